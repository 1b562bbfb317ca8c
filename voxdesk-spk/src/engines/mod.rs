//! TTS engine implementations

pub mod command;
pub mod custom;
pub mod remote;

use crate::audio::AudioSegment;
use crate::error::SpeechError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// One engine output step: the source text chunk, its phonetic
/// transcription if the engine reports one, and the audio
#[derive(Debug, Clone)]
pub struct EngineChunk {
    pub text: String,
    pub phonemes: Option<String>,
    pub segment: AudioSegment,
}

/// Lazy, ordered, finite sequence of engine chunks
pub type ChunkStream = BoxStream<'static, Result<EngineChunk, SpeechError>>;

/// An initialized engine handle, scoped to one language
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Language code the handle was initialized for
    fn language(&self) -> &str;

    /// Fixed output sample rate
    fn sample_rate(&self) -> u32;

    /// Start synthesis. Nothing runs until the stream is polled, and each
    /// call re-runs the engine.
    fn run(&self, text: &str, voice: &str, speed: f32) -> Result<ChunkStream, SpeechError>;

    /// Get available voices
    async fn list_voices(&self) -> Result<Vec<String>, SpeechError>;

    /// Get engine name
    fn name(&self) -> &str;
}

/// Builds engine handles for a language
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn initialize(&self, language: &str) -> Result<Arc<dyn SynthesisEngine>, SpeechError>;

    fn name(&self) -> &str;
}

/// Split text into chunks on runs of newlines, skipping blank chunks
pub fn split_text(text: &str) -> Vec<String> {
    text.split(|c| c == '\n' || c == '\r')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

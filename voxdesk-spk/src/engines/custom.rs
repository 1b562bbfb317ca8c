//! Custom TTS engine implementation
//! Allows embedders to provide their own in-process engine

use crate::engines::{split_text, ChunkStream, EngineChunk, EngineFactory, SynthesisEngine};
use crate::error::SpeechError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

type SynthesizeFn =
    dyn Fn(&str, &str, f32) -> Vec<Result<EngineChunk, SpeechError>> + Send + Sync;
type InitializeFn = dyn Fn(&str) -> Result<(), SpeechError> + Send + Sync;

/// Custom engine wrapper
///
/// The synthesize function receives the full text, the voice and the speed,
/// and returns the chunk results in production order.
pub struct CustomEngine {
    name: String,
    language: String,
    sample_rate: u32,
    voices: Vec<String>,
    synthesize_fn: Arc<SynthesizeFn>,
}

impl CustomEngine {
    pub fn new<F>(name: &str, language: &str, sample_rate: u32, synthesize_fn: F) -> Self
    where
        F: Fn(&str, &str, f32) -> Vec<Result<EngineChunk, SpeechError>> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            language: language.to_string(),
            sample_rate,
            voices: Vec::new(),
            synthesize_fn: Arc::new(synthesize_fn),
        }
    }

    /// Per-chunk variant: text is split on newlines and the function is
    /// called once per chunk
    pub fn per_chunk<F>(name: &str, language: &str, sample_rate: u32, chunk_fn: F) -> Self
    where
        F: Fn(&str, &str, f32) -> Result<EngineChunk, SpeechError> + Send + Sync + 'static,
    {
        Self::new(name, language, sample_rate, move |text, voice, speed| {
            split_text(text)
                .iter()
                .map(|chunk| chunk_fn(chunk, voice, speed))
                .collect()
        })
    }

    pub fn with_voices(mut self, voices: Vec<String>) -> Self {
        self.voices = voices;
        self
    }
}

#[async_trait]
impl SynthesisEngine for CustomEngine {
    fn language(&self) -> &str {
        &self.language
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn run(&self, text: &str, voice: &str, speed: f32) -> Result<ChunkStream, SpeechError> {
        if text.is_empty() {
            return Err(SpeechError::Synthesis("Text cannot be empty".to_string()));
        }
        let synthesize_fn = Arc::clone(&self.synthesize_fn);
        let text = text.to_string();
        let voice = voice.to_string();
        Ok(stream::once(async move { stream::iter(synthesize_fn(&text, &voice, speed)) })
            .flatten()
            .boxed())
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        Ok(self.voices.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Factory producing a custom engine per language
pub struct CustomEngineFactory {
    name: String,
    build: Arc<dyn Fn(&str) -> Result<Arc<dyn SynthesisEngine>, SpeechError> + Send + Sync>,
}

impl CustomEngineFactory {
    pub fn new<F>(name: &str, build: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn SynthesisEngine>, SpeechError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            build: Arc::new(build),
        }
    }

    /// Factory whose engines all share one synthesize function, with an
    /// initialization hook that may reject a language
    pub fn from_fn<I, F>(name: &str, sample_rate: u32, init_fn: I, synthesize_fn: F) -> Self
    where
        I: Fn(&str) -> Result<(), SpeechError> + Send + Sync + 'static,
        F: Fn(&str, &str, f32) -> Vec<Result<EngineChunk, SpeechError>> + Send + Sync + 'static,
    {
        let init_fn: Arc<InitializeFn> = Arc::new(init_fn);
        let synthesize_fn: Arc<SynthesizeFn> = Arc::new(synthesize_fn);
        let engine_name = name.to_string();
        Self::new(name, move |language| {
            init_fn(language)?;
            Ok(Arc::new(CustomEngine {
                name: engine_name.clone(),
                language: language.to_string(),
                sample_rate,
                voices: Vec::new(),
                synthesize_fn: Arc::clone(&synthesize_fn),
            }) as Arc<dyn SynthesisEngine>)
        })
    }
}

#[async_trait]
impl EngineFactory for CustomEngineFactory {
    async fn initialize(&self, language: &str) -> Result<Arc<dyn SynthesisEngine>, SpeechError> {
        (self.build)(language)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

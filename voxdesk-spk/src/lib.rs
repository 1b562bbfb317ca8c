//! voxdesk-spk: Speech synthesis pipeline for the desktop
//!
//! Turns text into audible speech in three stages:
//! - A synthesis producer drives a TTS engine and yields ordered audio segments
//! - A segment assembler concatenates them into one 16-bit PCM WAV buffer
//! - A playback consumer hands the buffer to an output device
//!
//! Synthesis runs on a background task with cooperative cancellation, so a
//! stop request interrupts both in-flight synthesis and active playback.

pub mod assembler;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod controller;
#[cfg(feature = "device")]
pub mod device;
pub mod engines;
pub mod error;
pub mod orchestrator;
pub mod playback;
pub mod producer;
pub mod registry;
pub mod request;
pub mod wav;

pub use assembler::{assemble, SegmentAssembler};
pub use audio::{AssembledAudio, AudioSegment};
pub use config::{EngineKind, SpeechConfig, VoiceConfig};
pub use controller::{Notification, SpeechController};
#[cfg(feature = "device")]
pub use device::CpalOutputDevice;
pub use engines::{EngineChunk, EngineFactory, SynthesisEngine};
pub use error::{FailureKind, SpeechError};
pub use orchestrator::{SpeechEvent, SpeechOrchestrator, TaskHandle};
pub use playback::{NullOutputDevice, OutputDevice, PlaybackConsumer, PlaybackSession, PlaybackState};
pub use producer::SynthesisProducer;
pub use registry::EngineRegistry;
pub use request::SynthesisRequest;

use engines::command::CommandEngineFactory;
use engines::remote::RemoteEngineFactory;
use std::sync::Arc;

/// Build the engine factory selected by the configuration
pub fn engine_factory(config: &SpeechConfig) -> Arc<dyn EngineFactory> {
    match config.engine {
        EngineKind::Command => Arc::new(CommandEngineFactory::new(config.command.clone())),
        EngineKind::Remote => Arc::new(RemoteEngineFactory::new(config.remote.clone())),
    }
}

//! Error types for voxdesk-spk

use thiserror::Error;

/// Speech synthesis and playback errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Engine initialization failed for language '{language}': {message}")]
    EngineInitialization { language: String, message: String },

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: u16, actual: u16 },

    #[error("No audio generated")]
    EmptyResult,

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("A synthesis request is already in flight")]
    Busy,

    #[error("Synthesis cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio format error: {0}")]
    Format(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure category reported to the interactive context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    EngineInitialization,
    Synthesis,
    EmptyResult,
    Playback,
    Rejected,
    Cancelled,
}

impl SpeechError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SpeechError::EngineInitialization { .. } => FailureKind::EngineInitialization,
            SpeechError::Synthesis(_)
            | SpeechError::SampleRateMismatch { .. }
            | SpeechError::ChannelMismatch { .. }
            | SpeechError::Format(_)
            | SpeechError::Io(_) => FailureKind::Synthesis,
            SpeechError::EmptyResult => FailureKind::EmptyResult,
            SpeechError::Playback(_) => FailureKind::Playback,
            SpeechError::InvalidRequest(_) | SpeechError::Busy | SpeechError::Config(_) => {
                FailureKind::Rejected
            }
            SpeechError::Cancelled => FailureKind::Cancelled,
        }
    }

    pub(crate) fn init(language: &str, message: impl Into<String>) -> Self {
        SpeechError::EngineInitialization {
            language: language.to_string(),
            message: message.into(),
        }
    }
}

//! A single user-initiated speak action

use crate::config::{SpeechConfig, MAX_SPEED, MIN_SPEED};
use crate::error::SpeechError;

const MAX_TEXT_LENGTH: usize = 100_000;

/// Immutable synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    text: String,
    voice: String,
    language: String,
    speed: f32,
}

impl SynthesisRequest {
    pub fn new(
        text: &str,
        voice: &str,
        language: &str,
        speed: f32,
    ) -> Result<Self, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::InvalidRequest("Please enter some text to speak".to_string()));
        }

        if text.contains('\0') {
            return Err(SpeechError::InvalidRequest("Text contains null bytes".to_string()));
        }

        if text.len() > MAX_TEXT_LENGTH {
            return Err(SpeechError::InvalidRequest(format!(
                "Text too long (max {} bytes)",
                MAX_TEXT_LENGTH
            )));
        }

        if voice.is_empty() || voice.chars().any(|c| c.is_control()) {
            return Err(SpeechError::InvalidRequest("Invalid voice identifier".to_string()));
        }

        if language.is_empty()
            || language.len() > 32
            || !language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(SpeechError::InvalidRequest(format!(
                "Invalid language code '{}'",
                language
            )));
        }

        if !speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(SpeechError::InvalidRequest(format!(
                "Speed must be between {} and {}",
                MIN_SPEED, MAX_SPEED
            )));
        }

        Ok(Self {
            text: text.to_string(),
            voice: voice.to_string(),
            language: language.to_string(),
            speed,
        })
    }

    /// Build a request using the configured voice, language and speed
    pub fn from_config(text: &str, config: &SpeechConfig) -> Result<Self, SpeechError> {
        Self::new(text, &config.voice.voice, &config.voice.language, config.speed)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }
}

/// Convert a speed percentage (50-200) to a multiplier
pub fn speed_from_percent(percent: u32) -> Result<f32, SpeechError> {
    if !(50..=200).contains(&percent) {
        return Err(SpeechError::InvalidRequest(format!(
            "Speed must be between 50% and 200%, got {}%",
            percent
        )));
    }
    Ok(percent as f32 / 100.0)
}

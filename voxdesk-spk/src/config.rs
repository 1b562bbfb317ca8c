//! Configuration for speech synthesis and playback

use crate::catalog;
use crate::error::SpeechError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Engine used by the synthesis producer
    pub engine: EngineKind,

    /// Voice settings
    pub voice: VoiceConfig,

    /// Speed multiplier (0.5-2.0, default 1.0)
    pub speed: f32,

    /// Playback gain (0.0-1.0, default 1.0)
    pub volume: f32,

    /// External command engine settings
    pub command: CommandEngineConfig,

    /// Remote synthesis backend settings
    pub remote: RemoteEngineConfig,

    /// How long `stop` waits for an in-flight synthesis to wind down
    pub stop_timeout_ms: u64,

    /// Output device name (default device if unset)
    pub output_device: Option<String>,
}

/// Engine type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Local neural TTS program, one process per text chunk
    Command,
    /// Remote synthesis service over HTTP
    Remote,
}

/// Voice configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Engine language code (e.g. "a" for American English)
    pub language: String,

    /// Voice identifier (e.g. "af_heart")
    pub voice: String,
}

/// External command engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandEngineConfig {
    /// Program name or path
    pub program: PathBuf,

    /// Argument template. Placeholders: {text} {voice} {lang} {speed} {output}
    pub args: Vec<String>,

    /// Per-chunk timeout in seconds
    pub timeout_secs: u64,

    /// Sample rate the program produces
    pub sample_rate: u32,
}

/// Remote synthesis backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteEngineConfig {
    /// Base URL of the synthesis service
    pub endpoint: String,

    /// Voice name understood by the service
    pub voice_name: String,

    /// Locale code understood by the service (e.g. "en-US")
    pub language_code: String,

    /// Requested sample rate
    pub sample_rate: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Command,
            voice: VoiceConfig::default(),
            speed: 1.0,
            volume: 1.0,
            command: CommandEngineConfig::default(),
            remote: RemoteEngineConfig::default(),
            stop_timeout_ms: 2_000,
            output_device: None,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "a".to_string(),
            voice: "af_heart".to_string(),
        }
    }
}

impl Default for CommandEngineConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("koko"),
            args: [
                "text", "{text}", "--lan", "{lang}", "--style", "{voice}", "--speed", "{speed}",
                "--output", "{output}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            timeout_secs: 120,
            sample_rate: 24_000,
        }
    }
}

impl Default for RemoteEngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:50051".to_string(),
            voice_name: "English-US.Female-1".to_string(),
            language_code: "en-US".to_string(),
            sample_rate: 16_000,
            timeout_secs: 30,
        }
    }
}

impl VoiceConfig {
    /// Validate voice configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.language.is_empty() {
            return Err("Language code cannot be empty".to_string());
        }

        if !catalog::is_supported(&self.language) {
            return Err(format!("Unsupported language code '{}'", self.language));
        }

        if self.voice.is_empty() {
            return Err("Voice cannot be empty".to_string());
        }

        if self.voice.len() > 256 {
            return Err("Voice name too long (max 256 chars)".to_string());
        }

        if self.voice.chars().any(|c| c == '\0' || c.is_control()) {
            return Err("Voice name contains invalid characters".to_string());
        }

        Ok(())
    }
}

impl SpeechConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SpeechError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: SpeechConfig = toml::from_str(&content)
            .map_err(|e| SpeechError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate().map_err(SpeechError::Config)?;
        debug!("Loaded speech config from {}", path.display());
        Ok(config)
    }

    /// Apply `VOXDESK_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bin) = std::env::var("VOXDESK_ENGINE_BIN") {
            self.command.program = PathBuf::from(bin);
        }
        if let Ok(endpoint) = std::env::var("VOXDESK_REMOTE_ENDPOINT") {
            self.remote.endpoint = endpoint;
        }
        if let Ok(lang) = std::env::var("VOXDESK_LANG") {
            self.voice.language = lang;
        }
        if let Ok(voice) = std::env::var("VOXDESK_VOICE") {
            self.voice.voice = voice;
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(format!("Speed must be between {} and {}", MIN_SPEED, MAX_SPEED));
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }

        if self.stop_timeout_ms == 0 || self.stop_timeout_ms > 60_000 {
            return Err("Stop timeout must be between 1 and 60000 ms".to_string());
        }

        self.voice.validate()?;

        if self.command.program.as_os_str().is_empty() {
            return Err("Engine program cannot be empty".to_string());
        }

        if !self.command.args.iter().any(|a| a.contains("{output}")) {
            return Err("Engine arguments must contain an {output} placeholder".to_string());
        }

        if self.command.timeout_secs == 0 || self.command.timeout_secs > 3_600 {
            return Err("Engine timeout must be between 1 and 3600 seconds".to_string());
        }

        validate_sample_rate(self.command.sample_rate)?;

        if self.engine == EngineKind::Remote {
            let endpoint = &self.remote.endpoint;
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err("Remote endpoint must be an http:// or https:// URL".to_string());
            }

            if endpoint.len() > 2048 {
                return Err("Remote endpoint URL too long (max 2048 chars)".to_string());
            }

            if self.remote.voice_name.is_empty() {
                return Err("Remote voice name cannot be empty".to_string());
            }

            if self.remote.timeout_secs == 0 || self.remote.timeout_secs > 300 {
                return Err("Remote timeout must be between 1 and 300 seconds".to_string());
            }

            validate_sample_rate(self.remote.sample_rate)?;
        }

        if let Some(ref device) = self.output_device {
            if device.is_empty() || device.len() > 256 {
                return Err("Output device name must be 1-256 chars".to_string());
            }
        }

        Ok(())
    }
}

/// Accepted output rates, shared by config validation and ad hoc tones
pub fn validate_sample_rate(rate: u32) -> Result<(), String> {
    if !(8_000..=192_000).contains(&rate) {
        return Err(format!("Sample rate {} Hz out of range (8000-192000)", rate));
    }
    Ok(())
}

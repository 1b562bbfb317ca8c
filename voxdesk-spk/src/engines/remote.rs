//! Remote synthesis backend
//! Sends the whole text in one request and receives raw 16-bit PCM

use crate::audio::AudioSegment;
use crate::config::RemoteEngineConfig;
use crate::engines::{ChunkStream, EngineChunk, EngineFactory, SynthesisEngine};
use crate::error::SpeechError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const SYNTHESIZE_PATH: &str = "/v1/synthesize";

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice_name: &'a str,
    encoding: &'static str,
    sample_rate_hz: u32,
    language_code: &'a str,
}

pub struct RemoteEngineFactory {
    config: RemoteEngineConfig,
}

impl RemoteEngineFactory {
    pub fn new(config: RemoteEngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineFactory for RemoteEngineFactory {
    async fn initialize(&self, language: &str) -> Result<Arc<dyn SynthesisEngine>, SpeechError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| SpeechError::init(language, format!("Failed to create HTTP client: {}", e)))?;

        info!(
            endpoint = %self.config.endpoint,
            voice = %self.config.voice_name,
            "Initialized remote TTS engine"
        );
        Ok(Arc::new(RemoteEngine {
            client,
            url: format!("{}{}", self.config.endpoint.trim_end_matches('/'), SYNTHESIZE_PATH),
            language: language.to_string(),
            config: self.config.clone(),
        }))
    }

    fn name(&self) -> &str {
        "remote"
    }
}

/// Remote engine handle; the request voice is ignored in favour of the
/// service's configured voice name
pub struct RemoteEngine {
    client: Client,
    url: String,
    language: String,
    config: RemoteEngineConfig,
}

#[async_trait]
impl SynthesisEngine for RemoteEngine {
    fn language(&self) -> &str {
        &self.language
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn run(&self, text: &str, voice: &str, _speed: f32) -> Result<ChunkStream, SpeechError> {
        debug!(requested = voice, using = %self.config.voice_name, "Remote voice selection");

        let client = self.client.clone();
        let url = self.url.clone();
        let config = self.config.clone();
        let text = text.to_string();

        let stream = stream::once(async move {
            let body = SynthesizeRequest {
                text: &text,
                voice_name: &config.voice_name,
                encoding: "LINEAR_PCM",
                sample_rate_hz: config.sample_rate,
                language_code: &config.language_code,
            };

            let response = client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| SpeechError::Synthesis(format!("Remote request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(SpeechError::Synthesis(format!(
                    "Remote synthesis error ({}): {}",
                    status, error_text
                )));
            }

            let audio = response
                .bytes()
                .await
                .map_err(|e| SpeechError::Synthesis(format!("Failed to read audio response: {}", e)))?;
            let segment = AudioSegment::from_le_bytes(&audio, config.sample_rate)?;
            debug!(samples = segment.len(), "Received remote audio");

            Ok(EngineChunk {
                text,
                phonemes: None,
                segment,
            })
        })
        .boxed();
        Ok(stream)
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        Ok(vec![self.config.voice_name.clone()])
    }

    fn name(&self) -> &str {
        "remote"
    }
}

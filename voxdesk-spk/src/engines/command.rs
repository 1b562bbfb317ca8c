//! External command engine
//! Local neural TTS run as a child process, once per text chunk

use crate::catalog;
use crate::config::CommandEngineConfig;
use crate::engines::{split_text, ChunkStream, EngineChunk, EngineFactory, SynthesisEngine};
use crate::error::SpeechError;
use crate::wav;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Creates command engines after locating the program
pub struct CommandEngineFactory {
    config: CommandEngineConfig,
}

impl CommandEngineFactory {
    pub fn new(config: CommandEngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineFactory for CommandEngineFactory {
    async fn initialize(&self, language: &str) -> Result<Arc<dyn SynthesisEngine>, SpeechError> {
        if !catalog::is_supported(language) {
            return Err(SpeechError::init(language, "unsupported language code"));
        }

        let program = resolve_program(&self.config.program).ok_or_else(|| {
            SpeechError::init(
                language,
                format!(
                    "TTS program '{}' not found. Install it or set command.program in config",
                    self.config.program.display()
                ),
            )
        })?;

        info!(program = ?program, language, "Initialized command TTS engine");
        Ok(Arc::new(CommandEngine {
            program,
            args: self.config.args.clone(),
            language: language.to_string(),
            timeout: Duration::from_secs(self.config.timeout_secs),
            sample_rate: self.config.sample_rate,
        }))
    }

    fn name(&self) -> &str {
        "command"
    }
}

/// Engine handle bound to one program and language
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    language: String,
    timeout: Duration,
    sample_rate: u32,
}

/// Everything one chunk invocation needs, shared across the stream
struct ChunkJob {
    program: PathBuf,
    args: Vec<String>,
    language: String,
    voice: String,
    speed: String,
    timeout: Duration,
}

#[async_trait]
impl SynthesisEngine for CommandEngine {
    fn language(&self) -> &str {
        &self.language
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn run(&self, text: &str, voice: &str, speed: f32) -> Result<ChunkStream, SpeechError> {
        let chunks = split_text(text);
        debug!("Split text into {} chunks", chunks.len());

        let job = Arc::new(ChunkJob {
            program: self.program.clone(),
            args: self.args.clone(),
            language: self.language.clone(),
            voice: voice.to_string(),
            speed: format!("{:.2}", speed),
            timeout: self.timeout,
        });

        let stream = stream::iter(chunks)
            .then(move |chunk| {
                let job = Arc::clone(&job);
                async move { job.synthesize(chunk).await }
            })
            .boxed();
        Ok(stream)
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        Ok(catalog::voices(&self.language)
            .iter()
            .map(|v| v.to_string())
            .collect())
    }

    fn name(&self) -> &str {
        "command"
    }
}

impl ChunkJob {
    async fn synthesize(&self, text: String) -> Result<EngineChunk, SpeechError> {
        let output = tempfile::Builder::new()
            .prefix("voxdesk-")
            .suffix(".wav")
            .tempfile()?;
        let output_path = output.path().to_string_lossy().into_owned();

        // Control characters are dropped; newlines never reach here
        let sanitized: String = text.chars().filter(|c| !c.is_control()).collect();

        let values = [
            ("{text}", sanitized.as_str()),
            ("{voice}", self.voice.as_str()),
            ("{lang}", self.language.as_str()),
            ("{speed}", self.speed.as_str()),
            ("{output}", output_path.as_str()),
        ];
        let args: Vec<String> = self.args.iter().map(|a| expand(a, &values)).collect();

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SpeechError::Synthesis(format!(
                    "Failed to execute {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                SpeechError::Synthesis(format!(
                    "TTS program timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| SpeechError::Synthesis(format!("TTS program failed: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SpeechError::Synthesis(format!(
                "TTS program exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(output.path()).await.map_err(|e| {
            SpeechError::Synthesis(format!("Failed to read engine output: {}", e))
        })?;
        let segment = wav::read_segment(Cursor::new(bytes))?;
        debug!(chunk = %text, samples = segment.len(), "Synthesized chunk");

        Ok(EngineChunk {
            text,
            phonemes: None,
            segment,
        })
    }
}

/// Substitute `{name}` placeholders found in the template only
fn expand(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_program(program: &Path) -> Option<PathBuf> {
    // Path-like values are used as given
    if program.components().count() > 1 || program.is_absolute() {
        return program.exists().then(|| program.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

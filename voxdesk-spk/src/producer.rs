//! Synthesis producer: request in, lazy ordered segments out

use crate::audio::AudioSegment;
use crate::engines::EngineFactory;
use crate::error::SpeechError;
use crate::registry::EngineRegistry;
use crate::request::SynthesisRequest;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tracing::debug;

pub type SegmentStream = BoxStream<'static, Result<AudioSegment, SpeechError>>;

/// One started synthesis
pub struct Synthesis {
    pub segments: SegmentStream,
    /// The engine's fixed output rate
    pub sample_rate: u32,
    /// True if the engine was (re)initialized for this request
    pub initialized: bool,
}

/// Runs requests against the cached engine for their language
///
/// Not safe to run overlapping requests on one producer; callers serialize
/// access (the orchestrator holds it behind a mutex).
pub struct SynthesisProducer {
    registry: EngineRegistry,
}

impl SynthesisProducer {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            registry: EngineRegistry::new(factory),
        }
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EngineRegistry {
        &mut self.registry
    }

    /// Start synthesis. No retries; engine failures surface as-is.
    pub async fn synthesize(&mut self, request: &SynthesisRequest) -> Result<Synthesis, SpeechError> {
        let acquired = self.registry.acquire(request.language()).await?;
        let engine = acquired.engine;

        let chunks = engine.run(request.text(), request.voice(), request.speed())?;
        let segments = chunks
            .map(|result| {
                result.map(|chunk| {
                    debug!(
                        text = %chunk.text,
                        phonemes = ?chunk.phonemes,
                        samples = chunk.segment.len(),
                        "Engine produced chunk"
                    );
                    chunk.segment
                })
            })
            .boxed();

        Ok(Synthesis {
            segments,
            sample_rate: engine.sample_rate(),
            initialized: acquired.initialized,
        })
    }
}

//! Engine cache keyed by language code

use crate::engines::{EngineFactory, SynthesisEngine};
use crate::error::SpeechError;
use std::sync::Arc;
use tracing::{info, warn};

/// Holds at most one initialized engine, for the language it was built for
pub struct EngineRegistry {
    factory: Arc<dyn EngineFactory>,
    cached: Option<Arc<dyn SynthesisEngine>>,
}

/// Engine handed out by the registry
pub struct Acquired {
    pub engine: Arc<dyn SynthesisEngine>,
    /// True if this call had to initialize the engine
    pub initialized: bool,
}

impl EngineRegistry {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            cached: None,
        }
    }

    /// Whether `acquire(language)` would initialize a new engine
    pub fn needs_initialization(&self, language: &str) -> bool {
        self.cached_language() != Some(language)
    }

    /// Reuse the cached engine for the same language, otherwise replace it.
    /// The cache stays empty if initialization fails.
    pub async fn acquire(&mut self, language: &str) -> Result<Acquired, SpeechError> {
        if let Some(ref engine) = self.cached {
            if engine.language() == language {
                return Ok(Acquired {
                    engine: Arc::clone(engine),
                    initialized: false,
                });
            }
            info!(
                "Language changed from '{}' to '{}', reinitializing engine",
                engine.language(),
                language
            );
        }
        self.cached = None;

        let engine = self
            .factory
            .initialize(language)
            .await
            .map_err(|e| match e {
                SpeechError::EngineInitialization { .. } => e,
                other => SpeechError::init(language, other.to_string()),
            })
            .map_err(|e| {
                warn!("{}", e);
                e
            })?;

        self.cached = Some(Arc::clone(&engine));
        Ok(Acquired {
            engine,
            initialized: true,
        })
    }

    pub fn cached_language(&self) -> Option<&str> {
        self.cached.as_ref().map(|e| e.language())
    }

    /// Drop the cached engine
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn factory_name(&self) -> &str {
        self.factory.name()
    }
}

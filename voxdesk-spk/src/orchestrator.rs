//! Background synthesis tasks: producer into assembler, one request at a time

use crate::assembler::SegmentAssembler;
use crate::audio::AssembledAudio;
use crate::engines::EngineFactory;
use crate::error::{FailureKind, SpeechError};
use crate::producer::SynthesisProducer;
use crate::request::SynthesisRequest;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events sent from the background task to the interactive context
#[derive(Debug)]
pub enum SpeechEvent {
    /// Human-readable progress line
    Progress(String),
    /// Assembly finished; the buffer is ready for playback
    AudioReady(AssembledAudio),
    Error { kind: FailureKind, message: String },
    /// Sent after `AudioReady`
    Finished,
    Cancelled,
}

/// Handle on one submitted request
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

struct ActiveTask {
    handle: TaskHandle,
    join: JoinHandle<()>,
}

/// Runs synthesis and assembly off the interactive context
///
/// At most one task is in flight. Engine access is serialized through a
/// mutex around the producer, so the cached engine is never driven by two
/// requests at once.
pub struct SpeechOrchestrator {
    producer: Arc<tokio::sync::Mutex<SynthesisProducer>>,
    events: mpsc::UnboundedSender<SpeechEvent>,
    active: Mutex<Option<ActiveTask>>,
    stop_timeout: Duration,
    next_id: AtomicU64,
}

impl SpeechOrchestrator {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        stop_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SpeechEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let orchestrator = Self {
            producer: Arc::new(tokio::sync::Mutex::new(SynthesisProducer::new(factory))),
            events,
            active: Mutex::new(None),
            stop_timeout,
            next_id: AtomicU64::new(1),
        };
        (orchestrator, receiver)
    }

    /// Start a background task for the request
    ///
    /// Must be called from within a tokio runtime. Rejected with
    /// [`SpeechError::Busy`] while another task is unfinished.
    pub fn submit(&self, request: SynthesisRequest) -> Result<TaskHandle, SpeechError> {
        let mut active = self.active.lock();
        if let Some(ref task) = *active {
            if !task.join.is_finished() {
                return Err(SpeechError::Busy);
            }
        }

        let handle = TaskHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        };
        info!(
            task = handle.id,
            language = request.language(),
            voice = request.voice(),
            chars = request.text().chars().count(),
            "Submitting synthesis request"
        );

        let join = tokio::spawn(run_task(
            handle.id,
            Arc::clone(&self.producer),
            request,
            handle.token.clone(),
            self.events.clone(),
        ));
        *active = Some(ActiveTask {
            handle: handle.clone(),
            join,
        });
        Ok(handle)
    }

    /// Cancel the in-flight task and wait for it to wind down
    ///
    /// Tasks that ignore cancellation past the stop timeout are aborted.
    /// Returns false if nothing was running.
    pub async fn stop(&self) -> bool {
        let task = self.active.lock().take();
        let Some(mut task) = task else {
            return false;
        };
        if task.join.is_finished() {
            return false;
        }

        info!(task = task.handle.id, "Stopping synthesis");
        task.handle.cancel();
        if tokio::time::timeout(self.stop_timeout, &mut task.join)
            .await
            .is_err()
        {
            warn!(
                task = task.handle.id,
                "Synthesis did not stop within {:?}, aborting",
                self.stop_timeout
            );
            task.join.abort();
            let _ = self.events.send(SpeechEvent::Cancelled);
        }
        true
    }

    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map(|task| !task.join.is_finished())
            .unwrap_or(false)
    }

    /// Language of the engine currently cached by the producer, if any
    pub fn cached_language(&self) -> Option<String> {
        self.producer
            .try_lock()
            .ok()
            .and_then(|p| p.registry().cached_language().map(str::to_string))
    }
}

async fn run_task(
    id: u64,
    producer: Arc<tokio::sync::Mutex<SynthesisProducer>>,
    request: SynthesisRequest,
    token: CancellationToken,
    events: mpsc::UnboundedSender<SpeechEvent>,
) {
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => Err(SpeechError::Cancelled),
        result = produce(&producer, &request, &token, &events) => result,
    };

    match outcome {
        Ok(audio) => {
            info!(
                task = id,
                samples = audio.sample_count(),
                duration_ms = audio.duration().as_millis() as u64,
                "Synthesis complete"
            );
            let _ = events.send(SpeechEvent::AudioReady(audio));
            let _ = events.send(SpeechEvent::Finished);
        }
        Err(SpeechError::Cancelled) => {
            info!(task = id, "Synthesis cancelled");
            let _ = events.send(SpeechEvent::Cancelled);
        }
        Err(e) => {
            error!(task = id, "Synthesis failed: {}", e);
            let _ = events.send(SpeechEvent::Error {
                kind: e.kind(),
                message: e.to_string(),
            });
        }
    }
}

async fn produce(
    producer: &tokio::sync::Mutex<SynthesisProducer>,
    request: &SynthesisRequest,
    token: &CancellationToken,
    events: &mpsc::UnboundedSender<SpeechEvent>,
) -> Result<AssembledAudio, SpeechError> {
    let progress = |message: String| {
        debug!("{}", message);
        let _ = events.send(SpeechEvent::Progress(message));
    };

    let mut producer = producer.lock().await;
    if producer.registry().needs_initialization(request.language()) {
        progress(format!(
            "Initializing pipeline for language '{}'...",
            request.language()
        ));
    }
    let synthesis = producer.synthesize(request).await?;
    progress("Generating speech...".to_string());

    let mut assembler = SegmentAssembler::new(synthesis.sample_rate, 1);
    let mut segments = synthesis.segments;
    while let Some(segment) = segments.next().await {
        if token.is_cancelled() {
            return Err(SpeechError::Cancelled);
        }
        let segment = segment?;
        progress(format!(
            "Processing segment {}...",
            assembler.segment_count() + 1
        ));
        assembler.push(segment)?;
    }

    assembler.finish()
}

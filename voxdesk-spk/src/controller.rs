//! Interactive context: owns the playback consumer and reacts to task events

use crate::config::SpeechConfig;
use crate::engines::EngineFactory;
use crate::error::{FailureKind, SpeechError};
use crate::orchestrator::{SpeechEvent, SpeechOrchestrator, TaskHandle};
use crate::playback::{OutputDevice, PlaybackConsumer, PlaybackSession, PlaybackState};
use crate::request::SynthesisRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub const STATUS_READY: &str = "Ready to synthesize speech";
pub const STATUS_SYNTHESIZING: &str = "Synthesizing speech...";
pub const STATUS_PLAYING: &str = "Playing audio...";
pub const STATUS_STOPPED: &str = "Speech stopped";

/// What the interactive surface should show
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Status(String),
    /// Assembled audio was handed to the device
    Playing { duration: Duration },
    /// The background task finished cleanly
    Ready,
    Failed { kind: FailureKind, message: String },
}

/// Speak/stop front end over the orchestrator and one output device
pub struct SpeechController<D: OutputDevice> {
    orchestrator: SpeechOrchestrator,
    events: mpsc::UnboundedReceiver<SpeechEvent>,
    consumer: PlaybackConsumer<D>,
    session: Option<PlaybackSession>,
    status: String,
}

impl<D: OutputDevice> SpeechController<D> {
    pub fn new(factory: Arc<dyn EngineFactory>, device: D, config: &SpeechConfig) -> Self {
        let (orchestrator, events) = SpeechOrchestrator::new(factory, config.stop_timeout());
        let mut consumer = PlaybackConsumer::new(device);
        consumer.set_gain(config.volume);
        Self {
            orchestrator,
            events,
            consumer,
            session: None,
            status: STATUS_READY.to_string(),
        }
    }

    /// Submit a request; any current playback is stopped first
    pub fn speak(&mut self, request: SynthesisRequest) -> Result<TaskHandle, SpeechError> {
        if self.orchestrator.is_busy() {
            return Err(SpeechError::Busy);
        }
        self.stop_playback();
        let handle = self.orchestrator.submit(request)?;
        self.status = STATUS_SYNTHESIZING.to_string();
        Ok(handle)
    }

    /// Stop synthesis and playback. Safe to call when both are idle.
    pub async fn stop(&mut self) -> Notification {
        let stopped_task = self.orchestrator.stop().await;

        // Audio that was assembled but not yet collected must not start later
        while let Ok(event) = self.events.try_recv() {
            if let SpeechEvent::AudioReady(_) = event {
                info!("Discarding audio assembled before stop");
            }
        }

        self.stop_playback();
        self.consumer.halt();
        if stopped_task {
            info!("Speech stopped during synthesis");
        }
        self.status = STATUS_STOPPED.to_string();
        Notification::Status(self.status.clone())
    }

    /// Linear volume from a 0-100 percentage
    pub fn set_volume(&mut self, percent: u8) {
        self.consumer.set_volume_percent(percent);
    }

    /// Wait for the next task event and apply it
    ///
    /// `AudioReady` is handed to the playback consumer here, on the caller's
    /// task. Returns `None` only if the event channel is closed.
    pub async fn next_notification(&mut self) -> Option<Notification> {
        let event = self.events.recv().await?;
        Some(self.apply(event))
    }

    /// Non-blocking variant of [`next_notification`](Self::next_notification)
    pub fn try_notification(&mut self) -> Option<Notification> {
        let event = self.events.try_recv().ok()?;
        Some(self.apply(event))
    }

    /// Detect natural completion of the current playback
    pub fn poll_playback(&mut self) -> Option<Notification> {
        let session = self.session.as_mut()?;
        if !session.is_playing() {
            return None;
        }
        if self.consumer.refresh(session) == PlaybackState::Stopped {
            self.session = None;
            self.status = STATUS_READY.to_string();
            return Some(Notification::Status(self.status.clone()));
        }
        None
    }

    fn apply(&mut self, event: SpeechEvent) -> Notification {
        match event {
            SpeechEvent::Progress(message) => {
                self.status = message.clone();
                Notification::Status(message)
            }
            SpeechEvent::AudioReady(audio) => self.start_playback(audio),
            SpeechEvent::Finished => Notification::Ready,
            SpeechEvent::Error { kind, message } => self.fail(kind, message),
            SpeechEvent::Cancelled => {
                self.status = STATUS_STOPPED.to_string();
                Notification::Status(self.status.clone())
            }
        }
    }

    fn start_playback(&mut self, audio: crate::audio::AssembledAudio) -> Notification {
        let duration = audio.duration();
        let result = self.consumer.load(audio).and_then(|mut session| {
            self.consumer.play(&mut session)?;
            Ok(session)
        });

        match result {
            Ok(session) => {
                self.session = Some(session);
                self.status = STATUS_PLAYING.to_string();
                Notification::Playing { duration }
            }
            Err(e) => {
                warn!("Playback failed: {}", e);
                self.fail(FailureKind::Playback, e.to_string())
            }
        }
    }

    fn fail(&mut self, kind: FailureKind, message: String) -> Notification {
        self.status = format!("Error: {}", message);
        Notification::Failed { kind, message }
    }

    fn stop_playback(&mut self) {
        if let Some(mut session) = self.session.take() {
            self.consumer.stop(&mut session);
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.orchestrator.is_busy()
    }

    pub fn playback_state(&self) -> Option<PlaybackState> {
        self.session.as_ref().map(|s| s.state())
    }

    pub fn orchestrator(&self) -> &SpeechOrchestrator {
        &self.orchestrator
    }

    pub fn consumer(&self) -> &PlaybackConsumer<D> {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut PlaybackConsumer<D> {
        &mut self.consumer
    }
}

//! Playback consumer: binds an assembled buffer to an output device

use crate::audio::AssembledAudio;
use crate::error::SpeechError;
use bytes::Bytes;
use hound::WavReader;
use std::io::Cursor;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Audio output capability
///
/// The device receives its own handle to the encoded buffer, so the bytes
/// stay alive for as long as the device may read them.
pub trait OutputDevice: Send {
    /// Bind a complete encoded buffer as the source, replacing any previous one
    fn bind_source(&mut self, source: Bytes) -> Result<(), SpeechError>;

    /// Start streaming the bound source from offset 0
    fn play(&mut self) -> Result<(), SpeechError>;

    /// Halt streaming and release the device. Safe to call when idle.
    fn stop(&mut self);

    /// Linear gain, 0.0-1.0
    fn set_gain(&mut self, gain: f32);

    /// Whether the device is still streaming
    fn is_active(&self) -> bool;

    fn name(&self) -> &str;
}

impl<D: OutputDevice + ?Sized> OutputDevice for Box<D> {
    fn bind_source(&mut self, source: Bytes) -> Result<(), SpeechError> {
        (**self).bind_source(source)
    }

    fn play(&mut self) -> Result<(), SpeechError> {
        (**self).play()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn set_gain(&mut self, gain: f32) {
        (**self).set_gain(gain)
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Loaded, not yet started
    Idle,
    Playing,
    /// Finished or stopped; a session is never resumed
    Stopped,
}

/// One loaded buffer and its playback state
#[derive(Debug)]
pub struct PlaybackSession {
    id: u64,
    audio: AssembledAudio,
    state: PlaybackState,
}

impl PlaybackSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn audio(&self) -> &AssembledAudio {
        &self.audio
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}

/// Drives one output device, one session at a time
pub struct PlaybackConsumer<D: OutputDevice> {
    device: D,
    gain: f32,
    bound: Option<u64>,
    playing: Option<u64>,
    next_id: u64,
}

impl<D: OutputDevice> PlaybackConsumer<D> {
    pub fn new(mut device: D) -> Self {
        device.set_gain(1.0);
        Self {
            device,
            gain: 1.0,
            bound: None,
            playing: None,
            next_id: 1,
        }
    }

    /// Bind a buffer to the device. Whatever was playing is stopped.
    pub fn load(&mut self, audio: AssembledAudio) -> Result<PlaybackSession, SpeechError> {
        self.halt();
        self.device
            .bind_source(audio.bytes().clone())
            .map_err(into_playback)?;

        let id = self.next_id;
        self.next_id += 1;
        self.bound = Some(id);
        debug!(
            session = id,
            bytes = audio.bytes().len(),
            device = self.device.name(),
            "Loaded audio"
        );

        Ok(PlaybackSession {
            id,
            audio,
            state: PlaybackState::Idle,
        })
    }

    /// Start an idle session. Stopped sessions are rejected.
    pub fn play(&mut self, session: &mut PlaybackSession) -> Result<(), SpeechError> {
        match session.state {
            PlaybackState::Playing => return Ok(()),
            PlaybackState::Stopped => {
                return Err(SpeechError::Playback(
                    "Session already stopped; load the audio again to replay".to_string(),
                ))
            }
            PlaybackState::Idle => {}
        }

        if self.bound != Some(session.id) {
            self.halt();
            self.device
                .bind_source(session.audio.bytes().clone())
                .map_err(into_playback)?;
            self.bound = Some(session.id);
        }

        self.device.play().map_err(into_playback)?;
        session.state = PlaybackState::Playing;
        self.playing = Some(session.id);
        info!(
            session = session.id,
            duration_ms = session.audio.duration().as_millis() as u64,
            "Playing audio"
        );
        Ok(())
    }

    /// Stop a session. Idle sessions are left untouched.
    pub fn stop(&mut self, session: &mut PlaybackSession) {
        if session.state != PlaybackState::Playing {
            return;
        }
        if self.playing == Some(session.id) {
            self.halt();
        }
        session.state = PlaybackState::Stopped;
        info!(session = session.id, "Playback stopped");
    }

    /// Detect natural completion
    pub fn refresh(&mut self, session: &mut PlaybackSession) -> PlaybackState {
        if session.state == PlaybackState::Playing && !self.device.is_active() {
            session.state = PlaybackState::Stopped;
            if self.playing == Some(session.id) {
                self.playing = None;
            }
            info!(session = session.id, "Playback finished");
        }
        session.state
    }

    /// Stop the device unconditionally
    pub fn halt(&mut self) {
        self.device.stop();
        self.playing = None;
    }

    /// Set linear gain; each call replaces the previous value
    pub fn set_gain(&mut self, gain: f32) {
        let gain = if gain.is_finite() { gain.clamp(0.0, 1.0) } else { 1.0 };
        self.gain = gain;
        self.device.set_gain(gain);
    }

    /// Set gain from a 0-100 volume percentage
    pub fn set_volume_percent(&mut self, percent: u8) {
        self.set_gain(percent.min(100) as f32 / 100.0);
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

fn into_playback(err: SpeechError) -> SpeechError {
    match err {
        SpeechError::Playback(_) => err,
        other => SpeechError::Playback(other.to_string()),
    }
}

/// Output device without an audio backend
///
/// Logs what it would play and reports itself active for the buffer's
/// duration.
#[derive(Debug)]
pub struct NullOutputDevice {
    duration: Duration,
    started: Option<Instant>,
    gain: f32,
}

impl NullOutputDevice {
    pub fn new() -> Self {
        Self {
            duration: Duration::ZERO,
            started: None,
            gain: 1.0,
        }
    }
}

impl Default for NullOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDevice for NullOutputDevice {
    fn bind_source(&mut self, source: Bytes) -> Result<(), SpeechError> {
        let reader = WavReader::new(Cursor::new(source))
            .map_err(|e| SpeechError::Playback(format!("Unreadable audio buffer: {}", e)))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(SpeechError::Playback("Audio buffer declares a zero sample rate".to_string()));
        }
        self.duration = Duration::from_secs_f64(reader.duration() as f64 / spec.sample_rate as f64);
        self.started = None;
        Ok(())
    }

    fn play(&mut self) -> Result<(), SpeechError> {
        info!(
            duration_ms = self.duration.as_millis() as u64,
            gain = self.gain,
            "No audio backend compiled in; simulating playback"
        );
        self.started = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) {
        self.started = None;
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    fn is_active(&self) -> bool {
        self.started
            .map(|t| t.elapsed() < self.duration)
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "null"
    }
}

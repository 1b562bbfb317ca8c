//! Audio output through cpal
//!
//! The cpal stream is not `Send`, so each playback owns a dedicated thread
//! that builds the stream, keeps it alive and drops it on stop or completion.

use crate::error::SpeechError;
use crate::playback::OutputDevice;
use crate::wav;
use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use hound::WavReader;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Output device backed by the platform audio host
pub struct CpalOutputDevice {
    device_name: Option<String>,
    source: Option<Bytes>,
    gain: Arc<AtomicU32>,
    active: Arc<AtomicBool>,
    worker: Option<Worker>,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Decoded mono clip ready for streaming
struct Clip {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl CpalOutputDevice {
    /// Use the named output device, or the host default
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            source: None,
            gain: Arc::new(AtomicU32::new(1.0f32.to_bits())),
            active: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Get available output devices
    pub fn list_devices() -> Result<Vec<String>, SpeechError> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| SpeechError::Playback(format!("Failed to enumerate devices: {}", e)))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    fn decode_clip(source: &Bytes) -> Result<Clip, SpeechError> {
        let decoded = wav::decode_pcm16(source)
            .map_err(|e| SpeechError::Playback(format!("Unreadable audio buffer: {}", e)))?;
        let channels = decoded.channels.max(1) as usize;

        // Downmix to mono; the output callback spreads it over device channels
        let samples = decoded
            .samples
            .chunks(channels)
            .map(|frame| {
                frame.iter().map(|&s| s as f32 / i16::MAX as f32).sum::<f32>() / frame.len() as f32
            })
            .collect();

        Ok(Clip {
            samples: Arc::new(samples),
            sample_rate: decoded.sample_rate,
        })
    }
}

impl OutputDevice for CpalOutputDevice {
    fn bind_source(&mut self, source: Bytes) -> Result<(), SpeechError> {
        // Validate the header up front so binding fails rather than playing
        WavReader::new(Cursor::new(source.clone()))
            .map_err(|e| SpeechError::Playback(format!("Unreadable audio buffer: {}", e)))?;
        self.stop();
        self.source = Some(source);
        Ok(())
    }

    fn play(&mut self) -> Result<(), SpeechError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| SpeechError::Playback("No audio source bound".to_string()))?;
        let clip = Self::decode_clip(source)?;
        self.stop();

        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let device_name = self.device_name.clone();
        let gain = Arc::clone(&self.gain);
        let active = Arc::clone(&self.active);

        active.store(true, Ordering::SeqCst);
        let handle = std::thread::Builder::new()
            .name("voxdesk-playback".to_string())
            .spawn(move || {
                run_stream(device_name, clip, gain, &ready_tx, &stop_rx);
                active.store(false, Ordering::SeqCst);
            })
            .map_err(|e| SpeechError::Playback(format!("Failed to spawn playback thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(Worker { stop_tx, handle });
                Ok(())
            }
            Ok(Err(msg)) => {
                let _ = handle.join();
                self.active.store(false, Ordering::SeqCst);
                Err(SpeechError::Playback(msg))
            }
            Err(_) => {
                let _ = handle.join();
                self.active.store(false, Ordering::SeqCst);
                Err(SpeechError::Playback("Playback thread exited early".to_string()))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.try_send(());
            if worker.handle.join().is_err() {
                warn!("Playback thread panicked");
            }
            debug!("Output stream released");
        }
        self.active.store(false, Ordering::SeqCst);
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    fn is_active(&self) -> bool {
        self.worker.is_some() && self.active.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        self.device_name.as_deref().unwrap_or("default")
    }
}

impl Drop for CpalOutputDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_stream(
    device_name: Option<String>,
    clip: Clip,
    gain: Arc<AtomicU32>,
    ready_tx: &Sender<Result<(), String>>,
    stop_rx: &Receiver<()>,
) {
    let finished = Arc::new(AtomicBool::new(false));
    let stream = match open_stream(device_name.as_deref(), clip, gain, Arc::clone(&finished)) {
        Ok(stream) => stream,
        Err(msg) => {
            error!("{}", msg);
            let _ = ready_tx.send(Err(msg));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));

    loop {
        match stop_rx.recv_timeout(POLL_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if finished.load(Ordering::SeqCst) {
                    info!("Output stream reached end of audio");
                    break;
                }
            }
        }
    }
    drop(stream);
}

fn find_device(name: Option<&str>) -> Result<Device, String> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .output_devices()
            .map_err(|e| format!("Failed to enumerate devices: {}", e))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| format!("Output device '{}' not found", name)),
        None => host
            .default_output_device()
            .ok_or_else(|| "No output device available".to_string()),
    }
}

fn open_stream(
    device_name: Option<&str>,
    clip: Clip,
    gain: Arc<AtomicU32>,
    finished: Arc<AtomicBool>,
) -> Result<Stream, String> {
    let device = find_device(device_name)?;
    let default = device
        .default_output_config()
        .map_err(|e| format!("Failed to get output config: {}", e))?;
    let channels = default.channels();
    let format = default.sample_format();

    // Open at the clip's own rate when the device allows it
    let supports_clip_rate = device
        .supported_output_configs()
        .map(|mut ranges| {
            ranges.any(|r| {
                r.channels() == channels
                    && r.sample_format() == format
                    && r.min_sample_rate().0 <= clip.sample_rate
                    && clip.sample_rate <= r.max_sample_rate().0
            })
        })
        .unwrap_or(false);
    let rate = if supports_clip_rate {
        clip.sample_rate
    } else {
        default.sample_rate().0
    };

    let config = StreamConfig {
        channels,
        sample_rate: SampleRate(rate),
        buffer_size: BufferSize::Default,
    };
    debug!(rate, channels, format = ?format, "Opening output stream");

    let mut cursor = ClipCursor::new(clip, rate, gain, finished);
    let stream = match format {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                cursor.fill(data, channels, |s| s)
            },
            log_stream_error,
            None,
        ),
        SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                cursor.fill(data, channels, |s| (s * i16::MAX as f32) as i16)
            },
            log_stream_error,
            None,
        ),
        SampleFormat::U16 => device.build_output_stream(
            &config,
            move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                cursor.fill(data, channels, |s| ((s * 0.5 + 0.5) * u16::MAX as f32) as u16)
            },
            log_stream_error,
            None,
        ),
        other => return Err(format!("Unsupported sample format {:?}", other)),
    }
    .map_err(|e| format!("Failed to build stream: {}", e))?;

    stream
        .play()
        .map_err(|e| format!("Failed to start stream: {}", e))?;
    Ok(stream)
}

fn log_stream_error(err: cpal::StreamError) {
    error!("Audio output stream error: {}", err);
}

/// Read position into a clip, stepping by the clip/device rate ratio
struct ClipCursor {
    clip: Clip,
    position: f64,
    step: f64,
    gain: Arc<AtomicU32>,
    finished: Arc<AtomicBool>,
}

impl ClipCursor {
    fn new(clip: Clip, output_rate: u32, gain: Arc<AtomicU32>, finished: Arc<AtomicBool>) -> Self {
        let step = clip.sample_rate as f64 / output_rate.max(1) as f64;
        Self {
            clip,
            position: 0.0,
            step,
            gain,
            finished,
        }
    }

    fn fill<T: Copy>(&mut self, data: &mut [T], channels: u16, convert: impl Fn(f32) -> T) {
        let gain = f32::from_bits(self.gain.load(Ordering::Relaxed));
        for frame in data.chunks_mut(channels.max(1) as usize) {
            let value = match self.clip.samples.get(self.position as usize) {
                Some(&sample) => {
                    self.position += self.step;
                    convert((sample * gain).clamp(-1.0, 1.0))
                }
                None => {
                    self.finished.store(true, Ordering::SeqCst);
                    convert(0.0)
                }
            };
            for out in frame.iter_mut() {
                *out = value;
            }
        }
    }
}

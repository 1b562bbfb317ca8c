//! Audio segments and assembled playable buffers

use crate::error::SpeechError;
use crate::wav;
use bytes::Bytes;
use std::time::Duration;

/// Sample rate of the primary neural engine
pub const PRIMARY_SAMPLE_RATE: u32 = 24_000;

/// Sample rate requested from the remote backend
pub const REMOTE_SAMPLE_RATE: u32 = 16_000;

/// One chunk of synthesized audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSegment {
    /// Mono segment from 16-bit samples
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self::with_channels(samples, sample_rate, 1)
    }

    pub fn with_channels(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Mono segment from normalized float samples, clipped to [-1.0, 1.0]
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        let samples = samples.iter().map(|&s| f32_to_i16(s)).collect();
        Self::new(samples, sample_rate)
    }

    /// Mono sine tone at full scale
    pub fn sine(frequency: f32, seconds: f32, sample_rate: u32) -> Self {
        let count = (sample_rate as f32 * seconds.max(0.0)) as usize;
        let step = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
        let samples = (0..count)
            .map(|i| ((i as f32 * step).sin() * i16::MAX as f32) as i16)
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Mono segment from little-endian 16-bit PCM bytes
    pub fn from_le_bytes(raw: &[u8], sample_rate: u32) -> Result<Self, SpeechError> {
        if raw.len() % 2 != 0 {
            return Err(SpeechError::Synthesis(format!(
                "Odd PCM payload length ({} bytes)",
                raw.len()
            )));
        }
        let samples = raw
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self::new(samples, sample_rate))
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        frames_duration(self.samples.len(), self.sample_rate, self.channels)
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    if !sample.is_finite() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

fn frames_duration(sample_count: usize, sample_rate: u32, channels: u16) -> Duration {
    if sample_rate == 0 || channels == 0 {
        return Duration::ZERO;
    }
    let frames = sample_count as f64 / channels as f64;
    Duration::from_secs_f64(frames / sample_rate as f64)
}

/// Final playable buffer: a complete in-memory WAV file
///
/// Cloning shares the encoded bytes, so a playback device can hold the buffer
/// for as long as it reads from it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledAudio {
    encoded: Bytes,
    sample_rate: u32,
    channels: u16,
    sample_count: usize,
}

impl AssembledAudio {
    /// Encode samples into a WAV container
    pub fn encode(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Self, SpeechError> {
        let encoded = wav::encode_pcm16(samples, sample_rate, channels)?;
        Ok(Self {
            encoded,
            sample_rate,
            channels,
            sample_count: samples.len(),
        })
    }

    /// Encoded container bytes
    pub fn bytes(&self) -> &Bytes {
        &self.encoded
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn duration(&self) -> Duration {
        frames_duration(self.sample_count, self.sample_rate, self.channels)
    }

    /// Decode the container back into samples
    pub fn decode(&self) -> Result<wav::DecodedWav, SpeechError> {
        wav::decode_pcm16(&self.encoded)
    }
}

//! Uncompressed PCM WAV container

use crate::audio::{AssembledAudio, AudioSegment};
use crate::error::SpeechError;
use bytes::Bytes;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::{Cursor, Read};
use std::path::Path;

/// Size of the RIFF/fmt/data header written for 16-bit mono or stereo PCM
pub const HEADER_LEN: usize = 44;

pub const BITS_PER_SAMPLE: u16 = 16;

/// Samples and format read back from a 16-bit PCM container
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWav {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub samples: Vec<i16>,
}

pub fn pcm16_spec(sample_rate: u32, channels: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

/// Encode 16-bit samples into a complete in-memory WAV file
pub fn encode_pcm16(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Bytes, SpeechError> {
    if channels == 0 || sample_rate == 0 {
        return Err(SpeechError::Synthesis(
            "Sample rate and channel count must be non-zero".to_string(),
        ));
    }

    let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, pcm16_spec(sample_rate, channels))?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(Bytes::from(cursor.into_inner()))
}

/// Decode a 16-bit integer PCM WAV file
pub fn decode_pcm16(bytes: &[u8]) -> Result<DecodedWav, SpeechError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != BITS_PER_SAMPLE {
        return Err(SpeechError::Format(hound::Error::Unsupported));
    }

    let samples = reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    Ok(DecodedWav {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        samples,
    })
}

/// Read any integer or float WAV stream into a 16-bit segment
pub fn read_segment<R: Read>(source: R) -> Result<AudioSegment, SpeechError> {
    let mut reader = WavReader::new(source)?;
    let spec = reader.spec();

    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => {
            let floats = reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?;
            return Ok(AudioSegment::with_channels(
                AudioSegment::from_f32(&floats, spec.sample_rate).into_samples(),
                spec.sample_rate,
                spec.channels,
            ));
        }
        (SampleFormat::Int, 16) => reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?,
        // Narrower ints widen to full 16-bit scale, wider ones are truncated
        (SampleFormat::Int, bits) if bits < 16 => {
            let shift = 16 - bits;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v << shift) as i16))
                .collect::<Result<Vec<_>, _>>()?
        }
        (SampleFormat::Int, bits) => {
            let shift = bits - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(AudioSegment::with_channels(samples, spec.sample_rate, spec.channels))
}

/// Write an assembled buffer to disk as-is
pub fn write_file(path: impl AsRef<Path>, audio: &AssembledAudio) -> Result<(), SpeechError> {
    std::fs::write(path, audio.bytes())?;
    Ok(())
}

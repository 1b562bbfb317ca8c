//! Tests for the PCM WAV container

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use voxdesk_spk::audio::AssembledAudio;
use voxdesk_spk::error::SpeechError;
use voxdesk_spk::wav::{self, HEADER_LEN};

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[test]
fn test_header_describes_mono_pcm16() {
    let samples: Vec<i16> = (0..100).collect();
    let bytes = wav::encode_pcm16(&samples, 24_000, 1).unwrap();

    assert_eq!(bytes.len(), HEADER_LEN + samples.len() * 2);
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(le_u16(&bytes, 20), 1); // PCM format tag
    assert_eq!(le_u16(&bytes, 22), 1);
    assert_eq!(le_u32(&bytes, 24), 24_000);
    assert_eq!(le_u32(&bytes, 28), 48_000); // byte rate
    assert_eq!(le_u16(&bytes, 34), 16);
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(le_u32(&bytes, 40), 200);
}

#[test]
fn test_payload_is_little_endian() {
    let bytes = wav::encode_pcm16(&[0x1234, -2], 16_000, 1).unwrap();
    assert_eq!(&bytes[HEADER_LEN..], &[0x34, 0x12, 0xFE, 0xFF]);
}

#[test]
fn test_decode_reads_back_format_and_samples() {
    let samples = vec![i16::MIN, -1, 0, 1, i16::MAX];
    let audio = AssembledAudio::encode(&samples, 16_000, 1).unwrap();

    let decoded = audio.decode().unwrap();
    assert_eq!(decoded.sample_rate, 16_000);
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.bits_per_sample, 16);
    assert_eq!(decoded.samples, samples);
}

#[test]
fn test_empty_payload_is_header_only() {
    let bytes = wav::encode_pcm16(&[], 24_000, 1).unwrap();
    assert_eq!(bytes.len(), HEADER_LEN);
    assert_eq!(le_u32(&bytes, 40), 0);
}

#[test]
fn test_encode_rejects_zero_rate() {
    assert!(wav::encode_pcm16(&[1, 2, 3], 0, 1).is_err());
    assert!(wav::encode_pcm16(&[1, 2, 3], 24_000, 0).is_err());
}

#[test]
fn test_decode_rejects_float_container() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.finalize().unwrap();
    }

    let result = wav::decode_pcm16(cursor.get_ref());
    assert!(matches!(result, Err(SpeechError::Format(_))));
}

#[test]
fn test_decode_rejects_garbage() {
    assert!(wav::decode_pcm16(b"not a wav file at all").is_err());
}

#[test]
fn test_read_segment_converts_float_samples() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for s in [0.0f32, 1.5, -1.0, 0.5] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.set_position(0);

    let segment = wav::read_segment(cursor).unwrap();
    assert_eq!(segment.sample_rate(), 24_000);
    assert_eq!(segment.samples(), &[0, i16::MAX, -i16::MAX, 16_384]);
}

#[test]
fn test_read_segment_narrows_24_bit_samples() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 22_050,
        bits_per_sample: 24,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        writer.write_sample(0x7F_FF00i32).unwrap();
        writer.write_sample(-0x80_0000i32).unwrap();
        writer.finalize().unwrap();
    }
    cursor.set_position(0);

    let segment = wav::read_segment(cursor).unwrap();
    assert_eq!(segment.samples(), &[0x7FFF, i16::MIN]);
}

#[test]
fn test_read_segment_widens_8_bit_samples() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 8,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for s in [127i8, -128, 0] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.set_position(0);

    let segment = wav::read_segment(cursor).unwrap();
    assert_eq!(segment.sample_rate(), 16_000);
    assert_eq!(segment.samples(), &[0x7F00, i16::MIN, 0]);
}

#[test]
fn test_write_file_matches_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.wav");
    let audio = AssembledAudio::encode(&[10, 20, 30], 24_000, 1).unwrap();

    wav::write_file(&path, &audio).unwrap();
    let written = std::fs::read(&path).unwrap();
    assert_eq!(written.as_slice(), audio.bytes().as_ref());
}

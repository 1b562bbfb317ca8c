//! Segment assembly: ordered concatenation followed by container encoding

use crate::audio::{AssembledAudio, AudioSegment};
use crate::error::SpeechError;
use tracing::debug;

/// Collects segments in production order and encodes them once complete
///
/// Every segment must match the session's fixed sample rate and channel count.
/// Mismatches are errors; segments are never resampled.
#[derive(Debug)]
pub struct SegmentAssembler {
    sample_rate: u32,
    channels: u16,
    samples: Vec<i16>,
    segments: usize,
}

impl SegmentAssembler {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            samples: Vec::new(),
            segments: 0,
        }
    }

    /// Append the next segment
    pub fn push(&mut self, segment: AudioSegment) -> Result<(), SpeechError> {
        if segment.sample_rate() != self.sample_rate {
            return Err(SpeechError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: segment.sample_rate(),
            });
        }
        if segment.channels() != self.channels {
            return Err(SpeechError::ChannelMismatch {
                expected: self.channels,
                actual: segment.channels(),
            });
        }

        self.segments += 1;
        debug!(
            "Assembling segment {} ({} samples)",
            self.segments,
            segment.len()
        );
        self.samples.extend_from_slice(segment.samples());
        Ok(())
    }

    pub fn segment_count(&self) -> usize {
        self.segments
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Encode everything pushed so far
    pub fn finish(self) -> Result<AssembledAudio, SpeechError> {
        if self.segments == 0 {
            return Err(SpeechError::EmptyResult);
        }
        AssembledAudio::encode(&self.samples, self.sample_rate, self.channels)
    }
}

/// Assemble a complete mono sequence, stopping at the first error
pub fn assemble<I>(segments: I, sample_rate: u32) -> Result<AssembledAudio, SpeechError>
where
    I: IntoIterator<Item = Result<AudioSegment, SpeechError>>,
{
    let mut assembler = SegmentAssembler::new(sample_rate, 1);
    for segment in segments {
        assembler.push(segment?)?;
    }
    assembler.finish()
}

//! Peak-normalized 16-bit PCM WAV encoding, entirely in memory.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{Error, Result};
use crate::synth::SampleBuffer;

const HEADER_LEN: usize = 44;

/// A complete RIFF/WAVE file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavPayload(Vec<u8>);

impl WavPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn encoding_error(err: hound::Error) -> Error {
    Error::Encoding(err.to_string())
}

/// Scales samples so the loudest one reaches full range.
///
/// `sample / peak * 32768` is truncated toward zero and saturated, so a
/// positive peak lands on `i16::MAX` and a negative one on `i16::MIN`.
///
/// # Errors
///
/// [`Error::Encoding`] for an empty or silent buffer, or a non-finite sample.
pub fn normalize(samples: &[f64]) -> Result<Vec<i16>> {
    if samples.is_empty() {
        return Err(Error::Encoding("no samples to encode".into()));
    }
    if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
        return Err(Error::Encoding(format!("sample {pos} is not finite")));
    }
    let peak = samples.iter().fold(0.0_f64, |peak, s| peak.max(s.abs()));
    if peak == 0.0 {
        return Err(Error::Encoding("all samples are zero".into()));
    }

    Ok(samples
        .iter()
        .map(|s| (s / peak * 32768.0) as i16)
        .collect())
}

/// Encodes a mono buffer at its own sample rate.
pub fn encode(buffer: &SampleBuffer) -> Result<WavPayload> {
    let pcm = normalize(buffer.samples())?;
    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN + pcm.len() * 2));
    let mut writer = WavWriter::new(&mut cursor, spec).map_err(encoding_error)?;
    for sample in pcm {
        writer.write_sample(sample).map_err(encoding_error)?;
    }
    writer.finalize().map_err(encoding_error)?;

    Ok(WavPayload(cursor.into_inner()))
}

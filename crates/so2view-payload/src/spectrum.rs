use bytes::{Buf, BufMut};

use crate::error::{DecodeError, Result};

const SAMPLE_SIZE: usize = std::mem::size_of::<f64>();

/// Spectrometer reading: intensity per detector pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum(Vec<f64>);

impl Spectrum {
    pub fn new(samples: Vec<f64>) -> Self {
        Self(samples)
    }

    pub fn samples(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Smallest and largest finite sample.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.0
            .iter()
            .copied()
            .filter(|s| s.is_finite())
            .fold(None, |acc, s| match acc {
                None => Some((s, s)),
                Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
            })
    }

    /// Wire encoding: consecutive little-endian `f64`.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() * SAMPLE_SIZE);
        for &sample in &self.0 {
            out.put_f64_le(sample);
        }
        out
    }
}

/// Decode a spectrum body of exactly `samples` little-endian `f64` values.
///
/// Bodies that are not a whole number of samples, or hold a different
/// number of samples, are rejected rather than truncated or padded.
pub fn decode_spectrum(body: &[u8], samples: usize) -> Result<Spectrum> {
    if body.len() % SAMPLE_SIZE != 0 {
        return Err(DecodeError::SpectrumMisaligned { len: body.len() });
    }

    let actual = body.len() / SAMPLE_SIZE;
    if actual != samples {
        return Err(DecodeError::SpectrumLength {
            expected: samples,
            actual,
        });
    }

    let mut buf = body;
    let values = (0..samples).map(|_| buf.get_f64_le()).collect();
    Ok(Spectrum(values))
}

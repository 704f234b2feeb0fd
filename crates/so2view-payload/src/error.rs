/// Errors that can occur while decoding a response body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Decoding was asked for a body the peer reported as empty.
    #[error("response body is empty")]
    EmptyBody,

    /// The spectrum body is not made of whole 8-byte samples.
    #[error("spectrum body of {len} bytes is not a whole number of f64 samples")]
    SpectrumMisaligned { len: usize },

    /// The spectrum body has the wrong number of samples.
    #[error("spectrum has {actual} samples, expected {expected}")]
    SpectrumLength { expected: usize, actual: usize },

    /// The image container could not be decoded.
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    /// Sample buffer does not match the declared image shape.
    #[error("image shape {height}x{width}x{channels} needs {expected} samples, got {actual}")]
    Shape {
        height: usize,
        width: usize,
        channels: usize,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;

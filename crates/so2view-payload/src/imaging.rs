use image::DynamicImage;

use crate::error::{DecodeError, Result};
use crate::metadata::{extract_text_metadata, Metadata};

/// Channel order of 3-channel images as packed by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    /// Already canonical.
    #[default]
    Rgb,
    /// Blue first; swapped to RGB on decode.
    Bgr,
}

/// Options for image decoding.
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    /// Order the sender packs colour samples in.
    pub source_order: ChannelOrder,
}

/// Pixel samples at their native depth, row-major, channels interleaved.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bits per sample.
    pub fn bit_depth(&self) -> u8 {
        match self {
            Samples::U8(_) => 8,
            Samples::U16(_) => 16,
            Samples::F32(_) => 32,
        }
    }

    /// Sample at flat index `i`, widened to `f64`.
    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            Samples::U8(v) => v.get(i).map(|&s| f64::from(s)),
            Samples::U16(v) => v.get(i).map(|&s| f64::from(s)),
            Samples::F32(v) => v.get(i).map(|&s| f64::from(s)),
        }
    }

    fn swap_within_pixels(&mut self, channels: usize, a: usize, b: usize) {
        match self {
            Samples::U8(v) => v.chunks_exact_mut(channels).for_each(|px| px.swap(a, b)),
            Samples::U16(v) => v.chunks_exact_mut(channels).for_each(|px| px.swap(a, b)),
            Samples::F32(v) => v.chunks_exact_mut(channels).for_each(|px| px.swap(a, b)),
        }
    }
}

/// A decoded image: `height × width` grayscale or `height × width × channels`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    height: usize,
    width: usize,
    channels: usize,
    samples: Samples,
}

impl ImageFrame {
    /// Build a frame from raw parts, checking the sample count.
    pub fn from_parts(
        height: usize,
        width: usize,
        channels: usize,
        samples: Samples,
    ) -> Result<Self> {
        let expected = height * width * channels;
        if samples.len() != expected {
            return Err(DecodeError::Shape {
                height,
                width,
                channels,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            height,
            width,
            channels,
            samples,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }

    /// `[height, width]` for single-channel images, `[height, width, channels]` otherwise.
    pub fn shape(&self) -> Vec<usize> {
        if self.channels == 1 {
            vec![self.height, self.width]
        } else {
            vec![self.height, self.width, self.channels]
        }
    }

    /// Sample at row `y`, column `x`, channel `c`.
    pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f64> {
        if y >= self.height || x >= self.width || c >= self.channels {
            return None;
        }
        self.samples
            .get((y * self.width + x) * self.channels + c)
    }

    /// Smallest and largest sample, or `None` for an empty image.
    pub fn sample_range(&self) -> Option<(f64, f64)> {
        (0..self.samples.len())
            .filter_map(|i| self.samples.get(i))
            .fold(None, |acc, s| match acc {
                None => Some((s, s)),
                Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
            })
    }

    fn from_dynamic(image: DynamicImage) -> Self {
        let height = image.height() as usize;
        let width = image.width() as usize;
        let channels = usize::from(image.color().channel_count());

        let (channels, samples) = match image {
            DynamicImage::ImageLuma8(buf) => (channels, Samples::U8(buf.into_raw())),
            DynamicImage::ImageLumaA8(buf) => (channels, Samples::U8(buf.into_raw())),
            DynamicImage::ImageRgb8(buf) => (channels, Samples::U8(buf.into_raw())),
            DynamicImage::ImageRgba8(buf) => (channels, Samples::U8(buf.into_raw())),
            DynamicImage::ImageLuma16(buf) => (channels, Samples::U16(buf.into_raw())),
            DynamicImage::ImageLumaA16(buf) => (channels, Samples::U16(buf.into_raw())),
            DynamicImage::ImageRgb16(buf) => (channels, Samples::U16(buf.into_raw())),
            DynamicImage::ImageRgba16(buf) => (channels, Samples::U16(buf.into_raw())),
            DynamicImage::ImageRgb32F(buf) => (channels, Samples::F32(buf.into_raw())),
            DynamicImage::ImageRgba32F(buf) => (channels, Samples::F32(buf.into_raw())),
            other => (4, Samples::F32(other.to_rgba32f().into_raw())),
        };

        Self {
            height,
            width,
            channels,
            samples,
        }
    }
}

/// Decode an encoded still image and its text metadata.
///
/// Sample depth and channel count are kept as stored. Three-channel images
/// are returned in RGB order; metadata is scanned from the raw body
/// independently of the pixel decode.
pub fn decode_image(body: &[u8], options: &ImageOptions) -> Result<(ImageFrame, Metadata)> {
    let decoded = image::load_from_memory(body)?;
    let mut frame = ImageFrame::from_dynamic(decoded);

    if frame.channels == 3 && options.source_order == ChannelOrder::Bgr {
        frame.samples.swap_within_pixels(3, 0, 2);
    }

    Ok((frame, extract_text_metadata(body)))
}

use std::fmt;

use image::RgbaImage;
use rayon::prelude::*;

/// How dissimilar two frames are. Zero means identical.
pub type Distance = u64;

/// How the root of the summed squared error is scaled before it is compared with a
/// threshold.
#[derive(clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Unscaled. Thresholds have to be tuned for every resolution.
    Raw,
    /// Scaled by `100000 / pixel_count`, which makes thresholds roughly independent of
    /// the resolution.
    Pixel,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DistanceError {
    #[error(
        "the frames have different dimensions, {}x{} and {}x{}",
        .left.0, .left.1, .right.0, .right.1
    )]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },
}

/// A decoded frame and the index of the timestamp it was sampled at.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    index: usize,
    image: RgbaImage,
}

// NOTE: chunks of whole pixels, big enough that rayon's overhead doesn't matter
const CHUNK_LEN: usize = 4 * 16 * 1024;

impl Frame {
    pub fn new(index: usize, image: RgbaImage) -> Self {
        Self { index, image }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn distance_to(
        &self,
        other: &Frame,
        normalization: Normalization,
    ) -> Result<Distance, DistanceError> {
        distance(&self.image, &other.image, normalization)
    }
}

/// The root of the summed squared difference of every channel of every pixel, scaled
/// according to `normalization` and truncated. Frames of different sizes can't be
/// compared.
pub fn distance(
    left: &RgbaImage,
    right: &RgbaImage,
    normalization: Normalization,
) -> Result<Distance, DistanceError> {
    if left.dimensions() != right.dimensions() {
        return Err(DistanceError::DimensionMismatch {
            left: left.dimensions(),
            right: right.dimensions(),
        });
    }

    let squared: u64 = left
        .as_raw()
        .par_chunks(CHUNK_LEN)
        .zip(right.as_raw().par_chunks(CHUNK_LEN))
        .map(|(l, r)| sum_squared_diff(l, r))
        .sum();

    let root = (squared as f64).sqrt();
    let scaled = match normalization {
        Normalization::Raw => root,
        Normalization::Pixel => {
            let pixels = u64::from(left.width()) * u64::from(left.height());
            if pixels == 0 {
                return Ok(0);
            }
            root * 100000.0 / pixels as f64
        }
    };

    Ok(scaled as Distance)
}

fn sum_squared_diff(left: &[u8], right: &[u8]) -> u64 {
    left.iter()
        .zip(right)
        .map(|(&l, &r)| {
            let diff = u64::from(l.abs_diff(r));
            diff * diff
        })
        .sum()
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("size", &format_args!("{width}x{height}"))
            .finish()
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::Raw => write!(f, "raw"),
            Normalization::Pixel => write!(f, "pixel"),
        }
    }
}

//! Detector and image decoding seams.

use image::{GrayImage, ImageError};

/// Window size a detector starts scanning from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Tunables for one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectParams {
    /// Scales between each octave of the image pyramid.
    pub interval: i32,
    /// Overlapping hits needed before a region is reported.
    pub min_neighbors: i32,
    pub accurate: bool,
    pub size: Size,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            interval: 5,
            min_neighbors: 2,
            accurate: true,
            size: Size {
                width: 24,
                height: 24,
            },
        }
    }
}

/// One detected region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
}

/// A loaded classifier.
///
/// Shared by every request on its route without locking, so implementations
/// must be safe to call concurrently and must not mutate themselves.
pub trait ObjectDetector: Send + Sync {
    /// Returns the regions found, or `None` if the detector could not run.
    fn detect(&self, image: &GrayImage, params: &DetectParams) -> Option<Vec<Detection>>;
}

/// Turns uploaded bytes into a grayscale image.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<GrayImage, ImageError>;
}

/// Decodes any format the `image` crate was built with.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyImageDecoder;

impl ImageDecoder for AnyImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<GrayImage, ImageError> {
        Ok(image::load_from_memory(bytes)?.to_luma8())
    }
}

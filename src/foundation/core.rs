use crate::foundation::error::{PoseBatchError, PoseBatchResult};

pub use kurbo::{Affine, Point};

/// Target raster shape as `(height, width, channels)`.
///
/// `channels` is 1 (grayscale) or 3 (RGB).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ImageShape {
    /// Rows.
    pub height: usize,
    /// Columns.
    pub width: usize,
    /// Samples per pixel.
    pub channels: usize,
}

impl ImageShape {
    /// Build a validated shape.
    pub fn new(height: usize, width: usize, channels: usize) -> PoseBatchResult<Self> {
        let shape = Self {
            height,
            width,
            channels,
        };
        shape.validate()?;
        Ok(shape)
    }

    /// Check dimensions are non-zero, fit the rasterizer (u16 extents) and use 1 or 3 channels.
    pub fn validate(&self) -> PoseBatchResult<()> {
        if self.height == 0 || self.width == 0 {
            return Err(PoseBatchError::validation(format!(
                "image shape must be non-empty, got {}x{}",
                self.height, self.width
            )));
        }
        if self.height > usize::from(u16::MAX) || self.width > usize::from(u16::MAX) {
            return Err(PoseBatchError::validation(format!(
                "image shape {}x{} exceeds raster limits",
                self.height, self.width
            )));
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(PoseBatchError::validation(format!(
                "image channels must be 1 or 3, got {}",
                self.channels
            )));
        }
        Ok(())
    }

    /// `true` for single-channel shapes.
    pub fn is_grayscale(&self) -> bool {
        self.channels == 1
    }

    /// Ratio of the width to the 128px reference width used for stroke and kernel sizes.
    pub fn scale_factor(&self) -> f64 {
        self.width as f64 / 128.0
    }

    /// `(height, width, channels)` as an ndarray shape tuple.
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }
}

/// Sample types that can be resampled through an affine warp.
pub trait Pixel: Copy + Default + Send + Sync + 'static {
    /// Widen to `f32` for interpolation.
    fn to_f32(self) -> f32;
    /// Narrow an interpolated value back to the sample type.
    fn from_f32(v: f32) -> Self;
}

impl Pixel for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v.round().clamp(0.0, 255.0) as u8
    }
}

impl Pixel for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

//! Pose-to-raster rendering.
//!
//! Both renderers are pure functions of `(shape, joint order, keypoints)`: every call builds its
//! own single-channel layers, rasterizes them with `vello_cpu` and stacks them into an
//! `(H, W, C)` `u8` array.

pub(crate) mod blur;
/// Soft region-occupancy mask (legs, upper body, head).
pub mod mask;
pub(crate) mod raster;
/// Left/right-separated line drawing of the skeleton.
pub mod stickman;

use crate::foundation::core::ImageShape;

/// Stroke width for a primitive authored at `base` px on a 128px-wide canvas.
pub(crate) fn scaled_thickness(shape: ImageShape, base: f64) -> f64 {
    (base * shape.scale_factor()).round().max(1.0)
}

use std::path::Path;

use anyhow::Context;
use image::{ColorType, DynamicImage, ImageFormat, imageops::FilterType};
use ndarray::{Array3, ArrayView3};

use crate::foundation::{
    core::ImageShape,
    error::{PoseBatchError, PoseBatchResult},
};

/// Decode the image at `path` as an `(H, W, C)` array matching `shape`.
///
/// Converts to grayscale or RGB according to `shape.channels` and resizes with bilinear
/// filtering when the stored size differs.
pub fn load_image(path: &Path, shape: ImageShape) -> PoseBatchResult<Array3<u8>> {
    shape.validate()?;
    let img = image::open(path).with_context(|| format!("open image '{}'", path.display()))?;
    let img = if shape.is_grayscale() {
        DynamicImage::ImageLuma8(img.to_luma8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };

    let (w, h) = (shape.width as u32, shape.height as u32);
    let img = if img.width() != w || img.height() != h {
        img.resize_exact(w, h, FilterType::Triangle)
    } else {
        img
    };

    Array3::from_shape_vec(shape.dim(), img.into_bytes()).map_err(|e| {
        PoseBatchError::shape(format!("decoded '{}' to an unexpected size: {e}", path.display()))
    })
}

/// Write an `(H, W, 1)` or `(H, W, 3)` `u8` array as PNG.
pub fn save_png(img: ArrayView3<'_, u8>, path: &Path) -> PoseBatchResult<()> {
    let (h, w, c) = img.dim();
    let color = match c {
        1 => ColorType::L8,
        3 => ColorType::Rgb8,
        _ => {
            return Err(PoseBatchError::shape(format!(
                "png output needs 1 or 3 channels, got {c}"
            )));
        }
    };
    let width = u32::try_from(w).map_err(|_| PoseBatchError::shape("image too wide for png"))?;
    let height = u32::try_from(h).map_err(|_| PoseBatchError::shape("image too tall for png"))?;
    let raw: Vec<u8> = img.iter().copied().collect();
    image::save_buffer_with_format(path, &raw, width, height, color, ImageFormat::Png)
        .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/batch/io.rs"]
mod tests;

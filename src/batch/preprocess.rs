use std::path::Path;

use ndarray::{Array, Array3, Array4, ArrayView, ArrayView4, Axis, Dimension, s};

use crate::{
    batch::io::save_png,
    foundation::error::{PoseBatchError, PoseBatchResult},
};

/// `u8` samples to `f32` in `[-1, 1]`.
pub fn preprocess<D: Dimension>(x: ArrayView<'_, u8, D>) -> Array<f32, D> {
    x.mapv(|v| f32::from(v) / 127.5 - 1.0)
}

/// `u8` masks to `f32` in `[0, 1]`; three-channel masks collapse to one channel by max.
pub fn preprocess_mask(x: ArrayView4<'_, u8>) -> Array4<f32> {
    let mask = x.mapv(|v| f32::from(v) / 255.0);
    if mask.len_of(Axis(3)) != 3 {
        return mask;
    }
    mask.map_axis(Axis(3), |px| px.iter().copied().fold(0.0, f32::max))
        .insert_axis(Axis(3))
}

/// `f32` in `[-1, 1]` back to `u8`; values outside the range saturate.
pub fn postprocess<D: Dimension>(x: ArrayView<'_, f32, D>) -> Array<u8, D> {
    x.mapv(|v| (255.0 * (v + 1.0) / 2.0).clamp(0.0, 255.0) as u8)
}

/// Lay out a `(B, H, W, C)` batch row-major on a `rows × cols` grid. Unused cells stay zero.
pub fn tile<T: Copy + Default>(
    batch: ArrayView4<'_, T>,
    rows: usize,
    cols: usize,
) -> PoseBatchResult<Array3<T>> {
    let (b, h, w, c) = batch.dim();
    if rows * cols < b {
        return Err(PoseBatchError::shape(format!(
            "{rows}x{cols} grid cannot hold {b} images"
        )));
    }
    let mut canvas = Array3::<T>::default((rows * h, cols * w, c));
    for (idx, img) in batch.outer_iter().enumerate() {
        let (i, j) = (idx / cols, idx % cols);
        canvas
            .slice_mut(s![i * h..(i + 1) * h, j * w..(j + 1) * w, ..])
            .assign(&img);
    }
    Ok(canvas)
}

/// Postprocess a `[-1, 1]` batch, tile it on the smallest square grid and save it as PNG.
pub fn plot_batch(batch: ArrayView4<'_, f32>, path: &Path) -> PoseBatchResult<()> {
    let side = (batch.len_of(Axis(0)) as f64).sqrt().ceil().max(1.0) as usize;
    let canvas = tile(postprocess(batch).view(), side, side)?;
    save_png(canvas.view(), path)
}

#[cfg(test)]
#[path = "../../tests/unit/batch/preprocess.rs"]
mod tests;

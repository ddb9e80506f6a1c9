use ndarray::{Array3, ArrayView3, s};

use crate::foundation::{
    core::{Affine, Pixel, Point},
    error::{PoseBatchError, PoseBatchResult},
};

/// Resample `src` (`(H, W, C)`) through `transform`, which maps source pixel coordinates to
/// output pixel coordinates. The output keeps the source frame.
///
/// Each output pixel pulls `src(M⁻¹·(x, y))` with bilinear interpolation; reads outside the
/// image replicate the nearest edge sample.
pub fn warp_affine<T: Pixel>(src: ArrayView3<'_, T>, transform: Affine) -> PoseBatchResult<Array3<T>> {
    let det = transform.determinant();
    if !det.is_finite() || det.abs() < 1e-12 {
        return Err(PoseBatchError::validation(format!(
            "cannot warp through a singular transform (determinant {det})"
        )));
    }
    let inverse = transform.inverse();

    let (h, w, c) = src.dim();
    let mut out = Array3::<T>::default((h, w, c));
    if h == 0 || w == 0 {
        return Ok(out);
    }
    let (max_x, max_y) = (w as i64 - 1, h as i64 - 1);

    for y in 0..h {
        for x in 0..w {
            let p = inverse * Point::new(x as f64, y as f64);
            // beyond one pixel out every read replicates the edge anyway
            let px = p.x.clamp(-1.0, w as f64);
            let py = p.y.clamp(-1.0, h as f64);
            let x0f = px.floor();
            let y0f = py.floor();
            let fx = (px - x0f) as f32;
            let fy = (py - y0f) as f32;

            let x0 = (x0f as i64).clamp(0, max_x) as usize;
            let x1 = (x0f as i64 + 1).clamp(0, max_x) as usize;
            let y0 = (y0f as i64).clamp(0, max_y) as usize;
            let y1 = (y0f as i64 + 1).clamp(0, max_y) as usize;

            for ch in 0..c {
                let top = lerp(src[[y0, x0, ch]].to_f32(), src[[y0, x1, ch]].to_f32(), fx);
                let bottom = lerp(src[[y1, x0, ch]].to_f32(), src[[y1, x1, ch]].to_f32(), fx);
                out[[y, x, ch]] = T::from_f32(lerp(top, bottom, fy));
            }
        }
    }
    Ok(out)
}

/// Mirror an `(H, W, C)` image left to right.
pub fn flip_image<T: Clone>(src: ArrayView3<'_, T>) -> Array3<T> {
    src.slice(s![.., ..;-1, ..]).to_owned()
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
#[path = "../../tests/unit/register/warp.rs"]
mod tests;

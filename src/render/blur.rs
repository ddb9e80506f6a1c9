use ndarray::{Array2, ArrayView2, Axis};

use crate::foundation::error::{PoseBatchError, PoseBatchResult};

/// Odd Gaussian kernel size for a canvas `width` px wide: `round(11 × width / 128)`, bumped to
/// the next odd number.
pub(crate) fn kernel_size(width: usize) -> usize {
    let k = (11.0 * width as f64 / 128.0).round() as usize;
    if k % 2 == 0 { k + 1 } else { k }
}

/// Sigma derived from the kernel size the way OpenCV does when sigma is left at zero.
pub(crate) fn sigma_for_kernel(ksize: usize) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

const Q16_ONE: u32 = 1 << 16;

/// Separable Gaussian blur over one `u8` channel; reads past the border clamp to the edge.
pub(crate) fn gaussian_blur(src: ArrayView2<'_, u8>, ksize: usize) -> PoseBatchResult<Array2<u8>> {
    if ksize % 2 == 0 {
        return Err(PoseBatchError::validation(format!(
            "blur kernel size must be odd, got {ksize}"
        )));
    }
    if ksize == 1 || src.is_empty() {
        return Ok(src.to_owned());
    }

    let kernel = kernel_q16(ksize);
    let rows = convolve_lanes(src, &kernel, Axis(1));
    Ok(convolve_lanes(rows.view(), &kernel, Axis(0)))
}

/// Odd-sized Q16 taps summing to exactly [`Q16_ONE`].
fn kernel_q16(ksize: usize) -> Vec<u32> {
    let sigma = f64::from(sigma_for_kernel(ksize));
    let center = (ksize / 2) as f64;
    let weights: Vec<f64> = (0..ksize)
        .map(|i| {
            let x = i as f64 - center;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();

    let mut taps: Vec<u32> = weights
        .iter()
        .map(|w| (w / total * f64::from(Q16_ONE)).round() as u32)
        .collect();
    // rounding drift lands on the center tap
    let drift = i64::from(Q16_ONE) - taps.iter().map(|&t| i64::from(t)).sum::<i64>();
    let mid = ksize / 2;
    taps[mid] = (i64::from(taps[mid]) + drift).clamp(0, i64::from(Q16_ONE)) as u32;
    taps
}

/// Convolve every lane along `axis` with `kernel`, replicating the lane ends.
fn convolve_lanes(src: ArrayView2<'_, u8>, kernel: &[u32], axis: Axis) -> Array2<u8> {
    let radius = kernel.len() / 2;
    let mut out = Array2::<u8>::zeros(src.dim());
    for (lane, mut dst) in src.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        let last = lane.len() - 1;
        for (i, px) in dst.iter_mut().enumerate() {
            let acc: u64 = kernel
                .iter()
                .enumerate()
                .map(|(k, &tap)| {
                    let j = (i + k).saturating_sub(radius).min(last);
                    u64::from(tap) * u64::from(lane[j])
                })
                .sum();
            *px = q16_to_u8(acc);
        }
    }
    out
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/blur.rs"]
mod tests;

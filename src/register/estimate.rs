use serde::{Deserialize, Serialize};

use crate::foundation::{
    core::{Affine, Point},
    error::{PoseBatchError, PoseBatchResult},
};

const EPS: f64 = 1e-9;
const SINGULAR_EPS: f64 = 1e-12;

/// Degrees of freedom of the fitted transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionModel {
    /// Rotation, uniform scale and translation (4 DoF).
    #[default]
    Similarity,
    /// Full 2x3 affine (6 DoF), still rejecting reflections.
    Affine,
}

impl MotionModel {
    fn sample_size(self) -> usize {
        match self {
            Self::Similarity => 2,
            Self::Affine => 3,
        }
    }
}

/// Robust estimator settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Fitted model.
    pub model: MotionModel,
    /// Reprojection distance (px) under which a pair counts as an inlier.
    pub inlier_threshold: f64,
    /// Fraction of pairs that must agree with the winning hypothesis.
    pub min_inlier_ratio: f64,
    /// Upper bound on the minimal samples tried.
    pub max_hypotheses: usize,
    /// Transforms scaling any axis by more than this (or less than its inverse) are rejected.
    pub max_scale: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            model: MotionModel::Similarity,
            inlier_threshold: 3.0,
            min_inlier_ratio: 0.5,
            max_hypotheses: 2000,
            max_scale: 8.0,
        }
    }
}

impl EstimatorConfig {
    /// Reject settings the estimator cannot run with.
    pub fn validate(&self) -> PoseBatchResult<()> {
        if !(self.inlier_threshold.is_finite() && self.inlier_threshold > 0.0) {
            return Err(PoseBatchError::validation(
                "estimator inlier_threshold must be finite and > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_inlier_ratio) {
            return Err(PoseBatchError::validation(
                "estimator min_inlier_ratio must be in [0, 1]",
            ));
        }
        if self.max_hypotheses == 0 {
            return Err(PoseBatchError::validation(
                "estimator max_hypotheses must be >= 1",
            ));
        }
        if !(self.max_scale.is_finite() && self.max_scale >= 1.0) {
            return Err(PoseBatchError::validation(
                "estimator max_scale must be finite and >= 1",
            ));
        }
        Ok(())
    }
}

/// Fit a transform mapping `src[i]` onto `dst[i]`.
///
/// Minimal samples are enumerated in a fixed order and each hypothesis is scored over every
/// pair with a truncated squared error (residuals cap at the inlier threshold). The best
/// hypothesis must be supported by more pairs than its own sample; its inliers are then refit
/// by least squares. Without such support all pairs are fitted together. Either way the result
/// needs `min_inlier_ratio` agreement and a plausible non-reflective shape, otherwise `None`.
pub fn estimate_transform(src: &[Point], dst: &[Point], config: &EstimatorConfig) -> Option<Affine> {
    let n = src.len();
    let k = config.model.sample_size();
    if n != dst.len() || n < k {
        return None;
    }
    let threshold = config.inlier_threshold;

    let mut best: Option<(Vec<usize>, f64)> = None;
    for sample in combinations(n, k).take(config.max_hypotheses) {
        let Some(m) = fit_minimal(config.model, src, dst, &sample) else {
            continue;
        };
        let (inliers, cost) = consensus(m, src, dst, threshold);
        if best.as_ref().is_none_or(|(_, best_cost)| cost < *best_cost) {
            best = Some((inliers, cost));
        }
    }

    let supported = best
        .map(|(inliers, _)| inliers)
        .filter(|inliers| inliers.len() > k);
    let m = match supported {
        Some(inliers) => {
            let src_in: Vec<Point> = inliers.iter().map(|&i| src[i]).collect();
            let dst_in: Vec<Point> = inliers.iter().map(|&i| dst[i]).collect();
            fit_all(config.model, &src_in, &dst_in)?
        }
        None => fit_all(config.model, src, dst)?,
    };

    let required = ((config.min_inlier_ratio * n as f64).ceil() as usize).max(1);
    let (inliers, _) = consensus(m, src, dst, threshold);
    (inliers.len() >= required && is_reasonable(m, config.max_scale)).then_some(m)
}

fn fit_all(model: MotionModel, src: &[Point], dst: &[Point]) -> Option<Affine> {
    match model {
        MotionModel::Similarity => fit_similarity(src, dst),
        MotionModel::Affine => fit_affine(src, dst),
    }
}

fn fit_minimal(model: MotionModel, src: &[Point], dst: &[Point], idx: &[usize]) -> Option<Affine> {
    let s: Vec<Point> = idx.iter().map(|&i| src[i]).collect();
    let d: Vec<Point> = idx.iter().map(|&i| dst[i]).collect();
    fit_all(model, &s, &d)
}

/// Inliers of `m` and its truncated cost `sum(min(e², threshold²))` over all pairs.
fn consensus(m: Affine, src: &[Point], dst: &[Point], threshold: f64) -> (Vec<usize>, f64) {
    let mut inliers = Vec::new();
    let mut cost = 0.0;
    for (i, (&s, &d)) in src.iter().zip(dst).enumerate() {
        let e2 = (m * s).distance_squared(d);
        if e2 < threshold * threshold {
            inliers.push(i);
            cost += e2;
        } else {
            cost += threshold * threshold;
        }
    }
    (inliers, cost)
}

/// Least-squares similarity: `d ≈ a·s + t` with `a = p + iq` in complex notation.
fn fit_similarity(src: &[Point], dst: &[Point]) -> Option<Affine> {
    let n = src.len() as f64;
    let sc = centroid(src);
    let dc = centroid(dst);

    let (mut num_p, mut num_q, mut den) = (0.0, 0.0, 0.0);
    for (&s, &d) in src.iter().zip(dst) {
        let s = s - sc;
        let d = d - dc;
        num_p += s.x * d.x + s.y * d.y;
        num_q += s.x * d.y - s.y * d.x;
        den += s.hypot2();
    }
    if den < EPS * n {
        return None;
    }
    let (p, q) = (num_p / den, num_q / den);
    let tx = dc.x - (p * sc.x - q * sc.y);
    let ty = dc.y - (q * sc.x + p * sc.y);
    Some(Affine::new([p, q, -q, p, tx, ty]))
}

/// Least-squares affine through the normal equations of `[x y 1]`.
fn fit_affine(src: &[Point], dst: &[Point]) -> Option<Affine> {
    let mut ata = [[0.0f64; 3]; 3];
    let mut atx = [0.0f64; 3];
    let mut aty = [0.0f64; 3];
    for (&s, &d) in src.iter().zip(dst) {
        let row = [s.x, s.y, 1.0];
        for r in 0..3 {
            for c in 0..3 {
                ata[r][c] += row[r] * row[c];
            }
            atx[r] += row[r] * d.x;
            aty[r] += row[r] * d.y;
        }
    }
    let [a, c, e] = solve3(ata, atx)?;
    let [b, d, f] = solve3(ata, aty)?;
    Some(Affine::new([a, b, c, d, e, f]))
}

fn solve3(m: [[f64; 3]; 3], rhs: [f64; 3]) -> Option<[f64; 3]> {
    let det = det3(m);
    let scale = m.iter().flatten().map(|v| v.abs()).fold(0.0, f64::max);
    if !det.is_finite() || det.abs() <= SINGULAR_EPS * scale.powi(3).max(1.0) {
        return None;
    }
    let mut out = [0.0; 3];
    for (col, slot) in out.iter_mut().enumerate() {
        let mut mc = m;
        for r in 0..3 {
            mc[r][col] = rhs[r];
        }
        *slot = det3(mc) / det;
    }
    Some(out)
}

fn det3(m: [[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn centroid(points: &[Point]) -> Point {
    let n = points.len().max(1) as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
    Point::new(sx / n, sy / n)
}

/// Finite, orientation-preserving and with both axis scales inside `[1/max, max]`.
fn is_reasonable(m: Affine, max_scale: f64) -> bool {
    let [a, b, c, d, e, f] = m.as_coeffs();
    if ![a, b, c, d, e, f].iter().all(|v| v.is_finite()) {
        return false;
    }
    if m.determinant() <= 0.0 {
        return false;
    }
    let scale_x = a.hypot(b);
    let scale_y = c.hypot(d);
    let range = (1.0 / max_scale)..=max_scale;
    range.contains(&scale_x) && range.contains(&scale_y)
}

/// Lexicographic k-subsets of `0..n`.
fn combinations(n: usize, k: usize) -> impl Iterator<Item = Vec<usize>> {
    let mut next = (k <= n).then(|| (0..k).collect::<Vec<_>>());
    std::iter::from_fn(move || {
        let current = next.take()?;
        let mut idx = current.clone();
        let mut i = k;
        while i > 0 {
            i -= 1;
            if idx[i] < n - k + i {
                idx[i] += 1;
                for j in i + 1..k {
                    idx[j] = idx[j - 1] + 1;
                }
                next = Some(idx);
                break;
            }
        }
        Some(current)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/register/estimate.rs"]
mod tests;

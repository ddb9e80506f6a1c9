use std::sync::Arc;

use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use crate::foundation::{
    core::{ImageShape, Point},
    error::{PoseBatchError, PoseBatchResult},
};

/// Sentinel written into blanked-out keypoint rows.
pub const MISSING: f32 = -100.0;

/// Joint names the renderers and the orientation classifier look up.
pub mod names {
    /// Nose.
    pub const NOSE: &str = "cnose";
    /// Head center, used by the soft-mask head region.
    pub const HEAD: &str = "chead";
    /// Left eye.
    pub const LEFT_EYE: &str = "leye";
    /// Right eye.
    pub const RIGHT_EYE: &str = "reye";
    /// Left shoulder.
    pub const LEFT_SHOULDER: &str = "lshoulder";
    /// Right shoulder.
    pub const RIGHT_SHOULDER: &str = "rshoulder";
    /// Left elbow.
    pub const LEFT_ELBOW: &str = "lelbow";
    /// Right elbow.
    pub const RIGHT_ELBOW: &str = "relbow";
    /// Left wrist.
    pub const LEFT_WRIST: &str = "lwrist";
    /// Right wrist.
    pub const RIGHT_WRIST: &str = "rwrist";
    /// Left hip.
    pub const LEFT_HIP: &str = "lhip";
    /// Right hip.
    pub const RIGHT_HIP: &str = "rhip";
    /// Left knee.
    pub const LEFT_KNEE: &str = "lknee";
    /// Right knee.
    pub const RIGHT_KNEE: &str = "rknee";
    /// Left ankle.
    pub const LEFT_ANKLE: &str = "lankle";
    /// Right ankle.
    pub const RIGHT_ANKLE: &str = "rankle";
}

/// Joints whose coordinates survive blanking in the batch pipeline by default.
pub const DEFAULT_KEPT_JOINTS: [&str; 4] = [
    names::LEFT_HIP,
    names::RIGHT_HIP,
    names::LEFT_SHOULDER,
    names::RIGHT_SHOULDER,
];

/// Ordered, duplicate-free joint vocabulary shared by every keypoint array of a dataset.
///
/// Cloning is cheap; the names are shared.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct JointOrder {
    names: Arc<[String]>,
}

impl JointOrder {
    /// Build a joint order, rejecting empty vocabularies and duplicate names.
    pub fn new<I, S>(names: I) -> PoseBatchResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(PoseBatchError::validation("joint order must not be empty"));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(PoseBatchError::validation(format!(
                    "duplicate joint name '{name}' in joint order"
                )));
            }
        }
        Ok(Self {
            names: names.into(),
        })
    }

    /// Full-body vocabulary with every joint the renderers use.
    pub fn standard() -> Self {
        let vocabulary: [&str; 16] = [
            names::NOSE,
            names::HEAD,
            names::LEFT_EYE,
            names::RIGHT_EYE,
            names::LEFT_SHOULDER,
            names::RIGHT_SHOULDER,
            names::LEFT_ELBOW,
            names::RIGHT_ELBOW,
            names::LEFT_WRIST,
            names::RIGHT_WRIST,
            names::LEFT_HIP,
            names::RIGHT_HIP,
            names::LEFT_KNEE,
            names::RIGHT_KNEE,
            names::LEFT_ANKLE,
            names::RIGHT_ANKLE,
        ];
        Self {
            names: vocabulary.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of joints (rows of every keypoint array).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false` for a constructed order.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in row order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether `name` is part of the vocabulary.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Row index of `name`.
    pub fn index(&self, name: &str) -> PoseBatchResult<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| PoseBatchError::validation(format!("unknown joint name '{name}'")))
    }

    /// Row indices for a list of names, in the given order.
    pub fn indices<S: AsRef<str>>(&self, names: &[S]) -> PoseBatchResult<Vec<usize>> {
        names.iter().map(|n| self.index(n.as_ref())).collect()
    }

    /// Check that `keypoints` has one `(x, y)` row per joint.
    pub fn check_keypoints(&self, keypoints: ArrayView2<'_, f32>) -> PoseBatchResult<()> {
        let (rows, cols) = keypoints.dim();
        if rows != self.len() || cols != 2 {
            return Err(PoseBatchError::shape(format!(
                "keypoints must be ({}, 2), got ({rows}, {cols})",
                self.len()
            )));
        }
        Ok(())
    }
}

impl TryFrom<Vec<String>> for JointOrder {
    type Error = PoseBatchError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<JointOrder> for Vec<String> {
    fn from(order: JointOrder) -> Self {
        order.names.to_vec()
    }
}

/// A coordinate pair is present iff both components are non-negative.
#[inline]
pub fn is_present(x: f32, y: f32) -> bool {
    x >= 0.0 && y >= 0.0
}

/// Whether row `index` of `keypoints` holds a present coordinate.
#[inline]
pub fn is_row_present(keypoints: ArrayView2<'_, f32>, index: usize) -> bool {
    is_present(keypoints[[index, 0]], keypoints[[index, 1]])
}

/// Row `index` as a point, sentinels included.
#[inline]
pub fn point_at(keypoints: ArrayView2<'_, f32>, index: usize) -> Point {
    Point::new(
        f64::from(keypoints[[index, 0]]),
        f64::from(keypoints[[index, 1]]),
    )
}

/// Scale normalized `[0, 1]` coordinates into pixel space of `shape` (`x·W`, `y·H`).
///
/// Sentinel rows stay negative.
pub fn rescale_normalized(keypoints: ArrayView2<'_, f32>, shape: ImageShape) -> Array2<f32> {
    let mut out = keypoints.to_owned();
    let (w, h) = (shape.width as f32, shape.height as f32);
    for mut row in out.rows_mut() {
        row[0] *= w;
        row[1] *= h;
    }
    out
}

/// Overwrite every row not named in `keep` with [`MISSING`].
pub fn blank_joints<S: AsRef<str>>(
    keypoints: &mut ArrayViewMut2<'_, f32>,
    order: &JointOrder,
    keep: &[S],
) -> PoseBatchResult<()> {
    order.check_keypoints(keypoints.view())?;
    let kept = order.indices(keep)?;
    for (i, mut row) in keypoints.rows_mut().into_iter().enumerate() {
        if !kept.contains(&i) {
            row.fill(MISSING);
        }
    }
    Ok(())
}

/// Mirror present rows horizontally (`x' = width - 1 - x`); missing rows keep their sentinel.
///
/// Applying it twice restores the input.
pub fn flip_horizontal(keypoints: &mut ArrayViewMut2<'_, f32>, width: usize) {
    let last = width as f32 - 1.0;
    for mut row in keypoints.rows_mut() {
        if is_present(row[0], row[1]) {
            row[0] = last - row[0];
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pose/joints.rs"]
mod tests;

use ndarray::ArrayView2;

use crate::{
    foundation::core::Point,
    pose::joints::{is_row_present, point_at},
};

/// Joints usable for registration: present in both the source and the target pose.
///
/// Recomputed for every sample; the mask has one entry per joint row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Correspondences {
    valid: Vec<bool>,
}

impl Correspondences {
    /// Compare two keypoint sets row by row. Both must have the same number of rows.
    pub fn between(source: ArrayView2<'_, f32>, target: ArrayView2<'_, f32>) -> Self {
        debug_assert_eq!(source.nrows(), target.nrows());
        let valid = (0..source.nrows().min(target.nrows()))
            .map(|i| is_row_present(source, i) && is_row_present(target, i))
            .collect();
        Self { valid }
    }

    /// Validity per joint row.
    pub fn mask(&self) -> &[bool] {
        &self.valid
    }

    /// Number of valid pairs.
    pub fn count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// The valid rows of `keypoints`, in joint order.
    pub fn select(&self, keypoints: ArrayView2<'_, f32>) -> Vec<Point> {
        self.valid
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v)
            .map(|(i, _)| point_at(keypoints, i))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/register/correspondence.rs"]
mod tests;

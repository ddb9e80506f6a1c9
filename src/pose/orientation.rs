use ndarray::ArrayView2;

use crate::{
    foundation::error::PoseBatchResult,
    pose::joints::{JointOrder, names},
};

/// Resolved row indices of the four joints the classifier compares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrientationJoints {
    left_hip: usize,
    left_shoulder: usize,
    right_hip: usize,
    right_shoulder: usize,
}

impl OrientationJoints {
    /// Look up hips and shoulders in `order`.
    pub fn resolve(order: &JointOrder) -> PoseBatchResult<Self> {
        Ok(Self {
            left_hip: order.index(names::LEFT_HIP)?,
            left_shoulder: order.index(names::LEFT_SHOULDER)?,
            right_hip: order.index(names::RIGHT_HIP)?,
            right_shoulder: order.index(names::RIGHT_SHOULDER)?,
        })
    }

    /// `min(lhip.x, lshoulder.x) < max(rhip.x, rshoulder.x)`.
    pub fn classify(&self, keypoints: ArrayView2<'_, f32>) -> bool {
        let left = keypoints[[self.left_hip, 0]].min(keypoints[[self.left_shoulder, 0]]);
        let right = keypoints[[self.right_hip, 0]].max(keypoints[[self.right_shoulder, 0]]);
        left < right
    }
}

/// Facing of a skeleton: `true` when the left side lies image-left of the right side.
///
/// Two skeletons with different results are mirror images of each other as far as a
/// non-reflective transform is concerned.
pub fn orientation(keypoints: ArrayView2<'_, f32>, order: &JointOrder) -> PoseBatchResult<bool> {
    order.check_keypoints(keypoints)?;
    Ok(OrientationJoints::resolve(order)?.classify(keypoints))
}

#[cfg(test)]
#[path = "../../tests/unit/pose/orientation.rs"]
mod tests;

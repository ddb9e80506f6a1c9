//! Pose data model: the dataset-wide joint vocabulary, keypoint arrays and orientation.
//!
//! A keypoint set is an `(J, 2)` `f32` array of pixel coordinates whose rows follow a
//! [`joints::JointOrder`]. A row is missing when either coordinate is negative.

/// Joint vocabulary and keypoint array helpers.
pub mod joints;
/// Left/right facing classification.
pub mod orientation;

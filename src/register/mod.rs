//! Keypoint-guided registration.
//!
//! [`engine::register`] aligns each image of a batch so that its source pose lands on a target
//! pose: it gathers the joints visible in both poses, mirrors the source when the two poses face
//! opposite ways, fits a non-reflective transform and resamples image and mask through it.
//! Samples that cannot be aligned pass through unchanged (apart from the mirror).

/// Per-joint validity of a (source, target) keypoint pair.
pub mod correspondence;
/// Batch registration and the per-sample [`engine::Alignment`] decision.
pub mod engine;
/// Robust similarity / affine fitting from point correspondences.
pub mod estimate;
/// Image resampling through an affine transform.
pub mod warp;

//! posebatch turns a keypoint-annotated image dataset into pose-conditioned training batches.
//!
//! The crate covers three concerns:
//!
//! 1. **Render**: keypoints become rasters. [`render_stickman`] draws a left/right-separated
//!    line skeleton; [`render_pose_mask`] paints blurred, peak-normalized occupancy regions.
//! 2. **Register**: [`register`] warps each image (and mask) of a batch so its source pose
//!    lands on a target pose, mirroring first when the two poses face opposite ways.
//! 3. **Batch**: [`IndexFlow`] walks one split of a [`DatasetIndex`], and [`Prefetch`] keeps one
//!    batch in flight on a worker thread.
//!
//! Keypoints are `(J, 2)` `f32` arrays of pixel `(x, y)` coordinates whose rows follow a
//! [`JointOrder`]; a joint is missing when either coordinate is negative ([`MISSING`]).
//! Images are `(H, W, C)` arrays, batches `(B, H, W, C)`.
//!
//! - **No unsafe**: `unsafe` is denied in this crate.
//! - **Deterministic**: rendering and registration are pure; batch order depends only on the
//!   configured seed.
#![deny(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod batch;
pub mod pose;
pub mod register;
pub mod render;

pub use batch::flow::{Batch, BatchSource, FlowConfig, IndexFlow};
pub use batch::index::DatasetIndex;
pub use batch::io::{load_image, save_png};
pub use batch::prefetch::Prefetch;
pub use batch::preprocess::{plot_batch, postprocess, preprocess, preprocess_mask, tile};
pub use foundation::core::{Affine, ImageShape, Pixel, Point};
pub use foundation::error::{PoseBatchError, PoseBatchResult};
pub use pose::joints::{DEFAULT_KEPT_JOINTS, JointOrder, MISSING};
pub use pose::orientation::orientation;
pub use register::correspondence::Correspondences;
pub use register::engine::{
    Alignment, FallbackReason, RegisterConfig, Registration, plan_alignment, register,
};
pub use register::estimate::{EstimatorConfig, MotionModel, estimate_transform};
pub use register::warp::{flip_image, warp_affine};
pub use render::mask::render_pose_mask;
pub use render::stickman::render_stickman;

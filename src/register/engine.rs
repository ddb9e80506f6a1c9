use ndarray::{Array3, Array4, ArrayView2, ArrayView3, ArrayView4, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    foundation::{
        core::{Affine, Pixel},
        error::{PoseBatchError, PoseBatchResult},
    },
    pose::{
        joints::{JointOrder, flip_horizontal},
        orientation::OrientationJoints,
    },
    register::{
        correspondence::Correspondences,
        estimate::{EstimatorConfig, estimate_transform},
        warp::{flip_image, warp_affine},
    },
};

/// Registration settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterConfig {
    /// Fewer valid pairs than this leave the sample untouched.
    pub min_correspondences: usize,
    /// Register samples on a rayon pool instead of the calling thread.
    pub parallel: bool,
    /// Pool size when `parallel` is set (`None` = rayon default).
    pub threads: Option<usize>,
    /// Transform fitting.
    pub estimator: EstimatorConfig,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            min_correspondences: 4,
            parallel: false,
            threads: None,
            estimator: EstimatorConfig::default(),
        }
    }
}

impl RegisterConfig {
    /// Reject settings registration cannot run with.
    pub fn validate(&self) -> PoseBatchResult<()> {
        if let Some(n) = self.threads
            && n == 0
        {
            return Err(PoseBatchError::validation(
                "register 'threads' must be >= 1 when set",
            ));
        }
        self.estimator.validate()
    }
}

/// Why a sample was passed through without a transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// Too few joints are visible in both poses.
    InsufficientCorrespondences {
        /// Number of valid pairs found.
        valid: usize,
    },
    /// The estimator found no acceptable transform.
    EstimatorFailed,
}

/// Per-sample registration decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    /// Image and mask are resampled through `transform` (after mirroring when `flipped`).
    Aligned {
        /// Source-to-target pixel mapping.
        transform: Affine,
        /// The source was mirrored before fitting.
        flipped: bool,
    },
    /// Image and mask are returned as is (mirrored when `flipped`).
    Fallback {
        /// Cause of the fallback.
        reason: FallbackReason,
        /// The source was mirrored before the estimator gave up.
        flipped: bool,
    },
}

impl Alignment {
    /// Whether the sample gets mirrored.
    pub fn flipped(&self) -> bool {
        match *self {
            Self::Aligned { flipped, .. } | Self::Fallback { flipped, .. } => flipped,
        }
    }

    /// The fitted transform, if any.
    pub fn transform(&self) -> Option<Affine> {
        match *self {
            Self::Aligned { transform, .. } => Some(transform),
            Self::Fallback { .. } => None,
        }
    }

    /// `true` for [`Alignment::Aligned`].
    pub fn is_aligned(&self) -> bool {
        matches!(self, Self::Aligned { .. })
    }
}

/// Decide how to align one sample, without touching pixels.
///
/// `width` is the image width used to mirror source keypoints.
pub fn plan_alignment(
    source: ArrayView2<'_, f32>,
    target: ArrayView2<'_, f32>,
    order: &JointOrder,
    width: usize,
    config: &RegisterConfig,
) -> PoseBatchResult<Alignment> {
    order.check_keypoints(source)?;
    order.check_keypoints(target)?;
    let facing = OrientationJoints::resolve(order)?;
    Ok(plan_sample(source, target, &facing, width, config))
}

fn plan_sample(
    source: ArrayView2<'_, f32>,
    target: ArrayView2<'_, f32>,
    facing: &OrientationJoints,
    width: usize,
    config: &RegisterConfig,
) -> Alignment {
    let pairs = Correspondences::between(source, target);
    let valid = pairs.count();
    if valid < config.min_correspondences {
        return Alignment::Fallback {
            reason: FallbackReason::InsufficientCorrespondences { valid },
            flipped: false,
        };
    }

    let flipped = facing.classify(source) != facing.classify(target);
    let src_points = if flipped {
        let mut mirrored = source.to_owned();
        flip_horizontal(&mut mirrored.view_mut(), width);
        pairs.select(mirrored.view())
    } else {
        pairs.select(source)
    };
    let dst_points = pairs.select(target);

    match estimate_transform(&src_points, &dst_points, &config.estimator) {
        Some(transform) => Alignment::Aligned { transform, flipped },
        None => Alignment::Fallback {
            reason: FallbackReason::EstimatorFailed,
            flipped,
        },
    }
}

/// Output of [`register`]: one warped image, mask and decision per input sample.
#[derive(Clone, Debug)]
pub struct Registration<T> {
    /// `(B, H, W, C)` images in the target poses' frame.
    pub images: Array4<T>,
    /// `(B, H, W, Cm)` masks, warped alongside the images.
    pub masks: Array4<T>,
    /// What happened to each sample.
    pub alignments: Vec<Alignment>,
}

/// Align every image (and its mask) of a batch from its source pose onto its target pose.
///
/// `images` is `(B, H, W, C)`, `masks` is `(B, H, W, Cm)` and both keypoint batches are
/// `(B, J, 2)` with `J == order.len()`. Any disagreement is a [`PoseBatchError::Shape`]; nothing
/// is truncated.
#[tracing::instrument(skip_all, fields(batch = images.len_of(Axis(0))))]
pub fn register<T: Pixel>(
    images: ArrayView4<'_, T>,
    masks: ArrayView4<'_, T>,
    source: ArrayView3<'_, f32>,
    target: ArrayView3<'_, f32>,
    order: &JointOrder,
    config: &RegisterConfig,
) -> PoseBatchResult<Registration<T>> {
    config.validate()?;
    check_batch(images, masks, source, target, order)?;
    let facing = OrientationJoints::resolve(order)?;

    let samples = images.len_of(Axis(0));
    if samples == 0 {
        return Ok(Registration {
            images: images.to_owned(),
            masks: masks.to_owned(),
            alignments: Vec::new(),
        });
    }
    let run = |i: usize| {
        register_sample(
            images.index_axis(Axis(0), i),
            masks.index_axis(Axis(0), i),
            source.index_axis(Axis(0), i),
            target.index_axis(Axis(0), i),
            &facing,
            config,
        )
    };

    let results: Vec<_> = if config.parallel {
        let pool = build_thread_pool(config.threads)?;
        pool.install(|| (0..samples).into_par_iter().map(run).collect())
    } else {
        (0..samples).map(run).collect()
    };
    let results = results.into_iter().collect::<PoseBatchResult<Vec<_>>>()?;

    let mut alignments = Vec::with_capacity(samples);
    let mut warped_images = Vec::with_capacity(samples);
    let mut warped_masks = Vec::with_capacity(samples);
    for (i, (alignment, image, mask)) in results.into_iter().enumerate() {
        if let Alignment::Fallback { reason, flipped } = alignment {
            tracing::debug!(sample = i, ?reason, flipped, "registration fell back to identity");
        }
        alignments.push(alignment);
        warped_images.push(image);
        warped_masks.push(mask);
    }

    Ok(Registration {
        images: stack(&warped_images)?,
        masks: stack(&warped_masks)?,
        alignments,
    })
}

type SampleOutput<T> = (Alignment, Array3<T>, Array3<T>);

fn register_sample<T: Pixel>(
    image: ArrayView3<'_, T>,
    mask: ArrayView3<'_, T>,
    source: ArrayView2<'_, f32>,
    target: ArrayView2<'_, f32>,
    facing: &OrientationJoints,
    config: &RegisterConfig,
) -> PoseBatchResult<SampleOutput<T>> {
    let width = image.len_of(Axis(1));
    let alignment = plan_sample(source, target, facing, width, config);

    let (image, mask) = if alignment.flipped() {
        (flip_image(image), flip_image(mask))
    } else {
        (image.to_owned(), mask.to_owned())
    };

    match alignment.transform() {
        Some(m) => {
            let image = warp_affine(image.view(), m)?;
            let mask = warp_affine(mask.view(), m)?;
            Ok((alignment, image, mask))
        }
        None => Ok((alignment, image, mask)),
    }
}

fn check_batch<T>(
    images: ArrayView4<'_, T>,
    masks: ArrayView4<'_, T>,
    source: ArrayView3<'_, f32>,
    target: ArrayView3<'_, f32>,
    order: &JointOrder,
) -> PoseBatchResult<()> {
    let (b, h, w, _) = images.dim();
    let (mb, mh, mw, _) = masks.dim();
    if (mb, mh, mw) != (b, h, w) {
        return Err(PoseBatchError::shape(format!(
            "masks are ({mb}, {mh}, {mw}, _) but images are ({b}, {h}, {w}, _)"
        )));
    }
    let expected = (b, order.len(), 2);
    for (label, dim) in [("source", source.dim()), ("target", target.dim())] {
        if dim != expected {
            return Err(PoseBatchError::shape(format!(
                "{label} keypoints are {dim:?}, expected {expected:?}"
            )));
        }
    }
    Ok(())
}

fn stack<T: Pixel>(samples: &[Array3<T>]) -> PoseBatchResult<Array4<T>> {
    let views: Vec<_> = samples.iter().map(|a| a.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(|e| PoseBatchError::shape(e.to_string()))
}

fn build_thread_pool(threads: Option<usize>) -> PoseBatchResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| PoseBatchError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/register/engine.rs"]
mod tests;

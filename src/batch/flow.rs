use std::path::{Path, PathBuf};

use ndarray::{Array3, Array4, ArrayView3, Axis};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    batch::{
        index::DatasetIndex,
        io::load_image,
        preprocess::{preprocess, preprocess_mask},
    },
    foundation::{
        core::ImageShape,
        error::{PoseBatchError, PoseBatchResult},
    },
    pose::joints::{DEFAULT_KEPT_JOINTS, JointOrder, blank_joints},
    render::{mask::render_pose_mask, stickman::render_stickman},
};

/// How an [`IndexFlow`] selects, orders and prepares samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Samples per batch.
    pub batch_size: usize,
    /// Target image height.
    pub height: usize,
    /// Target image width.
    pub width: usize,
    /// 1 for grayscale, 3 for RGB.
    pub channels: usize,
    /// Draw from the training split (`false`: test split).
    pub train: bool,
    /// Top up a short final batch with samples from the start of the split.
    pub fill_batches: bool,
    /// Reshuffle the split at every epoch.
    pub shuffle: bool,
    /// Seed of the shuffling RNG.
    pub seed: u64,
    /// Multiply images by their (1-channel) masks.
    pub apply_mask: bool,
    /// Joints passed through in [`Batch::joints`]; all others are blanked.
    pub kept_joints: Vec<String>,
    /// Directory holding the images. Defaults to `<index dir>/../original/filted_up_{train|test}`.
    pub image_root: Option<PathBuf>,
    /// Restrict the split to these file names.
    pub allow_list: Option<Vec<String>>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            height: 128,
            width: 128,
            channels: 3,
            train: true,
            fill_batches: true,
            shuffle: true,
            seed: 1,
            apply_mask: false,
            kept_joints: DEFAULT_KEPT_JOINTS.iter().map(|s| s.to_string()).collect(),
            image_root: None,
            allow_list: None,
        }
    }
}

impl FlowConfig {
    /// The per-sample raster shape.
    pub fn image_shape(&self) -> PoseBatchResult<ImageShape> {
        ImageShape::new(self.height, self.width, self.channels)
    }

    /// Reject settings a flow cannot run with.
    pub fn validate(&self) -> PoseBatchResult<()> {
        if self.batch_size == 0 {
            return Err(PoseBatchError::validation("flow batch_size must be >= 1"));
        }
        self.image_shape().map(|_| ())
    }

    fn split_name(&self) -> &'static str {
        if self.train { "train" } else { "test" }
    }
}

/// One prepared batch.
#[derive(Clone, Debug)]
pub struct Batch {
    /// Dataset index entries in this batch.
    pub indices: Vec<usize>,
    /// `(B, H, W, C)` images in `[-1, 1]` (masked when masking is on).
    pub images: Array4<f32>,
    /// `(B, H, W, C)` stickman renderings in `[-1, 1]`.
    pub stickmen: Array4<f32>,
    /// `(B, J, 2)` pixel coordinates; joints outside the kept set are blanked.
    pub joints: Array3<f32>,
    /// `(B, H, W, 1)` masks in `[0, 1]` when masking is on.
    pub masks: Option<Array4<f32>>,
}

impl Batch {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// `true` when the batch holds no samples.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// An endless supply of batches.
pub trait BatchSource {
    /// Produce the next batch.
    fn next_batch(&mut self) -> PoseBatchResult<Batch>;

    /// Samples per epoch.
    fn len(&self) -> usize;

    /// `true` when an epoch has no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row names of [`Batch::joints`].
    fn joint_order(&self) -> &JointOrder;
}

/// Batches drawn from one split of a [`DatasetIndex`].
#[derive(Debug)]
pub struct IndexFlow {
    index: DatasetIndex,
    config: FlowConfig,
    shape: ImageShape,
    index_dir: PathBuf,
    image_root: PathBuf,
    indices: Vec<usize>,
    batch_start: usize,
    rng: StdRng,
}

impl IndexFlow {
    /// Load the index at `index_path` and prepare iteration over the configured split.
    pub fn open(index_path: &Path, config: FlowConfig) -> PoseBatchResult<Self> {
        let index = DatasetIndex::load(index_path)?;
        let index_dir = index_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_index(index, index_dir, config)
    }

    /// Iterate an already loaded index; relative paths resolve against `index_dir`.
    pub fn from_index(
        index: DatasetIndex,
        index_dir: PathBuf,
        config: FlowConfig,
    ) -> PoseBatchResult<Self> {
        config.validate()?;
        index.validate()?;
        let shape = config.image_shape()?;
        // fail early on unknown names
        index.joint_order.indices(&config.kept_joints)?;

        let indices: Vec<usize> = (0..index.len())
            .filter(|&i| index.train[i] == config.train)
            .filter(|&i| {
                config
                    .allow_list
                    .as_ref()
                    .is_none_or(|allowed| allowed.iter().any(|f| *f == index.imgs[i]))
            })
            .collect();
        if indices.is_empty() {
            return Err(PoseBatchError::validation(format!(
                "dataset index has no samples in the {} split",
                config.split_name()
            )));
        }

        let image_root = config.image_root.clone().unwrap_or_else(|| {
            index_dir
                .join("..")
                .join("original")
                .join(format!("filted_up_{}", config.split_name()))
        });

        let mut flow = Self {
            rng: StdRng::seed_from_u64(config.seed),
            index,
            config,
            shape,
            index_dir,
            image_root,
            indices,
            batch_start: 0,
        };
        flow.start_epoch();
        Ok(flow)
    }

    /// Per-sample raster shape.
    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    /// Index entries of the split, in current epoch order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The flow settings.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    fn start_epoch(&mut self) {
        self.batch_start = 0;
        if self.config.shuffle {
            self.indices.shuffle(&mut self.rng);
            tracing::debug!(samples = self.indices.len(), "shuffled split");
        }
    }

    fn take_indices(&mut self) -> Vec<usize> {
        let n = self.indices.len();
        let bs = self.config.batch_size;
        let end = (self.batch_start + bs).min(n);
        let mut batch = self.indices[self.batch_start..end].to_vec();
        if self.config.fill_batches {
            let missing = bs - batch.len();
            batch.extend(self.indices.iter().cycle().take(missing).copied());
        }

        if self.batch_start + bs >= n {
            tracing::debug!("epoch complete");
            self.start_epoch();
        } else {
            self.batch_start += bs;
        }
        batch
    }

    fn load_batch(&self, indices: Vec<usize>) -> PoseBatchResult<Batch> {
        let order = &self.index.joint_order;
        let mut images = Vec::with_capacity(indices.len());
        let mut stickmen = Vec::with_capacity(indices.len());
        let mut joints = Vec::with_capacity(indices.len());
        let mut masks = Vec::new();

        for &i in &indices {
            images.push(load_image(&self.image_root.join(&self.index.imgs[i]), self.shape)?);
            let pose = self.index.pixel_joints(i, self.shape)?;
            stickmen.push(render_stickman(self.shape, order, pose.view())?);

            if self.config.apply_mask {
                let mask = match &self.index.masks {
                    Some(files) => load_image(&self.index_dir.join(&files[i]), self.shape)?,
                    None => render_pose_mask(self.shape, order, pose.view())?,
                };
                masks.push(mask);
            }

            let mut pose = pose;
            blank_joints(&mut pose.view_mut(), order, &self.config.kept_joints)?;
            joints.push(pose);
        }

        let mut images = preprocess(stack(&images)?.view());
        let masks = if self.config.apply_mask {
            let masks = preprocess_mask(stack(&masks)?.view());
            images *= &masks;
            Some(masks)
        } else {
            None
        };

        let joint_views: Vec<_> = joints.iter().map(|j| j.view()).collect();
        let joints = ndarray::stack(Axis(0), &joint_views)
            .map_err(|e| PoseBatchError::shape(e.to_string()))?;

        Ok(Batch {
            indices,
            images,
            stickmen: preprocess(stack(&stickmen)?.view()),
            joints,
            masks,
        })
    }
}

impl BatchSource for IndexFlow {
    #[tracing::instrument(skip(self), fields(start = self.batch_start))]
    fn next_batch(&mut self) -> PoseBatchResult<Batch> {
        let indices = self.take_indices();
        self.load_batch(indices)
    }

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn joint_order(&self) -> &JointOrder {
        &self.index.joint_order
    }
}

fn stack(samples: &[Array3<u8>]) -> PoseBatchResult<Array4<u8>> {
    let views: Vec<ArrayView3<'_, u8>> = samples.iter().map(|a| a.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(|e| PoseBatchError::shape(e.to_string()))
}

#[cfg(test)]
#[path = "../../tests/unit/batch/flow.rs"]
mod tests;

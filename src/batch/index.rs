use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use ndarray::{Array2, Array4, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    foundation::{
        core::ImageShape,
        error::{PoseBatchError, PoseBatchResult},
    },
    batch::preprocess::preprocess_mask,
    pose::joints::{JointOrder, rescale_normalized},
    render::mask::render_pose_mask,
};

/// Dataset index: one entry per image with its split, file name and normalized joints.
///
/// Stored as JSON. Joint coordinates are fractions of the image size (`x / W`, `y / H`);
/// negative values mark missing joints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetIndex {
    /// `true` for training entries, `false` for test entries.
    pub train: Vec<bool>,
    /// Image file names, relative to the image root.
    pub imgs: Vec<String>,
    /// Normalized `(J, 2)` coordinates per entry.
    pub joints: Vec<Vec<[f32; 2]>>,
    /// Row names shared by every entry of `joints`.
    pub joint_order: JointOrder,
    /// Optional mask file names, relative to the index directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masks: Option<Vec<String>>,
}

impl DatasetIndex {
    /// Read and validate an index file.
    pub fn load(path: &Path) -> PoseBatchResult<Self> {
        let file =
            File::open(path).with_context(|| format!("open dataset index '{}'", path.display()))?;
        let index: Self = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            PoseBatchError::serde(format!("parse dataset index '{}': {e}", path.display()))
        })?;
        index.validate()?;
        Ok(index)
    }

    /// Check that every per-entry list has one element per image and every entry has one
    /// joint row per name in `joint_order`.
    pub fn validate(&self) -> PoseBatchResult<()> {
        let n = self.imgs.len();
        if self.train.len() != n || self.joints.len() != n {
            return Err(PoseBatchError::validation(format!(
                "dataset index lists {n} images, {} split flags and {} joint sets",
                self.train.len(),
                self.joints.len()
            )));
        }
        if let Some(masks) = &self.masks
            && masks.len() != n
        {
            return Err(PoseBatchError::validation(format!(
                "dataset index lists {n} images but {} masks",
                masks.len()
            )));
        }
        let j = self.joint_order.len();
        if let Some((i, rows)) = self.joints.iter().enumerate().find(|(_, r)| r.len() != j) {
            return Err(PoseBatchError::validation(format!(
                "entry {i} has {} joints, joint order has {j}",
                rows.len()
            )));
        }
        Ok(())
    }

    /// Number of entries across both splits.
    pub fn len(&self) -> usize {
        self.imgs.len()
    }

    /// `true` when the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.imgs.is_empty()
    }

    /// Normalized `(J, 2)` joints of entry `i`.
    pub fn normalized_joints(&self, i: usize) -> PoseBatchResult<Array2<f32>> {
        let rows = self.joints.get(i).ok_or_else(|| {
            PoseBatchError::validation(format!("entry {i} out of range ({} entries)", self.len()))
        })?;
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        Array2::from_shape_vec((rows.len(), 2), flat).map_err(|e| PoseBatchError::shape(e.to_string()))
    }

    /// Joints of entry `i` in pixel coordinates of `shape`.
    pub fn pixel_joints(&self, i: usize, shape: ImageShape) -> PoseBatchResult<Array2<f32>> {
        Ok(rescale_normalized(self.normalized_joints(i)?.view(), shape))
    }

    /// `(B, H, W, 1)` soft masks in `[0, 1]` rendered from the full joints of `entries`.
    pub fn pose_masks(&self, entries: &[usize], shape: ImageShape) -> PoseBatchResult<Array4<f32>> {
        let masks = entries
            .iter()
            .map(|&i| render_pose_mask(shape, &self.joint_order, self.pixel_joints(i, shape)?.view()))
            .collect::<PoseBatchResult<Vec<_>>>()?;
        let views: Vec<_> = masks.iter().map(|m| m.view()).collect();
        let stacked =
            ndarray::stack(Axis(0), &views).map_err(|e| PoseBatchError::shape(e.to_string()))?;
        Ok(preprocess_mask(stacked.view()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/batch/index.rs"]
mod tests;

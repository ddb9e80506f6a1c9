use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::{
    foundation::{
        core::ImageShape,
        error::{PoseBatchError, PoseBatchResult},
    },
    pose::joints::{JointOrder, is_row_present, names, point_at},
    render::{raster::Layer, scaled_thickness},
};

/// Hips and shoulders, in polygon order.
pub(crate) const TORSO: [&str; 4] = [
    names::LEFT_HIP,
    names::LEFT_SHOULDER,
    names::RIGHT_SHOULDER,
    names::RIGHT_HIP,
];

const RIGHT_CHAIN: [&str; 6] = [
    names::RIGHT_ANKLE,
    names::RIGHT_KNEE,
    names::RIGHT_HIP,
    names::RIGHT_SHOULDER,
    names::RIGHT_ELBOW,
    names::RIGHT_WRIST,
];

const LEFT_CHAIN: [&str; 6] = [
    names::LEFT_ANKLE,
    names::LEFT_KNEE,
    names::LEFT_HIP,
    names::LEFT_SHOULDER,
    names::LEFT_ELBOW,
    names::LEFT_WRIST,
];

const LIMB_WIDTH: f64 = 3.0;
const NECK_VALUE: u8 = 127;

/// Draw `keypoints` as a stickman on a blank `(H, W, C)` canvas.
///
/// Channel 0 holds the right limbs, channel 1 the left limbs and channel 2 the filled torso. The
/// neck (shoulder midpoint to nose) goes into both limb channels at half intensity, the eye
/// segments into their side's channel. A primitive is only drawn when every joint it touches
/// is present. For a single-channel `shape` the three channels are averaged.
///
/// Errors when `keypoints` does not match `order` or `order` lacks one of the drawn joints.
pub fn render_stickman(
    shape: ImageShape,
    order: &JointOrder,
    keypoints: ArrayView2<'_, f32>,
) -> PoseBatchResult<Array3<u8>> {
    shape.validate()?;
    order.check_keypoints(keypoints)?;

    let torso = order.indices(&TORSO)?;
    let right_chain = order.indices(&RIGHT_CHAIN)?;
    let left_chain = order.indices(&LEFT_CHAIN)?;
    let nose = order.index(names::NOSE)?;
    let left_eye = order.index(names::LEFT_EYE)?;
    let right_eye = order.index(names::RIGHT_EYE)?;
    let left_shoulder = order.index(names::LEFT_SHOULDER)?;
    let right_shoulder = order.index(names::RIGHT_SHOULDER)?;

    let thickness = scaled_thickness(shape, LIMB_WIDTH);
    let present = |i: usize| is_row_present(keypoints, i);
    let at = |i: usize| point_at(keypoints, i);

    let mut right = Layer::new(shape)?;
    let mut left = Layer::new(shape)?;
    let mut body = Layer::new(shape)?;

    if torso.iter().all(|&i| present(i)) {
        let pts: Vec<_> = torso.iter().map(|&i| at(i)).collect();
        body.fill_polygon(&pts, 255);
    }

    for (layer, chain) in [(&mut right, &right_chain), (&mut left, &left_chain)] {
        for seg in chain.windows(2) {
            if present(seg[0]) && present(seg[1]) {
                layer.line(at(seg[0]), at(seg[1]), 255, thickness);
            }
        }
    }

    let neck = at(left_shoulder).midpoint(at(right_shoulder));
    if neck.x >= 0.0 && neck.y >= 0.0 && present(nose) {
        right.line(neck, at(nose), NECK_VALUE, thickness);
        left.line(neck, at(nose), NECK_VALUE, thickness);
    }

    if present(nose) && present(left_eye) && present(right_eye) {
        right.line(at(nose), at(right_eye), 255, thickness);
        left.line(at(nose), at(left_eye), 255, thickness);
    }

    let layers = [right.finish(), left.finish(), body.finish()];
    if shape.is_grayscale() {
        let mean = Array2::from_shape_fn((shape.height, shape.width), |(y, x)| {
            let sum: u16 = layers.iter().map(|l| u16::from(l[[y, x]])).sum();
            ((f32::from(sum) / 3.0).round()) as u8
        });
        return Ok(mean.insert_axis(Axis(2)));
    }
    stack_layers(&layers)
}

/// Stack equally-sized layers along a trailing channel axis.
pub(crate) fn stack_layers(layers: &[Array2<u8>]) -> PoseBatchResult<Array3<u8>> {
    let views: Vec<_> = layers.iter().map(|l| l.view()).collect();
    ndarray::stack(Axis(2), &views).map_err(|e| PoseBatchError::shape(e.to_string()))
}

#[cfg(test)]
#[path = "../../tests/unit/render/stickman.rs"]
mod tests;

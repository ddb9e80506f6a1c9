use ndarray::{Array2, Array3, ArrayView2};

use crate::{
    foundation::{core::ImageShape, error::PoseBatchResult},
    pose::joints::{JointOrder, names, point_at},
    render::{
        blur::{gaussian_blur, kernel_size},
        raster::Layer,
        scaled_thickness,
        stickman::{TORSO, stack_layers},
    },
};

const HEAD: [&str; 3] = [names::LEFT_SHOULDER, names::HEAD, names::RIGHT_SHOULDER];

const LEG_SEGMENTS: [(&str, &str); 5] = [
    (names::RIGHT_ANKLE, names::RIGHT_KNEE),
    (names::RIGHT_KNEE, names::RIGHT_HIP),
    (names::RIGHT_HIP, names::LEFT_HIP),
    (names::LEFT_HIP, names::LEFT_KNEE),
    (names::LEFT_KNEE, names::LEFT_ANKLE),
];

const UPPER_BODY_SEGMENTS: [(&str, &str); 8] = [
    (names::RIGHT_HIP, names::RIGHT_SHOULDER),
    (names::RIGHT_SHOULDER, names::RIGHT_ELBOW),
    (names::RIGHT_ELBOW, names::RIGHT_WRIST),
    (names::RIGHT_HIP, names::LEFT_HIP),
    (names::RIGHT_SHOULDER, names::LEFT_SHOULDER),
    (names::LEFT_HIP, names::LEFT_SHOULDER),
    (names::LEFT_SHOULDER, names::LEFT_ELBOW),
    (names::LEFT_ELBOW, names::LEFT_WRIST),
];

const HEAD_SEGMENTS: [(&str, &str); 3] = [
    (names::RIGHT_SHOULDER, names::HEAD),
    (names::RIGHT_SHOULDER, names::LEFT_SHOULDER),
    (names::LEFT_SHOULDER, names::HEAD),
];

const SEGMENT_WIDTH: f64 = 15.0;

/// Render the soft region mask of a pose as a `(H, W, 3)` image: legs, upper body, head.
///
/// Each region is drawn as thick segments (plus the torso quad for the upper body and the
/// shoulder/head triangle for the head), blurred and stretched so its brightest sample is 255.
/// Nothing here checks joint presence: missing joints are drawn at their sentinel
/// coordinates, which usually falls off canvas but can smear across it.
pub fn render_pose_mask(
    shape: ImageShape,
    order: &JointOrder,
    keypoints: ArrayView2<'_, f32>,
) -> PoseBatchResult<Array3<u8>> {
    shape.validate()?;
    order.check_keypoints(keypoints)?;

    let at = |i: usize| point_at(keypoints, i);
    let thickness = scaled_thickness(shape, SEGMENT_WIDTH);

    let torso: Vec<_> = order.indices(&TORSO)?.into_iter().map(at).collect();
    let head: Vec<_> = order.indices(&HEAD)?.into_iter().map(at).collect();

    let mut legs = Layer::new(shape)?;
    let mut upper = Layer::new(shape)?;
    let mut crown = Layer::new(shape)?;
    upper.fill_polygon(&torso, 255);
    crown.fill_polygon(&head, 255);

    for (layer, segments) in [
        (&mut legs, &LEG_SEGMENTS[..]),
        (&mut upper, &UPPER_BODY_SEGMENTS[..]),
        (&mut crown, &HEAD_SEGMENTS[..]),
    ] {
        for &(a, b) in segments {
            layer.line(at(order.index(a)?), at(order.index(b)?), 255, thickness);
        }
    }

    let ksize = kernel_size(shape.width);
    let layers = [legs.finish(), upper.finish(), crown.finish()]
        .iter()
        .map(|layer| gaussian_blur(layer.view(), ksize).map(stretch_to_peak))
        .collect::<PoseBatchResult<Vec<_>>>()?;
    stack_layers(&layers)
}

/// Scale so the maximum maps to 255; truncates like an integer cast. All-zero stays zero.
fn stretch_to_peak(mut layer: Array2<u8>) -> Array2<u8> {
    let peak = layer.iter().copied().max().unwrap_or(0);
    if peak > 0 {
        let peak = f32::from(peak);
        layer.mapv_inplace(|v| (f32::from(v) / peak * 255.0) as u8);
    }
    layer
}

#[cfg(test)]
#[path = "../../tests/unit/render/mask.rs"]
mod tests;

use super::*;

use crate::pose::joints::MISSING;

fn rgb() -> ImageShape {
    ImageShape::new(128, 128, 3).unwrap()
}

// Front-facing figure on a 128x128 canvas, rows in `JointOrder::standard()` order.
fn standing() -> Array2<f32> {
    ndarray::array![
        [64.0, 20.0],  // cnose
        [64.0, 10.0],  // chead
        [68.0, 17.0],  // leye
        [60.0, 17.0],  // reye
        [80.0, 40.0],  // lshoulder
        [48.0, 40.0],  // rshoulder
        [88.0, 60.0],  // lelbow
        [40.0, 60.0],  // relbow
        [92.0, 80.0],  // lwrist
        [36.0, 80.0],  // rwrist
        [76.0, 76.0],  // lhip
        [52.0, 76.0],  // rhip
        [78.0, 100.0], // lknee
        [50.0, 100.0], // rknee
        [80.0, 122.0], // lankle
        [48.0, 122.0], // rankle
    ]
}

#[test]
fn all_missing_keypoints_render_blank() {
    let order = JointOrder::standard();
    let kps = Array2::from_elem((order.len(), 2), MISSING);
    let img = render_stickman(rgb(), &order, kps.view()).unwrap();
    assert_eq!(img.dim(), (128, 128, 3));
    assert!(img.iter().all(|&v| v == 0));
}

#[test]
fn rendering_is_pure() {
    let order = JointOrder::standard();
    let kps = standing();
    let a = render_stickman(rgb(), &order, kps.view()).unwrap();
    let b = render_stickman(rgb(), &order, kps.view()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn channels_separate_right_left_and_torso() {
    let order = JointOrder::standard();
    let img = render_stickman(rgb(), &order, standing().view()).unwrap();

    // torso center
    assert_eq!(img[[58, 64, 2]], 255);
    assert_eq!(img[[58, 64, 0]], 0);
    assert_eq!(img[[58, 64, 1]], 0);

    // shin midpoints
    assert_eq!(img[[111, 49, 0]], 255);
    assert_eq!(img[[111, 49, 1]], 0);
    assert_eq!(img[[111, 79, 1]], 255);
    assert_eq!(img[[111, 79, 0]], 0);

    // neck at half intensity in both limb channels
    assert_eq!(img[[30, 64, 0]], 127);
    assert_eq!(img[[30, 64, 1]], 127);
    assert_eq!(img[[30, 64, 2]], 0);
}

#[test]
fn missing_hip_drops_torso_and_adjacent_segments() {
    let order = JointOrder::standard();
    let mut kps = standing();
    let lhip = order.index(names::LEFT_HIP).unwrap();
    kps[[lhip, 0]] = MISSING;

    let img = render_stickman(rgb(), &order, kps.view()).unwrap();
    assert!(img.index_axis(Axis(2), 2).iter().all(|&v| v == 0));
    // lknee-lhip midpoint is gone, lknee-lankle is still drawn
    assert_eq!(img[[88, 77, 1]], 0);
    assert_eq!(img[[111, 79, 1]], 255);
}

#[test]
fn missing_eye_skips_both_eye_segments() {
    let order = JointOrder::standard();
    let mut kps = standing();
    let leye = order.index(names::LEFT_EYE).unwrap();
    kps[[leye, 1]] = -1.0;

    let with_eyes = render_stickman(rgb(), &order, standing().view()).unwrap();
    let without = render_stickman(rgb(), &order, kps.view()).unwrap();
    // reye segment midpoint (62, 18.5) sits away from the neck stroke
    assert_eq!(with_eyes[[18, 61, 0]], 255);
    assert_eq!(without[[18, 61, 0]], 0);
}

#[test]
fn grayscale_shape_averages_channels() {
    let order = JointOrder::standard();
    let shape = ImageShape::new(128, 128, 1).unwrap();
    let img = render_stickman(shape, &order, standing().view()).unwrap();
    assert_eq!(img.dim(), (128, 128, 1));
    assert_eq!(img[[58, 64, 0]], 85);
    assert_eq!(img[[5, 5, 0]], 0);
}

#[test]
fn order_without_nose_is_rejected() {
    let order = JointOrder::new(["lhip", "lshoulder", "rhip", "rshoulder"]).unwrap();
    let kps = Array2::<f32>::zeros((4, 2));
    let err = render_stickman(rgb(), &order, kps.view()).unwrap_err();
    assert!(matches!(err, PoseBatchError::Validation(_)));
}

#[test]
fn wrong_row_count_is_a_shape_error() {
    let order = JointOrder::standard();
    let kps = Array2::<f32>::zeros((3, 2));
    let err = render_stickman(rgb(), &order, kps.view()).unwrap_err();
    assert!(matches!(err, PoseBatchError::Shape(_)));
}

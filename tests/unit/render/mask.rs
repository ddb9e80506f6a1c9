use super::*;

use crate::pose::joints::MISSING;

fn rgb() -> ImageShape {
    ImageShape::new(128, 128, 3).unwrap()
}

fn set(kps: &mut Array2<f32>, order: &JointOrder, name: &str, x: f32, y: f32) {
    let i = order.index(name).unwrap();
    kps[[i, 0]] = x;
    kps[[i, 1]] = y;
}

// Square torso centred on (64, 64); arms collapsed onto the shoulders.
fn square_torso(order: &JointOrder) -> Array2<f32> {
    let mut kps = Array2::from_elem((order.len(), 2), 0.0f32);
    for (name, x, y) in [
        (names::NOSE, 64.0, 20.0),
        (names::HEAD, 64.0, 10.0),
        (names::LEFT_EYE, 68.0, 17.0),
        (names::RIGHT_EYE, 60.0, 17.0),
        (names::LEFT_SHOULDER, 84.0, 44.0),
        (names::RIGHT_SHOULDER, 44.0, 44.0),
        (names::LEFT_ELBOW, 84.0, 44.0),
        (names::RIGHT_ELBOW, 44.0, 44.0),
        (names::LEFT_WRIST, 84.0, 44.0),
        (names::RIGHT_WRIST, 44.0, 44.0),
        (names::LEFT_HIP, 84.0, 84.0),
        (names::RIGHT_HIP, 44.0, 84.0),
        (names::LEFT_KNEE, 84.0, 104.0),
        (names::RIGHT_KNEE, 44.0, 104.0),
        (names::LEFT_ANKLE, 84.0, 124.0),
        (names::RIGHT_ANKLE, 44.0, 124.0),
    ] {
        set(&mut kps, order, name, x, y);
    }
    kps
}

#[test]
fn upper_body_peaks_at_torso_centroid_and_decays() {
    let order = JointOrder::standard();
    let mask = render_pose_mask(rgb(), &order, square_torso(&order).view()).unwrap();
    assert_eq!(mask.dim(), (128, 128, 3));

    let upper = mask.index_axis(ndarray::Axis(2), 1);
    assert_eq!(upper[[64, 64]], 255);
    assert_eq!(upper.iter().copied().max(), Some(255));

    // walk right from the centroid: never increases, ends at zero
    let row: Vec<u8> = (64..128).map(|x| upper[[64, x]]).collect();
    assert!(row.windows(2).all(|w| w[0] >= w[1]));
    assert!(row[30] < 255);
    assert_eq!(*row.last().unwrap(), 0);
}

#[test]
fn every_drawn_layer_is_normalized_to_255() {
    let order = JointOrder::standard();
    let mask = render_pose_mask(rgb(), &order, square_torso(&order).view()).unwrap();
    for c in 0..3 {
        let peak = mask.index_axis(ndarray::Axis(2), c).iter().copied().max();
        assert_eq!(peak, Some(255), "channel {c}");
    }
}

#[test]
fn rendering_is_pure() {
    let order = JointOrder::standard();
    let kps = square_torso(&order);
    let a = render_pose_mask(rgb(), &order, kps.view()).unwrap();
    let b = render_pose_mask(rgb(), &order, kps.view()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn grayscale_shape_still_yields_three_regions() {
    let order = JointOrder::standard();
    let shape = ImageShape::new(64, 64, 1).unwrap();
    let mut kps = square_torso(&order);
    kps.mapv_inplace(|v| v / 2.0);
    let mask = render_pose_mask(shape, &order, kps.view()).unwrap();
    assert_eq!(mask.dim(), (64, 64, 3));
}

#[test]
fn all_missing_keypoints_land_off_canvas() {
    let order = JointOrder::standard();
    let kps = Array2::from_elem((order.len(), 2), MISSING);
    let mask = render_pose_mask(rgb(), &order, kps.view()).unwrap();
    assert!(mask.iter().all(|&v| v == 0));
}

#[test]
fn missing_hip_is_drawn_at_its_sentinel() {
    // Torso fill has no presence check: a blanked hip drags the quad off toward (-100, -100).
    let order = JointOrder::standard();
    let whole = square_torso(&order);
    let mut blanked = whole.clone();
    set(&mut blanked, &order, names::LEFT_HIP, MISSING, MISSING);

    let ok = render_pose_mask(rgb(), &order, whole.view()).unwrap();
    let smeared = render_pose_mask(rgb(), &order, blanked.view()).unwrap();
    assert_eq!(ok[[10, 10, 1]], 0);
    assert!(smeared[[10, 10, 1]] > 0);
}

#[test]
fn order_without_head_is_rejected() {
    let standard = JointOrder::standard();
    let without_head: Vec<&str> = standard
        .names()
        .iter()
        .map(String::as_str)
        .filter(|n| *n != names::HEAD)
        .collect();
    let order = JointOrder::new(without_head).unwrap();
    let kps = Array2::<f32>::zeros((order.len(), 2));
    assert!(render_pose_mask(rgb(), &order, kps.view()).is_err());
}

use super::*;

use ndarray::array;

#[test]
fn pair_is_valid_only_when_both_sides_are_present() {
    let source = array![[1.0f32, 2.0], [-100.0, 5.0], [3.0, 4.0], [0.0, 0.0]];
    let target = array![[7.0f32, 8.0], [9.0, 9.0], [6.0, -1.0], [0.0, 0.0]];
    let c = Correspondences::between(source.view(), target.view());
    assert_eq!(c.mask(), &[true, false, false, true]);
    assert_eq!(c.count(), 2);
}

#[test]
fn select_keeps_joint_order() {
    let source = array![[1.0f32, 2.0], [-1.0, -1.0], [3.0, 4.0]];
    let target = array![[5.0f32, 6.0], [7.0, 8.0], [9.0, 10.0]];
    let c = Correspondences::between(source.view(), target.view());
    assert_eq!(
        c.select(source.view()),
        vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]
    );
    assert_eq!(
        c.select(target.view()),
        vec![Point::new(5.0, 6.0), Point::new(9.0, 10.0)]
    );
}

#[test]
fn all_missing_yields_no_pairs() {
    let source = ndarray::Array2::from_elem((5, 2), -100.0f32);
    let c = Correspondences::between(source.view(), source.view());
    assert_eq!(c.count(), 0);
    assert!(c.select(source.view()).is_empty());
}

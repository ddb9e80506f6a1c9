use super::*;

use crate::{batch::io::save_png, pose::joints::MISSING};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "posebatch_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// Normalized front-facing pose in `JointOrder::standard()` row order.
fn pose() -> Vec<[f32; 2]> {
    [
        [64.0, 20.0],
        [64.0, 10.0],
        [68.0, 17.0],
        [60.0, 17.0],
        [80.0, 40.0],
        [48.0, 40.0],
        [88.0, 60.0],
        [40.0, 60.0],
        [92.0, 80.0],
        [36.0, 80.0],
        [76.0, 76.0],
        [52.0, 76.0],
        [78.0, 100.0],
        [50.0, 100.0],
        [80.0, 122.0],
        [48.0, 122.0],
    ]
    .iter()
    .map(|[x, y]| [x / 128.0, y / 128.0])
    .collect()
}

fn index(train: &[bool]) -> DatasetIndex {
    DatasetIndex {
        train: train.to_vec(),
        imgs: (0..train.len()).map(|i| format!("{i:03}.png")).collect(),
        joints: vec![pose(); train.len()],
        joint_order: JointOrder::standard(),
        masks: None,
    }
}

fn ordered(batch_size: usize) -> FlowConfig {
    FlowConfig {
        batch_size,
        shuffle: false,
        ..FlowConfig::default()
    }
}

/// Write one solid-gray image per entry (gray level = 10 × entry) into `dir`.
fn write_images(idx: &DatasetIndex, dir: &Path, size: usize) {
    for (i, name) in idx.imgs.iter().enumerate() {
        let img = Array3::<u8>::from_elem((size, size, 3), (10 * i) as u8);
        save_png(img.view(), &dir.join(name)).unwrap();
    }
}

#[test]
fn keeps_only_the_requested_split() {
    let idx = index(&[true, false, true, true, false]);
    let flow = IndexFlow::from_index(idx.clone(), PathBuf::from("data"), ordered(2)).unwrap();
    assert_eq!(flow.indices(), &[0, 2, 3]);

    let test = FlowConfig {
        train: false,
        ..ordered(2)
    };
    let flow = IndexFlow::from_index(idx, PathBuf::from("data"), test).unwrap();
    assert_eq!(flow.indices(), &[1, 4]);
    assert_eq!(flow.len(), 2);
}

#[test]
fn allow_list_restricts_the_split() {
    let cfg = FlowConfig {
        allow_list: Some(vec!["002.png".into(), "004.png".into(), "001.png".into()]),
        ..ordered(2)
    };
    let flow = IndexFlow::from_index(index(&[true; 5]), PathBuf::new(), cfg).unwrap();
    assert_eq!(flow.indices(), &[1, 2, 4]);
}

#[test]
fn empty_split_is_an_error() {
    let err = IndexFlow::from_index(index(&[false, false]), PathBuf::new(), ordered(2)).unwrap_err();
    assert!(err.to_string().contains("train split"));
}

#[test]
fn unknown_kept_joint_is_an_error() {
    let cfg = FlowConfig {
        kept_joints: vec!["tail".into()],
        ..ordered(2)
    };
    assert!(matches!(
        IndexFlow::from_index(index(&[true]), PathBuf::new(), cfg),
        Err(PoseBatchError::Validation(_))
    ));
}

#[test]
fn short_final_batch_wraps_to_the_start() {
    let mut flow = IndexFlow::from_index(index(&[true; 5]), PathBuf::new(), ordered(4)).unwrap();
    assert_eq!(flow.take_indices(), vec![0, 1, 2, 3]);
    assert_eq!(flow.take_indices(), vec![4, 0, 1, 2]);
    assert_eq!(flow.take_indices(), vec![0, 1, 2, 3]);
}

#[test]
fn batch_larger_than_split_repeats_samples() {
    let mut flow = IndexFlow::from_index(index(&[true; 2]), PathBuf::new(), ordered(5)).unwrap();
    assert_eq!(flow.take_indices(), vec![0, 1, 0, 1, 0]);
}

#[test]
fn without_filling_the_last_batch_is_short() {
    let cfg = FlowConfig {
        fill_batches: false,
        ..ordered(4)
    };
    let mut flow = IndexFlow::from_index(index(&[true; 5]), PathBuf::new(), cfg).unwrap();
    assert_eq!(flow.take_indices().len(), 4);
    assert_eq!(flow.take_indices(), vec![4]);
    assert_eq!(flow.take_indices(), vec![0, 1, 2, 3]);
}

#[test]
fn shuffling_is_seeded_and_reshuffles_each_epoch() {
    let cfg = FlowConfig {
        batch_size: 8,
        seed: 7,
        ..FlowConfig::default()
    };
    let mut a = IndexFlow::from_index(index(&[true; 8]), PathBuf::new(), cfg.clone()).unwrap();
    let b = IndexFlow::from_index(index(&[true; 8]), PathBuf::new(), cfg).unwrap();
    assert_eq!(a.indices(), b.indices());

    let first = a.take_indices();
    let mut sorted = first.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..8).collect::<Vec<_>>());

    let epochs: Vec<Vec<usize>> = (0..4).map(|_| a.take_indices()).collect();
    assert!(epochs.iter().any(|e| *e != first));
}

#[test]
fn default_image_root_follows_the_dataset_layout() {
    let flow = IndexFlow::from_index(index(&[true]), PathBuf::from("ds/index"), ordered(1)).unwrap();
    assert_eq!(
        flow.image_root,
        PathBuf::from("ds/index/../original/filted_up_train")
    );
}

#[test]
fn batches_carry_images_stickmen_and_blanked_joints() {
    let root = temp_dir("flow_batch");
    let idx = index(&[true; 3]);
    write_images(&idx, &root, 32);
    let cfg = FlowConfig {
        height: 64,
        width: 64,
        image_root: Some(root.clone()),
        ..ordered(2)
    };
    let mut flow = IndexFlow::from_index(idx, root.clone(), cfg).unwrap();

    let batch = flow.next_batch().unwrap();
    assert_eq!(batch.indices, vec![0, 1]);
    assert_eq!(batch.images.dim(), (2, 64, 64, 3));
    assert_eq!(batch.stickmen.dim(), (2, 64, 64, 3));
    assert_eq!(batch.joints.dim(), (2, 16, 2));
    assert!(batch.masks.is_none());

    // entry 1 is solid gray 10, upscaled from 32px
    let expected = 10.0 / 127.5 - 1.0;
    assert!((batch.images[[1, 5, 5, 0]] - expected).abs() < 0.01);
    // stickman torso is lit, background is -1
    assert_eq!(batch.stickmen[[0, 29, 32, 2]], 1.0);
    assert_eq!(batch.stickmen[[0, 2, 2, 0]], -1.0);

    let order = JointOrder::standard();
    let lhip = order.index("lhip").unwrap();
    let nose = order.index("cnose").unwrap();
    assert_eq!(batch.joints[[0, lhip, 0]], 38.0);
    assert_eq!(batch.joints[[0, nose, 0]], MISSING);
    assert_eq!(batch.joints[[0, nose, 1]], MISSING);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn masking_multiplies_images_by_rendered_masks() {
    let root = temp_dir("flow_mask");
    let idx = index(&[true; 2]);
    write_images(&idx, &root, 64);
    let cfg = FlowConfig {
        height: 64,
        width: 64,
        apply_mask: true,
        image_root: Some(root.clone()),
        ..ordered(2)
    };
    let mut flow = IndexFlow::from_index(idx, root.clone(), cfg).unwrap();

    let batch = flow.next_batch().unwrap();
    let masks = batch.masks.as_ref().unwrap();
    assert_eq!(masks.dim(), (2, 64, 64, 1));
    // far corner: outside every region
    assert_eq!(masks[[0, 0, 63, 0]], 0.0);
    assert_eq!(batch.images[[0, 0, 63, 1]], 0.0);
    // torso: full weight keeps the pixel
    assert_eq!(masks[[1, 29, 32, 0]], 1.0);
    let expected = 10.0 / 127.5 - 1.0;
    assert!((batch.images[[1, 29, 32, 0]] - expected).abs() < 1e-6);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn missing_image_file_fails_the_batch() {
    let root = temp_dir("flow_missing");
    let cfg = FlowConfig {
        image_root: Some(root.clone()),
        ..ordered(1)
    };
    let mut flow = IndexFlow::from_index(index(&[true]), root.clone(), cfg).unwrap();
    assert!(flow.next_batch().is_err());
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn config_reads_partial_json() {
    let cfg: FlowConfig = serde_json::from_str(r#"{"batch_size": 4, "apply_mask": true}"#).unwrap();
    assert_eq!(cfg.batch_size, 4);
    assert!(cfg.apply_mask);
    assert_eq!(cfg.kept_joints, vec!["lhip", "rhip", "lshoulder", "rshoulder"]);
    assert!(cfg.validate().is_ok());

    let bad = FlowConfig {
        batch_size: 0,
        ..FlowConfig::default()
    };
    assert!(bad.validate().is_err());
}

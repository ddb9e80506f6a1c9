use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
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

#[test]
fn png_roundtrip_keeps_rgb_samples() {
    let dir = temp_dir("io_rgb");
    let path = dir.join("a.png");
    let img = Array3::from_shape_fn((5, 7, 3), |(y, x, c)| (y * 40 + x * 5 + c) as u8);
    save_png(img.view(), &path).unwrap();

    let loaded = load_image(&path, ImageShape::new(5, 7, 3).unwrap()).unwrap();
    assert_eq!(loaded, img);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn load_converts_to_grayscale_and_resizes() {
    let dir = temp_dir("io_gray");
    let path = dir.join("b.png");
    let img = Array3::<u8>::from_elem((10, 20, 3), 200);
    save_png(img.view(), &path).unwrap();

    let loaded = load_image(&path, ImageShape::new(4, 8, 1).unwrap()).unwrap();
    assert_eq!(loaded.dim(), (4, 8, 1));
    assert!(loaded.iter().all(|&v| v.abs_diff(200) <= 1));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_file_reports_path() {
    let err = load_image(
        Path::new("definitely/not/here.png"),
        ImageShape::new(4, 4, 3).unwrap(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("here.png"));
}

#[test]
fn two_channel_arrays_are_rejected() {
    let dir = temp_dir("io_bad");
    let img = Array3::<u8>::zeros((2, 2, 2));
    assert!(matches!(
        save_png(img.view(), &dir.join("c.png")),
        Err(PoseBatchError::Shape(_))
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

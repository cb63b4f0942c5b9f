use vidmark::{
    AnnotationTable, CodecOptions, FillAlgorithm, FrameIndex, Header, Keypoint, PostprocessOpts,
    VidmarkError, VideoShape, codec,
};

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "vidmark_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn sample_table() -> AnnotationTable {
    let mut t = AnnotationTable::new();
    t.insert(FrameIndex(0), vec![Keypoint::new(1, 2), Keypoint::new(3, 4)])
        .unwrap();
    t.insert(FrameIndex(9), vec![Keypoint::new(5, 6), Keypoint::new(7, 8)])
        .unwrap();
    t
}

#[test]
fn file_round_trip_keeps_table_and_header() {
    let tmp = temp_dir("round_trip");
    let path = tmp.join("nested").join("kp.txt");
    let header = Header::from_iter(["left_eye", "right_eye"]);

    codec::save_to_path(
        &sample_table(),
        &path,
        Some(&header),
        &CodecOptions::default(),
        false,
    )
    .unwrap();
    let (table, loaded_header) = codec::load_from_path(&path, &CodecOptions::default()).unwrap();
    assert_eq!(table, sample_table());
    assert_eq!(loaded_header, header);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn saving_twice_with_backup_keeps_only_the_previous_version() {
    let tmp = temp_dir("backup");
    std::fs::create_dir_all(&tmp).unwrap();
    let path = tmp.join("kp.txt");
    let opts = CodecOptions::default();

    let mut first = AnnotationTable::new();
    first.insert(FrameIndex(1), vec![Keypoint::new(1, 1)]).unwrap();
    let mut second = AnnotationTable::new();
    second.insert(FrameIndex(2), vec![Keypoint::new(2, 2)]).unwrap();
    let mut third = AnnotationTable::new();
    third.insert(FrameIndex(3), vec![Keypoint::new(3, 3)]).unwrap();

    codec::save_to_path(&first, &path, None, &opts, true).unwrap();
    assert!(!codec::backup_path(&path).exists());
    codec::save_to_path(&second, &path, None, &opts, true).unwrap();
    codec::save_to_path(&third, &path, None, &opts, true).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "3 3 3\n");
    assert_eq!(
        std::fs::read_to_string(codec::backup_path(&path)).unwrap(),
        "2 2 2\n"
    );

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn missing_file_reports_path() {
    let tmp = temp_dir("missing");
    let err = codec::load_from_path(&tmp.join("absent.txt"), &CodecOptions::default())
        .unwrap_err();
    let VidmarkError::Io(source) = &err else {
        panic!("expected an io error, got {err:?}");
    };
    assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
    assert!(err.to_string().contains("absent.txt"), "{err}");
}

#[test]
fn save_into_a_file_instead_of_a_directory_is_an_io_error() {
    let tmp = temp_dir("blocked_parent");
    std::fs::create_dir_all(&tmp).unwrap();
    let blocker = tmp.join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let err = codec::save_to_path(
        &sample_table(),
        &blocker.join("kp.txt"),
        None,
        &CodecOptions::default(),
        true,
    )
    .unwrap_err();
    assert!(matches!(err, VidmarkError::Io(_)), "{err:?}");
    assert!(err.to_string().contains("create output directory"), "{err}");

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn postprocess_expand_holds_last_annotation() {
    let tmp = temp_dir("postprocess_expand");
    std::fs::create_dir_all(&tmp).unwrap();
    let input = tmp.join("in.txt");
    let output = tmp.join("out.txt");
    std::fs::write(&input, "2 5 5\n").unwrap();

    let opts = PostprocessOpts {
        algorithm: FillAlgorithm::Expand,
        codec: CodecOptions::default(),
    };
    postprocess_and_check(&input, &output, &opts);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "0\n0 5 5\n1 5 5\n2 5 5\n3 5 5\n"
    );

    std::fs::remove_dir_all(&tmp).ok();
}

fn postprocess_and_check(input: &std::path::Path, output: &std::path::Path, opts: &PostprocessOpts) {
    let shape = VideoShape::new(4, 10, 10);
    let table = vidmark::postprocess(input, output, shape, opts).unwrap();
    assert!(table.is_dense(shape.frames));
}

#[test]
fn postprocess_rejects_annotations_outside_the_video() {
    let tmp = temp_dir("postprocess_oob");
    std::fs::create_dir_all(&tmp).unwrap();
    let input = tmp.join("in.txt");
    let output = tmp.join("out.txt");
    std::fs::write(&input, "7 1 1\n").unwrap();

    let err = vidmark::postprocess(
        &input,
        &output,
        VideoShape::new(4, 10, 10),
        &PostprocessOpts::default(),
    )
    .unwrap_err();
    assert!(matches!(err, VidmarkError::Bounds { frame: 7, .. }));
    assert!(!output.exists());

    std::fs::remove_dir_all(&tmp).ok();
}

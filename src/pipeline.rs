use std::path::Path;

use crate::{
    codec::{self, CodecOptions},
    fill::FillAlgorithm,
    foundation::{
        core::VideoShape,
        error::{VidmarkError, VidmarkResult},
    },
    overlay::{self, OverlayStats, OverlayStyle},
    table::{AnnotationTable, Header},
    video::{FrameSink, FrameSource},
};

/// Loads an annotation file and validates it against the video it belongs to.
pub fn load_input(
    path: &Path,
    shape: VideoShape,
    options: &CodecOptions,
) -> VidmarkResult<(AnnotationTable, Header)> {
    let (table, header) = codec::load_from_path(path, options)?;
    if table.keypoint_count().unwrap_or(0) == 0 {
        return Err(VidmarkError::empty_input(format!(
            "no keypoints found at '{}'",
            path.display()
        )));
    }
    codec::check_input(&table, &header, shape)?;
    Ok((table, header))
}

/// Options shared by [`postprocess`] and [`replay`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PostprocessOpts {
    pub algorithm: FillAlgorithm,
    pub codec: CodecOptions,
}

/// Loads `input`, fills it with `opts.algorithm` and saves the result to `output`,
/// backing up any file already there.
#[tracing::instrument(skip(opts), fields(algorithm = ?opts.algorithm))]
pub fn postprocess(
    input: &Path,
    output: &Path,
    shape: VideoShape,
    opts: &PostprocessOpts,
) -> VidmarkResult<AnnotationTable> {
    let (table, header) = load_input(input, shape, &opts.codec)?;
    let sparse = table.len();
    let table = opts.algorithm.apply(table, shape.frames)?;
    tracing::info!(
        before = sparse,
        after = table.len(),
        "post-processed annotations"
    );
    codec::save_to_path(&table, output, Some(&header), &opts.codec, true)?;
    Ok(table)
}

/// Writes `source` to `sink` with the (optionally filled) annotations of `keypoints` drawn on.
pub fn replay<S, K>(
    source: &S,
    keypoints: &Path,
    sink: K,
    opts: &PostprocessOpts,
    style: &OverlayStyle,
) -> VidmarkResult<OverlayStats>
where
    S: FrameSource + ?Sized,
    K: FrameSink,
{
    style.validate()?;
    let shape = source.shape();
    let (table, _header) = load_input(keypoints, shape, &opts.codec)?;
    let table = opts.algorithm.apply(table, shape.frames)?;
    overlay::render_overlay(source, &table, style, sink, REPLAY_CHUNK_FRAMES)
}

const REPLAY_CHUNK_FRAMES: u64 = 64;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        foundation::core::{FrameIndex, Fps, Keypoint},
        video::MemoryVideo,
    };

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "vidmark_{name}_{}_{}",
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
    fn load_input_rejects_empty_and_out_of_bounds_files() {
        let dir = temp_dir("load_input");
        let shape = VideoShape::new(10, 20, 20);

        let empty = dir.join("empty.txt");
        std::fs::write(&empty, "label\n").unwrap();
        // A lone header line parses as a data row and fails on the label.
        assert!(matches!(
            load_input(&empty, shape, &CodecOptions::default()),
            Err(VidmarkError::Format { .. })
        ));

        let oob = dir.join("oob.txt");
        std::fs::write(&oob, "3 20 1\n").unwrap();
        assert!(matches!(
            load_input(&oob, shape, &CodecOptions::default()),
            Err(VidmarkError::Bounds { .. })
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn postprocess_writes_dense_table_and_backup() {
        let dir = temp_dir("postprocess");
        let input = dir.join("in.txt");
        let output = dir.join("out.txt");
        std::fs::write(&input, "a\n1 0 0\n3 4 2\n").unwrap();
        std::fs::write(&output, "old\n").unwrap();

        let opts = PostprocessOpts {
            algorithm: FillAlgorithm::Interpolate,
            ..PostprocessOpts::default()
        };
        let table = postprocess(&input, &output, VideoShape::new(5, 10, 10), &opts).unwrap();
        assert!(table.is_dense(5));
        assert_eq!(table.get(FrameIndex(2)), Some(&[Keypoint::new(2, 1)][..]));

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "a\n0 0 0\n1 0 0\n2 2 1\n3 4 2\n4 4 2\n"
        );
        assert_eq!(
            std::fs::read_to_string(codec::backup_path(&output)).unwrap(),
            "old\n"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn replay_expands_before_drawing() {
        let dir = temp_dir("replay");
        let keypoints = dir.join("kp.txt");
        std::fs::write(&keypoints, "1 2 2\n").unwrap();

        let fps = Fps::new(10, 1).unwrap();
        let source = MemoryVideo::numbered(4, 6, 6, fps).unwrap();
        let mut out = MemoryVideo::new(6, 6, fps);
        let opts = PostprocessOpts {
            algorithm: FillAlgorithm::Expand,
            ..PostprocessOpts::default()
        };
        let stats = replay(&source, &keypoints, &mut out, &opts, &OverlayStyle::default())
            .unwrap();
        assert_eq!(stats.frames_total, 4);
        assert_eq!(stats.frames_annotated, 4);

        std::fs::remove_dir_all(&dir).ok();
    }
}

#[cfg(feature = "media-ffmpeg")]
mod media_pipeline {
    use std::process::Command;

    use vidmark::{
        FfmpegEncoder, FfmpegVideo, FillAlgorithm, Fps, FrameSink as _, FrameSource as _,
        MemoryVideo, OverlayStyle, PostprocessOpts, WindowedFrameCache, default_mp4_config,
    };

    fn ffmpeg_tools_available() -> bool {
        let ok = |tool: &str| {
            Command::new(tool)
                .arg("-version")
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        };
        ok("ffmpeg") && ok("ffprobe")
    }

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

    fn write_numbered(path: &std::path::Path, frames: u64) -> anyhow::Result<()> {
        let fps = Fps::new(10, 1)?;
        let mut encoder = FfmpegEncoder::new(default_mp4_config(path, 64, 48, fps))?;
        for i in 0..frames {
            encoder.push_frame(&MemoryVideo::numbered_frame(i, 64, 48))?;
        }
        encoder.finish()?;
        Ok(())
    }

    #[test]
    fn numbered_video_probes_and_decodes_through_the_cache() {
        if !ffmpeg_tools_available() {
            eprintln!("skipping: ffmpeg/ffprobe not available");
            return;
        }
        let tmp = temp_dir("media_cache");
        let path = tmp.join("numbers.mp4");
        write_numbered(&path, 30).unwrap();

        let video = FfmpegVideo::open(&path).unwrap();
        assert_eq!(video.len(), 30);
        assert_eq!((video.width(), video.height()), (64, 48));
        assert_eq!(video.frame_rate(), Fps::new(10, 1).unwrap());

        let mut cache = WindowedFrameCache::new(video, 4, 0).unwrap();
        // Lossy encoding keeps the flat gray level close to the frame index.
        for key in [0i64, 3, 17, -1] {
            let img = cache.get(key).unwrap();
            let expected = key.rem_euclid(30) as i32;
            let level = i32::from(img.get_pixel(32, 24)[0]);
            assert!((level - expected).abs() <= 3, "key {key}: level {level}");
        }
        assert_eq!(cache.reload_count(), 2);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn replay_encodes_an_annotated_copy() {
        if !ffmpeg_tools_available() {
            eprintln!("skipping: ffmpeg/ffprobe not available");
            return;
        }
        let tmp = temp_dir("media_replay");
        let src = tmp.join("in.mp4");
        let kp = tmp.join("kp.txt");
        let out = tmp.join("out.mp4");
        write_numbered(&src, 12).unwrap();
        std::fs::write(&kp, "point\n2 10 10\n8 50 40\n").unwrap();

        let video = FfmpegVideo::open(&src).unwrap();
        let mut encoder = FfmpegEncoder::new(default_mp4_config(
            &out,
            video.width(),
            video.height(),
            video.frame_rate(),
        ))
        .unwrap();
        let opts = PostprocessOpts {
            algorithm: FillAlgorithm::Interpolate,
            ..PostprocessOpts::default()
        };
        let stats =
            vidmark::replay(&video, &kp, &mut encoder, &opts, &OverlayStyle::default()).unwrap();
        assert_eq!(encoder.frames_written(), 12);
        encoder.finish().unwrap();
        assert_eq!(stats.frames_annotated, 12);

        let replayed = FfmpegVideo::open(&out).unwrap();
        assert_eq!(replayed.len(), 12);

        std::fs::remove_dir_all(&tmp).ok();
    }
}

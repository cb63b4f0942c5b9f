use std::path::{Path, PathBuf};

use crate::{
    foundation::{
        core::{FrameIndex, FrameRange, Fps},
        error::{VidmarkError, VidmarkResult},
    },
    video::{FrameSource, PixelLayout, RawFrame},
};

#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub frame_count: u64,
}

/// Video file decoded on demand through the system `ffmpeg` binary.
#[derive(Clone, Debug)]
pub struct FfmpegVideo {
    info: VideoSourceInfo,
}

impl FfmpegVideo {
    pub fn open(path: &Path) -> VidmarkResult<Self> {
        let info = probe_video(path)?;
        if info.width == 0 || info.height == 0 {
            return Err(VidmarkError::media(format!(
                "video '{}' reports a zero frame size",
                path.display()
            )));
        }
        tracing::info!(
            path = %path.display(),
            frames = info.frame_count,
            width = info.width,
            height = info.height,
            "opened video"
        );
        Ok(Self { info })
    }

    pub fn info(&self) -> &VideoSourceInfo {
        &self.info
    }
}

impl FrameSource for FfmpegVideo {
    fn len(&self) -> u64 {
        self.info.frame_count
    }

    fn width(&self) -> u32 {
        self.info.width
    }

    fn height(&self) -> u32 {
        self.info.height
    }

    fn frame_rate(&self) -> Fps {
        self.info.fps
    }

    fn frame(&self, index: FrameIndex) -> VidmarkResult<RawFrame> {
        let range = FrameRange::new(index, FrameIndex(index.0 + 1))?;
        self.frames(range)?.pop().ok_or_else(|| {
            VidmarkError::media(format!(
                "ffmpeg returned no video frame {} for '{}'",
                index.0,
                self.info.source_path.display()
            ))
        })
    }

    fn frames(&self, range: FrameRange) -> VidmarkResult<Vec<RawFrame>> {
        if range.end.0 > self.info.frame_count {
            return Err(VidmarkError::Index {
                index: i64::try_from(range.end.0 - 1).unwrap_or(i64::MAX),
                len: self.info.frame_count,
            });
        }
        let frames = decode_video_frames_rgb8(&self.info, range)?;
        Ok(frames
            .into_iter()
            .map(|data| RawFrame {
                width: self.info.width,
                height: self.info.height,
                layout: PixelLayout::Rgb8,
                data,
            })
            .collect())
    }
}

#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source_path: &Path) -> VidmarkResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        nb_frames: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| VidmarkError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(VidmarkError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| VidmarkError::media(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| VidmarkError::media("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| VidmarkError::media("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| VidmarkError::media("missing video height from ffprobe"))?;

    let (num, den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| VidmarkError::media("invalid video r_frame_rate"))?;
    let fps = Fps::new(num, den)?;

    let frame_count = match video_stream
        .nb_frames
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
    {
        Some(n) => n,
        None => {
            let duration_sec = parsed
                .format
                .as_ref()
                .and_then(|f| f.duration.as_ref())
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);
            (duration_sec * fps.as_f64()).round().max(0.0) as u64
        }
    };

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps,
        frame_count,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_video(_source_path: &Path) -> VidmarkResult<VideoSourceInfo> {
    Err(VidmarkError::media(
        "video files require the 'media-ffmpeg' feature",
    ))
}

#[cfg(feature = "media-ffmpeg")]
pub(crate) fn decode_video_frames_rgb8(
    source: &VideoSourceInfo,
    range: FrameRange,
) -> VidmarkResult<Vec<Vec<u8>>> {
    if range.is_empty() {
        return Ok(Vec::new());
    }

    let select = format!(
        "select=between(n\\,{}\\,{})",
        range.start.0,
        range.end.0 - 1
    );
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(&source.source_path)
        .args([
            "-vf",
            &select,
            "-vsync",
            "0",
            "-frames:v",
            &range.len_frames().to_string(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            VidmarkError::media(format!("failed to run ffmpeg for video decode: {e}"))
        })?;

    if !out.status.success() {
        return Err(VidmarkError::media(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected_len = source.width as usize * source.height as usize * 3;
    if expected_len == 0 {
        return Err(VidmarkError::media(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }
    if !out.stdout.len().is_multiple_of(expected_len) {
        return Err(VidmarkError::media(format!(
            "decoded video batch has invalid size: got {} bytes, expected multiples of {expected_len}",
            out.stdout.len()
        )));
    }

    let frames: Vec<Vec<u8>> = out
        .stdout
        .chunks_exact(expected_len)
        .take(range.len_frames() as usize)
        .map(<[u8]>::to_vec)
        .collect();
    tracing::debug!(
        start = range.start.0,
        decoded = frames.len(),
        "ffmpeg decoded frame batch"
    );
    Ok(frames)
}

#[cfg(not(feature = "media-ffmpeg"))]
pub(crate) fn decode_video_frames_rgb8(
    _source: &VideoSourceInfo,
    _range: FrameRange,
) -> VidmarkResult<Vec<Vec<u8>>> {
    Err(VidmarkError::media(
        "video files require the 'media-ffmpeg' feature",
    ))
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}

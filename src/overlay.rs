use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};

use crate::{
    foundation::{
        core::{FrameIndex, FrameRange, Keypoint},
        error::{VidmarkError, VidmarkResult},
    },
    table::AnnotationTable,
    video::{FrameSink, FrameSource, RawFrame},
};

const MAX_RADIUS: u32 = 1 << 16;

/// How keypoints are marked on replayed frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OverlayStyle {
    pub radius: u32,
    pub fill: [u8; 3],
    pub outline: [u8; 3],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            radius: 4,
            fill: [255, 255, 0],
            outline: [0, 0, 0],
        }
    }
}

impl OverlayStyle {
    pub fn validate(&self) -> VidmarkResult<()> {
        if self.radius == 0 {
            return Err(VidmarkError::validation("keypoint radius must be > 0"));
        }
        if self.radius > MAX_RADIUS {
            return Err(VidmarkError::validation(format!(
                "keypoint radius must be <= {MAX_RADIUS}"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverlayStats {
    pub frames_total: u64,
    pub frames_annotated: u64,
}

/// Draws a filled, outlined circle at every keypoint.
pub fn annotate_frame(image: &mut RgbImage, keypoints: &[Keypoint], style: &OverlayStyle) {
    let radius = style.radius.min(MAX_RADIUS) as i32;
    let (width, height) = image.dimensions();
    for kp in keypoints {
        let center = (
            clamp_to_canvas(kp.x, width, radius),
            clamp_to_canvas(kp.y, height, radius),
        );
        draw_filled_circle_mut(image, center, radius, Rgb(style.fill));
        draw_hollow_circle_mut(image, center, radius, Rgb(style.outline));
    }
}

// Circles centered further out than this cannot touch the canvas.
fn clamp_to_canvas(v: i64, extent: u32, radius: i32) -> i32 {
    let margin = i64::from(radius) + 1;
    v.clamp(-margin, i64::from(extent) + margin) as i32
}

/// Streams every frame of `source` into `sink`, marking the frames `table` annotates.
///
/// Frames without an annotation pass through unchanged.
#[tracing::instrument(skip(source, table, sink), fields(len = source.len()))]
pub fn render_overlay<S, K>(
    source: &S,
    table: &AnnotationTable,
    style: &OverlayStyle,
    mut sink: K,
    chunk_size: u64,
) -> VidmarkResult<OverlayStats>
where
    S: FrameSource + ?Sized,
    K: FrameSink,
{
    style.validate()?;
    let chunk_size = chunk_size.max(1);
    let len = source.len();
    let mut stats = OverlayStats::default();

    let mut chunk_start = 0;
    while chunk_start < len {
        let chunk_end = (chunk_start + chunk_size).min(len);
        let chunk = FrameRange::new(FrameIndex(chunk_start), FrameIndex(chunk_end))?;
        let frames = source.frames(chunk)?;
        if frames.len() as u64 != chunk.len_frames() {
            return Err(VidmarkError::media(format!(
                "frame source returned {} frames for [{chunk_start}, {chunk_end})",
                frames.len()
            )));
        }

        for (offset, raw) in frames.into_iter().enumerate() {
            let frame = FrameIndex(chunk_start + offset as u64);
            let mut image = RawFrame::into_rgb_image(raw)?;
            if let Some(keypoints) = table.get(frame) {
                annotate_frame(&mut image, keypoints, style);
                stats.frames_annotated += 1;
            }
            sink.push_frame(&image)?;
            stats.frames_total += 1;
        }
        chunk_start = chunk_end;
    }

    tracing::info!(
        frames = stats.frames_total,
        annotated = stats.frames_annotated,
        "rendered annotation overlay"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{foundation::core::Fps, video::MemoryVideo};

    #[test]
    fn annotate_frame_fills_center_and_outlines_edge() {
        let mut img = RgbImage::new(20, 20);
        let style = OverlayStyle::default();
        annotate_frame(&mut img, &[Keypoint::new(10, 10)], &style);
        assert_eq!(img.get_pixel(10, 10), &Rgb([255, 255, 0]));
        assert_eq!(img.get_pixel(14, 10), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn keypoints_off_canvas_are_clipped_not_fatal() {
        let mut img = RgbImage::new(4, 4);
        annotate_frame(&mut img, &[Keypoint::new(-100, 9_000_000_000)], &OverlayStyle::default());
    }

    #[test]
    fn zero_radius_is_rejected() {
        let style = OverlayStyle {
            radius: 0,
            ..OverlayStyle::default()
        };
        assert!(style.validate().is_err());
    }

    #[test]
    fn render_overlay_marks_only_annotated_frames() {
        let fps = Fps::new(10, 1).unwrap();
        let source = MemoryVideo::numbered(5, 16, 16, fps).unwrap();
        let mut table = AnnotationTable::new();
        table.insert(FrameIndex(1), vec![Keypoint::new(8, 8)]).unwrap();
        table.insert(FrameIndex(4), vec![Keypoint::new(8, 8)]).unwrap();

        let mut out = MemoryVideo::new(16, 16, fps);
        let stats =
            render_overlay(&source, &table, &OverlayStyle::default(), &mut out, 2).unwrap();
        assert_eq!(
            stats,
            OverlayStats {
                frames_total: 5,
                frames_annotated: 2
            }
        );

        let frames = out.images();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[1].get_pixel(8, 8), &Rgb([255, 255, 0]));
        assert_eq!(frames[4].get_pixel(8, 8), &Rgb([255, 255, 0]));
        assert_eq!(frames[2].get_pixel(8, 8), &Rgb([2, 2, 2]));
        assert_eq!(&frames[3], &source.images()[3]);
    }
}

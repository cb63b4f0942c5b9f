use image::RgbImage;

use crate::foundation::{
    core::{FrameIndex, FrameRange, Fps, VideoShape},
    error::{VidmarkError, VidmarkResult},
};

/// Memory layout of a decoded frame as handed out by a [`FrameSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// Interleaved `r, g, b` bytes, row-major.
    Rgb8,
    /// Interleaved `r, g, b, a` bytes, row-major. Alpha is dropped on conversion.
    Rgba8,
    /// Three full planes (`r`, then `g`, then `b`), each `height * width` bytes.
    PlanarRgb8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 | Self::PlanarRgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Converts the frame into a single interleaved RGB image.
    pub fn into_rgb_image(self) -> VidmarkResult<RgbImage> {
        let pixels = self.width as usize * self.height as usize;
        let expected = pixels * self.layout.bytes_per_pixel();
        if self.data.len() != expected {
            return Err(VidmarkError::validation(format!(
                "raw {:?} frame of {}x{} has {} bytes, expected {expected}",
                self.layout,
                self.width,
                self.height,
                self.data.len()
            )));
        }

        let rgb = match self.layout {
            PixelLayout::Rgb8 => self.data,
            PixelLayout::Rgba8 => self
                .data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
            PixelLayout::PlanarRgb8 => {
                let (r, rest) = self.data.split_at(pixels);
                let (g, b) = rest.split_at(pixels);
                let mut out = Vec::with_capacity(expected);
                for i in 0..pixels {
                    out.extend_from_slice(&[r[i], g[i], b[i]]);
                }
                out
            }
        };

        RgbImage::from_raw(self.width, self.height, rgb)
            .ok_or_else(|| VidmarkError::validation("rgb buffer does not match frame size"))
    }
}

/// An indexable, fixed-length source of decoded video frames.
pub trait FrameSource {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn frame_rate(&self) -> Fps;

    /// Decodes frame `index`, `0 <= index < len()`.
    fn frame(&self, index: FrameIndex) -> VidmarkResult<RawFrame>;

    /// Decodes every frame of `range`, in order.
    ///
    /// Sources that can decode a run of frames in one pass should override this.
    fn frames(&self, range: FrameRange) -> VidmarkResult<Vec<RawFrame>> {
        (range.start.0..range.end.0)
            .map(|f| self.frame(FrameIndex(f)))
            .collect()
    }

    fn shape(&self) -> VideoShape {
        VideoShape::new(self.len(), self.height(), self.width())
    }
}

/// Consumer of presentation-ready frames, e.g. a video encoder.
pub trait FrameSink {
    fn push_frame(&mut self, frame: &RgbImage) -> VidmarkResult<()>;
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn push_frame(&mut self, frame: &RgbImage) -> VidmarkResult<()> {
        (**self).push_frame(frame)
    }
}

/// In-memory video, usable both as a [`FrameSource`] and as a [`FrameSink`].
#[derive(Clone, Debug)]
pub struct MemoryVideo {
    width: u32,
    height: u32,
    fps: Fps,
    frames: Vec<RgbImage>,
}

impl MemoryVideo {
    pub fn new(width: u32, height: u32, fps: Fps) -> Self {
        Self {
            width,
            height,
            fps,
            frames: Vec::new(),
        }
    }

    pub fn from_frames(frames: Vec<RgbImage>, fps: Fps) -> VidmarkResult<Self> {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        let mut video = Self::new(width, height, fps);
        for frame in &frames {
            video.push_frame(frame)?;
        }
        Ok(video)
    }

    /// Test pattern: frame `i` is filled with gray level `i % 256`, and its first pixel's
    /// red and green channels hold `i` as a big-endian `u16`.
    pub fn numbered(count: u64, width: u32, height: u32, fps: Fps) -> VidmarkResult<Self> {
        if width == 0 || height == 0 {
            return Err(VidmarkError::validation("test video size must be non-zero"));
        }
        let mut video = Self::new(width, height, fps);
        video.frames = (0..count)
            .map(|i| Self::numbered_frame(i, width, height))
            .collect();
        Ok(video)
    }

    /// Frame `index` of the [`MemoryVideo::numbered`] pattern. `width` and `height` must
    /// be non-zero.
    pub fn numbered_frame(index: u64, width: u32, height: u32) -> RgbImage {
        let level = (index % 256) as u8;
        let mut img = RgbImage::from_pixel(width, height, image::Rgb([level; 3]));
        let [hi, lo] = ((index & 0xffff) as u16).to_be_bytes();
        img.put_pixel(0, 0, image::Rgb([hi, lo, level]));
        img
    }

    /// Reads back the index stamped into a frame of [`MemoryVideo::numbered`].
    pub fn stamped_index(frame: &RgbImage) -> u16 {
        let px = frame.get_pixel(0, 0);
        u16::from_be_bytes([px[0], px[1]])
    }

    pub fn images(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn into_images(self) -> Vec<RgbImage> {
        self.frames
    }
}

impl FrameSource for MemoryVideo {
    fn len(&self) -> u64 {
        self.frames.len() as u64
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn frame_rate(&self) -> Fps {
        self.fps
    }

    fn frame(&self, index: FrameIndex) -> VidmarkResult<RawFrame> {
        let img = usize::try_from(index.0)
            .ok()
            .and_then(|i| self.frames.get(i))
            .ok_or_else(|| VidmarkError::Index {
                index: i64::try_from(index.0).unwrap_or(i64::MAX),
                len: self.len(),
            })?;
        Ok(RawFrame {
            width: self.width,
            height: self.height,
            layout: PixelLayout::Rgb8,
            data: img.as_raw().clone(),
        })
    }
}

impl FrameSink for MemoryVideo {
    fn push_frame(&mut self, frame: &RgbImage) -> VidmarkResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(VidmarkError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        self.frames.push(frame.clone());
        Ok(())
    }
}

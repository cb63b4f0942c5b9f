use image::RgbImage;

use crate::{
    foundation::{
        core::{FrameIndex, FrameRange, Fps, VideoShape},
        error::{VidmarkError, VidmarkResult},
    },
    video::{FrameSource, RawFrame},
};

/// Zero-argument callback run around a cache reload.
pub type ReloadHook = Box<dyn FnMut()>;

/// Keeps a contiguous window of decoded frames around the most recent access.
///
/// With a radius `N > 0` smaller than the video, the window is `[key - N, key + N)`
/// clipped to the video; a read outside the window throws the whole window away and
/// decodes the one around the new key. A radius of 0 (or one covering the whole
/// video) decodes everything up front and never reloads.
pub struct WindowedFrameCache<S> {
    source: S,
    radius: u64,
    window: FrameRange,
    loaded: Vec<RgbImage>,
    before_reload: Option<ReloadHook>,
    after_reload: Option<ReloadHook>,
    reloads: u64,
}

impl<S: FrameSource> WindowedFrameCache<S> {
    /// Decodes the initial window centered on `mid` (clamped to the last frame).
    #[tracing::instrument(skip(source), fields(len = source.len()))]
    pub fn new(source: S, radius: u64, mid: u64) -> VidmarkResult<Self> {
        let len = source.len();
        let window = if radius > 0 && radius < len {
            FrameRange::around(FrameIndex(mid.min(len - 1)), radius, len)
        } else {
            FrameRange {
                start: FrameIndex(0),
                end: FrameIndex(len),
            }
        };

        let loaded = decode_window(&source, window)?;
        tracing::info!(
            start = window.start.0,
            end = window.end.0,
            "frame cache loaded initial window"
        );

        Ok(Self {
            source,
            radius,
            window,
            loaded,
            before_reload: None,
            after_reload: None,
            reloads: 0,
        })
    }

    /// Registers the hooks run before and after every reload, returning the previous ones.
    pub fn on_cache_load(
        &mut self,
        prefix: Option<ReloadHook>,
        suffix: Option<ReloadHook>,
    ) -> (Option<ReloadHook>, Option<ReloadHook>) {
        (
            std::mem::replace(&mut self.before_reload, prefix),
            std::mem::replace(&mut self.after_reload, suffix),
        )
    }

    pub fn with_hooks(
        mut self,
        prefix: impl FnMut() + 'static,
        suffix: impl FnMut() + 'static,
    ) -> Self {
        self.before_reload = Some(Box::new(prefix));
        self.after_reload = Some(Box::new(suffix));
        self
    }

    /// Returns frame `key`; negative keys count from the end of the video.
    pub fn get(&mut self, key: i64) -> VidmarkResult<&RgbImage> {
        let len = self.source.len();
        let resolved = if key < 0 {
            i128::from(key) + i128::from(len)
        } else {
            i128::from(key)
        };
        if resolved < 0 || resolved >= i128::from(len) {
            return Err(VidmarkError::Index { index: key, len });
        }
        let frame = FrameIndex(resolved as u64);

        if !self.window.contains(frame) {
            self.reload(frame)?;
        }

        let offset = (frame.0 - self.window.start.0) as usize;
        self.loaded
            .get(offset)
            .ok_or(VidmarkError::Index { index: key, len })
    }

    fn reload(&mut self, center: FrameIndex) -> VidmarkResult<()> {
        if let Some(hook) = self.before_reload.as_mut() {
            hook();
        }

        let window = FrameRange::around(center, self.radius, self.source.len());
        // On failure the previous window stays loaded.
        let loaded = decode_window(&self.source, window)?;
        self.window = window;
        self.loaded = loaded;
        self.reloads += 1;
        tracing::info!(
            start = window.start.0,
            end = window.end.0,
            reloads = self.reloads,
            "frame cache reloaded"
        );

        if let Some(hook) = self.after_reload.as_mut() {
            hook();
        }
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.len() == 0
    }

    /// Frames currently held in memory.
    pub fn window(&self) -> FrameRange {
        self.window
    }

    pub fn radius(&self) -> u64 {
        self.radius
    }

    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    pub fn shape(&self) -> VideoShape {
        self.source.shape()
    }

    pub fn frame_rate(&self) -> Fps {
        self.source.frame_rate()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S> std::fmt::Debug for WindowedFrameCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowedFrameCache")
            .field("radius", &self.radius)
            .field("window", &self.window)
            .field("reloads", &self.reloads)
            .field("before_reload", &self.before_reload.is_some())
            .field("after_reload", &self.after_reload.is_some())
            .finish()
    }
}

fn decode_window<S: FrameSource>(source: &S, window: FrameRange) -> VidmarkResult<Vec<RgbImage>> {
    tracing::debug!(start = window.start.0, end = window.end.0, "decoding frames");
    let raw = source.frames(window)?;
    if raw.len() as u64 != window.len_frames() {
        return Err(VidmarkError::media(format!(
            "frame source returned {} frames for window [{}, {})",
            raw.len(),
            window.start,
            window.end
        )));
    }
    raw.into_iter().map(RawFrame::into_rgb_image).collect()
}

use crate::foundation::error::{VidmarkError, VidmarkResult};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    pub start: FrameIndex,
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    pub fn new(start: FrameIndex, end: FrameIndex) -> VidmarkResult<Self> {
        if start.0 > end.0 {
            return Err(VidmarkError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// The `radius`-neighborhood `[center - radius, center + radius)` clipped to `[0, len)`.
    pub fn around(center: FrameIndex, radius: u64, len: u64) -> Self {
        Self {
            start: FrameIndex(center.0.saturating_sub(radius)),
            end: FrameIndex(center.0.saturating_add(radius).min(len)),
        }
    }
}

/// Integer pixel coordinate of one keypoint.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Keypoint {
    pub x: i64,
    pub y: i64,
}

impl Keypoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<(i64, i64)> for Keypoint {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

/// Declared shape of a video: frame count and per-frame size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VideoShape {
    pub frames: u64,
    pub height: u32,
    pub width: u32,
}

impl VideoShape {
    pub fn new(frames: u64, height: u32, width: u32) -> Self {
        Self {
            frames,
            height,
            width,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> VidmarkResult<Self> {
        if den == 0 {
            return Err(VidmarkError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(VidmarkError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_range_contains_boundaries() {
        let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
        assert!(!r.contains(FrameIndex(1)));
        assert!(r.contains(FrameIndex(2)));
        assert!(r.contains(FrameIndex(4)));
        assert!(!r.contains(FrameIndex(5)));
        assert_eq!(r.len_frames(), 3);
        assert!(FrameRange::new(FrameIndex(5), FrameIndex(2)).is_err());
    }

    #[test]
    fn around_clips_to_video_bounds() {
        let r = FrameRange::around(FrameIndex(1), 3, 100);
        assert_eq!((r.start.0, r.end.0), (0, 4));

        let r = FrameRange::around(FrameIndex(98), 3, 100);
        assert_eq!((r.start.0, r.end.0), (95, 100));

        let r = FrameRange::around(FrameIndex(50), 3, 100);
        assert_eq!((r.start.0, r.end.0), (47, 53));
        assert!(r.contains(FrameIndex(50)));
    }

    #[test]
    fn fps_rejects_zero_parts() {
        assert!(Fps::new(0, 1).is_err());
        assert!(Fps::new(30, 0).is_err());
        assert!((Fps::new(30000, 1001).unwrap().as_f64() - 29.97).abs() < 1e-2);
    }
}

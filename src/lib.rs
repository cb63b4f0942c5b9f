#![forbid(unsafe_code)]

pub mod codec;
pub mod encode_ffmpeg;
pub mod fill;
pub mod foundation;
pub mod frame_cache;
pub mod media;
pub mod overlay;
pub mod pipeline;
pub mod table;
pub mod video;

pub use codec::{CodecOptions, KeypointConfig, check_input, keypoint_config, load, save};
pub use encode_ffmpeg::{EncodeConfig, FfmpegEncoder, default_mp4_config, is_ffmpeg_on_path};
pub use fill::{FillAlgorithm, interpolate, past_expand};
pub use foundation::core::{Fps, FrameIndex, FrameRange, Keypoint, VideoShape};
pub use foundation::error::{Axis, VidmarkError, VidmarkResult};
pub use frame_cache::{ReloadHook, WindowedFrameCache};
pub use media::{FfmpegVideo, VideoSourceInfo};
pub use overlay::{OverlayStats, OverlayStyle, annotate_frame, render_overlay};
pub use pipeline::{PostprocessOpts, load_input, postprocess, replay};
pub use table::{AnnotationTable, Header};
pub use video::{FrameSink, FrameSource, MemoryVideo, PixelLayout, RawFrame};

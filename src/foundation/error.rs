use std::fmt;

pub type VidmarkResult<T> = Result<T, VidmarkError>;

/// Which limit of the video shape a value was checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Frame,
    X,
    Y,
}

impl Axis {
    fn limit_name(self) -> &'static str {
        match self {
            Self::Frame => "frame count",
            Self::X => "width",
            Self::Y => "height",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame => f.write_str("frame index"),
            Self::X => f.write_str("x"),
            Self::Y => f.write_str("y"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VidmarkError {
    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error(
        "bounds error: frame {frame}{}: {axis} = {value} is outside [0, {bound}) (video {})",
        .label.as_deref().map(|l| format!(", keypoint '{l}'")).unwrap_or_default(),
        .axis.limit_name()
    )]
    Bounds {
        frame: u64,
        label: Option<String>,
        axis: Axis,
        value: i64,
        bound: u64,
    },

    #[error("index error: frame {index} is out of range (video only has {len} frames)")]
    Index { index: i64, len: u64 },

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("shape mismatch at frame {frame}: expected {expected} keypoints, found {found}")]
    ShapeMismatch {
        frame: u64,
        expected: usize,
        found: usize,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("media error: {0}")]
    Media(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VidmarkError {
    pub fn format(line: usize, msg: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: msg.into(),
        }
    }

    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// I/O failure on `path`; keeps the source's kind and prefixes the action and path.
    pub fn io_at(action: &str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            source.kind(),
            format!("failed to {action} '{}': {source}", path.display()),
        ))
    }
}

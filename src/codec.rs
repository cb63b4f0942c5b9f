use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    encode_ffmpeg::ensure_parent_dir,
    foundation::{
        core::{FrameIndex, Keypoint, VideoShape},
        error::{Axis, VidmarkError, VidmarkResult},
    },
    table::{AnnotationTable, Header},
};

/// Text layout options of an annotation file.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CodecOptions {
    pub separator: String,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            separator: " ".to_string(),
        }
    }
}

impl CodecOptions {
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn validate(&self) -> VidmarkResult<()> {
        if self.separator.is_empty() {
            return Err(VidmarkError::validation("field separator must be non-empty"));
        }
        if self.separator.contains('\n') {
            return Err(VidmarkError::validation(
                "field separator must not contain a line break",
            ));
        }
        Ok(())
    }
}

/// One keypoint of the base configuration an annotation session starts from.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct KeypointConfig {
    pub label: String,
    pub position: Keypoint,
}

/// Writes `table` as separator-delimited text, one line per frame in ascending order.
///
/// With a `header`, its labels are written first as a single line.
pub fn save<W: Write>(
    table: &AnnotationTable,
    mut writer: W,
    header: Option<&Header>,
    options: &CodecOptions,
) -> VidmarkResult<()> {
    options.validate()?;
    let sep = options.separator.as_str();

    if let Some(header) = header {
        if let Some(k) = table.keypoint_count()
            && k != header.len()
        {
            return Err(VidmarkError::validation(format!(
                "header has {} labels but frames carry {k} keypoints",
                header.len()
            )));
        }
        if let Some(bad) = header.iter().find(|l| l.contains(sep) || l.contains('\n')) {
            return Err(VidmarkError::validation(format!(
                "header label '{bad}' contains the field separator or a line break"
            )));
        }
        // A blank header line would be skipped on load.
        if let Some(i) = header.iter().position(|l| l.trim().is_empty()) {
            return Err(VidmarkError::validation(format!(
                "header label {i} is empty or whitespace only"
            )));
        }
        writeln!(writer, "{}", header.0.join(sep))?;
    }

    for (frame, keypoints) in table.iter() {
        write!(writer, "{frame}")?;
        for kp in keypoints {
            write!(writer, "{sep}{}{sep}{}", kp.x, kp.y)?;
        }
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

struct Row {
    line: usize,
    tokens: Vec<String>,
}

/// Parses an annotation file into a table and its header.
///
/// The first line is a header when its token count is exactly `(n - 1) / 2`, `n` being
/// the token count of the second line. Files without a header get labels `"0".."k-1"`.
#[tracing::instrument(skip(reader))]
pub fn load<R: BufRead>(
    reader: R,
    options: &CodecOptions,
) -> VidmarkResult<(AnnotationTable, Header)> {
    options.validate()?;
    let sep = options.separator.as_str();

    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.trim().is_empty() {
            continue;
        }
        rows.push(Row {
            line: idx + 1,
            tokens: line.split(sep).map(str::to_owned).collect(),
        });
    }

    let Some(first) = rows.first() else {
        return Err(VidmarkError::format(0, "annotation source is empty"));
    };

    let mut header = None;
    let mut data = rows.as_slice();
    if let Some(second) = rows.get(1) {
        let (n0, n1) = (first.tokens.len(), second.tokens.len());
        if n0 == (n1 - 1) / 2 {
            header = Some(Header(first.tokens.clone()));
            data = &rows[1..];
        } else if n0 != n1 {
            return Err(VidmarkError::format(
                first.line,
                format!(
                    "row 0 has a different length ({n0}) from row 1 ({n1}), \
                     but not quite as to make it a header"
                ),
            ));
        }
    }

    let mut table = AnnotationTable::new();
    let mut previous: Option<usize> = None;
    for (index, row) in data.iter().enumerate() {
        let (frame, keypoints) = parse_row(row)?;
        if let Some(expected) = previous
            && expected != keypoints.len()
        {
            return Err(VidmarkError::format(
                row.line,
                format!(
                    "row {index} has {} keypoints, but row {} has {expected}",
                    keypoints.len(),
                    index - 1
                ),
            ));
        }
        previous = Some(keypoints.len());
        if table.contains(frame) {
            return Err(VidmarkError::format(
                row.line,
                format!("frame {frame} is annotated more than once"),
            ));
        }
        table.insert(frame, keypoints)?;
    }

    let keypoints = table.keypoint_count().unwrap_or(0);
    let header = match header {
        Some(h) if h.len() != keypoints => {
            return Err(VidmarkError::format(
                first.line,
                format!(
                    "header has {} labels but rows carry {keypoints} keypoints",
                    h.len()
                ),
            ));
        }
        Some(h) => h,
        None => Header::synthesized(keypoints),
    };

    tracing::debug!(
        frames = table.len(),
        keypoints,
        "loaded annotation table"
    );
    Ok((table, header))
}

fn parse_row(row: &Row) -> VidmarkResult<(FrameIndex, Vec<Keypoint>)> {
    if row.tokens.len().is_multiple_of(2) {
        return Err(VidmarkError::format(
            row.line,
            format!(
                "row has {} fields; expected a frame index followed by x/y pairs",
                row.tokens.len()
            ),
        ));
    }

    let frame = row.tokens[0].trim().parse::<u64>().map_err(|_| {
        VidmarkError::format(
            row.line,
            format!("frame index '{}' is not a non-negative integer", row.tokens[0]),
        )
    })?;

    let coord = |tok: &str| {
        tok.trim().parse::<i64>().map_err(|_| {
            VidmarkError::format(row.line, format!("coordinate '{tok}' is not an integer"))
        })
    };
    let keypoints = row.tokens[1..]
        .chunks_exact(2)
        .map(|pair| -> VidmarkResult<Keypoint> {
            Ok(Keypoint::new(coord(&pair[0])?, coord(&pair[1])?))
        })
        .collect::<VidmarkResult<Vec<_>>>()?;

    Ok((FrameIndex(frame), keypoints))
}

/// Validates every frame index and coordinate of `table` against `shape`.
pub fn check_input(
    table: &AnnotationTable,
    header: &Header,
    shape: VideoShape,
) -> VidmarkResult<()> {
    if let Some(k) = table.keypoint_count()
        && k != header.len()
    {
        return Err(VidmarkError::validation(format!(
            "header has {} labels but frames carry {k} keypoints",
            header.len()
        )));
    }

    if let Some(last) = table.last_frame()
        && last.0 >= shape.frames
    {
        return Err(VidmarkError::Bounds {
            frame: last.0,
            label: None,
            axis: Axis::Frame,
            value: i64::try_from(last.0).unwrap_or(i64::MAX),
            bound: shape.frames,
        });
    }

    for (frame, keypoints) in table.iter() {
        for (i, kp) in keypoints.iter().enumerate() {
            check_keypoint(frame, header.label(i), *kp, shape)?;
        }
    }
    Ok(())
}

/// Pairs the first annotated frame's keypoints with their labels.
pub fn keypoint_config(
    table: &AnnotationTable,
    header: &Header,
    shape: VideoShape,
) -> VidmarkResult<Vec<KeypointConfig>> {
    let (frame, keypoints) = table
        .iter()
        .next()
        .ok_or_else(|| VidmarkError::empty_input("no keypoints to build a configuration from"))?;

    keypoints
        .iter()
        .enumerate()
        .map(|(i, kp)| -> VidmarkResult<KeypointConfig> {
            let label = header.label(i).ok_or_else(|| {
                VidmarkError::validation(format!("keypoint {i} has no header label"))
            })?;
            check_keypoint(frame, Some(label), *kp, shape)?;
            Ok(KeypointConfig {
                label: label.to_string(),
                position: *kp,
            })
        })
        .collect()
}

fn check_keypoint(
    frame: FrameIndex,
    label: Option<&str>,
    kp: Keypoint,
    shape: VideoShape,
) -> VidmarkResult<()> {
    for (axis, value, bound) in [
        (Axis::X, kp.x, u64::from(shape.width)),
        (Axis::Y, kp.y, u64::from(shape.height)),
    ] {
        if value < 0 || value as u64 >= bound {
            return Err(VidmarkError::Bounds {
                frame: frame.0,
                label: label.map(str::to_owned),
                axis,
                value,
                bound,
            });
        }
    }
    Ok(())
}

/// Saves to `path`, creating missing parent directories.
///
/// With `backup`, an existing file is first renamed to `path~`, replacing any older backup.
pub fn save_to_path(
    table: &AnnotationTable,
    path: &Path,
    header: Option<&Header>,
    options: &CodecOptions,
    backup: bool,
) -> VidmarkResult<()> {
    ensure_parent_dir(path)?;
    if backup {
        backup_existing(path)?;
    }

    let file = File::create(path)
        .map_err(|e| VidmarkError::io_at("create annotation file", path, e))?;
    save(table, BufWriter::new(file), header, options)
}

pub fn load_from_path(
    path: &Path,
    options: &CodecOptions,
) -> VidmarkResult<(AnnotationTable, Header)> {
    let file =
        File::open(path).map_err(|e| VidmarkError::io_at("open annotation file", path, e))?;
    load(BufReader::new(file), options)
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("~");
    PathBuf::from(name)
}

fn backup_existing(path: &Path) -> VidmarkResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let backup = backup_path(path);
    if backup.exists() {
        std::fs::remove_file(&backup)
            .map_err(|e| VidmarkError::io_at("remove old backup", &backup, e))?;
    }
    std::fs::rename(path, &backup)
        .map_err(|e| VidmarkError::io_at("back up annotation file", path, e))?;
    tracing::info!(backup = %backup.display(), "backed up existing annotation file");
    Ok(())
}

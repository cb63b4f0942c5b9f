use crate::{
    foundation::{
        core::{FrameIndex, Keypoint},
        error::{Axis, VidmarkError, VidmarkResult},
    },
    table::AnnotationTable,
};

/// Post-processing applied to a sparse table before it is saved or replayed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillAlgorithm {
    #[default]
    None,
    Interpolate,
    Expand,
}

impl FillAlgorithm {
    pub fn apply(self, table: AnnotationTable, length: u64) -> VidmarkResult<AnnotationTable> {
        match self {
            Self::None => Ok(table),
            Self::Interpolate => interpolate(table, length),
            Self::Expand => past_expand(table, length),
        }
    }
}

/// Fills every missing frame in `[0, length)` with the most recent preceding annotation.
///
/// Frame 0, when missing, borrows from the first annotated frame.
#[tracing::instrument(skip(table), fields(frames = table.len()))]
pub fn past_expand(mut table: AnnotationTable, length: u64) -> VidmarkResult<AnnotationTable> {
    check_fill_input(&table, length)?;
    seed_first_frame(&mut table)?;

    let mut held: Vec<Keypoint> = Vec::new();
    for f in 0..length {
        let frame = FrameIndex(f);
        match table.get(frame) {
            Some(row) => held = row.to_vec(),
            None => {
                table.insert(frame, held.clone())?;
            }
        }
    }
    Ok(table)
}

/// Linearly interpolates keypoints between consecutive annotated frames.
///
/// Missing first and last frames are seeded from the nearest annotation first, so the
/// result covers `[0, length)`. Interpolated coordinates are rounded half away from zero.
#[tracing::instrument(skip(table), fields(frames = table.len()))]
pub fn interpolate(mut table: AnnotationTable, length: u64) -> VidmarkResult<AnnotationTable> {
    check_fill_input(&table, length)?;
    seed_first_frame(&mut table)?;

    let final_frame = FrameIndex(length - 1);
    if let Some(last) = table.last_frame()
        && last != final_frame
    {
        tracing::info!(
            frame = final_frame.0,
            source = last.0,
            "last frame is not annotated, borrowing from last annotated frame"
        );
        let seed = row(&table, last)?;
        table.insert(final_frame, seed)?;
    }

    let keys: Vec<FrameIndex> = table.frames().collect();
    for pair in keys.windows(2) {
        let (low, high) = (pair[0], pair[1]);
        let diff = high.0 - low.0;
        if diff < 2 {
            continue;
        }

        let low_row = row(&table, low)?;
        let high_row = row(&table, high)?;
        if low_row.len() != high_row.len() {
            return Err(VidmarkError::ShapeMismatch {
                frame: high.0,
                expected: low_row.len(),
                found: high_row.len(),
            });
        }

        let deltas: Vec<(f64, f64)> = low_row
            .iter()
            .zip(&high_row)
            .map(|(lo, hi)| {
                // Differences of arbitrary i64 coordinates overflow i64.
                (
                    (hi.x as f64 - lo.x as f64) / diff as f64,
                    (hi.y as f64 - lo.y as f64) / diff as f64,
                )
            })
            .collect();

        for k in 1..diff {
            let step = k as f64;
            let filled = low_row
                .iter()
                .zip(&deltas)
                .map(|(lo, (dx, dy))| {
                    Keypoint::new(
                        (lo.x as f64 + dx * step).round() as i64,
                        (lo.y as f64 + dy * step).round() as i64,
                    )
                })
                .collect();
            table.insert(FrameIndex(low.0 + k), filled)?;
        }
    }
    Ok(table)
}

fn check_fill_input(table: &AnnotationTable, length: u64) -> VidmarkResult<()> {
    let Some(last) = table.last_frame() else {
        return Err(VidmarkError::empty_input(
            "cannot fill an annotation table without annotated frames",
        ));
    };
    if length == 0 {
        return Err(VidmarkError::validation("video length must be > 0"));
    }
    if last.0 >= length {
        return Err(VidmarkError::Bounds {
            frame: last.0,
            label: None,
            axis: Axis::Frame,
            value: i64::try_from(last.0).unwrap_or(i64::MAX),
            bound: length,
        });
    }
    Ok(())
}

fn seed_first_frame(table: &mut AnnotationTable) -> VidmarkResult<()> {
    let Some(first) = table.first_frame() else {
        return Ok(());
    };
    if first.0 != 0 {
        tracing::info!(
            source = first.0,
            "frame 0 is not annotated, borrowing from first annotated frame"
        );
        let seed = row(table, first)?;
        table.insert(FrameIndex(0), seed)?;
    }
    Ok(())
}

fn row(table: &AnnotationTable, frame: FrameIndex) -> VidmarkResult<Vec<Keypoint>> {
    table
        .get(frame)
        .map(<[Keypoint]>::to_vec)
        .ok_or_else(|| VidmarkError::Index {
            index: i64::try_from(frame.0).unwrap_or(i64::MAX),
            len: table.len() as u64,
        })
}

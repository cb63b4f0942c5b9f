use std::collections::BTreeMap;

use crate::foundation::{
    core::{FrameIndex, Keypoint},
    error::{VidmarkError, VidmarkResult},
};

/// Ordered keypoint labels, one per keypoint column of an [`AnnotationTable`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Header(pub Vec<String>);

impl Header {
    /// Labels `"0", "1", ... "k-1"`, used when a file carries no header line.
    pub fn synthesized(keypoints: usize) -> Self {
        Self((0..keypoints).map(|k| k.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Header {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Sparse or dense mapping from frame index to that frame's keypoints.
///
/// Every row holds the same number of keypoints. The arity is fixed by the first
/// inserted row and enforced by [`AnnotationTable::insert`], so no consumer has to
/// re-check row lengths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationTable {
    rows: BTreeMap<FrameIndex, Vec<Keypoint>>,
    arity: Option<usize>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) the keypoints of `frame`, returning the previous row.
    pub fn insert(
        &mut self,
        frame: FrameIndex,
        keypoints: Vec<Keypoint>,
    ) -> VidmarkResult<Option<Vec<Keypoint>>> {
        match self.arity {
            Some(expected) if expected != keypoints.len() => {
                return Err(VidmarkError::ShapeMismatch {
                    frame: frame.0,
                    expected,
                    found: keypoints.len(),
                });
            }
            Some(_) => {}
            None => self.arity = Some(keypoints.len()),
        }
        Ok(self.rows.insert(frame, keypoints))
    }

    pub fn get(&self, frame: FrameIndex) -> Option<&[Keypoint]> {
        self.rows.get(&frame).map(Vec::as_slice)
    }

    pub fn contains(&self, frame: FrameIndex) -> bool {
        self.rows.contains_key(&frame)
    }

    /// Drops the annotation of `frame`. The arity is kept even if the table empties.
    pub fn remove(&mut self, frame: FrameIndex) -> Option<Vec<Keypoint>> {
        self.rows.remove(&frame)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keypoints per frame, `None` until the first row is inserted.
    pub fn keypoint_count(&self) -> Option<usize> {
        self.arity
    }

    pub fn first_frame(&self) -> Option<FrameIndex> {
        self.rows.keys().next().copied()
    }

    pub fn last_frame(&self) -> Option<FrameIndex> {
        self.rows.keys().next_back().copied()
    }

    /// Annotated frame indices in ascending order.
    pub fn frames(&self) -> impl DoubleEndedIterator<Item = FrameIndex> + '_ {
        self.rows.keys().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (FrameIndex, &[Keypoint])> + '_ {
        self.rows.iter().map(|(f, kps)| (*f, kps.as_slice()))
    }

    /// The nearest annotated frame at or before `frame`.
    ///
    /// This is what an annotation view shows for a frame that has no annotation of
    /// its own ("previous state").
    pub fn at_or_before(&self, frame: FrameIndex) -> Option<(FrameIndex, &[Keypoint])> {
        self.rows
            .range(..=frame)
            .next_back()
            .map(|(f, kps)| (*f, kps.as_slice()))
    }

    /// True when every frame in `[0, length)` has an annotation.
    pub fn is_dense(&self, length: u64) -> bool {
        (0..length).all(|f| self.rows.contains_key(&FrameIndex(f)))
    }

    /// Copy with every coordinate multiplied by `zoom` and rounded half away from zero.
    ///
    /// Annotations edited on a zoomed view are saved with `scaled(1.0 / zoom)`.
    pub fn scaled(&self, zoom: f64) -> VidmarkResult<Self> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(VidmarkError::validation(format!(
                "zoom factor must be finite and > 0, got {zoom}"
            )));
        }
        let rows = self
            .rows
            .iter()
            .map(|(f, kps)| {
                let scaled = kps
                    .iter()
                    .map(|kp| {
                        Keypoint::new(
                            (kp.x as f64 * zoom).round() as i64,
                            (kp.y as f64 * zoom).round() as i64,
                        )
                    })
                    .collect();
                (*f, scaled)
            })
            .collect();
        Ok(Self {
            rows,
            arity: self.arity,
        })
    }
}

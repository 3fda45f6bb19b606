//! Contiguous edit sequence for one track.

use crate::edit::{Edit, EditSource};
use crate::{Direction, Error, Result};
use serde::{Deserialize, Serialize};

/// Ordered, gap-free edits covering a track from position 0.
///
/// Every edit starts exactly where the previous one ends; gaps are
/// represented by explicit silence edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Edits {
    edits: Vec<Edit>,
}

impl Edits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Edit] {
        &self.edits
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Edit> {
        self.edits.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Total covered length; the first position past the last edit.
    pub fn length(&self) -> i64 {
        self.edits.last().map(Edit::end_project).unwrap_or(0)
    }

    /// Append an edit, which must start exactly at the current end.
    pub fn push(&mut self, edit: Edit) -> Result<()> {
        let expected = self.length();
        if edit.startproject != expected {
            return Err(Error::EditNotContiguous {
                position: edit.startproject,
                expected,
            });
        }
        self.edits.push(edit);
        Ok(())
    }

    /// Append a source span at the current end.
    pub fn append(&mut self, startsource: i64, length: i64, source: EditSource) -> &mut Edit {
        let edit = Edit::new(self.length(), startsource, length, source);
        self.edits.push(edit);
        self.edits.last_mut().unwrap_or_else(|| unreachable!())
    }

    /// Extend the sequence with silence up to `position` if it ends short.
    pub fn pad_to(&mut self, position: i64) {
        let end = self.length();
        if position > end {
            self.edits.push(Edit::silence(end, position - end));
        }
    }

    /// The edit containing `position` for the given playback direction.
    ///
    /// Boundary positions belong to the edit being entered: forward playback
    /// claims `[startproject, end)`, reverse claims `(startproject, end]`.
    pub fn edit_of(&self, position: i64, direction: Direction) -> Option<&Edit> {
        match direction {
            Direction::Forward => {
                let i = self.edits.partition_point(|e| e.end_project() <= position);
                self.edits.get(i).filter(|e| e.startproject <= position)
            }
            Direction::Reverse => {
                let i = self.edits.partition_point(|e| e.end_project() < position);
                self.edits.get(i).filter(|e| e.startproject < position)
            }
        }
    }

    /// Index of the edit containing `position`, same boundary rules as
    /// [`Edits::edit_of`].
    pub fn index_of(&self, position: i64, direction: Direction) -> Option<usize> {
        match direction {
            Direction::Forward => {
                let i = self.edits.partition_point(|e| e.end_project() <= position);
                self.edits
                    .get(i)
                    .filter(|e| e.startproject <= position)
                    .map(|_| i)
            }
            Direction::Reverse => {
                let i = self.edits.partition_point(|e| e.end_project() < position);
                self.edits
                    .get(i)
                    .filter(|e| e.startproject < position)
                    .map(|_| i)
            }
        }
    }

    /// Remove `[start, end)` from the sequence, shifting later edits back.
    ///
    /// Edits straddling a boundary are trimmed; edits fully inside are
    /// dropped. Contiguity is preserved.
    pub fn clear(&mut self, start: i64, end: i64) {
        let length = end - start;
        if length <= 0 {
            return;
        }
        let mut result = Vec::with_capacity(self.edits.len());
        for mut edit in self.edits.drain(..) {
            let edit_start = edit.startproject;
            let edit_end = edit.end_project();
            if edit_end <= start {
                result.push(edit);
            } else if edit_start >= end {
                edit.startproject -= length;
                result.push(edit);
            } else {
                let head = (start - edit_start).max(0);
                let tail = (edit_end - end).max(0);
                if head > 0 {
                    let mut front = edit.clone();
                    front.length = head;
                    result.push(front);
                }
                if tail > 0 {
                    let back_source = edit.source_at(end);
                    edit.startproject = start;
                    edit.startsource = back_source;
                    edit.length = tail;
                    edit.transition = None;
                    result.push(edit);
                }
            }
        }
        self.edits = result;
    }

    /// Open a silent gap covering `[start, end)`, splitting the edit at
    /// `start` and shifting everything after it forward.
    pub fn insert_silence(&mut self, start: i64, end: i64) {
        let length = end - start;
        if length <= 0 {
            return;
        }
        if start >= self.length() {
            self.pad_to(end);
            return;
        }
        let mut result = Vec::with_capacity(self.edits.len() + 2);
        let mut inserted = false;
        for mut edit in self.edits.drain(..) {
            if edit.end_project() <= start {
                result.push(edit);
            } else if edit.startproject >= start {
                if !inserted {
                    result.push(Edit::silence(start, length));
                    inserted = true;
                }
                edit.startproject += length;
                result.push(edit);
            } else {
                let back_source = edit.source_at(start);
                let back_length = edit.end_project() - start;
                let source = edit.source.clone();
                edit.length = start - edit.startproject;
                result.push(edit);
                result.push(Edit::silence(start, length));
                inserted = true;
                result.push(Edit::new(start + length, back_source, back_length, source));
            }
        }
        self.edits = result;
    }

    /// Verify the gap-free invariant over the whole sequence.
    pub fn validate(&self) -> Result<()> {
        let mut expected = 0;
        for edit in &self.edits {
            if edit.startproject != expected {
                return Err(Error::EditNotContiguous {
                    position: edit.startproject,
                    expected,
                });
            }
            expected = edit.end_project();
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Edits {
    type Item = &'a Edit;
    type IntoIter = std::slice::Iter<'a, Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}

//! Cursor positions that track their character through concurrent edits.

use crate::operation::{OpComponent, TextOperation};
use crate::unicount::count_chars;

/// A cursor or selection: `position` is the active end, `selection_end` the anchor.
/// Either may be the larger one (selecting backwards is fine); a collapsed cursor
/// has both equal.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Cursor {
    pub position: usize,
    pub selection_end: usize,
}

impl Cursor {
    pub fn new(position: usize, selection_end: usize) -> Self {
        Cursor { position, selection_end }
    }

    pub fn collapsed(position: usize) -> Self {
        Cursor { position, selection_end: position }
    }

    pub fn is_collapsed(&self) -> bool {
        self.position == self.selection_end
    }

    /// Map this cursor through an operation so it still points at the same
    /// character afterwards. Inserts before the cursor shift it right, deletes
    /// spanning it clamp it to the start of the deleted range.
    pub fn transform(&self, op: &TextOperation) -> Cursor {
        let position = transform_index(self.position, op);
        let selection_end = if self.is_collapsed() {
            position
        } else {
            transform_index(self.selection_end, op)
        };
        Cursor { position, selection_end }
    }

    /// Composing two cursor updates keeps the later one.
    pub fn compose(self, other: Cursor) -> Cursor {
        other
    }
}

fn transform_index(index: usize, op: &TextOperation) -> usize {
    let mut index = index as isize;
    let mut new_index = index;
    for c in op.components() {
        match c {
            OpComponent::Retain(n, _) => index -= *n as isize,
            OpComponent::Insert(s, _) => new_index += count_chars(s) as isize,
            OpComponent::Delete(n) => {
                new_index -= index.min(*n as isize);
                index -= *n as isize;
            }
        }
        if index < 0 {
            break;
        }
    }
    new_index.max(0) as usize
}

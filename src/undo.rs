//! Undo/redo history that stays valid while remote edits land.
//!
//! The stacks hold *inverse* operations. When a remote operation arrives, every
//! entry is transformed through it (threading the remote op from the newest entry
//! down) so replaying an undo still touches the right characters.

use crate::error::OtError;
use crate::meta::WrappedOp;
use crate::operation::TextOperation;

const DEFAULT_MAX_ITEMS: usize = 50;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum UndoState {
    Normal,
    Undoing,
    Redoing,
}

#[derive(Debug)]
pub struct UndoManager {
    max_items: usize,
    undo_stack: Vec<WrappedOp>,
    redo_stack: Vec<WrappedOp>,
    state: UndoState,
    /// Set right after an undo or redo so the next edit starts a fresh entry
    /// instead of coalescing into the one that was just replayed.
    dont_compose: bool,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    pub fn new() -> Self {
        Self::with_max_items(DEFAULT_MAX_ITEMS)
    }

    /// `max_items` bounds the undo stack; pushing past it drops the oldest entry.
    pub fn with_max_items(max_items: usize) -> Self {
        UndoManager {
            max_items,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            state: UndoState::Normal,
            dont_compose: false,
        }
    }

    /// Record an undoable operation (the inverse of an edit).
    ///
    /// During an undo the recorded operation is the redo; during a redo it's the
    /// next undo. In normal operation a new edit clears the redo stack, and with
    /// `compose` set it coalesces into the newest undo entry when the two chain
    /// (this is what turns per-keystroke operations into word-level undo). An
    /// entry that can't merge with the top is pushed separately instead.
    pub fn add(&mut self, op: WrappedOp, compose: bool) -> Result<(), OtError> {
        match self.state {
            UndoState::Undoing => {
                self.redo_stack.push(op);
                self.dont_compose = true;
            }
            UndoState::Redoing => {
                self.undo_stack.push(op);
                self.dont_compose = true;
            }
            UndoState::Normal => {
                let coalesce = !self.dont_compose
                    && compose
                    && self.undo_stack.last().is_some_and(|last| op.op.can_merge_with(&last.op));
                if coalesce {
                    if let Some(last) = self.undo_stack.pop() {
                        match op.compose(&last) {
                            Ok(merged) => self.undo_stack.push(merged),
                            Err(err) => {
                                self.undo_stack.push(last);
                                return Err(err);
                            }
                        }
                    }
                } else {
                    self.undo_stack.push(op);
                    if self.undo_stack.len() > self.max_items {
                        self.undo_stack.remove(0);
                    }
                }
                self.dont_compose = false;
                self.redo_stack.clear();
            }
        }
        Ok(())
    }

    /// Rewrite both stacks so they apply cleanly after a remote operation.
    pub fn transform(&mut self, op: &TextOperation) -> Result<(), OtError> {
        transform_stack(&mut self.undo_stack, op.clone())?;
        transform_stack(&mut self.redo_stack, op.clone())?;
        Ok(())
    }

    pub fn last(&self) -> Option<&WrappedOp> {
        self.undo_stack.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_undoing(&self) -> bool {
        self.state == UndoState::Undoing
    }

    pub fn is_redoing(&self) -> bool {
        self.state == UndoState::Redoing
    }

    /// Pop the newest undo entry and hand it to `f` for application. `f` gets the
    /// manager back and is expected to re-enter [`UndoManager::add`] with the
    /// entry's inverse, which lands on the redo stack because of the mode flag.
    pub fn perform_undo<F>(&mut self, f: F) -> Result<(), OtError>
    where
        F: FnOnce(&mut Self, WrappedOp) -> Result<(), OtError>,
    {
        let Some(op) = self.undo_stack.pop() else {
            return Err(OtError::NothingToUndo);
        };
        self.state = UndoState::Undoing;
        let result = f(self, op);
        self.state = UndoState::Normal;
        result
    }

    /// The mirror image of [`UndoManager::perform_undo`].
    pub fn perform_redo<F>(&mut self, f: F) -> Result<(), OtError>
    where
        F: FnOnce(&mut Self, WrappedOp) -> Result<(), OtError>,
    {
        let Some(op) = self.redo_stack.pop() else {
            return Err(OtError::NothingToRedo);
        };
        self.state = UndoState::Redoing;
        let result = f(self, op);
        self.state = UndoState::Normal;
        result
    }

    /// Drop all history. Idempotent.
    pub fn dispose(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.state = UndoState::Normal;
        self.dont_compose = false;
    }
}

/// Transform every entry in the stack, newest first, threading the remote
/// operation through so older entries see it as rewritten by the newer ones.
/// Entries that collapse to noops are dropped.
fn transform_stack(stack: &mut Vec<WrappedOp>, mut op: TextOperation) -> Result<(), OtError> {
    let mut transformed = Vec::with_capacity(stack.len());
    for entry in stack.drain(..).rev() {
        let (entry, next_op) = entry.transform(&op)?;
        op = next_op;
        if !entry.op.is_noop() {
            transformed.push(entry);
        }
    }
    transformed.reverse();
    *stack = transformed;
    Ok(())
}

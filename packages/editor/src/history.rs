//! # History Stack
//!
//! Snapshot-based undo/redo, generic over the snapshot type.
//!
//! ## Design
//!
//! - `push` records the state *before* a change
//! - `undo(current)` returns the previous state and parks `current` for redo
//! - `redo(current)` is the mirror image
//! - A push equal to the top of the undo stack is ignored
//! - New pushes clear the redo stack
//!
//! The stack knows nothing about HTML; the engine supplies snapshots and
//! the equality used for duplicate suppression.
//!
//! ## Example
//!
//! ```rust
//! use berry_editor::History;
//!
//! let mut history = History::new();
//! history.push(1);
//! history.push(2);
//! assert_eq!(history.undo(3), Some(2));
//! assert_eq!(history.redo(2), Some(3));
//! ```

use std::fmt;

/// Equality predicate used to suppress duplicate snapshots
pub type SnapshotEq<T> = fn(&T, &T) -> bool;

/// Undo/redo stack over caller-supplied snapshots
pub struct History<T> {
    /// Past states (most recent last)
    undo_stack: Vec<T>,

    /// Undone states (most recent last)
    redo_stack: Vec<T>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    equals: SnapshotEq<T>,
}

impl<T: PartialEq> History<T> {
    /// Unlimited history using `PartialEq`
    pub fn new() -> Self {
        Self::with_max_levels(0)
    }

    /// History keeping at most `max_levels` undo states
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self::with_equality(max_levels, |a, b| a == b)
    }
}

impl<T> History<T> {
    /// History with a custom equality predicate
    pub fn with_equality(max_levels: usize, equals: SnapshotEq<T>) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            equals,
        }
    }

    /// Record a state. Ignored when it equals the most recent one.
    pub fn push(&mut self, state: T) -> bool {
        if let Some(top) = self.undo_stack.last() {
            if (self.equals)(top, &state) {
                return false;
            }
        }

        self.undo_stack.push(state);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
        true
    }

    /// Step back. `current` becomes the next redo state.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Step forward. `current` becomes the next undo state.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Most recent undo state
    pub fn peek_undo(&self) -> Option<&T> {
        self.undo_stack.last()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Forget everything (full document reload)
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl<T: PartialEq> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for History<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("undo_stack", &self.undo_stack)
            .field("redo_stack", &self.redo_stack)
            .field("max_levels", &self.max_levels)
            .finish()
    }
}

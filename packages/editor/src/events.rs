//! Host callbacks. Every callback fires synchronously inside the call that
//! caused it and defaults to doing nothing.

use crate::selection::SelectionRange;
use berry_sanitizer::SanitizeReport;

pub trait EditorEvents {
    /// Committed content changed
    fn on_change(&mut self, _html: &str) {}

    fn on_selection_change(&mut self, _selection: Option<SelectionRange>) {}

    fn on_focus(&mut self) {}

    fn on_blur(&mut self) {}

    /// The sanitizer had to remove something from the surface
    fn on_sanitized(&mut self, _report: &SanitizeReport) {}
}

/// Ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl EditorEvents for NoEvents {}

//! # Native Formatting
//!
//! The seam to a host's built-in formatting primitive (the legacy
//! `execCommand` family in browsers). The engine tries it first for simple
//! inline formats and checks the result before trusting it.
//!
//! ## Implementations
//!
//! - [`NoNativeFormatting`]: reports every command as unsupported, so the
//!   engine always synthesizes markup itself.
//! - [`LegacyExecCommand`]: headless emulation of the browser behaviour.
//!   It emits presentational markup (`<b>`, `<i>`, `<u>`, `<strike>`,
//!   `<font color>`), most of which the sanitizer strips, and can collapse
//!   the selection afterwards the way some browsers do.

use crate::format::{element_factory, wrap_range};
use crate::selection::DomPoint;
use crate::surface::Surface;
use berry_dom::{Dom, NodeId};
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NativeCommand {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    ForeColor,
    HiliteColor,
}

impl NativeCommand {
    /// Legacy command name
    pub fn as_str(self) -> &'static str {
        match self {
            NativeCommand::Bold => "bold",
            NativeCommand::Italic => "italic",
            NativeCommand::Underline => "underline",
            NativeCommand::StrikeThrough => "strikeThrough",
            NativeCommand::ForeColor => "foreColor",
            NativeCommand::HiliteColor => "hiliteColor",
        }
    }
}

/// A host formatting primitive. Returns `false` when the command is not
/// supported; `true` means "attempted", not "changed anything".
pub trait NativeFormatter {
    fn exec(&mut self, surface: &mut Surface, command: NativeCommand, value: Option<&str>) -> bool;
}

/// No native path: every command is unsupported
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNativeFormatting;

impl NativeFormatter for NoNativeFormatting {
    fn exec(&mut self, _surface: &mut Surface, _command: NativeCommand, _value: Option<&str>) -> bool {
        false
    }
}

/// Emulates the browser's legacy formatting commands
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyExecCommand {
    collapse_selection: bool,
}

impl LegacyExecCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse the selection to its end after each command
    pub fn collapsing_selection(mut self) -> Self {
        self.collapse_selection = true;
        self
    }
}

impl NativeFormatter for LegacyExecCommand {
    fn exec(&mut self, surface: &mut Surface, command: NativeCommand, value: Option<&str>) -> bool {
        let Some(selection) = surface.selection() else {
            return false;
        };
        // Browsers report success for a collapsed selection without
        // touching the tree.
        if selection.is_collapsed() {
            return true;
        }

        let mut make: Box<dyn FnMut(&mut Dom) -> NodeId> = match (command, value) {
            (NativeCommand::Bold, _) => Box::new(element_factory("b", None)),
            (NativeCommand::Italic, _) => Box::new(element_factory("i", None)),
            (NativeCommand::Underline, _) => Box::new(element_factory("u", None)),
            (NativeCommand::StrikeThrough, _) => Box::new(element_factory("strike", None)),
            (NativeCommand::ForeColor, Some(color)) => {
                let color = color.to_string();
                Box::new(move |dom: &mut Dom| dom.create_element_with_attrs("font", &[("color", color.as_str())]))
            }
            (NativeCommand::HiliteColor, Some(color)) => Box::new(element_factory(
                "span",
                Some(format!("background-color: {color}")),
            )),
            (NativeCommand::ForeColor | NativeCommand::HiliteColor, None) => return false,
        };

        let root = surface.root();
        let wrapped = match wrap_range(surface.dom_mut(), root, selection, &mut make) {
            Ok(wrapped) => wrapped,
            Err(e) => {
                trace!(error = %e, "legacy command failed");
                return false;
            }
        };
        trace!(command = command.as_str(), wrapped = wrapped.len(), "legacy command");

        // Splitting moved text out of the nodes the live range points into.
        surface.select(Some(selection));

        if self.collapse_selection {
            if let Some(last) = wrapped.last() {
                let index = surface.dom().index_in_parent(*last).unwrap_or(0);
                if let Some(parent) = surface.dom().parent(*last) {
                    surface.set_caret(DomPoint::new(parent, index + 1));
                }
            }
        }
        true
    }
}

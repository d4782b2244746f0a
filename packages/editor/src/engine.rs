//! # Editor Engine
//!
//! Owns the bound surface, the history stack and the selection memory, and
//! runs every command through the same protocol:
//!
//! 1. validate the payload
//! 2. focus the surface and bring back the remembered selection
//! 3. snapshot the committed html and the selection
//! 4. attempt the edit, native path first for inline marks
//! 5. sanitize and commit, recording history only on a real change
//! 6. report the selection
//!
//! ## Design
//!
//! The engine is a small state machine (`Idle` → `Executing` → `Idle`). A
//! command arriving while another one runs is refused. Failures never cross
//! the public edge: operations return `false` or `None` and log the reason.
//!
//! The committed html is cached and only changes through a commit, undo,
//! redo or load, so the "before" side of every comparison is already
//! sanitized and costs nothing to produce.
//!
//! ## Example
//!
//! ```rust
//! use berry_editor::{Editor, EditorCommand, EditorConfig, SelectionRange};
//!
//! let mut editor = Editor::new(EditorConfig::default());
//! editor.load_html("<p>Hello world</p>");
//! editor.set_selection(Some(SelectionRange::new(0, 5)));
//! assert!(editor.exec(&EditorCommand::Bold));
//! assert_eq!(editor.get_html(), "<p><strong>Hello</strong> world</p>");
//! ```

use crate::blocks::{line_height_value, selected_blocks, set_block_property, set_block_style, toggle_list};
use crate::commands::{Action, CommandTable, EditorCommand, InlineFormat};
use crate::config::EditorConfig;
use crate::edits::{delete_range, insert_fragment, insert_horizontal_rule, insert_table, insert_text, point_after};
use crate::emoji::{EmojiRegistry, EmojiSet};
use crate::errors::{EditorError, EditorResult};
use crate::events::{EditorEvents, NoEvents};
use crate::format::{
    caret_after, clear_highlight_at, clear_highlight_in_range, element_factory, highlight_ancestor,
    insert_link, link_range, unlink, wrap_range,
};
use crate::history::History;
use crate::ids::AttachmentIdGenerator;
use crate::images::{self, ImageAttachmentPatch, ImageAttachmentState};
use crate::native::{NativeCommand, NativeFormatter, NoNativeFormatting};
use crate::query::{format_state_at, FormatState};
use crate::selection::{offset_to_point, DomPoint, SelectionMemory, SelectionRange};
use crate::surface::Surface;
use crate::tables::{self, CellContext};
use berry_document::{attachment_html, parse_sanitized, Attachment, AttachmentKind, EditorDocument};
use berry_dom::{Dom, DomError, NodeId};
use berry_sanitizer::style_guards::WidthUnit;
use berry_sanitizer::{sanitize_uri, Sanitizer, UriContext, ATTACHMENT_ID_ATTR};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, instrument, warn};

/// Committed content plus the selection that went with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub html: String,
    pub selection: Option<SelectionRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Executing,
}

/// Stage of an image resize gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizePhase {
    /// Pointer moving: the surface follows, nothing is committed
    Drag,
    /// Pointer released: the width is committed as one history step
    Release,
}

/// A file the host wants to upload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentFile {
    pub filename: String,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default)]
    pub content_type: String,
    /// Local preview (usually a `blob:` URL) shown while uploading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// What an upload adapter reports on success
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttachmentResult {
    pub url: String,
    pub filename: Option<String>,
    pub filesize: Option<u64>,
    pub content_type: Option<String>,
    pub width: Option<f64>,
    pub height: Option<u32>,
    pub alt: Option<String>,
}

impl AttachmentResult {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Rich-text editor bound to one editing surface
pub struct Editor {
    config: EditorConfig,
    surface: Option<Surface>,
    history: History<Snapshot>,
    memory: SelectionMemory,
    /// Last committed (sanitized) html
    html: String,
    commands: CommandTable,
    sanitizer: Sanitizer,
    native: Box<dyn NativeFormatter>,
    events: Box<dyn EditorEvents>,
    emoji: Rc<EmojiSet>,
    ids: AttachmentIdGenerator,
    /// Upload outcomes whose placeholder was off the surface when they arrived
    settled: HashMap<String, Settled>,
    state: EngineState,
}

/// Final outcome of an upload, kept until its placeholder is back
#[derive(Debug, Clone)]
enum Settled {
    Resolved(AttachmentResult),
    Failed,
}

fn same_html(a: &Snapshot, b: &Snapshot) -> bool {
    a.html == b.html
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            surface: None,
            history: History::with_equality(config.history_limit, same_html),
            memory: SelectionMemory::new(),
            html: String::new(),
            commands: CommandTable::new(config.links_open_in_new_tab),
            sanitizer: Sanitizer::with_mode(config.sanitize_mode),
            native: Box::new(NoNativeFormatting),
            events: Box::new(NoEvents),
            emoji: Rc::new(EmojiSet::new(config.twemoji_base_url.as_deref())),
            ids: AttachmentIdGenerator::new(&config.instance),
            settled: HashMap::new(),
            state: EngineState::Idle,
            config,
        }
    }

    /// Use the host's native formatting commands
    pub fn with_native(mut self, native: impl NativeFormatter + 'static) -> Self {
        self.native = Box::new(native);
        self
    }

    pub fn with_events(mut self, events: impl EditorEvents + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    /// Share emoji data with other editors through `registry`
    pub fn with_emoji_registry(mut self, registry: &mut EmojiRegistry) -> Self {
        self.emoji = registry.set(self.config.twemoji_base_url.as_deref());
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_bound(&self) -> bool {
        self.surface.is_some()
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Direct access for host input (typing, pasting). Call
    /// [`sync_input`](Self::sync_input) afterwards to commit.
    pub fn surface_mut(&mut self) -> Option<&mut Surface> {
        self.surface.as_mut()
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Take over a surface. Its content is sanitized and becomes the
    /// committed state; history starts empty.
    pub fn bind(&mut self, mut surface: Surface) {
        let raw = surface.html();
        let (clean, report) = self.sanitizer.sanitize_with_report(&raw);
        if clean != raw {
            warn!(
                removed_tags = report.removed_tags.len(),
                removed_attributes = report.removed_attributes.len(),
                "bound surface needed sanitizing"
            );
            let selection = surface.selection();
            surface.set_html(&clean);
            surface.select(selection);
        }

        self.memory.clear();
        self.memory.observe(surface.selection());
        self.history.clear();
        self.settled.clear();
        self.html = clean;
        self.surface = Some(surface);
        debug!(instance = %self.config.instance, "surface bound");
    }

    /// Release the surface. The committed html stays readable.
    pub fn unbind(&mut self) -> Option<Surface> {
        self.memory.clear();
        self.surface.take()
    }

    /// Replace the content without history or callbacks
    pub fn load_html(&mut self, html: &str) {
        let clean = self.sanitizer.sanitize(html);
        self.surface.get_or_insert_with(Surface::new).set_html(&clean);
        self.html = clean;
        self.history.clear();
        self.memory.clear();
        self.settled.clear();
    }

    /// Replace the content. Returns whether it changed.
    #[instrument(skip(self, html), fields(len = html.len()))]
    pub fn set_html(&mut self, html: &str, add_to_history: bool) -> bool {
        if self.state == EngineState::Executing {
            warn!("set_html while a command is executing, ignored");
            return false;
        }
        let clean = self.sanitizer.sanitize(html);
        let before = self.snapshot();

        let surface = self.surface.get_or_insert_with(Surface::new);
        surface.set_html(&clean);
        surface.select(before.selection);
        let clean = self.settle_surface().unwrap_or(clean);

        if clean == self.html {
            return false;
        }
        self.html = clean;
        self.memory.forget_expanded();
        if add_to_history {
            self.history.push(before);
        }
        self.events.on_change(&self.html);
        true
    }

    /// Committed html
    pub fn get_html(&self) -> &str {
        &self.html
    }

    /// Structured model of the committed content
    pub fn document(&self) -> EditorDocument {
        parse_sanitized(&self.html)
    }

    /// Commit whatever the host changed on the surface directly
    pub fn sync_input(&mut self) -> bool {
        if self.state == EngineState::Executing || self.surface.is_none() {
            return false;
        }
        let before = Snapshot {
            html: self.html.clone(),
            selection: self.memory.last(),
        };
        self.state = EngineState::Executing;
        let changed = self.commit(before);
        self.state = EngineState::Idle;
        self.report_selection();
        changed
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Run a command. Returns whether the committed content changed.
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub fn exec(&mut self, command: &EditorCommand) -> bool {
        if self.state == EngineState::Executing {
            warn!("re-entrant command refused");
            return false;
        }
        let action = match self.commands.validate(command) {
            Ok(action) => action,
            Err(error) => {
                debug!(%error, "command rejected");
                return false;
            }
        };
        if self.surface.is_none() {
            debug!("no surface bound");
            return false;
        }

        self.state = EngineState::Executing;
        let selection = self.focus_for_command();
        let before = Snapshot {
            html: self.html.clone(),
            selection,
        };
        let result = self.attempt(&action, selection).map(|_| true);
        self.finish(before, result)
    }

    /// String dispatch, as used by hosts that speak JSON
    pub fn exec_named(&mut self, name: &str, payload: Option<Value>) -> bool {
        match EditorCommand::from_name(name, payload) {
            Ok(command) => self.exec(&command),
            Err(error) => {
                debug!(%error, name, "command rejected");
                false
            }
        }
    }

    fn attempt(&mut self, action: &Action, selection: Option<SelectionRange>) -> EditorResult<()> {
        match action {
            Action::Inline(format) => self.apply_inline(format, selection),
            Action::ClearHighlight => clear_highlight(self.bound()?),
            Action::LineHeight(value) => {
                let value = line_height_value(*value);
                with_blocks(self.bound()?, |dom, blocks| {
                    set_block_property(dom, blocks, "line-height", Some(value.as_str()))
                })
            }
            Action::BlockStyle(kind) => {
                with_blocks(self.bound()?, |dom, blocks| set_block_style(dom, blocks, *kind))
            }
            Action::List(list_type) => {
                with_blocks(self.bound()?, |dom, blocks| toggle_list(dom, blocks, *list_type))
            }
            Action::Align(align) => with_blocks(self.bound()?, |dom, blocks| {
                set_block_property(dom, blocks, "text-align", Some(align.as_str()))
            }),
            Action::Link {
                url,
                text,
                open_in_new_tab,
            } => apply_link(self.bound()?, url, text.as_deref(), *open_in_new_tab),
            Action::Unlink => {
                let surface = self.bound()?;
                let selection = surface.selection().ok_or(EditorError::NoSelection)?;
                let caret = surface.live_range().map(|r| r.focus);
                let root = surface.root();
                unlink(surface.dom_mut(), root, selection, caret)?;
                surface.select(Some(selection));
                Ok(())
            }
            Action::InsertText(text) => {
                let surface = self.bound()?;
                let root = surface.root();
                let point = insertion_point(surface)?;
                let caret = insert_text(surface.dom_mut(), root, point, text)?;
                surface.set_caret(caret);
                Ok(())
            }
            Action::InsertHtml(html) => {
                let clean = self.sanitizer.sanitize(html);
                let markup = self.rekey_attachments(&clean);
                insert_markup(self.bound()?, &markup)
            }
            Action::InsertHorizontalRule => {
                let surface = self.bound()?;
                let root = surface.root();
                let point = insertion_point(surface)?;
                let caret = insert_horizontal_rule(surface.dom_mut(), root, point)?;
                surface.set_caret(caret);
                Ok(())
            }
            Action::InsertTable { rows, cols } => {
                let surface = self.bound()?;
                let root = surface.root();
                let point = insertion_point(surface)?;
                let caret = insert_table(surface.dom_mut(), root, point, *rows, *cols)?;
                surface.set_caret(caret);
                Ok(())
            }
            Action::Table(op) => {
                let surface = self.bound()?;
                let focus = surface.live_range().ok_or(EditorError::NoSelection)?.focus;
                let ctx = CellContext::locate(surface.dom(), focus.node).ok_or(EditorError::NotInTable)?;
                let caret = tables::apply(surface.dom_mut(), ctx, *op)?;
                surface.set_caret(caret);
                Ok(())
            }
            Action::InsertEmoji(name) => match self.emoji.insertion_html(name) {
                Some(markup) => insert_markup(self.bound()?, &markup),
                None => {
                    debug!(shortcode = %name, "unknown emoji shortcode");
                    Ok(())
                }
            },
        }
    }

    fn bound(&mut self) -> EditorResult<&mut Surface> {
        self.surface.as_mut().ok_or(EditorError::Unbound)
    }

    fn apply_inline(&mut self, format: &InlineFormat, selection: Option<SelectionRange>) -> EditorResult<()> {
        if self.config.prefer_native_formatting && format.prefers_native() && self.try_native(format)? {
            if let InlineFormat::Highlight(_) = format {
                advance_past_highlight(self.bound()?, selection)?;
            }
            return Ok(());
        }
        self.inline_fallback(format, selection)
    }

    /// Run the native command. Returns `false` when the fallback must run:
    /// the command is unsupported, changed nothing, or changed nothing that
    /// survives sanitizing.
    fn try_native(&mut self, format: &InlineFormat) -> EditorResult<bool> {
        let (command, value) = match format {
            InlineFormat::Bold => (NativeCommand::Bold, None),
            InlineFormat::Italic => (NativeCommand::Italic, None),
            InlineFormat::Underline => (NativeCommand::Underline, None),
            InlineFormat::Strike => (NativeCommand::StrikeThrough, None),
            InlineFormat::TextColor(color) => (NativeCommand::ForeColor, Some(color.as_str())),
            InlineFormat::Highlight(color) => (NativeCommand::HiliteColor, Some(color.as_str())),
            _ => return Ok(false),
        };

        let surface = self.surface.as_mut().ok_or(EditorError::Unbound)?;
        let before = surface.html();
        let selection = surface.selection();

        if !self.native.exec(surface, command, value) {
            debug!(command = command.as_str(), "native command unsupported");
            return Ok(false);
        }

        let after = surface.html();
        if after != before && self.sanitizer.sanitize(&after) != self.sanitizer.sanitize(&before) {
            return Ok(true);
        }

        warn!(command = command.as_str(), "native command had no lasting effect, falling back");
        if after != before {
            surface.set_html(&before);
        }
        surface.select(selection);
        Ok(false)
    }

    fn inline_fallback(&mut self, format: &InlineFormat, selection: Option<SelectionRange>) -> EditorResult<()> {
        let surface = self.surface.as_mut().ok_or(EditorError::Unbound)?;
        let live = surface.selection().filter(|s| !s.is_collapsed());
        // The native attempt may have collapsed the selection.
        let recovered = selection
            .filter(|s| !s.is_collapsed())
            .and(self.memory.last_expanded());
        let Some(range) = live.or(recovered) else {
            debug!("collapsed selection, nothing to wrap");
            return Ok(());
        };

        let root = surface.root();
        let wrappers = wrap_range(surface.dom_mut(), root, range, element_factory(format.tag(), format.style()))?;
        surface.select(Some(range));

        if let (InlineFormat::Highlight(_), Some(last)) = (format, wrappers.last()) {
            let caret = caret_after(surface.dom_mut(), *last)?;
            surface.set_caret(caret);
        }
        Ok(())
    }

    /// Give the surface focus and a selection to act on
    fn focus_for_command(&mut self) -> Option<SelectionRange> {
        let surface = self.surface.as_mut()?;
        let live = if surface.is_focused() {
            surface.selection()
        } else {
            None
        };
        let selection = live
            .or_else(|| {
                let remembered = self.memory.last()?;
                surface.select(Some(remembered)).then_some(remembered)
            })
            .or_else(|| surface.selection());

        if !surface.is_focused() {
            surface.set_focused(true);
            self.events.on_focus();
        }
        self.memory.observe(selection);
        selection
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            html: self.html.clone(),
            selection: self.get_selection().or(self.memory.last()),
        }
    }

    /// Start a non-command edit. `None` when the engine is busy or unbound.
    fn begin(&mut self) -> Option<Snapshot> {
        if self.state == EngineState::Executing {
            warn!("edit refused while a command is executing");
            return None;
        }
        self.surface.as_ref()?;
        self.state = EngineState::Executing;
        Some(self.snapshot())
    }

    /// End an edit: commit on success, roll the surface back on failure
    fn finish(&mut self, before: Snapshot, result: EditorResult<bool>) -> bool {
        let changed = match result {
            Ok(true) => self.commit(before),
            Ok(false) => false,
            Err(error) => {
                debug!(%error, "edit failed, surface restored");
                if let Some(surface) = self.surface.as_mut() {
                    surface.set_html(&before.html);
                    surface.select(before.selection);
                }
                false
            }
        };
        self.state = EngineState::Idle;
        self.report_selection();
        changed
    }

    /// Sanitize the surface and record the change, if any
    fn commit(&mut self, before: Snapshot) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let raw = surface.html();
        let (clean, report) = self.sanitizer.sanitize_with_report(&raw);

        if clean != raw {
            let selection = surface.selection();
            surface.set_html(&clean);
            surface.select(selection);
            if !report.is_clean() {
                warn!(
                    removed_tags = report.removed_tags.len(),
                    removed_attributes = report.removed_attributes.len(),
                    removed_styles = report.removed_styles.len(),
                    "sanitizer rewrote the surface"
                );
                self.events.on_sanitized(&report);
            }
        }

        let changed = clean != before.html;
        self.html = clean;
        if changed {
            self.memory.forget_expanded();
            self.history.push(before);
            self.events.on_change(&self.html);
        }
        changed
    }

    fn report_selection(&mut self) {
        let selection = self.get_selection();
        self.memory.observe(selection);
        self.events.on_selection_change(selection);
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        if self.state == EngineState::Executing {
            return false;
        }
        let current = self.snapshot();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.state == EngineState::Executing {
            return false;
        }
        let current = self.snapshot();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_levels(&self) -> usize {
        self.history.undo_levels()
    }

    /// Snapshots were sanitized when committed, so they go straight back
    fn restore(&mut self, snapshot: Snapshot) {
        if let Some(surface) = self.surface.as_mut() {
            surface.set_html(&snapshot.html);
            surface.select(snapshot.selection);
        }
        self.html = snapshot.html;
        if let Some(settled) = self.settle_surface() {
            self.html = settled;
        }
        self.memory.forget_expanded();
        self.events.on_change(&self.html);
        self.report_selection();
    }

    // ------------------------------------------------------------------
    // Selection and focus
    // ------------------------------------------------------------------

    pub fn get_selection(&self) -> Option<SelectionRange> {
        self.surface.as_ref().and_then(Surface::selection)
    }

    /// Select by offsets. Out-of-bounds offsets clear the selection and
    /// return `false`.
    pub fn set_selection(&mut self, selection: Option<SelectionRange>) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let applied = surface.select(selection);
        self.report_selection();
        applied
    }

    /// The host moved the live range itself
    pub fn notify_selection_change(&mut self) {
        self.report_selection();
    }

    pub fn is_focused(&self) -> bool {
        self.surface.as_ref().is_some_and(Surface::is_focused)
    }

    pub fn focus(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if surface.is_focused() {
            return;
        }
        surface.set_focused(true);
        if surface.live_range().is_none() {
            surface.select(self.memory.last());
        }
        self.events.on_focus();
    }

    pub fn blur(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if !surface.is_focused() {
            return;
        }
        self.memory.observe(surface.selection());
        surface.set_focused(false);
        self.events.on_blur();
    }

    /// Formatting active at the caret (or the remembered selection)
    pub fn query_state(&self) -> FormatState {
        let mut state = self
            .surface
            .as_ref()
            .and_then(|surface| {
                let root = surface.root();
                let point = match surface.live_range() {
                    Some(range) => range.focus,
                    None => offset_to_point(surface.dom(), root, self.memory.last()?.focus)?,
                };
                Some(format_state_at(surface.dom(), root, point))
            })
            .unwrap_or_default();
        state.can_undo = self.can_undo();
        state.can_redo = self.can_redo();
        state
    }

    // ------------------------------------------------------------------
    // Attachments
    // ------------------------------------------------------------------

    /// Insert a pending placeholder for `file` at the caret (or at the end
    /// of the document). Returns its id.
    pub fn insert_attachment_placeholder(&mut self, file: &AttachmentFile) -> Option<String> {
        self.insert_placeholder(file, None)
    }

    /// Insert placeholders for a batch, keeping file order
    pub fn insert_attachment_placeholders(&mut self, files: &[AttachmentFile]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(files.len());
        for file in files {
            let id = self.insert_placeholder(file, ids.last().map(String::as_str));
            ids.extend(id);
        }
        ids
    }

    #[instrument(skip(self, file), fields(filename = %file.filename))]
    fn insert_placeholder(&mut self, file: &AttachmentFile, after: Option<&str>) -> Option<String> {
        let before = self.begin()?;
        let id = self.unused_attachment_id();
        let attachment = Attachment {
            id: id.clone(),
            kind: Attachment::kind_for(&file.content_type),
            filename: file.filename.clone(),
            filesize: file.filesize,
            content_type: file.content_type.clone(),
            preview_url: file.preview_url.clone(),
            pending: true,
            progress: Some(0),
            ..Attachment::default()
        };
        let markup = attachment_html(&attachment);

        let result = self.bound().and_then(|surface| {
            let root = surface.root();
            let point = match after.and_then(|a| images::find_attachment(surface.dom(), root, a)) {
                Some(previous) => point_after(surface.dom(), previous).ok_or(EditorError::NoSelection)?,
                None => caret_point(surface),
            };
            if let Some(caret) = insert_fragment(surface.dom_mut(), root, point, &markup)? {
                surface.set_caret(caret);
            }
            Ok(true)
        });

        self.finish(before, result).then_some(id)
    }

    fn unused_attachment_id(&mut self) -> String {
        loop {
            let id = self.ids.next_id();
            let taken = self
                .surface
                .as_ref()
                .is_some_and(|s| images::find_attachment(s.dom(), s.root(), &id).is_some());
            if !taken {
                return id;
            }
        }
    }

    /// Give pasted attachments fresh ids where theirs are already on the
    /// surface or repeat within the markup. Elements nested inside an
    /// attachment with the same id follow their outer element.
    fn rekey_attachments(&mut self, html: &str) -> String {
        let mut fragment = Dom::parse(html);
        let root = fragment.root();
        let keyed: Vec<NodeId> = fragment
            .descendants(root)
            .into_iter()
            .filter(|n| fragment.attr(*n, ATTACHMENT_ID_ATTR).is_some())
            .collect();
        if keyed.is_empty() {
            return html.to_string();
        }

        let pasted: HashSet<String> = keyed
            .iter()
            .filter_map(|n| fragment.attr(*n, ATTACHMENT_ID_ATTR))
            .map(str::to_string)
            .collect();
        let mut used: HashSet<String> = HashSet::new();
        let mut assigned: HashMap<NodeId, (String, String)> = HashMap::new();

        for node in keyed {
            let Some(original) = fragment.attr(node, ATTACHMENT_ID_ATTR).map(str::to_string) else {
                continue;
            };
            let outer = fragment
                .ancestors(node)
                .find_map(|a| assigned.get(&a).filter(|(from, _)| *from == original))
                .map(|(_, to)| to.clone());

            let id = match outer {
                Some(id) => id,
                None => {
                    let on_surface = self
                        .surface
                        .as_ref()
                        .is_some_and(|s| images::find_attachment(s.dom(), s.root(), &original).is_some());
                    if on_surface || used.contains(&original) {
                        let mut fresh = self.unused_attachment_id();
                        while pasted.contains(&fresh) || used.contains(&fresh) {
                            fresh = self.unused_attachment_id();
                        }
                        debug!(from = %original, to = %fresh, "pasted attachment re-keyed");
                        fresh
                    } else {
                        original.clone()
                    }
                }
            };
            used.insert(id.clone());
            if id != original {
                fragment.set_attr(node, ATTACHMENT_ID_ATTR, id.clone());
            }
            assigned.insert(node, (original, id));
        }
        fragment.to_html()
    }

    /// Update upload progress. Not recorded in history and fires no
    /// callbacks.
    pub fn set_attachment_progress(&mut self, id: &str, percent: u8) -> bool {
        if self.state == EngineState::Executing {
            return false;
        }
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let root = surface.root();
        let Some(element) = images::find_attachment(surface.dom(), root, id) else {
            return false;
        };
        if surface.dom().attr(element, "data-berry-pending") != Some("true") {
            return false;
        }
        surface
            .dom_mut()
            .set_attr(element, "data-berry-progress", percent.min(100).to_string());

        let raw = surface.html();
        let clean = self.sanitizer.sanitize(&raw);
        if clean != raw {
            let selection = surface.selection();
            surface.set_html(&clean);
            surface.select(selection);
        }
        self.html = clean;
        true
    }

    /// Turn a placeholder into the uploaded attachment
    #[instrument(skip(self, result))]
    pub fn resolve_attachment(&mut self, id: &str, result: &AttachmentResult) -> bool {
        let kind = self
            .surface
            .as_ref()
            .and_then(|s| images::read_attachment(s.dom(), s.root(), id))
            .map(|(_, attachment)| attachment.kind);
        let Some(kind) = kind else {
            debug!("placeholder not on the surface, keeping the result");
            self.settled.insert(id.to_string(), Settled::Resolved(result.clone()));
            return false;
        };
        let context = match kind {
            AttachmentKind::Image => UriContext::Image,
            AttachmentKind::File => UriContext::Link,
        };
        let Some(url) = sanitize_uri(&result.url, context) else {
            warn!("upload returned an unsafe url, marking the attachment failed");
            self.fail_attachment(id);
            return false;
        };

        self.rewrite_attachment(id, |attachment| {
            apply_upload_result(attachment, url, result);
            Ok(())
        })
    }

    /// Mark a placeholder as failed
    pub fn fail_attachment(&mut self, id: &str) -> bool {
        let present = self
            .surface
            .as_ref()
            .is_some_and(|s| images::find_attachment(s.dom(), s.root(), id).is_some());
        if !present {
            debug!(id, "placeholder not on the surface, keeping the failure");
            self.settled.insert(id.to_string(), Settled::Failed);
            return false;
        }
        self.rewrite_attachment(id, |attachment| {
            mark_failed(attachment);
            Ok(())
        })
    }

    /// Apply kept upload outcomes to placeholders that are back on the
    /// surface and still pending. Not recorded in history. Returns the new
    /// sanitized html when anything changed.
    fn settle_surface(&mut self) -> Option<String> {
        if self.settled.is_empty() {
            return None;
        }
        let surface = self.surface.as_mut()?;
        let root = surface.root();
        let selection = surface.selection();
        let mut changed = false;

        for (id, outcome) in &self.settled {
            let Some((outer, mut attachment)) = images::read_attachment(surface.dom(), root, id) else {
                continue;
            };
            if !attachment.pending {
                continue;
            }
            match outcome {
                Settled::Resolved(result) => {
                    let context = if attachment.is_image() {
                        UriContext::Image
                    } else {
                        UriContext::Link
                    };
                    match sanitize_uri(&result.url, context) {
                        Some(url) => apply_upload_result(&mut attachment, url, result),
                        None => mark_failed(&mut attachment),
                    }
                }
                Settled::Failed => mark_failed(&mut attachment),
            }
            match images::write_attachment(surface.dom_mut(), outer, &attachment) {
                Ok(_) => {
                    debug!(%id, "kept upload outcome applied");
                    changed = true;
                }
                Err(error) => debug!(%id, %error, "kept upload outcome not applied"),
            }
        }
        if !changed {
            return None;
        }

        let clean = self.sanitizer.sanitize(&surface.html());
        surface.set_html(&clean);
        surface.select(selection);
        Some(clean)
    }

    pub fn remove_attachment(&mut self, id: &str) -> bool {
        let Some(before) = self.begin() else {
            return false;
        };
        let result = self.bound().map(|surface| {
            let selection = surface.selection();
            let root = surface.root();
            let removed = images::remove_attachment(surface.dom_mut(), root, id);
            surface.select(selection);
            removed
        });
        self.finish(before, result)
    }

    pub fn get_image_attachment_state(&self, id: &str) -> Option<ImageAttachmentState> {
        let surface = self.surface.as_ref()?;
        let (_, attachment) = images::read_attachment(surface.dom(), surface.root(), id)?;
        attachment
            .is_image()
            .then(|| ImageAttachmentState::from(&attachment))
    }

    /// Apply a validated patch. Returns `false` (and changes nothing) when
    /// any field is out of range.
    #[instrument(skip(self, patch))]
    pub fn update_image_attachment(&mut self, id: &str, patch: &ImageAttachmentPatch) -> bool {
        let mut accepted = false;
        self.rewrite_attachment(id, |attachment| {
            if !attachment.is_image() {
                return Err(EditorError::NotAnImage(attachment.id.clone()));
            }
            images::apply_patch(attachment, patch)?;
            accepted = true;
            Ok(())
        });
        accepted
    }

    /// Resize during a drag gesture. Widths are clamped into range rather
    /// than rejected. Returns the width applied.
    pub fn resize_image_attachment(
        &mut self,
        id: &str,
        width: f64,
        unit: WidthUnit,
        phase: ResizePhase,
    ) -> Option<f64> {
        let mut applied = None;
        match phase {
            ResizePhase::Drag => {
                if self.state == EngineState::Executing {
                    return None;
                }
                let surface = self.surface.as_mut()?;
                let root = surface.root();
                let (outer, mut attachment) = images::read_attachment(surface.dom(), root, id)?;
                if !attachment.is_image() {
                    return None;
                }
                applied = images::resize(&mut attachment, width, unit);
                applied?;
                let selection = surface.selection();
                if let Err(error) = images::write_attachment(surface.dom_mut(), outer, &attachment) {
                    debug!(%error, "resize preview failed");
                    return None;
                }
                surface.select(selection);
            }
            ResizePhase::Release => {
                self.rewrite_attachment(id, |attachment| {
                    if !attachment.is_image() {
                        return Err(EditorError::NotAnImage(attachment.id.clone()));
                    }
                    applied = images::resize(attachment, width, unit);
                    Ok(())
                });
            }
        }
        applied
    }

    /// Read attachment `id`, let `edit` change it and write it back as one
    /// committed edit
    fn rewrite_attachment<F>(&mut self, id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut Attachment) -> EditorResult<()>,
    {
        let Some(before) = self.begin() else {
            return false;
        };
        let result = self.bound().and_then(|surface| {
            let root = surface.root();
            let (outer, mut attachment) = images::read_attachment(surface.dom(), root, id)
                .ok_or_else(|| EditorError::AttachmentNotFound(id.to_string()))?;
            edit(&mut attachment)?;

            let selection = surface.selection();
            images::write_attachment(surface.dom_mut(), outer, &attachment)?;
            surface.select(selection);
            Ok(true)
        });
        self.finish(before, result)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("instance", &self.config.instance)
            .field("state", &self.state)
            .field("bound", &self.surface.is_some())
            .field("history", &self.history)
            .finish()
    }
}

fn apply_upload_result(attachment: &mut Attachment, url: String, result: &AttachmentResult) {
    attachment.url = url;
    if let Some(filename) = &result.filename {
        attachment.filename = filename.clone();
    }
    if let Some(filesize) = result.filesize {
        attachment.filesize = filesize;
    }
    if let Some(content_type) = &result.content_type {
        attachment.content_type = content_type.clone();
        attachment.kind = Attachment::kind_for(content_type);
    }
    if let Some(width) = result.width {
        images::resize(attachment, width, WidthUnit::Px);
    }
    attachment.height = result.height.or(attachment.height);
    attachment.alt = result.alt.clone().or(attachment.alt.take());
    attachment.preview_url = None;
    attachment.pending = false;
    attachment.failed = false;
    attachment.progress = None;
}

fn mark_failed(attachment: &mut Attachment) {
    attachment.pending = false;
    attachment.failed = true;
    attachment.progress = None;
}

/// Where attachments go: the end of the selection, or the end of the
/// document without one
fn caret_point(surface: &Surface) -> DomPoint {
    let root = surface.root();
    surface
        .selection()
        .and_then(|s| offset_to_point(surface.dom(), root, s.end()))
        .unwrap_or_else(|| DomPoint::new(root, surface.dom().children(root).len()))
}

/// Where an insertion goes. An expanded selection is deleted first.
fn insertion_point(surface: &mut Surface) -> EditorResult<DomPoint> {
    let root = surface.root();
    let selection = surface.selection().ok_or(EditorError::NoSelection)?;
    if !selection.is_collapsed() {
        delete_range(surface.dom_mut(), root, selection)?;
        surface.select(Some(SelectionRange::caret(selection.start())));
    }
    surface
        .live_range()
        .map(|range| range.focus)
        .ok_or(EditorError::NoSelection)
}

fn insert_markup(surface: &mut Surface, markup: &str) -> EditorResult<()> {
    let root = surface.root();
    let point = insertion_point(surface)?;
    if let Some(caret) = insert_fragment(surface.dom_mut(), root, point, markup)? {
        surface.set_caret(caret);
    }
    Ok(())
}

fn with_blocks<F>(surface: &mut Surface, edit: F) -> EditorResult<()>
where
    F: FnOnce(&mut Dom, &[NodeId]) -> Result<bool, DomError>,
{
    let range = surface.live_range().ok_or(EditorError::NoSelection)?;
    let selection = surface.selection();
    let root = surface.root();
    let blocks = selected_blocks(surface.dom_mut(), root, &range)?;
    edit(surface.dom_mut(), &blocks)?;
    surface.select(selection);
    Ok(())
}

fn apply_link(surface: &mut Surface, url: &str, text: Option<&str>, open_in_new_tab: bool) -> EditorResult<()> {
    let root = surface.root();
    match text {
        Some(text) => {
            let point = insertion_point(surface)?;
            let anchor = insert_link(surface.dom_mut(), point, url, text, open_in_new_tab)?;
            if let Some(caret) = point_after(surface.dom(), anchor) {
                surface.set_caret(caret);
            }
        }
        None => {
            let selection = surface.selection().ok_or(EditorError::NoSelection)?;
            if selection.is_collapsed() {
                return Err(EditorError::CollapsedSelection);
            }
            link_range(surface.dom_mut(), root, selection, url, open_in_new_tab)?;
            surface.select(Some(selection));
        }
    }
    Ok(())
}

fn clear_highlight(surface: &mut Surface) -> EditorResult<()> {
    let root = surface.root();
    let selection = surface.selection().ok_or(EditorError::NoSelection)?;

    if selection.is_collapsed() {
        let point = surface.live_range().ok_or(EditorError::NoSelection)?.focus;
        let offset = clear_highlight_at(surface.dom_mut(), root, point)?;
        surface.select(Some(offset.map(SelectionRange::caret).unwrap_or(selection)));
    } else {
        clear_highlight_in_range(surface.dom_mut(), root, selection)?;
        surface.select(Some(selection));
    }
    Ok(())
}

/// Move the caret past the highlight the native path just applied, so
/// typing continues unhighlighted
fn advance_past_highlight(surface: &mut Surface, selection: Option<SelectionRange>) -> EditorResult<()> {
    let Some(end) = selection.map(|s| s.end()).filter(|end| *end > 0) else {
        return Ok(());
    };
    let root = surface.root();
    let Some(point) = offset_to_point(surface.dom(), root, end) else {
        return Ok(());
    };
    if let Some(highlight) = highlight_ancestor(surface.dom(), root, point.node) {
        let caret = caret_after(surface.dom_mut(), highlight)?;
        surface.set_caret(caret);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::LegacyExecCommand;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorded {
        changes: Vec<String>,
        sanitized: usize,
        focused: usize,
    }

    struct Recorder(Rc<RefCell<Recorded>>);

    impl EditorEvents for Recorder {
        fn on_change(&mut self, html: &str) {
            self.0.borrow_mut().changes.push(html.to_string());
        }

        fn on_focus(&mut self) {
            self.0.borrow_mut().focused += 1;
        }

        fn on_sanitized(&mut self, _report: &berry_sanitizer::SanitizeReport) {
            self.0.borrow_mut().sanitized += 1;
        }
    }

    fn editor_with(html: &str) -> Editor {
        let mut editor = Editor::default();
        editor.load_html(html);
        editor
    }

    fn recording(html: &str) -> (Editor, Rc<RefCell<Recorded>>) {
        let log = Rc::new(RefCell::new(Recorded::default()));
        let mut editor = Editor::default().with_events(Recorder(log.clone()));
        editor.load_html(html);
        (editor, log)
    }

    #[test]
    fn test_bold_fallback() {
        let mut editor = editor_with("<p>Hello world</p>");
        editor.set_selection(Some(SelectionRange::new(0, 5)));
        assert!(editor.exec(&EditorCommand::Bold));
        assert_eq!(editor.get_html(), "<p><strong>Hello</strong> world</p>");
        assert_eq!(editor.get_selection(), Some(SelectionRange::new(0, 5)));
    }

    #[test]
    fn test_collapsed_selection_changes_nothing() {
        let (mut editor, log) = recording("<p>Hello</p>");
        editor.set_selection(Some(SelectionRange::caret(2)));
        assert!(!editor.exec(&EditorCommand::Italic));
        assert!(!editor.can_undo());
        assert!(log.borrow().changes.is_empty());
    }

    #[test]
    fn test_invalid_payload_is_a_no_op() {
        let mut editor = editor_with("<p>Hello</p>");
        editor.set_selection(Some(SelectionRange::new(0, 5)));
        assert!(!editor.exec(&EditorCommand::TextColor("red".into())));
        assert!(!editor.exec_named("fontSize", Some(serde_json::json!(97))));
        assert!(!editor.exec_named("explode", None));
        assert_eq!(editor.get_html(), "<p>Hello</p>");
    }

    #[test]
    fn test_native_bold_is_kept() {
        let mut editor = Editor::default().with_native(LegacyExecCommand::new());
        editor.load_html("<p>Hello world</p>");
        editor.set_selection(Some(SelectionRange::new(0, 5)));
        assert!(editor.exec(&EditorCommand::Bold));
        assert_eq!(editor.get_html(), "<p><b>Hello</b> world</p>");
    }

    #[test]
    fn test_native_strike_falls_back() {
        let mut editor = Editor::default().with_native(LegacyExecCommand::new());
        editor.load_html("<p>Hello world</p>");
        editor.set_selection(Some(SelectionRange::new(6, 11)));
        assert!(editor.exec(&EditorCommand::Strike));
        assert_eq!(editor.get_html(), "<p>Hello <s>world</s></p>");
    }

    #[test]
    fn test_native_font_color_falls_back_to_span() {
        let mut editor = Editor::default().with_native(LegacyExecCommand::new().collapsing_selection());
        editor.load_html("<p>Hello world</p>");
        editor.set_selection(Some(SelectionRange::new(0, 5)));
        assert!(editor.exec(&EditorCommand::TextColor("#ff0000".into())));
        assert_eq!(
            editor.get_html(),
            "<p><span style=\"color: #ff0000\">Hello</span> world</p>"
        );
    }

    #[test]
    fn test_highlight_moves_caret_past_spacer() {
        let mut editor = editor_with("<p>Hi</p>");
        editor.set_selection(Some(SelectionRange::new(0, 2)));
        assert!(editor.exec(&EditorCommand::HighlightColor("#ffff00".into())));
        assert_eq!(
            editor.get_html(),
            "<p><span style=\"background-color: #ffff00\">Hi</span>\u{200B}</p>"
        );
        assert_eq!(editor.get_selection(), Some(SelectionRange::caret(3)));
    }

    #[test]
    fn test_clear_highlight_at_caret() {
        let mut editor = editor_with("<p>a<span style=\"background-color: #ffff00\">bcd</span>e</p>");
        editor.set_selection(Some(SelectionRange::caret(2)));
        assert!(editor.exec(&EditorCommand::ClearHighlight));
        assert_eq!(editor.get_html(), "<p>abcde</p>");
        assert_eq!(editor.get_selection(), Some(SelectionRange::caret(2)));
    }

    #[test]
    fn test_heading_and_alignment() {
        let mut editor = editor_with("<p>Title</p><p>Body</p>");
        editor.set_selection(Some(SelectionRange::caret(1)));
        assert!(editor.exec(&EditorCommand::BlockStyle("heading1".into())));
        assert!(editor.exec(&EditorCommand::Align("center".into())));
        assert_eq!(
            editor.get_html(),
            "<h1 style=\"text-align: center\">Title</h1><p>Body</p>"
        );
        assert!(!editor.exec(&EditorCommand::Align("center".into())));
    }

    #[test]
    fn test_link_with_text_inserts_at_caret() {
        let mut editor = editor_with("<p>see </p>");
        editor.set_selection(Some(SelectionRange::caret(4)));
        let command = EditorCommand::from_name(
            "link",
            Some(serde_json::json!({"url": "https://x.io", "text": "here"})),
        )
        .unwrap();
        assert!(editor.exec(&command));
        assert_eq!(editor.get_html(), "<p>see <a href=\"https://x.io\">here</a></p>");
    }

    #[test]
    fn test_link_needs_expanded_selection() {
        let mut editor = editor_with("<p>see</p>");
        editor.set_selection(Some(SelectionRange::caret(1)));
        let command = EditorCommand::from_name("link", Some(serde_json::json!({"url": "https://x.io"}))).unwrap();
        assert!(!editor.exec(&command));
    }

    #[test]
    fn test_table_delete_last_row() {
        let mut editor = editor_with("<table><tbody><tr><td>only</td></tr></tbody></table>");
        editor.set_selection(Some(SelectionRange::caret(1)));
        assert!(editor.exec(&EditorCommand::TableDeleteRow));
        assert_eq!(editor.get_html(), "<p></p>");
        assert_eq!(editor.get_selection(), Some(SelectionRange::caret(0)));
    }

    #[test]
    fn test_table_command_outside_table() {
        let mut editor = editor_with("<p>x</p>");
        editor.set_selection(Some(SelectionRange::caret(1)));
        assert!(!editor.exec(&EditorCommand::TableAddRowAfter));
        assert_eq!(editor.get_html(), "<p>x</p>");
    }

    #[test]
    fn test_insert_text_replaces_selection() {
        let mut editor = editor_with("<p>Hello world</p>");
        editor.set_selection(Some(SelectionRange::new(6, 11)));
        assert!(editor.exec(&EditorCommand::InsertText("there".into())));
        assert_eq!(editor.get_html(), "<p>Hello there</p>");
        assert_eq!(editor.get_selection(), Some(SelectionRange::caret(11)));
    }

    #[test]
    fn test_insert_html_is_sanitized() {
        let mut editor = editor_with("<p>ab</p>");
        editor.set_selection(Some(SelectionRange::caret(1)));
        assert!(editor.exec(&EditorCommand::InsertHtml("<b onclick=\"x()\">X</b><script>bad()</script>".into())));
        assert_eq!(editor.get_html(), "<p>a<b>X</b>b</p>");
    }

    #[test]
    fn test_pasted_attachment_gets_its_own_id() {
        let image = "<img data-berry-attachment-id=\"x1\" src=\"https://a.test/b.png\">";
        let mut editor = editor_with(&format!("<p>a{image}b</p>"));
        editor.set_selection(Some(SelectionRange::caret(2)));
        assert!(editor.exec(&EditorCommand::InsertHtml(image.into())));

        let ids: Vec<String> = editor
            .document()
            .attachments()
            .iter()
            .map(|a| a.id.clone())
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], "x1");
        assert_ne!(ids[1], "x1");
        assert_eq!(editor.get_html().matches("\"x1\"").count(), 1);
    }

    #[test]
    fn test_kept_upload_result_applies_when_placeholder_returns() {
        let mut editor = editor_with("<p>ab</p>");
        editor.set_selection(Some(SelectionRange::caret(1)));
        let file = AttachmentFile {
            filename: "a.png".into(),
            content_type: "image/png".into(),
            ..AttachmentFile::default()
        };
        let id = editor.insert_attachment_placeholder(&file).unwrap();
        let pending = editor.get_html().to_string();

        assert!(editor.set_html("<p>ab</p>", true));
        assert!(!editor.resolve_attachment(&id, &AttachmentResult::url("https://cdn.test/a.png")));
        assert_eq!(editor.get_html(), "<p>ab</p>");

        assert!(editor.set_html(&pending, true));
        let html = editor.get_html();
        assert!(html.contains("https://cdn.test/a.png"));
        assert!(!html.contains("data-berry-pending"));
    }

    #[test]
    fn test_repeated_ids_within_pasted_markup_are_split() {
        let mut editor = editor_with("<p>ab</p>");
        editor.set_selection(Some(SelectionRange::caret(1)));
        let pasted = "<img data-berry-attachment-id=\"p1\" src=\"https://a.test/1.png\">\
                      <img data-berry-attachment-id=\"p1\" src=\"https://a.test/2.png\">";
        assert!(editor.exec(&EditorCommand::InsertHtml(pasted.into())));

        let doc = editor.document();
        let ids: Vec<&str> = doc.attachments().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], "p1");
        assert_ne!(ids[1], "p1");
    }

    #[test]
    fn test_unknown_emoji_changes_nothing() {
        let mut editor = editor_with("<p>a</p>");
        editor.set_selection(Some(SelectionRange::caret(1)));
        assert!(!editor.exec(&EditorCommand::InsertEmoji("nope".into())));
        assert!(editor.exec(&EditorCommand::InsertEmoji("tada".into())));
        assert_eq!(editor.get_html(), "<p>a🎉</p>");
    }

    #[test]
    fn test_sync_input_sanitizes_and_reports() {
        let (mut editor, log) = recording("<p>a</p>");
        let surface = editor.surface_mut().unwrap();
        let html = "<p>a<img src=\"x.png\" onerror=\"alert(1)\"></p>";
        surface.set_html(html);
        assert!(editor.sync_input());
        assert_eq!(editor.get_html(), "<p>a<img src=\"x.png\"></p>");
        assert_eq!(editor.surface().unwrap().html(), editor.get_html());
        assert_eq!(log.borrow().sanitized, 1);
        assert_eq!(log.borrow().changes.len(), 1);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let (mut editor, log) = recording("<p>Hello world</p>");
        editor.set_selection(Some(SelectionRange::new(0, 5)));
        editor.exec(&EditorCommand::Bold);
        assert!(editor.undo());
        assert_eq!(editor.get_html(), "<p>Hello world</p>");
        assert_eq!(editor.surface().unwrap().html(), "<p>Hello world</p>");
        assert!(editor.redo());
        assert_eq!(editor.get_html(), "<p><strong>Hello</strong> world</p>");
        assert!(!editor.redo());
        assert_eq!(log.borrow().changes.len(), 3);
    }

    #[test]
    fn test_focus_fires_once_per_command_sequence() {
        let (mut editor, log) = recording("<p>Hello</p>");
        editor.set_selection(Some(SelectionRange::new(0, 5)));
        editor.exec(&EditorCommand::Bold);
        editor.exec(&EditorCommand::Italic);
        assert_eq!(log.borrow().focused, 1);
        assert!(editor.is_focused());

        editor.blur();
        assert!(!editor.is_focused());
    }

    #[test]
    fn test_remembered_selection_after_blur() {
        let mut editor = editor_with("<p>Hello world</p>");
        editor.set_selection(Some(SelectionRange::new(6, 11)));
        editor.blur();
        editor.surface_mut().unwrap().set_live_range(None);
        assert!(editor.exec(&EditorCommand::Underline));
        assert_eq!(editor.get_html(), "<p>Hello <u>world</u></p>");
    }

    #[test]
    fn test_query_state() {
        let mut editor = editor_with("<h2><strong>Bold</strong> text</h2>");
        editor.set_selection(Some(SelectionRange::caret(2)));
        let state = editor.query_state();
        assert!(state.bold);
        assert_eq!(state.block, Some(berry_document::TextKind::Heading2));
        assert!(!state.can_undo);
    }

    #[test]
    fn test_placeholder_lifecycle() {
        let mut editor = editor_with("<p>ab</p>");
        editor.set_selection(Some(SelectionRange::caret(1)));
        let file = AttachmentFile {
            filename: "a.png".into(),
            filesize: 10,
            content_type: "image/png".into(),
            preview_url: None,
        };
        let id = editor.insert_attachment_placeholder(&file).unwrap();
        assert!(editor.get_html().contains("data-berry-pending=\"true\""));

        let undo_levels = editor.undo_levels();
        assert!(editor.set_attachment_progress(&id, 40));
        assert!(editor.get_html().contains("data-berry-progress=\"40\""));
        assert_eq!(editor.undo_levels(), undo_levels);

        assert!(editor.resolve_attachment(&id, &AttachmentResult::url("https://cdn.x/a.png")));
        let html = editor.get_html();
        assert!(html.contains("src=\"https://cdn.x/a.png\""));
        assert!(!html.contains("data-berry-pending"));
        assert!(!editor.set_attachment_progress(&id, 50));
    }

    #[test]
    fn test_unsafe_upload_url_fails_placeholder() {
        let mut editor = editor_with("<p>ab</p>");
        editor.set_selection(Some(SelectionRange::caret(2)));
        let file = AttachmentFile {
            filename: "r.pdf".into(),
            content_type: "application/pdf".into(),
            ..AttachmentFile::default()
        };
        let id = editor.insert_attachment_placeholder(&file).unwrap();
        assert!(!editor.resolve_attachment(&id, &AttachmentResult::url("javascript:alert(1)")));
        assert!(editor.get_html().contains("data-berry-failed=\"true\""));
    }

    #[test]
    fn test_resize_drag_then_release() {
        let mut editor = editor_with(
            "<p><figure data-berry-attachment-id=\"img-1\"><img src=\"https://x.y/a.png\" style=\"width: 300px\"></figure></p>",
        );
        let committed = editor.get_html().to_string();

        assert_eq!(
            editor.resize_image_attachment("img-1", 9000.0, WidthUnit::Px, ResizePhase::Drag),
            Some(4096.0)
        );
        assert_eq!(editor.get_html(), committed);
        assert!(!editor.can_undo());

        assert_eq!(
            editor.resize_image_attachment("img-1", 500.0, WidthUnit::Px, ResizePhase::Release),
            Some(500.0)
        );
        assert!(editor.get_html().contains("width: 500px"));
        assert_eq!(editor.undo_levels(), 1);
        assert!(editor.undo());
        assert_eq!(editor.get_html(), committed);
    }
}

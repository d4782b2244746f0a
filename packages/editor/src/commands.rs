//! # Command Table
//!
//! Every command the engine understands, with its raw payload, and the
//! validation that turns it into an [`Action`].
//!
//! ## Design
//!
//! Commands arrive from toolbars as a name and an optional JSON payload.
//! They are deserialized into [`EditorCommand`] (adjacently tagged, so the
//! wire form is `{"command": "textColor", "payload": "#f00"}`) and then
//! validated by [`CommandTable::validate`] using the same style guards the
//! sanitizer applies. Only a validated [`Action`] reaches the engine, so an
//! invalid payload can never mutate the surface.

use crate::errors::CommandError;
use berry_document::{ListType, TextKind};
use berry_sanitizer::is_safe_link;
use berry_sanitizer::style_guards::{
    format_px, parse_hex_color, parse_safe_font_family, parse_safe_font_size_value,
    parse_safe_line_height_value, TextAlign,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Table dimensions accepted by `insertTable`
pub const TABLE_DIMENSION_RANGE: (u32, u32) = (1, 10);

/// A number or a string, for payloads toolbars send either way (`14`, `"14px"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn as_text(&self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPayload {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_in_new_tab: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSize {
    pub rows: u32,
    pub cols: u32,
}

/// A command as sent by a host, payload not yet validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "camelCase")]
pub enum EditorCommand {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    TextColor(String),
    HighlightColor(String),
    ClearHighlight,
    FontFamily(String),
    FontSize(Scalar),
    LineHeight(Scalar),
    BlockStyle(String),
    List(String),
    Align(String),
    Link(LinkPayload),
    Unlink,
    InsertText(String),
    InsertHtml(String),
    InsertHorizontalRule,
    InsertTable(TableSize),
    TableAddRowBefore,
    TableAddRowAfter,
    TableAddColumnBefore,
    TableAddColumnAfter,
    TableDeleteRow,
    TableDeleteColumn,
    TableDelete,
    InsertEmoji(String),
}

impl EditorCommand {
    /// Build a command from its wire name and optional payload
    pub fn from_name(name: &str, payload: Option<Value>) -> Result<Self, CommandError> {
        let value = match payload {
            Some(payload) => json!({ "command": name, "payload": payload }),
            None => json!({ "command": name }),
        };

        serde_json::from_value(value).map_err(|e| {
            if Self::is_known(name) {
                CommandError::InvalidPayload {
                    command: Self::static_name(name),
                    reason: e.to_string(),
                }
            } else {
                CommandError::Unknown(name.to_string())
            }
        })
    }

    /// Wire name
    pub fn name(&self) -> &'static str {
        match self {
            EditorCommand::Bold => "bold",
            EditorCommand::Italic => "italic",
            EditorCommand::Underline => "underline",
            EditorCommand::Strike => "strike",
            EditorCommand::Code => "code",
            EditorCommand::TextColor(_) => "textColor",
            EditorCommand::HighlightColor(_) => "highlightColor",
            EditorCommand::ClearHighlight => "clearHighlight",
            EditorCommand::FontFamily(_) => "fontFamily",
            EditorCommand::FontSize(_) => "fontSize",
            EditorCommand::LineHeight(_) => "lineHeight",
            EditorCommand::BlockStyle(_) => "blockStyle",
            EditorCommand::List(_) => "list",
            EditorCommand::Align(_) => "align",
            EditorCommand::Link(_) => "link",
            EditorCommand::Unlink => "unlink",
            EditorCommand::InsertText(_) => "insertText",
            EditorCommand::InsertHtml(_) => "insertHtml",
            EditorCommand::InsertHorizontalRule => "insertHorizontalRule",
            EditorCommand::InsertTable(_) => "insertTable",
            EditorCommand::TableAddRowBefore => "tableAddRowBefore",
            EditorCommand::TableAddRowAfter => "tableAddRowAfter",
            EditorCommand::TableAddColumnBefore => "tableAddColumnBefore",
            EditorCommand::TableAddColumnAfter => "tableAddColumnAfter",
            EditorCommand::TableDeleteRow => "tableDeleteRow",
            EditorCommand::TableDeleteColumn => "tableDeleteColumn",
            EditorCommand::TableDelete => "tableDelete",
            EditorCommand::InsertEmoji(_) => "insertEmoji",
        }
    }

    const NAMES: &'static [&'static str] = &[
        "bold",
        "italic",
        "underline",
        "strike",
        "code",
        "textColor",
        "highlightColor",
        "clearHighlight",
        "fontFamily",
        "fontSize",
        "lineHeight",
        "blockStyle",
        "list",
        "align",
        "link",
        "unlink",
        "insertText",
        "insertHtml",
        "insertHorizontalRule",
        "insertTable",
        "tableAddRowBefore",
        "tableAddRowAfter",
        "tableAddColumnBefore",
        "tableAddColumnAfter",
        "tableDeleteRow",
        "tableDeleteColumn",
        "tableDelete",
        "insertEmoji",
    ];

    pub fn is_known(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }

    fn static_name(name: &str) -> &'static str {
        Self::NAMES
            .iter()
            .copied()
            .find(|n| *n == name)
            .unwrap_or("unknown")
    }
}

/// Inline formatting that wraps text segments
#[derive(Debug, Clone, PartialEq)]
pub enum InlineFormat {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    /// `#rrggbb`
    TextColor(String),
    /// `#rrggbb`
    Highlight(String),
    FontFamily(String),
    /// px
    FontSize(f64),
}

impl InlineFormat {
    /// Formats the host's native command path is tried for first
    pub fn prefers_native(&self) -> bool {
        matches!(
            self,
            InlineFormat::Bold
                | InlineFormat::Italic
                | InlineFormat::Underline
                | InlineFormat::Strike
                | InlineFormat::TextColor(_)
                | InlineFormat::Highlight(_)
        )
    }

    /// Tag used when the engine synthesizes the format
    pub fn tag(&self) -> &'static str {
        match self {
            InlineFormat::Bold => "strong",
            InlineFormat::Italic => "em",
            InlineFormat::Underline => "u",
            InlineFormat::Strike => "s",
            InlineFormat::Code => "code",
            _ => "span",
        }
    }

    /// Inline style carried by a synthesized `span`
    pub fn style(&self) -> Option<String> {
        match self {
            InlineFormat::TextColor(color) => Some(format!("color: {color}")),
            InlineFormat::Highlight(color) => Some(format!("background-color: {color}")),
            InlineFormat::FontFamily(family) => Some(format!("font-family: {family}")),
            InlineFormat::FontSize(size) => Some(format!("font-size: {}", format_px(*size))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOp {
    AddRowBefore,
    AddRowAfter,
    AddColumnBefore,
    AddColumnAfter,
    DeleteRow,
    DeleteColumn,
    Delete,
}

/// A validated command
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Inline(InlineFormat),
    ClearHighlight,
    LineHeight(f64),
    BlockStyle(TextKind),
    List(ListType),
    Align(TextAlign),
    Link {
        url: String,
        text: Option<String>,
        open_in_new_tab: bool,
    },
    Unlink,
    InsertText(String),
    InsertHtml(String),
    InsertHorizontalRule,
    InsertTable {
        rows: u32,
        cols: u32,
    },
    Table(TableOp),
    InsertEmoji(String),
}

/// Validates commands against the style guards
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    links_open_in_new_tab: bool,
}

impl CommandTable {
    pub fn new(links_open_in_new_tab: bool) -> Self {
        Self {
            links_open_in_new_tab,
        }
    }

    pub fn validate(&self, command: &EditorCommand) -> Result<Action, CommandError> {
        let name = command.name();
        let action = match command {
            EditorCommand::Bold => Action::Inline(InlineFormat::Bold),
            EditorCommand::Italic => Action::Inline(InlineFormat::Italic),
            EditorCommand::Underline => Action::Inline(InlineFormat::Underline),
            EditorCommand::Strike => Action::Inline(InlineFormat::Strike),
            EditorCommand::Code => Action::Inline(InlineFormat::Code),
            EditorCommand::TextColor(color) => {
                Action::Inline(InlineFormat::TextColor(hex_color(name, color)?))
            }
            EditorCommand::HighlightColor(color) => {
                Action::Inline(InlineFormat::Highlight(hex_color(name, color)?))
            }
            EditorCommand::ClearHighlight => Action::ClearHighlight,
            EditorCommand::FontFamily(family) => Action::Inline(InlineFormat::FontFamily(
                parse_safe_font_family(family)
                    .ok_or_else(|| CommandError::invalid(name, "unsafe font family"))?,
            )),
            EditorCommand::FontSize(size) => Action::Inline(InlineFormat::FontSize(
                parse_safe_font_size_value(&size.as_text())
                    .ok_or_else(|| CommandError::invalid(name, "font size outside 8-96px"))?,
            )),
            EditorCommand::LineHeight(value) => Action::LineHeight(
                parse_safe_line_height_value(&value.as_text())
                    .ok_or_else(|| CommandError::invalid(name, "line height outside 1-3"))?,
            ),
            EditorCommand::BlockStyle(style) => match TextKind::from_name(style) {
                Some(TextKind::ListItem) | None => {
                    return Err(CommandError::invalid(name, format!("unknown block style {style}")))
                }
                Some(kind) => Action::BlockStyle(kind),
            },
            EditorCommand::List(list) => match list.as_str() {
                "bullet" => Action::List(ListType::Bullet),
                "numbered" => Action::List(ListType::Numbered),
                other => {
                    return Err(CommandError::invalid(name, format!("unknown list type {other}")))
                }
            },
            EditorCommand::Align(align) => match align.as_str() {
                "left" => Action::Align(TextAlign::Left),
                "center" => Action::Align(TextAlign::Center),
                "right" => Action::Align(TextAlign::Right),
                "justify" => Action::Align(TextAlign::Justify),
                other => {
                    return Err(CommandError::invalid(name, format!("unknown alignment {other}")))
                }
            },
            EditorCommand::Link(link) => {
                let url = link.url.trim();
                if url.is_empty() || !is_safe_link(url) {
                    return Err(CommandError::invalid(name, "unsafe link"));
                }
                let text = match &link.text {
                    Some(text) if text.is_empty() => {
                        return Err(CommandError::invalid(name, "empty link text"))
                    }
                    other => other.clone(),
                };
                Action::Link {
                    url: url.to_string(),
                    text,
                    open_in_new_tab: link.open_in_new_tab.unwrap_or(self.links_open_in_new_tab),
                }
            }
            EditorCommand::Unlink => Action::Unlink,
            EditorCommand::InsertText(text) => {
                if text.is_empty() {
                    return Err(CommandError::invalid(name, "empty text"));
                }
                Action::InsertText(text.clone())
            }
            EditorCommand::InsertHtml(html) => {
                if html.trim().is_empty() {
                    return Err(CommandError::invalid(name, "empty markup"));
                }
                Action::InsertHtml(html.clone())
            }
            EditorCommand::InsertHorizontalRule => Action::InsertHorizontalRule,
            EditorCommand::InsertTable(TableSize { rows, cols }) => {
                let (min, max) = TABLE_DIMENSION_RANGE;
                if !(min..=max).contains(rows) || !(min..=max).contains(cols) {
                    return Err(CommandError::invalid(
                        name,
                        format!("table dimensions {rows}x{cols} outside {min}-{max}"),
                    ));
                }
                Action::InsertTable {
                    rows: *rows,
                    cols: *cols,
                }
            }
            EditorCommand::TableAddRowBefore => Action::Table(TableOp::AddRowBefore),
            EditorCommand::TableAddRowAfter => Action::Table(TableOp::AddRowAfter),
            EditorCommand::TableAddColumnBefore => Action::Table(TableOp::AddColumnBefore),
            EditorCommand::TableAddColumnAfter => Action::Table(TableOp::AddColumnAfter),
            EditorCommand::TableDeleteRow => Action::Table(TableOp::DeleteRow),
            EditorCommand::TableDeleteColumn => Action::Table(TableOp::DeleteColumn),
            EditorCommand::TableDelete => Action::Table(TableOp::Delete),
            EditorCommand::InsertEmoji(shortcode) => {
                let code = shortcode.trim().trim_matches(':');
                let valid = !code.is_empty()
                    && code
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'));
                if !valid {
                    return Err(CommandError::invalid(name, "malformed shortcode"));
                }
                Action::InsertEmoji(code.to_string())
            }
        };
        Ok(action)
    }
}

fn hex_color(name: &'static str, color: &str) -> Result<String, CommandError> {
    parse_hex_color(color).ok_or_else(|| CommandError::invalid(name, "expected #rgb or #rrggbb"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(command: EditorCommand) -> Result<Action, CommandError> {
        CommandTable::default().validate(&command)
    }

    #[test]
    fn test_from_name_unit_command() {
        assert_eq!(EditorCommand::from_name("bold", None), Ok(EditorCommand::Bold));
    }

    #[test]
    fn test_from_name_with_payload() {
        let command = EditorCommand::from_name("fontSize", Some(json!(14))).unwrap();
        assert_eq!(command, EditorCommand::FontSize(Scalar::Number(14.0)));

        let command = EditorCommand::from_name("link", Some(json!({ "url": "https://x.y" }))).unwrap();
        assert!(matches!(command, EditorCommand::Link(_)));
    }

    #[test]
    fn test_from_name_unknown() {
        assert_eq!(
            EditorCommand::from_name("explode", None),
            Err(CommandError::Unknown("explode".into()))
        );
        assert!(matches!(
            EditorCommand::from_name("insertTable", Some(json!("big"))),
            Err(CommandError::InvalidPayload { command: "insertTable", .. })
        ));
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&EditorCommand::TextColor("#f00".into())).unwrap();
        assert_eq!(json, r##"{"command":"textColor","payload":"#f00"}"##);
    }

    #[test]
    fn test_font_size_boundaries() {
        let size = |v: f64| validate(EditorCommand::FontSize(Scalar::Number(v)));
        assert!(size(7.0).is_err());
        assert_eq!(size(8.0), Ok(Action::Inline(InlineFormat::FontSize(8.0))));
        assert_eq!(size(96.0), Ok(Action::Inline(InlineFormat::FontSize(96.0))));
        assert!(size(97.0).is_err());
        assert!(validate(EditorCommand::FontSize(Scalar::Text("12px".into()))).is_ok());
    }

    #[test]
    fn test_line_height_boundaries() {
        let height = |v: &str| validate(EditorCommand::LineHeight(Scalar::Text(v.into())));
        assert!(height("0.9").is_err());
        assert_eq!(height("1"), Ok(Action::LineHeight(1.0)));
        assert_eq!(height("3"), Ok(Action::LineHeight(3.0)));
        assert!(height("3.1").is_err());
    }

    #[test]
    fn test_hex_colors_only() {
        let color = |v: &str| validate(EditorCommand::TextColor(v.into()));
        assert_eq!(color("#F00"), Ok(Action::Inline(InlineFormat::TextColor("#ff0000".into()))));
        assert!(color("#ff0000").is_ok());
        assert!(color("#ff00").is_err());
        assert!(color("red").is_err());
        assert!(color("rgb(255,0,0)").is_err());
    }

    #[test]
    fn test_link_validation() {
        let link = |url: &str| {
            validate(EditorCommand::Link(LinkPayload {
                url: url.into(),
                text: None,
                open_in_new_tab: None,
            }))
        };
        assert!(link("javascript:alert(1)").is_err());
        assert!(link("").is_err());
        assert_eq!(
            link("https://example.com"),
            Ok(Action::Link {
                url: "https://example.com".into(),
                text: None,
                open_in_new_tab: false,
            })
        );

        let table = CommandTable::new(true);
        let action = table.validate(&EditorCommand::Link(LinkPayload {
            url: "mailto:a@b.c".into(),
            text: Some("mail".into()),
            open_in_new_tab: None,
        }));
        assert!(matches!(action, Ok(Action::Link { open_in_new_tab: true, .. })));
    }

    #[test]
    fn test_table_dimensions() {
        let table = |rows, cols| validate(EditorCommand::InsertTable(TableSize { rows, cols }));
        assert!(table(0, 3).is_err());
        assert!(table(1, 1).is_ok());
        assert!(table(10, 10).is_ok());
        assert!(table(3, 11).is_err());
    }

    #[test]
    fn test_block_style_excludes_list_item() {
        assert_eq!(
            validate(EditorCommand::BlockStyle("heading2".into())),
            Ok(Action::BlockStyle(TextKind::Heading2))
        );
        assert!(validate(EditorCommand::BlockStyle("listItem".into())).is_err());
        assert!(validate(EditorCommand::List("checklist".into())).is_err());
        assert!(validate(EditorCommand::Align("start".into())).is_err());
    }

    #[test]
    fn test_emoji_shortcode() {
        assert_eq!(
            validate(EditorCommand::InsertEmoji(":smile:".into())),
            Ok(Action::InsertEmoji("smile".into()))
        );
        assert!(validate(EditorCommand::InsertEmoji("<img>".into())).is_err());
    }
}

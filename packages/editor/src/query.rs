//! # Format State
//!
//! What is active at a position: inline marks, link, colours, block kind,
//! list and alignment. Hosts use it to light up toolbar buttons.
//!
//! The innermost element wins for every value, matching what the user
//! sees at the caret.

use crate::selection::DomPoint;
use berry_document::{ListType, TextKind};
use berry_dom::{Dom, NodeId};
use berry_sanitizer::style_guards::{parse_text_align, TextAlign};
use berry_sanitizer::styles::style_property;
use berry_sanitizer::ATTACHMENT_ID_ATTR;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
    pub link: Option<String>,
    pub text_color: Option<String>,
    pub highlight_color: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub line_height: Option<String>,
    pub block: Option<TextKind>,
    pub list: Option<ListType>,
    pub align: Option<TextAlign>,
    pub can_undo: bool,
    pub can_redo: bool,
}

fn first<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn read_style(state: &mut FormatState, style: &str, block: bool) {
    if block {
        first(&mut state.align, style_property(style, "text-align").and_then(|v| parse_text_align(&v)));
        first(&mut state.line_height, style_property(style, "line-height"));
        return;
    }
    first(&mut state.text_color, style_property(style, "color"));
    first(&mut state.highlight_color, style_property(style, "background-color"));
    first(&mut state.font_family, style_property(style, "font-family"));
    first(&mut state.font_size, style_property(style, "font-size"));
}

/// Format state at `point`, looking no further up than `root`
pub fn format_state_at(dom: &Dom, root: NodeId, point: DomPoint) -> FormatState {
    let mut state = FormatState::default();

    let chain = std::iter::once(point.node)
        .chain(dom.ancestors(point.node))
        .take_while(|n| *n != root);

    for node in chain {
        let Some(tag) = dom.tag_name(node) else {
            continue;
        };
        let is_block = matches!(tag, "p" | "div" | "h1" | "h2" | "h3" | "blockquote" | "li" | "td" | "th");

        match tag {
            "b" | "strong" => state.bold = true,
            "i" | "em" => state.italic = true,
            "u" => state.underline = true,
            "s" | "strike" | "del" => state.strike = true,
            "code" => state.code = true,
            "mark" => first(&mut state.highlight_color, Some("mark".to_string())),
            "font" => first(&mut state.text_color, dom.attr(node, "color").map(str::to_string)),
            "a" if dom.attr(node, ATTACHMENT_ID_ATTR).is_none() => {
                first(&mut state.link, dom.attr(node, "href").map(str::to_string));
            }
            "p" | "div" => first(&mut state.block, Some(TextKind::Paragraph)),
            "h1" => first(&mut state.block, Some(TextKind::Heading1)),
            "h2" => first(&mut state.block, Some(TextKind::Heading2)),
            "h3" => first(&mut state.block, Some(TextKind::Heading3)),
            "blockquote" => first(&mut state.block, Some(TextKind::Quote)),
            "li" => first(&mut state.block, Some(TextKind::ListItem)),
            "ul" => first(&mut state.list, Some(ListType::Bullet)),
            "ol" => first(&mut state.list, Some(ListType::Numbered)),
            _ => {}
        }

        if let Some(style) = dom.attr(node, "style") {
            read_style(&mut state, style, is_block);
        }
    }
    state
}

//! # Document Model
//!
//! Closed block/inline tree derived from the editing surface on demand.
//! The model has no mutation API: edits happen on the surface markup and
//! the model is re-derived.

use crate::error::{DocumentError, DocumentResult};
use berry_sanitizer::style_guards::{TextAlign, WidthUnit};
use serde::{Deserialize, Serialize};

/// Highlight applied by a bare `<mark>`
pub const DEFAULT_HIGHLIGHT: &str = "#ffff00";

/// Root value. Never holds zero blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorDocument {
    pub blocks: Vec<BlockNode>,
}

impl Default for EditorDocument {
    fn default() -> Self {
        Self::empty()
    }
}

impl EditorDocument {
    /// One empty paragraph
    pub fn empty() -> Self {
        Self {
            blocks: vec![BlockNode::Text(TextBlock::paragraph(Vec::new()))],
        }
    }

    /// Builds a document, substituting the empty document for no blocks
    pub fn from_blocks(blocks: Vec<BlockNode>) -> Self {
        if blocks.is_empty() {
            Self::empty()
        } else {
            Self { blocks }
        }
    }

    pub fn from_json(json: &str) -> DocumentResult<Self> {
        let doc: EditorDocument = serde_json::from_str(json)?;
        if doc.blocks.is_empty() {
            return Err(DocumentError::Empty);
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// True for a single paragraph without content
    pub fn is_empty(&self) -> bool {
        match self.blocks.as_slice() {
            [BlockNode::Text(block)] => {
                block.kind == TextKind::Paragraph && block.children.is_empty()
            }
            _ => false,
        }
    }

    /// Text content: blocks separated by newlines, table cells by tabs
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                BlockNode::Text(text) => lines.push(inline_text(&text.children)),
                BlockNode::HorizontalRule { .. } => lines.push(String::new()),
                BlockNode::Table(table) => {
                    for row in &table.rows {
                        let cells: Vec<String> =
                            row.cells.iter().map(|c| inline_text(&c.children)).collect();
                        lines.push(cells.join("\t"));
                    }
                }
            }
        }
        lines.join("\n")
    }

    /// Every attachment in document order, table cells included
    pub fn attachments(&self) -> Vec<&Attachment> {
        fn collect<'a>(children: &'a [InlineNode], found: &mut Vec<&'a Attachment>) {
            for child in children {
                if let InlineNode::Attachment(attachment) = child {
                    found.push(attachment);
                }
            }
        }

        let mut found = Vec::new();
        for block in &self.blocks {
            match block {
                BlockNode::Text(text) => collect(&text.children, &mut found),
                BlockNode::HorizontalRule { .. } => {}
                BlockNode::Table(table) => {
                    for cell in table.rows.iter().flat_map(|r| &r.cells) {
                        collect(&cell.children, &mut found);
                    }
                }
            }
        }
        found
    }

    pub fn attachment(&self, id: &str) -> Option<&Attachment> {
        self.attachments().into_iter().find(|a| a.id == id)
    }
}

fn inline_text(children: &[InlineNode]) -> String {
    children
        .iter()
        .filter_map(|child| match child {
            InlineNode::Text(run) => Some(run.text.as_str()),
            InlineNode::Attachment(_) => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockNode {
    Text(TextBlock),
    #[serde(rename_all = "camelCase")]
    HorizontalRule {
        #[serde(default)]
        typography: BlockTypography,
    },
    Table(Table),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Quote,
    ListItem,
}

impl TextKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "paragraph" => Some(TextKind::Paragraph),
            "heading1" => Some(TextKind::Heading1),
            "heading2" => Some(TextKind::Heading2),
            "heading3" => Some(TextKind::Heading3),
            "quote" => Some(TextKind::Quote),
            "listItem" => Some(TextKind::ListItem),
            _ => None,
        }
    }

    /// Element written for a block of this kind
    pub fn tag(self) -> &'static str {
        match self {
            TextKind::Paragraph => "p",
            TextKind::Heading1 => "h1",
            TextKind::Heading2 => "h2",
            TextKind::Heading3 => "h3",
            TextKind::Quote => "blockquote",
            TextKind::ListItem => "li",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Bullet,
    Numbered,
}

impl ListType {
    pub fn tag(self) -> &'static str {
        match self {
            ListType::Bullet => "ul",
            ListType::Numbered => "ol",
        }
    }
}

/// Block-level typography. Every value has passed the style guards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTypography {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

impl BlockTypography {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub kind: TextKind,
    /// Only meaningful for list items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_type: Option<ListType>,
    #[serde(default)]
    pub typography: BlockTypography,
    #[serde(default)]
    pub children: Vec<InlineNode>,
}

impl TextBlock {
    pub fn paragraph(children: Vec<InlineNode>) -> Self {
        Self {
            kind: TextKind::Paragraph,
            list_type: None,
            typography: BlockTypography::default(),
            children,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// `border-collapse: collapse`
    #[serde(default)]
    pub collapsed: bool,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    #[serde(default)]
    pub header: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colspan: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowspan: Option<u16>,
    /// `border: 1px solid #000000`
    #[serde(default)]
    pub bordered: bool,
    #[serde(default)]
    pub typography: BlockTypography,
    #[serde(default)]
    pub children: Vec<InlineNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InlineNode {
    Text(TextRun),
    Attachment(Attachment),
}

impl InlineNode {
    pub fn text(text: impl Into<String>) -> Self {
        InlineNode::Text(TextRun {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn styled(text: impl Into<String>, marks: Marks) -> Self {
        InlineNode::Text(TextRun {
            text: text.into(),
            marks,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    /// `\n` is a line break, not a block break
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marks {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strike: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// `"14px"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<String>,
}

impl Marks {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Marks that need the styled `span` wrapper
    pub fn has_span_style(&self) -> bool {
        self.font_size.is_some()
            || self.font_family.is_some()
            || self.text_color.is_some()
            || self.highlight_color.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    #[default]
    Image,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAlign {
    Left,
    Center,
    Right,
}

impl ImageAlign {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "left" => Some(ImageAlign::Left),
            "center" => Some(ImageAlign::Center),
            "right" => Some(ImageAlign::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageAlign::Left => "left",
            ImageAlign::Center => "center",
            ImageAlign::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapSide {
    Left,
    Right,
}

impl WrapSide {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "left" => Some(WrapSide::Left),
            "right" => Some(WrapSide::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WrapSide::Left => "left",
            WrapSide::Right => "right",
        }
    }
}

/// An uploaded image or file. `id` joins the surface markup and the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(default)]
    pub kind: AttachmentKind,
    /// Empty while the upload is pending
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_unit: Option<WidthUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_align: Option<ImageAlign>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub wrap_text: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_side: Option<WrapSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub link_open_in_new_tab: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pending: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }

    /// Kind implied by a MIME type
    pub fn kind_for(content_type: &str) -> AttachmentKind {
        if content_type.starts_with("image/") {
            AttachmentKind::Image
        } else {
            AttachmentKind::File
        }
    }
}

//! # Document → HTML
//!
//! Writes the canonical markup for a document. The output is already in
//! the form the sanitizer produces, so loading it into the editor is stable.
//!
//! Marks nest in a fixed order so that re-parsing gives the same model:
//!
//! ```text
//! <a> <span style> <strong> <em> <s> <u> <code> text </code> </u> </s> </em> </strong> </span> </a>
//! ```

use crate::model::*;
use berry_dom::entities::{escape_attribute, escape_text};
use berry_sanitizer::style_guards::{format_number, format_px, WidthUnit, CELL_BORDER};
use berry_sanitizer::ATTACHMENT_ID_ATTR;

/// Serialize a document to HTML
pub fn serialize_html(doc: &EditorDocument) -> String {
    HtmlSerializer::new().serialize(doc)
}

/// Serialize an inline run list (the content of one block)
pub fn serialize_inline(children: &[InlineNode]) -> String {
    let mut serializer = HtmlSerializer::new();
    serializer.write_inlines(children);
    serializer.output
}

/// Markup for a single attachment
pub fn attachment_html(attachment: &Attachment) -> String {
    let mut serializer = HtmlSerializer::new();
    serializer.write_attachment(attachment);
    serializer.output
}

/// Serializer converts the document model back to HTML
#[derive(Default)]
pub struct HtmlSerializer {
    output: String,
}

impl HtmlSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serialize(mut self, doc: &EditorDocument) -> String {
        let mut open_list: Option<ListType> = None;

        for block in &doc.blocks {
            let list_type = match block {
                BlockNode::Text(text) if text.kind == TextKind::ListItem => {
                    Some(text.list_type.unwrap_or(ListType::Bullet))
                }
                _ => None,
            };

            if open_list != list_type {
                if let Some(open) = open_list {
                    self.close(open.tag());
                }
                if let Some(list) = list_type {
                    self.open(list.tag(), &[]);
                }
                open_list = list_type;
            }

            self.write_block(block);
        }

        if let Some(open) = open_list {
            self.close(open.tag());
        }
        self.output
    }

    fn write_block(&mut self, block: &BlockNode) {
        match block {
            BlockNode::Text(text) => {
                let tag = text.kind.tag();
                let style = typography_style(&text.typography);
                self.open(tag, &[("style", style)]);
                self.write_inlines(&text.children);
                self.close(tag);
            }
            BlockNode::HorizontalRule { typography } => {
                self.open("hr", &[("style", typography_style(typography))]);
            }
            BlockNode::Table(table) => self.write_table(table),
        }
    }

    fn write_table(&mut self, table: &Table) {
        let style = table
            .collapsed
            .then(|| "border-collapse: collapse".to_string());
        self.open("table", &[("style", style)]);
        self.open("tbody", &[]);

        for row in &table.rows {
            self.open("tr", &[]);
            for cell in &row.cells {
                let tag = if cell.header { "th" } else { "td" };
                let mut declarations = Vec::new();
                if cell.bordered {
                    declarations.push(format!("border: {CELL_BORDER}"));
                }
                declarations.extend(typography_style(&cell.typography));

                let style = (!declarations.is_empty()).then(|| declarations.join("; "));
                let colspan = cell.colspan.map(|n| n.to_string());
                let rowspan = cell.rowspan.map(|n| n.to_string());
                self.open(
                    tag,
                    &[("style", style), ("colspan", colspan), ("rowspan", rowspan)],
                );
                self.write_inlines(&cell.children);
                self.close(tag);
            }
            self.close("tr");
        }

        self.close("tbody");
        self.close("table");
    }

    pub fn write_inlines(&mut self, children: &[InlineNode]) {
        for child in children {
            match child {
                InlineNode::Text(run) => self.write_run(run),
                InlineNode::Attachment(attachment) => self.write_attachment(attachment),
            }
        }
    }

    fn write_run(&mut self, run: &TextRun) {
        let marks = &run.marks;
        let mut stack: Vec<&'static str> = Vec::new();

        if let Some(link) = &marks.link {
            let target = marks.link_target.clone();
            let rel = (target.as_deref() == Some("_blank")).then(|| "noopener noreferrer".to_string());
            self.open(
                "a",
                &[("href", Some(link.clone())), ("target", target), ("rel", rel)],
            );
            stack.push("a");
        }

        if marks.has_span_style() {
            let declarations: Vec<String> = [
                ("font-size", &marks.font_size),
                ("font-family", &marks.font_family),
                ("color", &marks.text_color),
                ("background-color", &marks.highlight_color),
            ]
            .into_iter()
            .filter_map(|(property, value)| value.as_deref().map(|v| format!("{property}: {v}")))
            .collect();
            self.open("span", &[("style", Some(declarations.join("; ")))]);
            stack.push("span");
        }

        for (on, tag) in [
            (marks.bold, "strong"),
            (marks.italic, "em"),
            (marks.strike, "s"),
            (marks.underline, "u"),
            (marks.code, "code"),
        ] {
            if on {
                self.open(tag, &[]);
                stack.push(tag);
            }
        }

        for (i, line) in run.text.split('\n').enumerate() {
            if i > 0 {
                self.output.push_str("<br>");
            }
            escape_text(line, &mut self.output);
        }

        while let Some(tag) = stack.pop() {
            self.close(tag);
        }
    }

    fn write_attachment(&mut self, attachment: &Attachment) {
        let attrs = attachment_attributes(attachment);

        if !attachment.is_image() {
            let mut attrs = attrs;
            if !attachment.url.is_empty() {
                attrs.insert(1, ("href", Some(attachment.url.clone())));
            }
            self.open("a", &attrs);
            escape_text(&attachment.filename, &mut self.output);
            self.close("a");
            return;
        }

        let mut attrs = attrs;
        let mut figure_style = Vec::new();
        if let Some(padding) = attachment.padding {
            figure_style.push(format!("padding: {}", format_px(padding)));
        }
        if let (true, Some(side)) = (attachment.wrap_text, attachment.wrap_side) {
            figure_style.push(format!("float: {}", side.as_str()));
        }
        if !figure_style.is_empty() {
            attrs.push(("style", Some(figure_style.join("; "))));
        }
        self.open("figure", &attrs);

        if let Some(link) = &attachment.link_url {
            let new_tab = attachment.link_open_in_new_tab;
            self.open(
                "a",
                &[
                    ("href", Some(link.clone())),
                    ("target", new_tab.then(|| "_blank".to_string())),
                    ("rel", new_tab.then(|| "noopener noreferrer".to_string())),
                ],
            );
        }

        // A placeholder without a source has nothing to display yet.
        if !attachment.url.is_empty() {
            let width = attachment.width.map(|w| {
                let unit = attachment.width_unit.unwrap_or(WidthUnit::Px);
                format!("width: {}{}", format_number(w), unit.suffix())
            });
            self.open(
                "img",
                &[
                    ("src", Some(attachment.url.clone())),
                    ("alt", attachment.alt.clone()),
                    ("height", attachment.height.map(|h| h.to_string())),
                    ("style", width),
                ],
            );
        }

        if attachment.link_url.is_some() {
            self.close("a");
        }

        if let Some(caption) = attachment.caption.as_deref().filter(|c| !c.is_empty()) {
            self.open("figcaption", &[]);
            escape_text(caption, &mut self.output);
            self.close("figcaption");
        }

        self.close("figure");
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, Option<String>)]) {
        self.output.push('<');
        self.output.push_str(tag);
        for (name, value) in attrs {
            if let Some(value) = value {
                self.output.push(' ');
                self.output.push_str(name);
                self.output.push_str("=\"");
                escape_attribute(value, &mut self.output);
                self.output.push('"');
            }
        }
        self.output.push('>');
    }

    fn close(&mut self, tag: &str) {
        self.output.push_str("</");
        self.output.push_str(tag);
        self.output.push('>');
    }
}

/// `data-berry-*` attributes shared by both attachment shapes
fn attachment_attributes(attachment: &Attachment) -> Vec<(&'static str, Option<String>)> {
    let flag = |on: bool| on.then(|| "true".to_string());
    let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());

    vec![
        (ATTACHMENT_ID_ATTR, Some(attachment.id.clone())),
        ("data-berry-filename", non_empty(&attachment.filename)),
        (
            "data-berry-filesize",
            (attachment.filesize > 0).then(|| attachment.filesize.to_string()),
        ),
        ("data-berry-content-type", non_empty(&attachment.content_type)),
        ("data-berry-preview-url", attachment.preview_url.clone()),
        (
            "data-berry-align",
            attachment.image_align.map(|a| a.as_str().to_string()),
        ),
        ("data-berry-wrap", flag(attachment.wrap_text)),
        (
            "data-berry-wrap-side",
            attachment.wrap_side.map(|s| s.as_str().to_string()),
        ),
        ("data-berry-pending", flag(attachment.pending)),
        ("data-berry-failed", flag(attachment.failed)),
        (
            "data-berry-progress",
            attachment.progress.map(|p| p.to_string()),
        ),
    ]
}

/// Block typography as a style attribute value
fn typography_style(typography: &BlockTypography) -> Option<String> {
    let declarations = typography_declarations(typography);
    (!declarations.is_empty()).then(|| declarations.join("; "))
}

fn typography_declarations(typography: &BlockTypography) -> Vec<String> {
    let mut declarations = Vec::new();
    if let Some(align) = typography.align {
        declarations.push(format!("text-align: {align}"));
    }
    if let Some(line_height) = typography.line_height {
        declarations.push(format!("line-height: {}", format_number(line_height)));
    }
    if let Some(size) = typography.font_size {
        declarations.push(format!("font-size: {}", format_px(size)));
    }
    if let Some(family) = &typography.font_family {
        declarations.push(format!("font-family: {family}"));
    }
    declarations
}

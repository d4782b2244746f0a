//! # HTML → Document
//!
//! Sanitizes the input, then walks the tree classifying every node into the
//! closed [`BlockNode`]/[`InlineNode`] variants.
//!
//! ## Design
//!
//! Block containers (`div`, `blockquote`, list items, ...) may hold further
//! blocks. Inline content found next to blocks is gathered into a pending
//! run and flushed as a text block of the enclosing kind, so stray text is
//! never lost and nested lists come out flat.

use crate::model::*;
use berry_dom::{Dom, NodeData, NodeId};
use berry_sanitizer::style_guards::{
    format_px, parse_image_width, parse_padding, parse_safe_color, parse_safe_font_family,
    parse_safe_font_size_value, parse_safe_line_height_value, parse_text_align,
};
use berry_sanitizer::styles::parse_declarations;
use berry_sanitizer::{sanitize_dom, ATTACHMENT_ID_ATTR};
use std::collections::HashSet;
use tracing::debug;

/// Elements that start a new block when met in block context
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "blockquote", "ul", "ol", "li", "hr", "table", "thead", "tbody",
    "tr", "td", "th", "figure", "figcaption",
];

/// Parse untrusted markup. Sanitizes first; never yields zero blocks.
pub fn parse_html(raw: &str) -> EditorDocument {
    let mut dom = Dom::parse(raw);
    sanitize_dom(&mut dom);
    let root = dom.root();
    parse_dom(&dom, root)
}

/// Parse markup that is already sanitized
pub fn parse_sanitized(html: &str) -> EditorDocument {
    let dom = Dom::parse(html);
    parse_dom(&dom, dom.root())
}

/// Parse the children of `root` in an existing tree
pub fn parse_dom(dom: &Dom, root: NodeId) -> EditorDocument {
    let mut parser = DocumentParser::new(dom, root);
    let mut blocks = Vec::new();
    parser.collect_blocks(root, &BlockContext::default(), &mut blocks);
    debug!(blocks = blocks.len(), "Parsed document");
    EditorDocument::from_blocks(blocks)
}

#[derive(Debug, Clone)]
struct BlockContext {
    kind: TextKind,
    list_type: Option<ListType>,
    typography: BlockTypography,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            kind: TextKind::Paragraph,
            list_type: None,
            typography: BlockTypography::default(),
        }
    }
}

impl BlockContext {
    fn with(&self, kind: TextKind, list_type: Option<ListType>, own: BlockTypography) -> Self {
        Self {
            kind,
            list_type,
            typography: BlockTypography {
                align: own.align.or(self.typography.align),
                line_height: own.line_height.or(self.typography.line_height),
                font_size: own.font_size.or(self.typography.font_size),
                font_family: own.font_family.or_else(|| self.typography.font_family.clone()),
            },
        }
    }

    fn text_block(&self, children: Vec<InlineNode>) -> BlockNode {
        BlockNode::Text(TextBlock {
            kind: self.kind,
            list_type: match self.kind {
                TextKind::ListItem => Some(self.list_type.unwrap_or(ListType::Bullet)),
                _ => None,
            },
            typography: self.typography.clone(),
            children,
        })
    }
}

struct DocumentParser<'a> {
    dom: &'a Dom,
    used_ids: HashSet<String>,
    next_image: usize,
}

impl<'a> DocumentParser<'a> {
    fn new(dom: &'a Dom, root: NodeId) -> Self {
        let used_ids = dom
            .descendants(root)
            .into_iter()
            .filter_map(|id| dom.attr(id, ATTACHMENT_ID_ATTR))
            .map(str::to_string)
            .collect();
        Self {
            dom,
            used_ids,
            next_image: 0,
        }
    }

    fn is_block(&self, id: NodeId) -> bool {
        match self.dom.tag_name(id) {
            Some("figure") => self.dom.attr(id, ATTACHMENT_ID_ATTR).is_none(),
            Some(name) => BLOCK_TAGS.contains(&name),
            None => false,
        }
    }

    fn collect_blocks(&mut self, parent: NodeId, ctx: &BlockContext, out: &mut Vec<BlockNode>) {
        let dom = self.dom;
        let mut pending = Vec::new();

        for &child in dom.children(parent) {
            if self.is_block(child) {
                flush(&mut pending, ctx, out);
                self.block(child, ctx, out);
            } else {
                self.inline(child, &Marks::default(), &mut pending);
            }
        }

        flush(&mut pending, ctx, out);
    }

    fn block(&mut self, id: NodeId, ctx: &BlockContext, out: &mut Vec<BlockNode>) {
        let dom = self.dom;
        let Some(name) = dom.tag_name(id) else {
            return;
        };
        let own = block_typography(dom.attr(id, "style"));

        let inner = match name {
            "hr" => {
                out.push(BlockNode::HorizontalRule { typography: own });
                return;
            }
            "table" => {
                out.push(BlockNode::Table(self.table(id)));
                return;
            }
            "ul" | "ol" => {
                let list_type = if name == "ol" {
                    ListType::Numbered
                } else {
                    ListType::Bullet
                };
                let list_ctx = ctx.with(TextKind::ListItem, Some(list_type), own);
                self.collect_blocks(id, &list_ctx, out);
                return;
            }
            "li" => ctx.with(TextKind::ListItem, ctx.list_type, own),
            "h1" => ctx.with(TextKind::Heading1, None, own),
            "h2" => ctx.with(TextKind::Heading2, None, own),
            "h3" => ctx.with(TextKind::Heading3, None, own),
            "blockquote" => ctx.with(TextKind::Quote, None, own),
            // Paragraph-like containers keep the enclosing kind.
            _ => ctx.with(ctx.kind, ctx.list_type, own),
        };

        let before = out.len();
        self.collect_blocks(id, &inner, out);
        let wraps_blocks = matches!(name, "div" | "figure" | "thead" | "tbody" | "tr");
        if out.len() == before && !wraps_blocks {
            out.push(inner.text_block(Vec::new()));
        }
    }

    fn inline(&mut self, id: NodeId, marks: &Marks, out: &mut Vec<InlineNode>) {
        let dom = self.dom;
        let el = match dom.data(id) {
            NodeData::Text(text) => {
                push_text(out, &text.replace(['\n', '\r', '\t'], " "), marks);
                return;
            }
            NodeData::Element(el) => el,
            NodeData::Comment(_) | NodeData::Root => return,
        };

        let name = el.name.as_str();
        if el.has_attr(ATTACHMENT_ID_ATTR) && matches!(name, "figure" | "img" | "a") {
            let attachment = self.attachment(id, marks);
            out.push(InlineNode::Attachment(attachment));
            return;
        }

        let mut marks = marks.clone();
        match name {
            "br" => {
                push_text(out, "\n", &marks);
                return;
            }
            "img" => {
                if let Some(attachment) = self.plain_image(id, &marks) {
                    out.push(InlineNode::Attachment(attachment));
                }
                return;
            }
            "strong" | "b" => marks.bold = true,
            "em" | "i" => marks.italic = true,
            "u" => marks.underline = true,
            "s" => marks.strike = true,
            "code" => marks.code = true,
            "mark" => marks.highlight_color = Some(DEFAULT_HIGHLIGHT.to_string()),
            "a" => {
                if let Some(href) = el.attr("href") {
                    marks.link = Some(href.to_string());
                    marks.link_target = el.attr("target").map(str::to_string);
                }
            }
            _ => {}
        }
        if let Some(style) = el.attr("style") {
            apply_inline_style(&mut marks, style);
        }

        for &child in dom.children(id) {
            self.inline(child, &marks, out);
        }
    }

    fn table(&mut self, id: NodeId) -> Table {
        let dom = self.dom;
        let collapsed = dom
            .attr(id, "style")
            .and_then(|style| style_value(style, "border-collapse"))
            .is_some_and(|v| v == "collapse");

        let mut rows = Vec::new();
        for &child in dom.children(id) {
            match dom.tag_name(child) {
                Some("tr") => rows.push(self.row(child)),
                Some("thead" | "tbody") => {
                    for &grandchild in dom.children(child) {
                        if dom.is_element(grandchild, &["tr"]) {
                            rows.push(self.row(grandchild));
                        }
                    }
                }
                _ => {}
            }
        }

        Table { collapsed, rows }
    }

    fn row(&mut self, id: NodeId) -> TableRow {
        let dom = self.dom;
        let cells = dom
            .children(id)
            .iter()
            .copied()
            .filter(|&c| dom.is_element(c, &["td", "th"]))
            .map(|cell| self.cell(cell))
            .collect();
        TableRow { cells }
    }

    fn cell(&mut self, id: NodeId) -> TableCell {
        let dom = self.dom;
        let style = dom.attr(id, "style");
        let span = |name: &str| {
            dom.attr(id, name)
                .and_then(|v| v.parse::<u16>().ok())
                .filter(|&n| n > 1)
        };

        let mut children = Vec::new();
        self.cell_content(id, &mut children);
        if is_blank(&children) {
            children.clear();
        }

        TableCell {
            header: dom.is_element(id, &["th"]),
            colspan: span("colspan"),
            rowspan: span("rowspan"),
            bordered: style.and_then(|s| style_value(s, "border")).is_some(),
            typography: block_typography(style),
            children,
        }
    }

    /// Cells hold inline content only; nested blocks become line breaks.
    fn cell_content(&mut self, id: NodeId, out: &mut Vec<InlineNode>) {
        let dom = self.dom;
        for &child in dom.children(id) {
            if self.is_block(child) {
                let ends_with_break = match out.last() {
                    Some(InlineNode::Text(run)) => run.text.ends_with('\n'),
                    Some(InlineNode::Attachment(_)) => false,
                    None => true,
                };
                if !ends_with_break {
                    push_text(out, "\n", &Marks::default());
                }
                self.cell_content(child, out);
            } else {
                self.inline(child, &Marks::default(), out);
            }
        }
    }

    fn attachment(&mut self, id: NodeId, marks: &Marks) -> Attachment {
        let dom = self.dom;
        let attr = |name: &str| dom.attr(id, name).map(str::to_string);
        let flag = |name: &str| dom.attr(id, name) == Some("true");

        let mut attachment = Attachment {
            id: attr(ATTACHMENT_ID_ATTR).unwrap_or_default(),
            filename: attr("data-berry-filename").unwrap_or_default(),
            filesize: attr("data-berry-filesize")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            content_type: attr("data-berry-content-type").unwrap_or_default(),
            preview_url: attr("data-berry-preview-url"),
            image_align: dom.attr(id, "data-berry-align").and_then(ImageAlign::parse),
            wrap_text: flag("data-berry-wrap"),
            wrap_side: dom.attr(id, "data-berry-wrap-side").and_then(WrapSide::parse),
            pending: flag("data-berry-pending"),
            failed: flag("data-berry-failed"),
            progress: dom
                .attr(id, "data-berry-progress")
                .and_then(|v| v.parse::<u8>().ok())
                .filter(|&p| p <= 100),
            ..Attachment::default()
        };

        match dom.tag_name(id) {
            Some("a") => {
                attachment.kind = AttachmentKind::File;
                attachment.url = attr("href").unwrap_or_default();
                if attachment.filename.is_empty() {
                    attachment.filename = dom.text_content(id);
                }
            }
            Some("figure") => {
                attachment.kind = AttachmentKind::Image;
                let descendants = dom.descendants(id);
                let find = |name: &str| {
                    descendants
                        .iter()
                        .copied()
                        .find(|&d| dom.is_element(d, &[name]))
                };
                if let Some(img) = find("img") {
                    read_image(dom, img, &mut attachment);
                }
                if let Some(style) = dom.attr(id, "style") {
                    attachment.padding = style_value(style, "padding").and_then(|p| parse_padding(&p));
                }
                match find("a").and_then(|a| dom.attr(a, "href").map(|href| (a, href))) {
                    Some((a, href)) => {
                        attachment.link_url = Some(href.to_string());
                        attachment.link_open_in_new_tab = dom.attr(a, "target") == Some("_blank");
                    }
                    None => inherit_link(&mut attachment, marks),
                }
                attachment.caption = find("figcaption")
                    .map(|c| dom.text_content(c))
                    .filter(|c| !c.is_empty());
            }
            _ => {
                attachment.kind = AttachmentKind::Image;
                read_image(dom, id, &mut attachment);
                if let Some(style) = dom.attr(id, "style") {
                    attachment.padding = style_value(style, "padding").and_then(|p| parse_padding(&p));
                }
                inherit_link(&mut attachment, marks);
            }
        }

        attachment
    }

    /// A pasted image without identity becomes an attachment with a fresh id
    fn plain_image(&mut self, id: NodeId, marks: &Marks) -> Option<Attachment> {
        self.dom.attr(id, "src")?;

        let attachment_id = loop {
            self.next_image += 1;
            let candidate = format!("image-{}", self.next_image);
            if self.used_ids.insert(candidate.clone()) {
                break candidate;
            }
        };

        let mut attachment = Attachment {
            id: attachment_id,
            kind: AttachmentKind::Image,
            ..Attachment::default()
        };
        read_image(self.dom, id, &mut attachment);
        inherit_link(&mut attachment, marks);
        Some(attachment)
    }
}

fn read_image(dom: &Dom, img: NodeId, attachment: &mut Attachment) {
    attachment.url = dom.attr(img, "src").unwrap_or_default().to_string();
    attachment.alt = dom.attr(img, "alt").map(str::to_string);
    attachment.height = dom.attr(img, "height").and_then(|h| h.parse().ok());
    if let Some((width, unit)) = dom
        .attr(img, "style")
        .and_then(|style| style_value(style, "width"))
        .and_then(|w| parse_image_width(&w))
    {
        attachment.width = Some(width);
        attachment.width_unit = Some(unit);
    }
}

fn inherit_link(attachment: &mut Attachment, marks: &Marks) {
    if let Some(link) = &marks.link {
        attachment.link_url = Some(link.clone());
        attachment.link_open_in_new_tab = marks.link_target.as_deref() == Some("_blank");
    }
}

fn style_value(style: &str, property: &str) -> Option<String> {
    parse_declarations(style)
        .into_iter()
        .filter(|(p, _)| p == property)
        .map(|(_, v)| v)
        .last()
}

fn block_typography(style: Option<&str>) -> BlockTypography {
    let mut typography = BlockTypography::default();
    let Some(style) = style else {
        return typography;
    };

    for (property, value) in parse_declarations(style) {
        match property.as_str() {
            "text-align" => typography.align = parse_text_align(&value),
            "line-height" => typography.line_height = parse_safe_line_height_value(&value),
            "font-size" => typography.font_size = parse_safe_font_size_value(&value),
            "font-family" => typography.font_family = parse_safe_font_family(&value),
            _ => {}
        }
    }
    typography
}

fn apply_inline_style(marks: &mut Marks, style: &str) {
    for (property, value) in parse_declarations(style) {
        match property.as_str() {
            "color" => {
                if let Some(color) = parse_safe_color(&value) {
                    marks.text_color = Some(color);
                }
            }
            "background-color" => {
                if let Some(color) = parse_safe_color(&value) {
                    marks.highlight_color = Some(color);
                }
            }
            "font-size" => {
                if let Some(size) = parse_safe_font_size_value(&value) {
                    marks.font_size = Some(format_px(size));
                }
            }
            "font-family" => {
                if let Some(family) = parse_safe_font_family(&value) {
                    marks.font_family = Some(family);
                }
            }
            _ => {}
        }
    }
}

/// Append text, merging with the previous run when the marks match
fn push_text(out: &mut Vec<InlineNode>, text: &str, marks: &Marks) {
    if text.is_empty() {
        return;
    }
    if let Some(InlineNode::Text(last)) = out.last_mut() {
        if last.marks == *marks {
            last.text.push_str(text);
            return;
        }
    }
    out.push(InlineNode::styled(text, marks.clone()));
}

fn is_blank(children: &[InlineNode]) -> bool {
    children.iter().all(|child| match child {
        InlineNode::Text(run) => run.text.trim().is_empty(),
        InlineNode::Attachment(_) => false,
    })
}

fn flush(pending: &mut Vec<InlineNode>, ctx: &BlockContext, out: &mut Vec<BlockNode>) {
    if pending.is_empty() {
        return;
    }
    let children = std::mem::take(pending);
    if !is_blank(&children) {
        out.push(ctx.text_block(children));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_block(doc: &EditorDocument, index: usize) -> &TextBlock {
        match &doc.blocks[index] {
            BlockNode::Text(block) => block,
            other => panic!("expected text block, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_yields_one_paragraph() {
        assert_eq!(parse_html(""), EditorDocument::empty());
        assert_eq!(parse_html("   \n "), EditorDocument::empty());
        assert_eq!(parse_html("<script>x</script>"), EditorDocument::empty());
    }

    #[test]
    fn test_loose_text_wrapped_in_paragraph() {
        let doc = parse_html("hello <b>world</b>");
        assert_eq!(doc.blocks.len(), 1);
        let block = text_block(&doc, 0);
        assert_eq!(block.kind, TextKind::Paragraph);
        assert_eq!(block.children.len(), 2);
    }

    #[test]
    fn test_headings_quotes_and_lists() {
        let doc = parse_html(
            "<h2>T</h2><blockquote><p>q1</p><p>q2</p></blockquote>\
             <ol><li>a<ul><li>b</li></ul></li></ol>",
        );
        let kinds: Vec<_> = doc
            .blocks
            .iter()
            .map(|b| match b {
                BlockNode::Text(t) => (t.kind, t.list_type),
                _ => panic!("unexpected block"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                (TextKind::Heading2, None),
                (TextKind::Quote, None),
                (TextKind::Quote, None),
                (TextKind::ListItem, Some(ListType::Numbered)),
                (TextKind::ListItem, Some(ListType::Bullet)),
            ]
        );
    }

    #[test]
    fn test_marks_and_styles() {
        let doc = parse_html(
            "<p><a href=\"https://x.test\"><strong><span style=\"color: rgb(255,0,0); font-size: 14\">x</span></strong></a>\
             <mark>y</mark></p>",
        );
        let block = text_block(&doc, 0);
        let InlineNode::Text(first) = &block.children[0] else {
            panic!("expected text");
        };
        assert!(first.marks.bold);
        assert_eq!(first.marks.link.as_deref(), Some("https://x.test"));
        assert_eq!(first.marks.text_color.as_deref(), Some("#ff0000"));
        assert_eq!(first.marks.font_size.as_deref(), Some("14px"));

        let InlineNode::Text(second) = &block.children[1] else {
            panic!("expected text");
        };
        assert_eq!(second.marks.highlight_color.as_deref(), Some(DEFAULT_HIGHLIGHT));
    }

    #[test]
    fn test_block_typography_guarded() {
        let doc = parse_html("<p style=\"text-align: center; line-height: 5; font-size: 20px\">x</p>");
        let block = text_block(&doc, 0);
        assert_eq!(
            block.typography.align,
            Some(berry_sanitizer::style_guards::TextAlign::Center)
        );
        assert_eq!(block.typography.line_height, None);
        assert_eq!(block.typography.font_size, Some(20.0));
    }

    #[test]
    fn test_line_breaks_and_raw_newlines() {
        let doc = parse_html("<p>a\nb<br>c</p>");
        let block = text_block(&doc, 0);
        assert_eq!(block.children, vec![InlineNode::text("a b\nc")]);
    }

    #[test]
    fn test_figure_attachment() {
        let doc = parse_html(
            "<p>see <figure data-berry-attachment-id=\"att-1\" data-berry-filename=\"a.png\" \
             data-berry-filesize=\"42\" data-berry-content-type=\"image/png\" data-berry-align=\"center\" \
             style=\"padding: 8px\"><a href=\"https://x.test\" target=\"_blank\"><img src=\"https://cdn.test/a.png\" \
             alt=\"A\" style=\"width: 50%\"></a><figcaption>Cap</figcaption></figure></p>",
        );
        let attachments = doc.attachments();
        assert_eq!(attachments.len(), 1);
        let a = attachments[0];
        assert_eq!(a.id, "att-1");
        assert_eq!(a.kind, AttachmentKind::Image);
        assert_eq!(a.filesize, 42);
        assert_eq!(a.url, "https://cdn.test/a.png");
        assert_eq!(a.width, Some(50.0));
        assert_eq!(a.width_unit, Some(berry_sanitizer::style_guards::WidthUnit::Percent));
        assert_eq!(a.padding, Some(8.0));
        assert_eq!(a.image_align, Some(ImageAlign::Center));
        assert_eq!(a.link_url.as_deref(), Some("https://x.test"));
        assert!(a.link_open_in_new_tab);
        assert_eq!(a.caption.as_deref(), Some("Cap"));
        assert_eq!(doc.plain_text(), "see ");
    }

    #[test]
    fn test_file_attachment_and_plain_image() {
        let doc = parse_html(
            "<p><a data-berry-attachment-id=\"f1\" href=\"https://x.test/r.pdf\">r.pdf</a>\
             <img src=\"https://x.test/p.png\"></p>",
        );
        let attachments = doc.attachments();
        assert_eq!(attachments[0].kind, AttachmentKind::File);
        assert_eq!(attachments[0].filename, "r.pdf");
        assert_eq!(attachments[1].id, "image-1");
        assert_eq!(attachments[1].url, "https://x.test/p.png");
    }

    #[test]
    fn test_table_cells() {
        let doc = parse_html(
            "<table style=\"border-collapse: collapse\"><tbody><tr>\
             <th style=\"border: 1px solid #000\">H</th><td colspan=\"2\"><p>a</p><p>b</p></td>\
             </tr></tbody></table>",
        );
        let BlockNode::Table(table) = &doc.blocks[0] else {
            panic!("expected table");
        };
        assert!(table.collapsed);
        let cells = &table.rows[0].cells;
        assert!(cells[0].header && cells[0].bordered);
        assert_eq!(cells[1].colspan, Some(2));
        assert_eq!(cells[1].children, vec![InlineNode::text("a\nb")]);
    }

    #[test]
    fn test_empty_blocks_kept() {
        let doc = parse_html("<p>a</p><p></p><h1></h1>");
        assert_eq!(doc.blocks.len(), 3);
        assert!(text_block(&doc, 1).children.is_empty());
        assert_eq!(text_block(&doc, 2).kind, TextKind::Heading1);
    }
}

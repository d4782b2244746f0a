//! # Image Attachments
//!
//! Reading and patching the presentation of an image attachment: width,
//! padding, alignment, text wrap, link, alt text and caption.
//!
//! ## Design
//!
//! An attachment may be represented by a bare `<img>` (optionally inside a
//! link) or by a `<figure>`. The current state is read by running the
//! element's markup through the document parser, so every shape the parser
//! understands is supported. A patch is validated with the style guards,
//! applied to the model and written back as the canonical figure markup,
//! replacing whatever shape was there before.

use crate::errors::CommandError;
use berry_document::{attachment_html, parse_sanitized, Attachment, ImageAlign, WrapSide};
use berry_dom::{Dom, DomError, NodeId};
use berry_sanitizer::style_guards::{clamp_image_width, safe_image_width, safe_padding, WidthUnit};
use berry_sanitizer::{is_safe_link, ATTACHMENT_ID_ATTR};
use serde::{Deserialize, Serialize};

const PATCH: &str = "updateImageAttachment";

/// Presentation state of an image attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachmentState {
    pub id: String,
    pub url: String,
    pub width: Option<f64>,
    pub width_unit: WidthUnit,
    pub padding: f64,
    pub align: Option<ImageAlign>,
    pub wrap_text: bool,
    pub wrap_side: Option<WrapSide>,
    pub link_url: Option<String>,
    pub link_open_in_new_tab: bool,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub pending: bool,
    pub failed: bool,
}

impl From<&Attachment> for ImageAttachmentState {
    fn from(attachment: &Attachment) -> Self {
        Self {
            id: attachment.id.clone(),
            url: attachment.url.clone(),
            width: attachment.width,
            width_unit: attachment.width_unit.unwrap_or(WidthUnit::Px),
            padding: attachment.padding.unwrap_or(0.0),
            align: attachment.image_align,
            wrap_text: attachment.wrap_text,
            wrap_side: attachment.wrap_side,
            link_url: attachment.link_url.clone(),
            link_open_in_new_tab: attachment.link_open_in_new_tab,
            alt: attachment.alt.clone(),
            caption: attachment.caption.clone(),
            pending: attachment.pending,
            failed: attachment.failed,
        }
    }
}

/// Partial update. Absent fields are left alone; an empty `linkUrl` or
/// `caption` removes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageAttachmentPatch {
    pub width: Option<f64>,
    pub width_unit: Option<WidthUnit>,
    pub padding: Option<f64>,
    pub align: Option<ImageAlign>,
    pub wrap_text: Option<bool>,
    pub wrap_side: Option<WrapSide>,
    pub link_url: Option<String>,
    pub link_open_in_new_tab: Option<bool>,
    pub alt: Option<String>,
    pub caption: Option<String>,
}

impl ImageAttachmentPatch {
    pub fn width(value: f64, unit: WidthUnit) -> Self {
        Self {
            width: Some(value),
            width_unit: Some(unit),
            ..Self::default()
        }
    }
}

/// Element carrying attachment `id`
pub fn find_attachment(dom: &Dom, root: NodeId, id: &str) -> Option<NodeId> {
    dom.descendants(root)
        .into_iter()
        .find(|n| dom.attr(*n, ATTACHMENT_ID_ATTR) == Some(id))
}

/// The node that represents the attachment as a whole: a bare image's
/// enclosing link, or the element itself
fn outer_node(dom: &Dom, element: NodeId) -> NodeId {
    match dom.parent(element) {
        Some(parent)
            if dom.is_element(element, &["img"])
                && dom.is_element(parent, &["a"])
                && dom.attr(parent, ATTACHMENT_ID_ATTR).is_none()
                && dom.children(parent).len() == 1 =>
        {
            parent
        }
        _ => element,
    }
}

/// Current model of attachment `id` and the node representing it
pub fn read_attachment(dom: &Dom, root: NodeId, id: &str) -> Option<(NodeId, Attachment)> {
    let element = find_attachment(dom, root, id)?;
    let outer = outer_node(dom, element);
    let doc = parse_sanitized(&dom.outer_html(outer));
    let attachment = doc.attachment(id)?.clone();
    Some((outer, attachment))
}

/// Replace `outer` with the canonical markup of `attachment`
pub fn write_attachment(dom: &mut Dom, outer: NodeId, attachment: &Attachment) -> Result<Option<NodeId>, DomError> {
    let nodes = dom.parse_into(&attachment_html(attachment));
    let Some(first) = nodes.first().copied() else {
        dom.detach(outer);
        return Ok(None);
    };
    dom.replace(outer, first)?;
    let mut previous = first;
    for node in nodes.into_iter().skip(1) {
        dom.insert_after(previous, node)?;
        previous = node;
    }
    Ok(Some(first))
}

/// Remove attachment `id`. Returns whether it existed.
pub fn remove_attachment(dom: &mut Dom, root: NodeId, id: &str) -> bool {
    match find_attachment(dom, root, id) {
        Some(element) => {
            let outer = outer_node(dom, element);
            dom.detach(outer);
            true
        }
        None => false,
    }
}

/// Validate and apply a patch. Nothing changes unless every field passes.
pub fn apply_patch(attachment: &mut Attachment, patch: &ImageAttachmentPatch) -> Result<(), CommandError> {
    let mut next = attachment.clone();

    if let Some(width) = patch.width {
        let unit = patch
            .width_unit
            .or(attachment.width_unit)
            .unwrap_or(WidthUnit::Px);
        let width = safe_image_width(width, unit).ok_or_else(|| {
            let (min, max) = unit.range();
            CommandError::invalid(PATCH, format!("width outside {min}-{max}{}", unit.suffix()))
        })?;
        next.width = Some(width);
        next.width_unit = Some(unit);
    }

    if let Some(padding) = patch.padding {
        next.padding = Some(safe_padding(padding).ok_or_else(|| CommandError::invalid(PATCH, "padding out of range"))?);
    }

    if let Some(align) = patch.align {
        next.image_align = Some(align);
    }

    if let Some(side) = patch.wrap_side {
        next.wrap_side = Some(side);
    }
    if let Some(wrap) = patch.wrap_text {
        next.wrap_text = wrap;
    }
    if next.wrap_text && next.wrap_side.is_none() {
        next.wrap_side = Some(match next.image_align {
            Some(ImageAlign::Right) => WrapSide::Right,
            _ => WrapSide::Left,
        });
    }

    if let Some(url) = &patch.link_url {
        let url = url.trim();
        if url.is_empty() {
            next.link_url = None;
            next.link_open_in_new_tab = false;
        } else if is_safe_link(url) {
            next.link_url = Some(url.to_string());
        } else {
            return Err(CommandError::invalid(PATCH, "unsafe link"));
        }
    }
    if let Some(new_tab) = patch.link_open_in_new_tab {
        next.link_open_in_new_tab = new_tab && next.link_url.is_some();
    }

    if let Some(alt) = &patch.alt {
        next.alt = (!alt.is_empty()).then(|| alt.clone());
    }
    if let Some(caption) = &patch.caption {
        next.caption = (!caption.trim().is_empty()).then(|| caption.trim().to_string());
    }

    *attachment = next;
    Ok(())
}

/// Width for a drag gesture: clamped into range instead of rejected
pub fn resize(attachment: &mut Attachment, width: f64, unit: WidthUnit) -> Option<f64> {
    let width = clamp_image_width(width, unit)?;
    attachment.width = Some(width);
    attachment.width_unit = Some(unit);
    Some(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIGURE: &str = "<p>a<figure data-berry-attachment-id=\"img-1\"><img src=\"https://x.y/a.png\" style=\"width: 300px\"></figure>b</p>";

    #[test]
    fn test_read_figure_state() {
        let dom = Dom::parse(FIGURE);
        let (outer, attachment) = read_attachment(&dom, dom.root(), "img-1").unwrap();
        assert!(dom.is_element(outer, &["figure"]));
        let state = ImageAttachmentState::from(&attachment);
        assert_eq!(state.width, Some(300.0));
        assert_eq!(state.width_unit, WidthUnit::Px);
        assert_eq!(state.url, "https://x.y/a.png");
    }

    #[test]
    fn test_read_linked_bare_image() {
        let dom = Dom::parse(
            "<p><a href=\"https://l.io\"><img data-berry-attachment-id=\"i2\" src=\"https://x.y/b.png\"></a></p>",
        );
        let (outer, attachment) = read_attachment(&dom, dom.root(), "i2").unwrap();
        assert!(dom.is_element(outer, &["a"]));
        assert_eq!(attachment.link_url.as_deref(), Some("https://l.io"));
    }

    #[test]
    fn test_width_patch_rejects_out_of_range() {
        let dom = Dom::parse(FIGURE);
        let (_, mut attachment) = read_attachment(&dom, dom.root(), "img-1").unwrap();

        assert!(apply_patch(&mut attachment, &ImageAttachmentPatch::width(5000.0, WidthUnit::Px)).is_err());
        assert_eq!(attachment.width, Some(300.0));

        apply_patch(&mut attachment, &ImageAttachmentPatch::width(4096.0, WidthUnit::Px)).unwrap();
        assert_eq!(attachment.width, Some(4096.0));
    }

    #[test]
    fn test_link_patch_and_write_back() {
        let mut dom = Dom::parse(FIGURE);
        let root = dom.root();
        let (outer, mut attachment) = read_attachment(&dom, root, "img-1").unwrap();
        let patch = ImageAttachmentPatch {
            link_url: Some("https://link.io".into()),
            link_open_in_new_tab: Some(true),
            ..ImageAttachmentPatch::default()
        };
        apply_patch(&mut attachment, &patch).unwrap();
        write_attachment(&mut dom, outer, &attachment).unwrap();

        assert_eq!(
            dom.to_html(),
            "<p>a<figure data-berry-attachment-id=\"img-1\"><a href=\"https://link.io\" target=\"_blank\" rel=\"noopener noreferrer\"><img src=\"https://x.y/a.png\" style=\"width: 300px\"></a></figure>b</p>"
        );

        let (_, mut attachment) = read_attachment(&dom, root, "img-1").unwrap();
        let unlink = ImageAttachmentPatch {
            link_url: Some(String::new()),
            ..ImageAttachmentPatch::default()
        };
        apply_patch(&mut attachment, &unlink).unwrap();
        assert_eq!(attachment.link_url, None);
        assert!(!attachment.link_open_in_new_tab);
    }

    #[test]
    fn test_unsafe_link_rejected() {
        let mut attachment = Attachment::default();
        let patch = ImageAttachmentPatch {
            link_url: Some("javascript:alert(1)".into()),
            ..ImageAttachmentPatch::default()
        };
        assert!(apply_patch(&mut attachment, &patch).is_err());
    }

    #[test]
    fn test_resize_clamps() {
        let mut attachment = Attachment::default();
        assert_eq!(resize(&mut attachment, 9000.0, WidthUnit::Px), Some(4096.0));
        assert_eq!(resize(&mut attachment, 1.0, WidthUnit::Percent), Some(5.0));
        assert_eq!(resize(&mut attachment, f64::NAN, WidthUnit::Px), None);
    }
}

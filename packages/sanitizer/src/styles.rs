//! # Style Reduction
//!
//! Re-validates a `style` attribute declaration by declaration. Anything
//! unknown, out of range or not permitted on the element is dropped, and
//! the survivors are written back in canonical `prop: value` form.

use crate::style_guards::{
    format_number, format_px, parse_border_collapse, parse_float, parse_image_width,
    parse_padding, parse_safe_color, parse_safe_font_family, parse_safe_font_size_value,
    parse_safe_line_height_value, parse_table_cell_border, parse_text_align,
};

/// Block elements that carry typography
pub const BLOCK_TEXT_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "blockquote", "li", "td", "th", "hr",
];

/// Inline elements that carry character styling
pub const INLINE_TEXT_TAGS: &[&str] = &[
    "span", "mark", "a", "strong", "b", "em", "i", "u", "s", "code",
];

/// Split a style attribute into `(property, value)` pairs.
///
/// Semicolons inside parentheses (e.g. `rgb(…)`) do not split.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    let mut push = |chunk: &str| {
        if let Some((name, value)) = chunk.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if !name.is_empty() && !value.is_empty() {
                declarations.push((name, value.to_string()));
            }
        }
    };

    for (i, c) in style.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&style[start..]);

    declarations
}

/// Validate one declaration for `tag`. Returns the canonical value.
pub fn reduce_declaration(tag: &str, property: &str, value: &str) -> Option<String> {
    let value = value
        .trim()
        .strip_suffix("!important")
        .map(str::trim)
        .unwrap_or(value.trim());

    let text_tag = BLOCK_TEXT_TAGS.contains(&tag) || INLINE_TEXT_TAGS.contains(&tag);
    let block_tag = BLOCK_TEXT_TAGS.contains(&tag);
    let image_tag = tag == "img" || tag == "figure";

    match property {
        "color" | "background-color" if text_tag => parse_safe_color(value),
        "font-family" if text_tag => parse_safe_font_family(value),
        "font-size" if text_tag => parse_safe_font_size_value(value).map(format_px),
        "line-height" if block_tag => parse_safe_line_height_value(value).map(format_number),
        "text-align" if block_tag || tag == "figure" => {
            parse_text_align(value).map(|a| a.as_str().to_string())
        }
        "border" if tag == "td" || tag == "th" => parse_table_cell_border(value).map(str::to_string),
        "border-collapse" if tag == "table" => parse_border_collapse(value).map(str::to_string),
        "width" if image_tag => parse_image_width(value)
            .map(|(width, unit)| format!("{}{}", format_number(width), unit.suffix())),
        "padding" if image_tag => parse_padding(value).map(format_px),
        "float" if image_tag => parse_float(value).map(str::to_string),
        _ => None,
    }
}

/// Result of reducing a style attribute
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReducedStyle {
    /// Canonical style text, `None` when nothing survived
    pub style: Option<String>,
    /// Properties that were dropped
    pub dropped: Vec<String>,
}

/// Reduce a whole style attribute for `tag`
pub fn reduce_style(tag: &str, style: &str) -> ReducedStyle {
    let mut kept: Vec<(String, String)> = Vec::new();
    let mut dropped = Vec::new();

    for (property, value) in parse_declarations(style) {
        match reduce_declaration(tag, &property, &value) {
            Some(clean) => match kept.iter_mut().find(|(p, _)| *p == property) {
                // Later declarations win, as in CSS.
                Some(existing) => existing.1 = clean,
                None => kept.push((property, clean)),
            },
            None => dropped.push(property),
        }
    }

    let style = (!kept.is_empty()).then(|| write_declarations(&kept));
    ReducedStyle { style, dropped }
}

/// Write declarations as `a: b; c: d`
pub fn write_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(p, v)| format!("{p}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Look up a single property in a style attribute (last one wins)
pub fn style_property(style: &str, property: &str) -> Option<String> {
    parse_declarations(style)
        .into_iter()
        .filter(|(p, _)| p == property)
        .map(|(_, v)| v)
        .last()
}

/// Set (or remove, with `None`) one property, keeping the rest in order
pub fn set_style_property(style: &str, property: &str, value: Option<&str>) -> Option<String> {
    let mut declarations = parse_declarations(style);
    declarations.retain(|(p, _)| p != property);
    if let Some(value) = value {
        declarations.push((property.to_string(), value.to_string()));
    }
    (!declarations.is_empty()).then(|| write_declarations(&declarations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_keeps_valid_typography() {
        let reduced = reduce_style(
            "span",
            "color: RGB(255, 0, 0); font-size: 14px; position: absolute; font-family: Arial",
        );
        assert_eq!(
            reduced.style.as_deref(),
            Some("color: #ff0000; font-size: 14px; font-family: Arial")
        );
        assert_eq!(reduced.dropped, vec!["position".to_string()]);
    }

    #[test]
    fn test_reduce_respects_element() {
        assert_eq!(reduce_style("span", "border: 1px solid black").style, None);
        assert_eq!(
            reduce_style("td", "border: 1px solid black").style.as_deref(),
            Some("border: 1px solid #000000")
        );
        assert_eq!(
            reduce_style("table", "border-collapse: collapse; border-spacing: 2px")
                .style
                .as_deref(),
            Some("border-collapse: collapse")
        );
        assert_eq!(reduce_style("table", "border-collapse: separate").style, None);
    }

    #[test]
    fn test_reduce_is_canonical() {
        let once = reduce_style("p", "text-align:CENTER;line-height:1.50;;").style.unwrap();
        assert_eq!(once, "text-align: center; line-height: 1.5");
        assert_eq!(reduce_style("p", &once).style.unwrap(), once);
    }

    #[test]
    fn test_expression_and_urls_dropped() {
        let reduced = reduce_style("span", "background-color: url(javascript:x); color: expression(1)");
        assert_eq!(reduced.style, None);
    }

    #[test]
    fn test_set_style_property() {
        assert_eq!(
            set_style_property("color: #ff0000; background-color: #ffff00", "background-color", None)
                .as_deref(),
            Some("color: #ff0000")
        );
        assert_eq!(set_style_property("background-color: #ffff00", "background-color", None), None);
        assert_eq!(
            style_property("color: #000000; color: #ffffff", "color").as_deref(),
            Some("#ffffff")
        );
    }
}

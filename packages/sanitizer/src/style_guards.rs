//! # Style Guards
//!
//! Pure validators for every typographic and layout value Berry lets
//! through. Each guard returns `None` on rejection and never panics.
//!
//! Numeric guards reject out-of-range input instead of clamping it. The
//! only clamping helper is [`clamp_image_width`], used by the interactive
//! resize gesture.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_FONT_FAMILY_LEN: usize = 160;
pub const FONT_SIZE_RANGE: (f64, f64) = (8.0, 96.0);
pub const LINE_HEIGHT_RANGE: (f64, f64) = (1.0, 3.0);
pub const IMAGE_WIDTH_PX_RANGE: (f64, f64) = (24.0, 4096.0);
pub const IMAGE_WIDTH_PERCENT_RANGE: (f64, f64) = (5.0, 100.0);
pub const PADDING_RANGE: (f64, f64) = (0.0, 96.0);

/// Canonical border for table cells
pub const CELL_BORDER: &str = "1px solid #000000";

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }
}

impl fmt::Display for TextAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of an image width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthUnit {
    Px,
    Percent,
}

impl WidthUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            WidthUnit::Px => "px",
            WidthUnit::Percent => "%",
        }
    }

    pub fn range(self) -> (f64, f64) {
        match self {
            WidthUnit::Px => IMAGE_WIDTH_PX_RANGE,
            WidthUnit::Percent => IMAGE_WIDTH_PERCENT_RANGE,
        }
    }
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Range check on the value as given; rounding happens only after it passes
fn in_range(value: f64, (min, max): (f64, f64)) -> Option<f64> {
    if !value.is_finite() || !(min..=max).contains(&value) {
        return None;
    }
    Some(round2(value))
}

fn parse_number(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    // Reject things like "1e3" or "0x10" that str::parse would accept.
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+')
    {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Format a number the way it is written into styles (`14`, `14.5`)
pub fn format_number(value: f64) -> String {
    let value = round2(value);
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// `14` → `14px`
pub fn format_px(value: f64) -> String {
    format!("{}px", format_number(value))
}

/// Trim, collapse whitespace and check against the family character set
pub fn parse_safe_font_family(input: &str) -> Option<String> {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || collapsed.chars().count() > MAX_FONT_FAMILY_LEN {
        return None;
    }
    let allowed = |c: char| {
        c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '\'' | '"' | ',' | '.' | '_' | '-')
    };
    collapsed.chars().all(allowed).then_some(collapsed)
}

/// Font size in px, with or without the `px` suffix, 8–96
pub fn parse_safe_font_size_value(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    let number = trimmed
        .strip_suffix("px")
        .or_else(|| trimmed.strip_suffix("PX"))
        .unwrap_or(trimmed);
    in_range(parse_number(number)?, FONT_SIZE_RANGE)
}

/// Numeric font size entry (no clamping)
pub fn safe_font_size(value: f64) -> Option<f64> {
    in_range(value, FONT_SIZE_RANGE)
}

/// Unitless line height, 1–3
pub fn parse_safe_line_height_value(input: &str) -> Option<f64> {
    in_range(parse_number(input)?, LINE_HEIGHT_RANGE)
}

/// Numeric line height entry (no clamping)
pub fn safe_line_height(value: f64) -> Option<f64> {
    in_range(value, LINE_HEIGHT_RANGE)
}

/// Strict colour payload: `#rgb` or `#rrggbb` only, normalised to `#rrggbb`
pub fn parse_hex_color(input: &str) -> Option<String> {
    let hex = input.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => Some(
            hex.chars()
                .flat_map(|c| [c, c])
                .fold(String::from("#"), |mut acc, c| {
                    acc.push(c.to_ascii_lowercase());
                    acc
                }),
        ),
        6 => Some(format!("#{}", hex.to_ascii_lowercase())),
        _ => None,
    }
}

/// Any accepted colour form (`#rgb`, `#rrggbb`, `rgb()`, opaque `rgba()`)
/// normalised to `#rrggbb`
pub fn parse_safe_color(input: &str) -> Option<String> {
    let value = input.trim().to_ascii_lowercase();
    if value.starts_with('#') {
        return parse_hex_color(&value);
    }

    let (args, has_alpha) = if let Some(rest) = value.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else if let Some(rest) = value.strip_prefix("rgb(") {
        (rest.strip_suffix(')')?, false)
    } else {
        return None;
    };

    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    let channels = match (parts.len(), has_alpha) {
        (3, _) => &parts[..3],
        (4, _) => {
            let alpha = parse_alpha(parts[3])?;
            if (alpha - 1.0).abs() > 0.001 {
                return None;
            }
            &parts[..3]
        }
        _ => return None,
    };

    let mut hex = String::from("#");
    for channel in channels {
        let n: u8 = channel.parse().ok()?;
        hex.push_str(&format!("{:02x}", n));
    }
    Some(hex)
}

fn parse_alpha(input: &str) -> Option<f64> {
    match input.strip_suffix('%') {
        Some(percent) => parse_number(percent).map(|p| p / 100.0),
        None => parse_number(input),
    }
}

pub fn parse_text_align(input: &str) -> Option<TextAlign> {
    match input.trim().to_ascii_lowercase().as_str() {
        "left" | "start" => Some(TextAlign::Left),
        "center" => Some(TextAlign::Center),
        "right" | "end" => Some(TextAlign::Right),
        "justify" => Some(TextAlign::Justify),
        _ => None,
    }
}

/// Image width with unit. A bare number is read as px.
pub fn parse_image_width(input: &str) -> Option<(f64, WidthUnit)> {
    let trimmed = input.trim();
    let (number, unit) = if let Some(n) = trimmed.strip_suffix('%') {
        (n, WidthUnit::Percent)
    } else if let Some(n) = trimmed.strip_suffix("px") {
        (n, WidthUnit::Px)
    } else {
        (trimmed, WidthUnit::Px)
    };
    safe_image_width(parse_number(number)?, unit).map(|v| (v, unit))
}

/// Numeric image width entry (no clamping)
pub fn safe_image_width(value: f64, unit: WidthUnit) -> Option<f64> {
    in_range(value, unit.range())
}

/// Clamp a dragged width into range. Non-finite input yields `None`.
pub fn clamp_image_width(value: f64, unit: WidthUnit) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let (min, max) = unit.range();
    Some(round2(value.clamp(min, max)))
}

/// Padding in px (`0` is allowed without a unit)
pub fn parse_padding(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed);
    safe_padding(parse_number(number)?)
}

pub fn safe_padding(value: f64) -> Option<f64> {
    in_range(value, PADDING_RANGE)
}

/// Table cell borders: exactly `1px solid <black>`
pub fn parse_table_cell_border(input: &str) -> Option<&'static str> {
    let lowered = input.trim().to_ascii_lowercase();
    // rgb(0, 0, 0) contains spaces, so rejoin everything after the style.
    let mut parts = lowered.split_whitespace();
    if parts.next()? != "1px" || parts.next()? != "solid" {
        return None;
    }
    let color: String = parts.collect::<Vec<_>>().join(" ");
    let is_black = color == "black" || parse_safe_color(&color).as_deref() == Some("#000000");
    is_black.then_some(CELL_BORDER)
}

/// Table `border-collapse`: only `collapse`
pub fn parse_border_collapse(input: &str) -> Option<&'static str> {
    (input.trim().eq_ignore_ascii_case("collapse")).then_some("collapse")
}

/// Image/figure float: `left` or `right`
pub fn parse_float(input: &str) -> Option<&'static str> {
    match input.trim().to_ascii_lowercase().as_str() {
        "left" => Some("left"),
        "right" => Some("right"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_size_boundaries() {
        assert_eq!(parse_safe_font_size_value("7"), None);
        assert_eq!(parse_safe_font_size_value("8"), Some(8.0));
        assert_eq!(parse_safe_font_size_value("96"), Some(96.0));
        assert_eq!(parse_safe_font_size_value("97"), None);
        assert_eq!(parse_safe_font_size_value("14px"), Some(14.0));
        assert_eq!(parse_safe_font_size_value("12.346px"), Some(12.35));
        assert_eq!(parse_safe_font_size_value("1e1"), None);
        assert_eq!(parse_safe_font_size_value("NaN"), None);
        assert_eq!(safe_font_size(f64::INFINITY), None);
    }

    #[test]
    fn test_values_just_outside_range_are_not_rounded_in() {
        assert_eq!(parse_safe_font_size_value("96.004px"), None);
        assert_eq!(parse_safe_font_size_value("7.996"), None);
        assert_eq!(safe_font_size(8.004), Some(8.0));
        assert_eq!(parse_safe_line_height_value("3.001"), None);
        assert_eq!(parse_safe_line_height_value("0.999"), None);
        assert_eq!(safe_image_width(4096.001, WidthUnit::Px), None);
        assert_eq!(safe_padding(-0.001), None);
    }

    #[test]
    fn test_line_height_boundaries() {
        assert_eq!(parse_safe_line_height_value("0.99"), None);
        assert_eq!(parse_safe_line_height_value("1"), Some(1.0));
        assert_eq!(parse_safe_line_height_value("1.5"), Some(1.5));
        assert_eq!(parse_safe_line_height_value("3"), Some(3.0));
        assert_eq!(parse_safe_line_height_value("3.01"), None);
        assert_eq!(parse_safe_line_height_value("2px"), None);
    }

    #[test]
    fn test_hex_color_lengths() {
        assert_eq!(parse_hex_color("#abc").as_deref(), Some("#aabbcc"));
        assert_eq!(parse_hex_color("#A1B2C3").as_deref(), Some("#a1b2c3"));
        assert_eq!(parse_hex_color("#abcd"), None);
        assert_eq!(parse_hex_color("#aabbccdd"), None);
        assert_eq!(parse_hex_color("abc"), None);
        assert_eq!(parse_hex_color("#ggg"), None);
    }

    #[test]
    fn test_rgb_colors() {
        assert_eq!(parse_safe_color("rgb(255, 0, 16)").as_deref(), Some("#ff0010"));
        assert_eq!(parse_safe_color("rgba(0,0,0,1)").as_deref(), Some("#000000"));
        assert_eq!(parse_safe_color("rgba(0,0,0,0.5)"), None);
        assert_eq!(parse_safe_color("rgb(300,0,0)"), None);
        assert_eq!(parse_safe_color("red"), None);
    }

    #[test]
    fn test_font_family() {
        assert_eq!(
            parse_safe_font_family("  'Open   Sans', Arial ").as_deref(),
            Some("'Open Sans', Arial")
        );
        assert_eq!(parse_safe_font_family("Arial; color: red"), None);
        assert_eq!(parse_safe_font_family("url(x)"), None);
        assert_eq!(parse_safe_font_family(&"a".repeat(161)), None);
        assert_eq!(parse_safe_font_family("   "), None);
    }

    #[test]
    fn test_image_width_ranges() {
        assert_eq!(parse_image_width("4096px"), Some((4096.0, WidthUnit::Px)));
        assert_eq!(parse_image_width("5000px"), None);
        assert_eq!(parse_image_width("23"), None);
        assert_eq!(parse_image_width("50%"), Some((50.0, WidthUnit::Percent)));
        assert_eq!(parse_image_width("4%"), None);
        assert_eq!(clamp_image_width(5000.0, WidthUnit::Px), Some(4096.0));
        assert_eq!(clamp_image_width(1.0, WidthUnit::Percent), Some(5.0));
        assert_eq!(clamp_image_width(f64::NAN, WidthUnit::Px), None);
    }

    #[test]
    fn test_cell_border() {
        assert_eq!(parse_table_cell_border("1px solid black"), Some(CELL_BORDER));
        assert_eq!(parse_table_cell_border("1px solid rgb(0, 0, 0)"), Some(CELL_BORDER));
        assert_eq!(parse_table_cell_border("1px  SOLID #000"), Some(CELL_BORDER));
        assert_eq!(parse_table_cell_border("2px solid black"), None);
        assert_eq!(parse_table_cell_border("1px dashed black"), None);
        assert_eq!(parse_table_cell_border("1px solid red"), None);
    }

    #[test]
    fn test_padding_and_format() {
        assert_eq!(parse_padding("0"), Some(0.0));
        assert_eq!(parse_padding("96px"), Some(96.0));
        assert_eq!(parse_padding("97px"), None);
        assert_eq!(format_px(14.0), "14px");
        assert_eq!(format_px(14.5), "14.5px");
    }
}

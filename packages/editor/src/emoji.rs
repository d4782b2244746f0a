//! # Emoji
//!
//! Shortcode lookup and Twemoji image markup.
//!
//! ## Design
//!
//! An [`EmojiRegistry`] is constructed by the caller and handed to the
//! editor. It caches one [`EmojiSet`] per Twemoji base URL, so every editor
//! configured with the same URL shares one set. Nothing is global.

use berry_dom::entities::escape_attribute;
use std::collections::HashMap;
use std::rc::Rc;

/// Built-in shortcodes
const SHORTCODES: &[(&str, &str)] = &[
    ("smile", "😄"),
    ("grin", "😁"),
    ("joy", "😂"),
    ("wink", "😉"),
    ("heart", "❤️"),
    ("thumbsup", "👍"),
    ("+1", "👍"),
    ("thumbsdown", "👎"),
    ("-1", "👎"),
    ("clap", "👏"),
    ("fire", "🔥"),
    ("star", "⭐"),
    ("tada", "🎉"),
    ("rocket", "🚀"),
    ("eyes", "👀"),
    ("thinking", "🤔"),
    ("wave", "👋"),
    ("check", "✅"),
    ("x", "❌"),
    ("warning", "⚠️"),
    ("bulb", "💡"),
    ("coffee", "☕"),
    ("100", "💯"),
    ("pray", "🙏"),
];

/// Twemoji file name: lowercase code points joined by `-`. A variation
/// selector is dropped unless the sequence has a zero-width joiner.
pub fn twemoji_code(emoji: &str) -> String {
    let has_joiner = emoji.contains('\u{200D}');
    emoji
        .chars()
        .filter(|c| has_joiner || *c != '\u{FE0F}')
        .map(|c| format!("{:x}", c as u32))
        .collect::<Vec<_>>()
        .join("-")
}

/// Emoji data for one Twemoji base URL
#[derive(Debug, Clone)]
pub struct EmojiSet {
    base_url: Option<String>,
    shortcodes: HashMap<&'static str, &'static str>,
}

impl EmojiSet {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            shortcodes: SHORTCODES.iter().copied().collect(),
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Emoji for a shortcode, with or without surrounding colons
    pub fn shortcode(&self, name: &str) -> Option<&'static str> {
        self.shortcodes.get(name.trim_matches(':')).copied()
    }

    /// Twemoji `<img>` markup, or `None` without a base URL
    pub fn image_html(&self, emoji: &str) -> Option<String> {
        let base = self.base_url.as_deref()?;
        let mut html = String::from("<img src=\"");
        escape_attribute(&format!("{base}/{}.png", twemoji_code(emoji)), &mut html);
        html.push_str("\" alt=\"");
        escape_attribute(emoji, &mut html);
        html.push_str("\">");
        Some(html)
    }

    /// Markup to insert for a shortcode: an image when a base URL is set,
    /// the emoji itself otherwise
    pub fn insertion_html(&self, name: &str) -> Option<String> {
        let emoji = self.shortcode(name)?;
        Some(self.image_html(emoji).unwrap_or_else(|| emoji.to_string()))
    }
}

/// Caches emoji sets by base URL
#[derive(Debug, Default)]
pub struct EmojiRegistry {
    sets: HashMap<String, Rc<EmojiSet>>,
}

impl EmojiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set for `base_url`, built on first use
    pub fn set(&mut self, base_url: Option<&str>) -> Rc<EmojiSet> {
        let key = base_url.unwrap_or_default().to_string();
        self.sets
            .entry(key)
            .or_insert_with(|| Rc::new(EmojiSet::new(base_url)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

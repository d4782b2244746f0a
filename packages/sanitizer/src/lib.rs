//! # Berry Sanitizer
//!
//! Reduces untrusted markup to the subset the editor understands.
//!
//! ## Design
//!
//! Two implementations share one policy:
//!
//! - **Tree**: parse with `berry-dom`, walk, write back. Preferred.
//! - **Fallback**: regular expressions only, for hosts without a tree.
//!
//! Both are idempotent (`sanitize(sanitize(x)) == sanitize(x)`) and both
//! drop anything executable: scripts, event handlers, `javascript:` URLs.
//!
//! The style guards in [`style_guards`] are the single source of truth for
//! numeric ranges and color formats; the command table validates payloads
//! against the same functions.

pub mod fallback;
pub mod policy;
pub mod sanitizer;
pub mod style_guards;
pub mod styles;
pub mod uri;

pub use fallback::{sanitize_fallback, sanitize_fallback_with_report};
pub use policy::ATTACHMENT_ID_ATTR;
pub use sanitizer::{sanitize_dom, SanitizeMode, SanitizeReport, Sanitizer};
pub use uri::{is_safe_link, sanitize_uri, UriContext};

/// Sanitize with the tree implementation
pub fn sanitize(html: &str) -> String {
    Sanitizer::new().sanitize(html)
}

/// Sanitize and report what was removed
pub fn sanitize_with_report(html: &str) -> (String, SanitizeReport) {
    Sanitizer::new().sanitize_with_report(html)
}

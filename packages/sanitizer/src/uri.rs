//! # URI Policy
//!
//! Scheme allow-list for `href`/`src` style attributes. Control characters
//! and whitespace are stripped before the scheme is read, so obfuscated
//! forms such as `java\tscript:` are still recognised and rejected.

/// Schemes accepted on links
pub const LINK_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "ftp", "sms"];

/// Extra schemes accepted on image sources
pub const IMAGE_SCHEMES: &[&str] = &["http", "https", "blob"];

const DATA_IMAGE_PREFIXES: &[&str] = &[
    "data:image/png;base64,",
    "data:image/gif;base64,",
    "data:image/jpeg;base64,",
    "data:image/webp;base64,",
];

/// Where a URI is going to be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriContext {
    Link,
    Image,
}

fn compact(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect()
}

/// The scheme of a URI, lower-cased, or `None` for relative references
pub fn scheme_of(input: &str) -> Option<String> {
    let compacted = compact(input);
    let colon = compacted.find(':')?;
    let candidate = &compacted[..colon];
    // A '/', '?' or '#' before the colon means it is part of a path.
    if candidate.contains(['/', '?', '#']) || candidate.is_empty() {
        return None;
    }
    Some(candidate.to_ascii_lowercase())
}

/// Returns the trimmed URI when it passes the policy for `context`
pub fn sanitize_uri(input: &str, context: UriContext) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    match scheme_of(trimmed) {
        None => Some(trimmed.to_string()),
        Some(scheme) => {
            let allowed = match context {
                UriContext::Link => LINK_SCHEMES.contains(&scheme.as_str()),
                UriContext::Image => {
                    IMAGE_SCHEMES.contains(&scheme.as_str()) || is_data_image(trimmed)
                }
            };
            // Reject values whose raw form differs from the compacted one
            // before the colon; browsers would strip those characters.
            let raw_scheme_clean = trimmed
                .split(':')
                .next()
                .is_some_and(|raw| raw.eq_ignore_ascii_case(&scheme));
            (allowed && raw_scheme_clean).then(|| trimmed.to_string())
        }
    }
}

fn is_data_image(uri: &str) -> bool {
    let lowered = uri.to_ascii_lowercase();
    DATA_IMAGE_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix))
}

/// Link payload check used by the command table
pub fn is_safe_link(input: &str) -> bool {
    sanitize_uri(input, UriContext::Link).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_link_schemes() {
        for uri in [
            "https://example.com",
            "http://example.com/a?b#c",
            "mailto:me@example.com",
            "tel:+123",
            "//cdn.example.com/x",
            "#section",
            "/relative/path",
            "relative/page.html",
            "?q=1",
        ] {
            assert!(is_safe_link(uri), "{uri} should be allowed");
        }
    }

    #[test]
    fn test_active_schemes_rejected() {
        for uri in [
            "javascript:alert(1)",
            "JavaScript:alert(1)",
            "java\tscript:alert(1)",
            " javascript:alert(1)",
            "\u{0}javascript:alert(1)",
            "vbscript:msgbox",
            "data:text/html,<script>",
            "file:///etc/passwd",
        ] {
            assert!(!is_safe_link(uri), "{uri:?} should be rejected");
        }
    }

    #[test]
    fn test_image_sources() {
        assert!(sanitize_uri("blob:https://x/123", UriContext::Image).is_some());
        assert!(sanitize_uri("data:image/png;base64,AAAA", UriContext::Image).is_some());
        assert!(sanitize_uri("data:image/svg+xml;base64,AAAA", UriContext::Image).is_none());
        assert!(sanitize_uri("blob:https://x/123", UriContext::Link).is_none());
    }

    #[test]
    fn test_colon_inside_path_is_relative() {
        assert_eq!(scheme_of("/a:b"), None);
        assert_eq!(scheme_of("page?x=a:b"), None);
        assert_eq!(scheme_of("HTTPS://x").as_deref(), Some("https"));
    }
}

use berry_sanitizer::SanitizeMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Instance name, seeds attachment ids
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Maximum undo levels (0 = unlimited)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Try the host's native formatting commands before synthesizing markup
    #[serde(default = "default_true")]
    pub prefer_native_formatting: bool,

    /// Default for links inserted without an explicit choice
    #[serde(default)]
    pub links_open_in_new_tab: bool,

    /// Twemoji image base URL. Without it emoji are inserted as text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twemoji_base_url: Option<String>,

    #[serde(default)]
    pub sanitize_mode: SanitizeMode,
}

fn default_instance() -> String {
    "berry".to_string()
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_true() -> bool {
    true
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            prefer_native_formatting: true,
            links_open_in_new_tab: false,
            twemoji_base_url: None,
            sanitize_mode: SanitizeMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "historyLimit": 20,
            "preferNativeFormatting": false,
            "twemojiBaseUrl": "https://cdn.example/72x72",
            "sanitizeMode": "fallback"
        }"#;

        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.history_limit, 20);
        assert!(!config.prefer_native_formatting);
        assert!(!config.links_open_in_new_tab);
        assert_eq!(config.sanitize_mode, SanitizeMode::Fallback);
        assert_eq!(config.instance, "berry");
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.history_limit, 100);
        assert!(config.prefer_native_formatting);
    }
}

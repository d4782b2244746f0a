use berry_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "berry.config.json";

/// Berry project configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory searched when no path is given
    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    /// File extensions treated as markup
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Where rewritten files go. Without it files are rewritten in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,

    /// Editor settings shared with the hosts
    #[serde(default)]
    pub editor: EditorConfig,
}

fn default_src_dir() -> String {
    ".".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["html".to_string(), "htm".to_string()]
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("{}: {}", config_path.display(), e))?;
            tracing::debug!(path = %config_path.display(), "Loaded config");
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn get_src_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.src_dir)
    }

    pub fn get_out_dir(&self, cwd: &Path) -> Option<PathBuf> {
        self.out_dir.as_ref().map(|dir| cwd.join(dir))
    }

    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            extensions: default_extensions(),
            out_dir: None,
            editor: EditorConfig::default(),
        }
    }
}

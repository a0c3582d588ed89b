use scribe_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "scribe.config.json";

/// Scribe configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding one subdirectory per content category
    #[serde(default = "default_content_root")]
    pub content_root: String,

    /// Editing and preview settings
    #[serde(default)]
    pub editor: EditorConfig,
}

fn default_content_root() -> String {
    "content".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.editor.validate()?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Get absolute path to the content root
    pub fn get_content_root(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.content_root)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_root: default_content_root(),
            editor: EditorConfig::default(),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub remember_credentials: bool,
    pub ram_mb: u32,
    pub last_version: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remember_credentials: true,
            ram_mb: 2048,
            last_version: None,
        }
    }
}

impl Settings {
    pub async fn load(config_dir: &Path) -> Self {
        let path = config_dir.join(SETTINGS_FILE);
        if let Ok(content) = fs::read_to_string(&path).await {
            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    pub async fn save(&self, config_dir: &Path) -> Result<(), std::io::Error> {
        let path = config_dir.join(SETTINGS_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self).unwrap_or_default();
        fs::write(path, json).await
    }
}

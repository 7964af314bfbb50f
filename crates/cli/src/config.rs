//! Configuration for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use wcore::{ConversationState, Credentials};

/// Location of the configuration file, `~/.config/crabwire.toml`.
pub fn path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("no home directory")?;
    Ok(home.join(".config").join("crabwire.toml"))
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// The active provider and conversation settings
    pub conversation: ConversationState,

    /// Credentials keyed by provider name
    #[serde(default)]
    pub credentials: BTreeMap<String, Credentials>,
}

impl Config {
    /// Load the configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from(&path()?)
    }

    /// Save the configuration to the default file
    pub fn save(&self) -> Result<()> {
        let path = path()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        self.save_to(&path)?;
        tracing::info!("configuration saved to {}", path.display());
        Ok(())
    }

    /// Load the configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}, run `crabwire generate`", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Save the configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }

    /// Credentials for `provider`, matched case-insensitively
    pub fn credentials(&self, provider: &str) -> Credentials {
        self.credentials
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(provider))
            .map(|(_, credentials)| credentials.clone())
            .unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conversation: ConversationState::new("OpenAI")
                .with_system("You are a helpful assistant."),
            credentials: [("OpenAI".to_string(), Credentials::key("YOUR_API_KEY"))]
                .into_iter()
                .collect::<_>(),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ChatError, Result};

pub const DEFAULT_API_URL: &str = "https://api.tachyon.chat/v1/chat/completions";
pub const DEFAULT_WELCOME_MESSAGE: &str = "Hello! I'm your AI assistant. How can I help you today?";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Provide concise, friendly, and helpful responses.";

/// Environment variable that overrides the stored API key
pub const API_KEY_ENV: &str = "CHATWIDGET_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
}

/// Cosmetic options. The engine never reads these; they are handed to the
/// presentation layer as-is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Appearance {
    pub theme: Theme,
    pub position: Position,
    pub primary_color: String,
    pub title: String,
    pub subtitle: String,
    pub placeholder: String,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            position: Position::BottomRight,
            primary_color: "#3B82F6".to_string(),
            title: "AI Assistant".to_string(),
            subtitle: "Online".to_string(),
            placeholder: "Type your message...".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetConfig {
    pub api_key: String,
    pub api_url: String,
    pub welcome_message: String,
    pub system_prompt: String,
    /// Request timeout in seconds. No timeout when absent.
    pub timeout_secs: Option<u64>,
    #[serde(flatten)]
    pub appearance: Appearance,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout_secs: None,
            appearance: Appearance::default(),
        }
    }
}

impl WidgetConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_welcome_message(mut self, text: impl Into<String>) -> Self {
        self.welcome_message = text.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }

    /// Load from the user config file, then apply the environment override
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api_key = key;
            }
        }
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: WidgetConfig = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ChatError::Config(format!(
                "an API key is required (set {} or apiKey in {})",
                API_KEY_ENV,
                Self::get_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the config file".to_string())
            )));
        }
        if self.api_url.trim().is_empty() {
            return Err(ChatError::Config("apiUrl must not be empty".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(ChatError::Config(
                "timeoutSecs must be at least 1 (omit it for no timeout)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ChatError::Config("could not determine config directory".to_string())
        })?;

        Ok(config_dir.join("chatwidget").join("config.json"))
    }
}

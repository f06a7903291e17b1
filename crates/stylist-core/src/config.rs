use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StylistError};

/// Environment variable that overrides `backend.base_url`.
pub const API_URL_ENV: &str = "STYLIST_API_URL";

/// Top-level configuration for the stylist session client.
///
/// Loaded from `~/.stylist/config.toml` by default. Every section falls back
/// to its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StylistConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

impl StylistConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StylistConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                info!(base_url = %url, "Backend URL overridden from {}", API_URL_ENV);
                self.backend.base_url = url;
            }
        }
    }

    /// Reject values that would make the session unusable.
    pub fn validate(&self) -> Result<()> {
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(StylistError::Config(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                self.backend.base_url
            )));
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(StylistError::Config(
                "backend.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.recording.max_duration_secs == 0 || self.recording.tick_interval_ms == 0 {
            return Err(StylistError::Config(
                "recording durations must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the stylist backend. Routes are appended to it.
    pub base_url: String,
    /// Upper bound on a single chat or transcription round trip.
    pub request_timeout_secs: u64,
    /// Interval between background health checks.
    pub health_poll_interval_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            health_poll_interval_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_poll_interval_secs)
    }

    /// Join a route onto the base URL without doubling slashes.
    pub fn endpoint(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Ask the backend for a synthesized audio reply.
    pub return_audio: bool,
    /// Message sent when the user attaches an image without text.
    pub default_image_prompt: String,
    /// Rendered after a failed chat request. Never sent back to the backend.
    pub apology_message: String,
    /// Rendered once when the session opens.
    pub welcome_message: String,
    /// Delay between a transcript arriving and its automatic send.
    pub auto_send_delay_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            return_audio: true,
            default_image_prompt: "What do you think about this item?".to_string(),
            apology_message: "I apologize, but I encountered an error. Please ensure the \
                              backend server is running and try again."
                .to_string(),
            welcome_message: "G'day! I'm your AI Fashion Stylist. Tell me about your event, \
                              show me what you're looking for, or use your voice - I'm here \
                              to help you find the perfect outfit!"
                .to_string(),
            auto_send_delay_ms: 1000,
        }
    }
}

impl ChatConfig {
    pub fn auto_send_delay(&self) -> Duration {
        Duration::from_millis(self.auto_send_delay_ms)
    }
}

/// Microphone capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Capture stops automatically after this many seconds.
    pub max_duration_secs: u64,
    /// Period of the elapsed-time heartbeat.
    pub tick_interval_ms: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 60,
            tick_interval_ms: 1000,
        }
    }
}

impl RecordingConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_temp_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_values() {
        let config = StylistConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.backend.health_poll_interval_secs, 30);
        assert!(config.chat.return_audio);
        assert_eq!(
            config.chat.default_image_prompt,
            "What do you think about this item?"
        );
        assert!(config.chat.apology_message.starts_with("I apologize"));
        assert_eq!(config.chat.auto_send_delay_ms, 1000);
        assert_eq!(config.recording.max_duration_secs, 60);
        assert_eq!(config.recording.tick_interval_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_helpers() {
        let config = StylistConfig::default();
        assert_eq!(config.backend.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.backend.health_poll_interval(), Duration::from_secs(30));
        assert_eq!(config.chat.auto_send_delay(), Duration::from_secs(1));
        assert_eq!(config.recording.max_duration(), Duration::from_secs(60));
        assert_eq!(config.recording.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let mut backend = BackendConfig::default();
        assert_eq!(backend.endpoint("/health"), "http://localhost:8000/health");
        backend.base_url = "http://stylist.local/".to_string();
        assert_eq!(
            backend.endpoint("api/chat"),
            "http://stylist.local/api/chat"
        );
    }

    #[test]
    fn test_config_load_partial_toml() {
        let file = create_temp_config(
            r#"
[backend]
base_url = "https://stylist.example.com"

[chat]
return_audio = false
"#,
        );
        let config = StylistConfig::load(file.path()).unwrap();
        assert_eq!(config.backend.base_url, "https://stylist.example.com");
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert!(!config.chat.return_audio);
        assert_eq!(config.chat.auto_send_delay_ms, 1000);
        assert_eq!(config.recording.max_duration_secs, 60);
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = StylistConfig::load(file.path()).unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = StylistConfig::load(file.path());
        assert!(matches!(result, Err(StylistError::Config(_))));
    }

    #[test]
    fn test_config_load_rejects_non_http_url() {
        let file = create_temp_config("[backend]\nbase_url = \"localhost:8000\"\n");
        let result = StylistConfig::load(file.path());
        assert!(matches!(result, Err(StylistError::Config(msg)) if msg.contains("base_url")));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = StylistConfig::default();
        config.backend.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = StylistConfig::default();
        config.recording.max_duration_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = StylistConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.backend.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut config = StylistConfig::default();
        config.chat.return_audio = false;
        config.recording.max_duration_secs = 30;
        config.save(&path).unwrap();

        let reloaded = StylistConfig::load(&path).unwrap();
        assert!(!reloaded.chat.return_audio);
        assert_eq!(reloaded.recording.max_duration_secs, 30);
        assert_eq!(reloaded.chat.welcome_message, config.chat.welcome_message);
    }
}

//! Command-line arguments for the stylist console.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "STYLIST_CONFIG";

/// Stylist - a conversational fashion assistant for the terminal.
#[derive(Parser, Debug)]
#[command(name = "stylist", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the stylist backend.
    #[arg(short = 'u', long = "base-url")]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Do not ask the backend for spoken replies.
    #[arg(long = "no-audio")]
    pub no_audio: bool,

    /// Directory where spoken replies are written.
    #[arg(long = "audio-dir")]
    pub audio_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > STYLIST_CONFIG env var > ~/.stylist/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level, falling back to the configured one.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    pub fn resolve_audio_dir(&self) -> PathBuf {
        self.audio_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("stylist"))
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".stylist").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".stylist").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "stylist",
            "--config",
            "/tmp/stylist.toml",
            "--base-url",
            "http://10.0.0.2:8000",
            "--no-audio",
        ]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/stylist.toml"));
        assert_eq!(args.base_url.as_deref(), Some("http://10.0.0.2:8000"));
        assert!(args.no_audio);
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = CliArgs::parse_from(["stylist"]);
        assert_eq!(args.resolve_log_level("warn"), "warn");

        let args = CliArgs::parse_from(["stylist", "-l", "debug"]);
        assert_eq!(args.resolve_log_level("warn"), "debug");
    }
}

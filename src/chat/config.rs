//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the binary runs with.  The endpoint's base URL is settled here and
//! nowhere else.

use std::env;
use std::path::PathBuf;

use arrrg_derive::CommandLine;
use directories::ProjectDirs;

use crate::client::DEFAULT_BASE_URL;

/// Environment variable consulted for the base URL when no flag is given.
pub const BASE_URL_ENV: &str = "PALAVER_API_URL";

/// Directory used when the platform reports no data directory.
const FALLBACK_DATA_DIR: &str = ".palaver";

/// Command-line arguments for the palaver-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Origin of the chat endpoint.
    #[arrrg(optional, "Chat endpoint base URL (default: $PALAVER_API_URL or http://localhost:5050)", "URL")]
    pub base_url: Option<String>,

    /// Where the credential and transcript are kept.
    #[arrrg(optional, "Directory for the saved API key and conversation", "DIR")]
    pub data_dir: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL of the chat endpoint; requests go to `{base_url}/chat`.
    pub base_url: String,

    /// Directory backing the key-value store.
    pub data_dir: PathBuf,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: http://localhost:5050
    /// - Data directory: the platform data directory for palaver
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: default_data_dir(),
            use_color: true,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Resolves configuration from parsed arguments and an environment lookup.
    ///
    /// The base URL comes from `--base-url`, else the [`BASE_URL_ENV`] variable, else
    /// the default.  Blank values count as unset.
    pub fn resolve(args: ChatArgs, lookup_env: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = args
            .base_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| lookup_env(BASE_URL_ENV).filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let data_dir = args
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        ChatConfig {
            base_url,
            data_dir,
            use_color: !args.no_color,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        Self::resolve(args, |name| env::var(name).ok())
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "palaver")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.base_url, "http://localhost:5050");
        assert!(config.use_color);
        assert!(!config.data_dir.as_os_str().is_empty());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::resolve(ChatArgs::default(), no_env);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            base_url: Some("https://chat.example.com".to_string()),
            data_dir: Some("/tmp/palaver-test".to_string()),
            no_color: true,
        };
        let config = ChatConfig::resolve(args, no_env);
        assert_eq!(config.base_url, "https://chat.example.com");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/palaver-test"));
        assert!(!config.use_color);
    }

    #[test]
    fn env_supplies_base_url_when_flag_absent() {
        let env = |name: &str| (name == BASE_URL_ENV).then(|| "http://env.example:9000".to_string());
        let config = ChatConfig::resolve(ChatArgs::default(), env);
        assert_eq!(config.base_url, "http://env.example:9000");

        let args = ChatArgs {
            base_url: Some("http://flag.example".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::resolve(args, env);
        assert_eq!(config.base_url, "http://flag.example");
    }

    #[test]
    fn blank_values_fall_through() {
        let args = ChatArgs {
            base_url: Some("  ".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::resolve(args, |_| Some(String::new()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_base_url("http://127.0.0.1:8080")
            .with_data_dir("state")
            .without_color();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.data_dir, PathBuf::from("state"));
        assert!(!config.use_color);
    }
}

// ABOUTME: Configuration loading and validation for the tracklog binary.
// ABOUTME: Reads TRACKLOG_* environment variables and falls back to a home-relative layout.

use std::path::PathBuf;

use thiserror::Error;
use tracklog_core::DEFAULT_CREATOR;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TRACKLOG_CREATOR must not contain control characters: {0:?}")]
    InvalidCreator(String),
}

/// Configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct TracklogConfig {
    pub home: PathBuf,
    pub documents_dir: PathBuf,
    pub creator: String,
}

impl TracklogConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - TRACKLOG_HOME: data directory holding the point store (default: ~/.tracklog)
    /// - TRACKLOG_DOCUMENTS: where recovered GPX files go (default: $TRACKLOG_HOME/documents)
    /// - TRACKLOG_CREATOR: creator written into GPX files (default: tracklog)
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = non_empty_var("TRACKLOG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("/tmp"))
                    .join(".tracklog")
            });

        let documents_dir = non_empty_var("TRACKLOG_DOCUMENTS")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("documents"));

        let creator =
            non_empty_var("TRACKLOG_CREATOR").unwrap_or_else(|| DEFAULT_CREATOR.to_string());
        if creator.chars().any(char::is_control) {
            return Err(ConfigError::InvalidCreator(creator));
        }

        Ok(Self {
            home,
            documents_dir,
            creator,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

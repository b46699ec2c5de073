// SPDX-License-Identifier: MPL-2.0

use crate::config::{APP_ID, DEFAULT_GRAPH_URL, DEFAULT_GRAPH_VERSION, DEFAULT_POST_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize settings: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a context build does when one fetched post cannot be normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPostPolicy {
    /// Fail the whole build.
    #[default]
    Abort,
    /// Log the post and build from the rest.
    Skip,
}

/// Persistent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub graph_url: String,
    pub graph_version: String,
    /// Semantic index endpoint; documents are not forwarded when unset
    pub index_url: Option<String>,
    pub default_post_limit: usize,
    pub malformed_posts: MalformedPostPolicy,
    /// Lifetime of newly created sessions; unset means they never expire
    pub session_ttl_hours: Option<i64>,
    /// Database location; the XDG data dir when unset
    pub database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            graph_version: DEFAULT_GRAPH_VERSION.to_string(),
            index_url: None,
            default_post_limit: DEFAULT_POST_LIMIT,
            malformed_posts: MalformedPostPolicy::default(),
            session_ttl_hours: None,
            database_path: None,
        }
    }
}

impl Settings {
    /// Get the settings file path (~/.config/io.github.sethcottle.Pagectx/settings.json)
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_ID);
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the default location, or return defaults if not found
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from `path`; missing or unreadable files yield defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "ignoring unreadable settings: {e}");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;

        Ok(())
    }

    /// Session lifetime as a duration, if one is configured. Hour counts
    /// too large for chrono are treated as no expiry.
    pub fn session_ttl(&self) -> Option<chrono::TimeDelta> {
        let hours = self.session_ttl_hours?;
        let ttl = chrono::TimeDelta::try_hours(hours);
        if ttl.is_none() {
            tracing::warn!(hours, "session_ttl_hours out of range; sessions will not expire");
        }
        ttl
    }
}

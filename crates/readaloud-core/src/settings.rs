//! Settings domain types and validation.
//!
//! Settings come from three layers, lowest priority first: a JSON file,
//! `READALOUD_*` environment variables, then command-line flags (applied by
//! the host). Every field is optional so partial layers merge cleanly.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Voice used when a channel has no preference.
pub const DEFAULT_VOICE: &str = "en-US-AriaNeural";

/// How long the voice list is trusted before it is fetched again.
pub const DEFAULT_VOICE_CACHE_TTL_SECS: u64 = 6 * 60 * 60;

/// How long a channel's voice preference is trusted before it is re-read.
pub const DEFAULT_PREFERENCE_CACHE_TTL_SECS: u64 = 5 * 60;

/// How long a cancelled session waits for the sink to acknowledge the stop.
pub const DEFAULT_STOP_GRACE_MS: u64 = 2_000;

/// Container hint for the decoder when the synthesizer does not say.
pub const DEFAULT_FORMAT_HINT: &str = "mp3";

/// Application settings structure.
///
/// All fields are optional to support partial updates and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Voice used when a channel has no stored preference.
    pub default_voice: Option<String>,

    /// Base URL of the HTTP synthesizer.
    pub synthesizer_endpoint: Option<String>,

    /// Voice catalog time-to-live, in seconds.
    pub voice_cache_ttl_secs: Option<u64>,

    /// Per-channel preference cache time-to-live, in seconds.
    pub preference_cache_ttl_secs: Option<u64>,

    /// Grace period for the sink to acknowledge a stop, in milliseconds.
    pub stop_grace_ms: Option<u64>,

    /// Container hint for the decoder (`mp3`, `ogg`, `wav`).
    pub format_hint: Option<String>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            default_voice: Some(DEFAULT_VOICE.to_string()),
            synthesizer_endpoint: None,
            voice_cache_ttl_secs: Some(DEFAULT_VOICE_CACHE_TTL_SECS),
            preference_cache_ttl_secs: Some(DEFAULT_PREFERENCE_CACHE_TTL_SECS),
            stop_grace_ms: Some(DEFAULT_STOP_GRACE_MS),
            format_hint: Some(DEFAULT_FORMAT_HINT.to_string()),
        }
    }

    /// Read settings from `READALOUD_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// `EDGE_TTS_VOICE` is accepted as a fallback for `READALOUD_VOICE`.
    /// Numeric values that fail to parse are ignored with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| {
            non_empty(key).and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key, value = %raw, error = %e, "Ignoring non-numeric setting");
                    None
                }
            })
        };

        Self {
            default_voice: non_empty("READALOUD_VOICE").or_else(|| non_empty("EDGE_TTS_VOICE")),
            synthesizer_endpoint: non_empty("READALOUD_ENDPOINT"),
            voice_cache_ttl_secs: number("READALOUD_VOICE_CACHE_TTL_SECS"),
            preference_cache_ttl_secs: number("READALOUD_PREFERENCE_CACHE_TTL_SECS"),
            stop_grace_ms: number("READALOUD_STOP_GRACE_MS"),
            format_hint: non_empty("READALOUD_FORMAT_HINT"),
        }
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &Self) {
        if other.default_voice.is_some() {
            self.default_voice.clone_from(&other.default_voice);
        }
        if other.synthesizer_endpoint.is_some() {
            self.synthesizer_endpoint.clone_from(&other.synthesizer_endpoint);
        }
        if other.voice_cache_ttl_secs.is_some() {
            self.voice_cache_ttl_secs = other.voice_cache_ttl_secs;
        }
        if other.preference_cache_ttl_secs.is_some() {
            self.preference_cache_ttl_secs = other.preference_cache_ttl_secs;
        }
        if other.stop_grace_ms.is_some() {
            self.stop_grace_ms = other.stop_grace_ms;
        }
        if other.format_hint.is_some() {
            self.format_hint.clone_from(&other.format_hint);
        }
    }

    /// Get the effective default voice (with default fallback).
    #[must_use]
    pub fn effective_default_voice(&self) -> &str {
        self.default_voice.as_deref().unwrap_or(DEFAULT_VOICE)
    }

    #[must_use]
    pub fn effective_voice_cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.voice_cache_ttl_secs
                .unwrap_or(DEFAULT_VOICE_CACHE_TTL_SECS),
        )
    }

    #[must_use]
    pub fn effective_preference_cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.preference_cache_ttl_secs
                .unwrap_or(DEFAULT_PREFERENCE_CACHE_TTL_SECS),
        )
    }

    #[must_use]
    pub fn effective_stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms.unwrap_or(DEFAULT_STOP_GRACE_MS))
    }

    #[must_use]
    pub fn effective_format_hint(&self) -> &str {
        self.format_hint.as_deref().unwrap_or(DEFAULT_FORMAT_HINT)
    }

    /// Validate settings values.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self
            .default_voice
            .as_ref()
            .is_some_and(|v| v.trim().is_empty())
        {
            return Err(SettingsError::EmptyVoice);
        }

        if let Some(endpoint) = &self.synthesizer_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(SettingsError::InvalidEndpoint(endpoint.clone()));
            }
        }

        if let Some(grace) = self.stop_grace_ms {
            if !(10..=60_000).contains(&grace) {
                return Err(SettingsError::InvalidStopGrace(grace));
            }
        }

        Ok(())
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Default voice cannot be empty")]
    EmptyVoice,

    #[error("Synthesizer endpoint must be an http(s) URL, got {0}")]
    InvalidEndpoint(String),

    #[error("Stop grace must be between 10 and 60000 ms, got {0}")]
    InvalidStopGrace(u64),

    #[error("Failed to read settings file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse settings file {path}: {reason}")]
    Parse { path: String, reason: String },
}

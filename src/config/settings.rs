//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::stt::EngineRevision;

use super::AppPaths;

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for model selection and recognition language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Active model id from the catalog (e.g. `"stream-base-v3"`).
    pub model: String,
    /// Speech language as a short ISO-639-1 code (e.g. `"en"`). Adapters
    /// expand this to whatever locale form their engine requires.
    pub language: String,
    /// Revision of the local streaming engine. Fixed for a whole session;
    /// changing it takes effect on the next preparation.
    pub revision: EngineRevision,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "stream-base-v3".into(),
            language: "en".into(),
            revision: EngineRevision::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// StreamingConfig
// ---------------------------------------------------------------------------

/// Per-model streaming preferences.
///
/// Only consulted for models whose capability is `BatchAndStreaming`;
/// streaming-only and batch-only models ignore it. A model id absent from
/// the map means "streaming enabled" (the default).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Explicit per-model overrides, keyed by model id.
    pub model_enabled: HashMap<String, bool>,
}

impl StreamingConfig {
    /// Whether streaming is enabled for `model_id`. Absent ⇒ `true`.
    pub fn is_enabled_for(&self, model_id: &str) -> bool {
        self.model_enabled.get(model_id).copied().unwrap_or(true)
    }

    /// Record an explicit preference for `model_id`.
    pub fn set_enabled_for(&mut self, model_id: impl Into<String>, enabled: bool) {
        self.model_enabled.insert(model_id.into(), enabled);
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and buffer cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate in Hz handed to the engines (must be 16 000).
    pub sample_rate: u32,
    /// Nominal buffer duration in milliseconds on the producer path.
    pub chunk_ms: u64,
    /// Audio input device name — `None` means the system default.
    pub input_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_ms: 85,
            input_device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voxstream::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model selection and language.
    pub stt: SttConfig,
    /// Per-model streaming preferences.
    pub streaming: StreamingConfig,
    /// Audio capture settings.
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.stt.model, loaded.stt.model);
        assert_eq!(original.stt.language, loaded.stt.language);
        assert_eq!(original.stt.revision, loaded.stt.revision);
        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);
        assert_eq!(original.audio.chunk_ms, loaded.audio.chunk_ms);
        assert_eq!(original.audio.input_device, loaded.audio.input_device);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.stt.model, default.stt.model);
        assert_eq!(config.stt.language, default.stt.language);
        assert_eq!(config.audio.sample_rate, default.audio.sample_rate);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.stt.model, "stream-base-v3");
        assert_eq!(cfg.stt.language, "en");
        assert_eq!(cfg.stt.revision, EngineRevision::V3);
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.audio.chunk_ms, 85);
        assert!(cfg.streaming.model_enabled.is_empty());
    }

    #[test]
    fn streaming_preference_defaults_to_enabled() {
        let cfg = StreamingConfig::default();
        assert!(cfg.is_enabled_for("system-speech"));
        assert!(cfg.is_enabled_for("anything-at-all"));
    }

    #[test]
    fn streaming_preference_explicit_disable_survives_round_trip() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.streaming.set_enabled_for("system-speech", false);
        cfg.stt.revision = EngineRevision::V2;
        cfg.stt.language = "de".into();

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert!(!loaded.streaming.is_enabled_for("system-speech"));
        assert!(loaded.streaming.is_enabled_for("stream-base-v3"));
        assert_eq!(loaded.stt.revision, EngineRevision::V2);
        assert_eq!(loaded.stt.language, "de");
    }
}

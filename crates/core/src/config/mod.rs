use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::gestures::MismatchPolicy;
use crate::intro::IntroTimetable;
use crate::timeline::Millis;
use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub intro: IntroConfig,
    pub gestures: GestureConfig,
    pub modal: ModalConfig,
}

impl AppConfig {
    /// Reads a JSON config file. Missing sections and fields keep their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Configuration specific to the audio session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioConfig {
    /// Directory every sound locator is built under.
    pub asset_root: String,
    /// Mute state used when nothing has been persisted yet.
    pub muted_by_default: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            asset_root: "/sounds".to_string(),
            muted_by_default: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntroConfig {
    pub timetable: IntroTimetable,
    /// Delay between completion and the overlay being unmounted.
    pub grace_ms: Millis,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            timetable: IntroTimetable::default(),
            grace_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GestureConfig {
    pub director_mode_ms: Millis,
    pub action_ms: Millis,
    pub film_burn_ms: Millis,
    pub burst_threshold: u32,
    pub burst_window_ms: Millis,
    pub mismatch_policy: MismatchPolicy,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            director_mode_ms: 5_000,
            action_ms: 3_000,
            film_burn_ms: 2_000,
            burst_threshold: 5,
            burst_window_ms: 2_000,
            mismatch_policy: MismatchPolicy::Reset,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModalConfig {
    /// Length of the simulated reel-loading transition.
    pub loading_ms: Millis,
    /// Delay after closing before the selected entry is dropped.
    pub close_clear_ms: Millis,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            loading_ms: 2_000,
            close_clear_ms: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json_str(
            r#"{ "audio": { "mutedByDefault": true }, "modal": { "loadingMs": 750 } }"#,
        )
        .unwrap();

        assert!(config.audio.muted_by_default);
        assert_eq!(config.audio.asset_root, "/sounds");
        assert_eq!(config.modal.loading_ms, 750);
        assert_eq!(config.modal.close_clear_ms, 300);
        assert_eq!(config.gestures.burst_threshold, 5);
        assert_eq!(config.intro.grace_ms, 500);
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.json");
        fs::write(&path, r#"{ "gestures": { "mismatchPolicy": "restartOnFirst" } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.gestures.mismatch_policy, MismatchPolicy::RestartOnFirst);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(AppConfig::from_json_str("{ audio: ").is_err());
    }
}

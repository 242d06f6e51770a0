//! Persistent CLI settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use deltawav_core::ipc::events::{AUDIO_DELTA_EVENT, CONTENT_KEY, FAILURE_EVENT, TERMINAL_EVENT};
use deltawav_core::{AssemblerConfig, AudioFormat, DecodePolicy, PipelineConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct CliSettings {
    pub audio_delta_event: String,
    pub terminal_event: String,
    /// Empty string disables failure-event detection.
    pub failure_event: String,
    pub content_key: String,
    /// `"strict"` or `"lenient"`.
    pub decode_policy: String,
    /// Whole-run time budget in seconds; `None` waits forever.
    pub deadline_secs: Option<u64>,
    pub sample_rate: u32,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            audio_delta_event: AUDIO_DELTA_EVENT.into(),
            terminal_event: TERMINAL_EVENT.into(),
            failure_event: FAILURE_EVENT.into(),
            content_key: CONTENT_KEY.into(),
            decode_policy: "strict".into(),
            deadline_secs: None,
            sample_rate: AudioFormat::default().sample_rate,
        }
    }
}

impl CliSettings {
    pub fn normalize(&mut self) {
        let defaults = CliSettings::default();
        self.audio_delta_event = non_blank_or(&self.audio_delta_event, &defaults.audio_delta_event);
        self.terminal_event = non_blank_or(&self.terminal_event, &defaults.terminal_event);
        self.failure_event = self.failure_event.trim().to_string();
        self.content_key = non_blank_or(&self.content_key, &defaults.content_key);
        self.decode_policy = normalize_decode_policy(&self.decode_policy);
        self.deadline_secs = self.deadline_secs.map(|s| s.clamp(1, 86_400));
        if self.sample_rate == 0 {
            self.sample_rate = defaults.sample_rate;
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            assembler: AssemblerConfig {
                audio_delta_event: self.audio_delta_event.clone(),
                terminal_event: self.terminal_event.clone(),
                failure_event: Some(self.failure_event.clone()).filter(|e| !e.is_empty()),
                content_key: self.content_key.clone(),
                decode_policy: match self.decode_policy.as_str() {
                    "lenient" => DecodePolicy::Lenient,
                    _ => DecodePolicy::Strict,
                },
                deadline: self.deadline_secs.map(Duration::from_secs),
                ..AssemblerConfig::default()
            },
            format: AudioFormat {
                sample_rate: self.sample_rate,
                ..AudioFormat::default()
            },
        }
    }
}

fn non_blank_or(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn normalize_decode_policy(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "lenient" | "skip" => "lenient".into(),
        _ => "strict".into(),
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("deltawav")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("deltawav")
            .join("settings.json")
    }
}

/// Load settings, falling back to defaults when the file is missing or bad.
pub fn load_settings(path: &Path) -> CliSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str::<CliSettings>(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), "ignoring malformed settings: {e}");
            CliSettings::default()
        }),
        Err(_) => CliSettings::default(),
    };
    settings.normalize();
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("absent.json"));
        assert_eq!(settings, CliSettings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"decodePolicy":" Skip ","deadlineSecs":0}"#).unwrap();

        let settings = load_settings(&path);
        assert_eq!(settings.decode_policy, "lenient");
        assert_eq!(settings.deadline_secs, Some(1));
        assert_eq!(settings.terminal_event, "done");
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(&path), CliSettings::default());
    }

    #[test]
    fn blank_names_restore_defaults_and_empty_failure_disables() {
        let mut settings = CliSettings {
            audio_delta_event: "  ".into(),
            failure_event: " ".into(),
            sample_rate: 0,
            ..CliSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.audio_delta_event, AUDIO_DELTA_EVENT);
        assert_eq!(settings.sample_rate, 24_000);

        let config = settings.pipeline_config();
        assert_eq!(config.assembler.failure_event, None);
        assert_eq!(config.assembler.decode_policy, DecodePolicy::Strict);
        assert_eq!(config.format, AudioFormat::default());
    }
}

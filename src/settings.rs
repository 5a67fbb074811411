use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::store::MAX_RECORDS;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub history_limit: usize,
    pub speech_command: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_limit: MAX_RECORDS,
            speech_command: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    system: Option<SystemSettings>,
    speech: Option<SpeechSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct SystemSettings {
    histories: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechSettings {
    command: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];

    if let Some(home) = paths::base_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(system) = incoming.system {
            if let Some(limit) = system.histories {
                if limit > 0 {
                    self.history_limit = limit.min(MAX_RECORDS);
                }
            }
        }
        if let Some(speech) = incoming.speech {
            if let Some(command) = speech.command {
                if !command.trim().is_empty() {
                    self.speech_command = Some(command);
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = paths::base_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

use crate::board::BoardSettings;
use crate::error::AppError;
use crate::reminder::{DEADLINE_WINDOW, REMINDER_WINDOW, SCAN_INTERVAL, ScanWindows};
use crate::storage::json_store::data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
pub const CONFIG_ENV_VAR: &str = "TASKBOARD_CONFIG_PATH";

#[derive(Debug, Clone)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        if self.accent.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.accent, text, self.reset)
        }
    }

    pub fn mutedize(&self, text: &str) -> String {
        if self.muted.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.muted, text, self.reset)
        }
    }
}

pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    match theme.and_then(canonical_theme_name).as_deref() {
        Some("noir") => Palette {
            accent: "\x1b[38;5;208m",
            muted: "\x1b[38;5;250m",
            reset: "\x1b[0m",
        },
        Some("solarized") => Palette {
            accent: "\x1b[38;5;108m",
            muted: "\x1b[38;5;250m",
            reset: "\x1b[0m",
        },
        _ => Palette {
            accent: "",
            muted: "",
            reset: "",
        },
    }
}

pub fn canonical_theme_name(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        return Some("default".into());
    }

    match trimmed {
        "vanilla" | "light" => Some("default".to_string()),
        "dark" | "dark_mode" | "darkmode" => Some("noir".to_string()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: Option<String>,
    pub reminder_window_minutes: u32,
    pub deadline_window_minutes: u32,
    pub scan_interval_seconds: u64,
    pub seed_demo_tasks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: None,
            reminder_window_minutes: REMINDER_WINDOW.whole_minutes() as u32,
            deadline_window_minutes: DEADLINE_WINDOW.whole_minutes() as u32,
            scan_interval_seconds: SCAN_INTERVAL.as_secs(),
            seed_demo_tasks: true,
        }
    }
}

impl Config {
    pub fn scan_windows(&self) -> ScanWindows {
        ScanWindows {
            reminder: time::Duration::minutes(i64::from(self.reminder_window_minutes)),
            deadline: time::Duration::minutes(i64::from(self.deadline_window_minutes)),
        }
    }

    pub fn scan_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.scan_interval_seconds)
    }

    pub fn board_settings(&self) -> BoardSettings {
        BoardSettings {
            windows: self.scan_windows(),
            seed_demo_tasks: self.seed_demo_tasks,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.reminder_window_minutes == 0 {
            return Err(AppError::invalid_data(
                "reminder_window_minutes must be positive",
            ));
        }
        if self.deadline_window_minutes == 0 {
            return Err(AppError::invalid_data(
                "deadline_window_minutes must be positive",
            ));
        }
        if self.scan_interval_seconds == 0 {
            return Err(AppError::invalid_data(
                "scan_interval_seconds must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub reminder_window_minutes: Option<u32>,
    pub deadline_window_minutes: Option<u32>,
    pub scan_interval_seconds: Option<u64>,
    pub seed_demo_tasks: Option<bool>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(data_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let mut config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.validate()?;
    config.theme = config.theme.and_then(|name| canonical_theme_name(&name));
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Result<Config, AppError> {
    let mut merged = base.clone();
    if let Some(theme) = overrides.theme.as_deref()
        && let Some(normalized) = canonical_theme_name(theme)
    {
        merged.theme = Some(normalized);
    }
    if let Some(minutes) = overrides.reminder_window_minutes {
        merged.reminder_window_minutes = minutes;
    }
    if let Some(minutes) = overrides.deadline_window_minutes {
        merged.deadline_window_minutes = minutes;
    }
    if let Some(seconds) = overrides.scan_interval_seconds {
        merged.scan_interval_seconds = seconds;
    }
    if let Some(seed) = overrides.seed_demo_tasks {
        merged.seed_demo_tasks = seed;
    }

    merged.validate()?;
    Ok(merged)
}

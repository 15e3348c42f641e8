use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::model::{DEFAULT_CLASS_COLOR, ReminderPolicy};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub defaults: DefaultsConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding `schedule.json`, `exams.json` and `notes.json`.
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DefaultsConfig {
    pub class_color: String,
    pub reminder: ReminderPolicy,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            class_color: DEFAULT_CLASS_COLOR.to_string(),
            reminder: ReminderPolicy::Off,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ViewConfig {
    /// Weeks before the current one offered by the week picker.
    pub weeks_before: u32,
    /// Weeks after the current one offered by the week picker.
    pub weeks_after: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            weeks_before: 2,
            weeks_after: 7,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("week-planner")
}

fn default_output_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("week-planner");

        let defaults = DefaultsConfig::default();
        let view = ViewConfig::default();

        let builder = Config::builder()
            // 1. Load default values
            // Storage
            .set_default("storage.data_dir", default_data_dir().to_string_lossy().to_string())?
            // Export
            .set_default("export.output_dir", default_output_dir().to_string_lossy().to_string())?
            // Defaults for new entries
            .set_default("defaults.class_color", defaults.class_color)?
            .set_default("defaults.reminder", defaults.reminder.as_str())?
            // Week picker
            .set_default("view.weeks_before", i64::from(view.weeks_before))?
            .set_default("view.weeks_after", i64::from(view.weeks_after))?

            // 2. Load from local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))

            // 3. Load from user config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))

            // 4. Load from Environment variables (PLANNER__STORAGE__DATA_DIR=...)
            .add_source(Environment::with_prefix("PLANNER").separator("__"));

        let s = builder.build().context("Failed to assemble configuration")?;
        s.try_deserialize().context("Invalid configuration")
    }
}

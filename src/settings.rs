// Panel settings: the explicit configuration object that replaces the
// browser panel's localStorage blob. Loaded once at start-up, written back
// through a single call when something changes.
use crate::types::PeriodWindow;
use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const SETTINGS_FILE: &str = "panel_settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataMode {
    #[default]
    Demo,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// UASG code of the institutional unit.
    #[serde(default = "default_uasg")]
    pub uasg: String,
    /// CNPJ used to resolve the agency code for contract queries.
    #[serde(default = "default_cnpj")]
    pub cnpj: String,
    /// Plan year (PCA).
    #[serde(default = "default_year")]
    pub year: i32,
    /// Contract reporting window, inclusive.
    #[serde(default = "default_year_start")]
    pub year_start: i32,
    #[serde(default = "default_year")]
    pub year_end: i32,
    #[serde(default)]
    pub data_mode: DataMode,
}

fn default_uasg() -> String {
    "156677".to_string()
}

fn default_cnpj() -> String {
    "35854176000195".to_string()
}

fn default_year() -> i32 {
    Utc::now().year()
}

fn default_year_start() -> i32 {
    default_year() - 2
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            uasg: default_uasg(),
            cnpj: default_cnpj(),
            year: default_year(),
            year_start: default_year_start(),
            year_end: default_year(),
            data_mode: DataMode::default(),
        }
    }
}

impl Settings {
    pub fn window(&self) -> PeriodWindow {
        PeriodWindow {
            start: self.year_start,
            end: self.year_end,
        }
    }
}

/// Missing or corrupt settings fall back to the defaults, the same
/// forgiving behavior the panel had for its stored settings.
pub fn load(path: impl AsRef<Path>) -> Settings {
    match fs::read_to_string(path.as_ref()) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                debug!(error = %e, "settings file unreadable, using defaults");
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

pub fn save(path: impl AsRef<Path>, settings: &Settings) -> Result<()> {
    let raw = serde_json::to_string_pretty(settings)?;
    fs::write(path.as_ref(), raw)
        .with_context(|| format!("gravando {}", path.as_ref().display()))?;
    Ok(())
}

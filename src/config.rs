use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, Result};

/// Top-level settings loaded from config.toml.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub business: Business,
    pub billing: BillingSettings,
    pub tax: TaxSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Business {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingSettings {
    pub hourly_rate: f64,
    pub currency: String,
    pub payment_terms_days: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaxSettings {
    /// Flat income-tax rate used by the quarterly estimator (e.g., 0.30).
    pub quarterly_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            business: Business {
                name: "Your Business".to_string(),
            },
            billing: BillingSettings {
                hourly_rate: 150.0,
                currency: "USD".to_string(),
                payment_terms_days: 30,
            },
            tax: TaxSettings {
                quarterly_rate: 0.30,
            },
        }
    }
}

impl Settings {
    /// Load config.toml from the config directory.
    pub fn load(config_dir: &Path) -> Result<Settings> {
        if !config_dir.exists() {
            return Err(LedgerError::ConfigNotFound(config_dir.to_path_buf()));
        }
        let path = config_dir.join("config.toml");
        if !path.exists() {
            return Err(LedgerError::ConfigFileNotFound(path));
        }
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| LedgerError::ConfigParse { path, source: e })
    }
}

/// Get the config directory path (~/.solobooks/ or XDG equivalent)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "solobooks") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        LedgerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".solobooks"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Path of the billing data file inside the config directory.
pub fn data_file(config_dir: &Path) -> PathBuf {
    config_dir.join("data").join("billing.json")
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[business]
name = "Your Business"

[billing]
hourly_rate = 150.0
currency = "USD"
payment_terms_days = 30

[tax]
# Flat income-tax rate used for quarterly estimates (advisory only).
quarterly_rate = 0.30
"#;

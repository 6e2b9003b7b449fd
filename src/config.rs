use std::path::Path;
use std::{env, fs};

use serde::Deserialize;

use crate::db::StoreId;
use crate::error::{Error, Result};

pub const CONFIG_PATH_VAR: &str = "RESTO_TILL_CONFIG";
pub const DATABASE_PATH_VAR: &str = "RESTO_TILL_DB";
const DEFAULT_CONFIG_PATH: &str = "resto-till.toml";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: String,
    /// Explicit key of the snapshot row. Derived from `restaurant_name` when absent.
    pub store_id: Option<String>,
    pub restaurant_name: String,
    pub log_filter: String,
    pub recent_window_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: "resto_till.db".to_string(),
            store_id: None,
            restaurant_name: "default".to_string(),
            log_filter: "info".to_string(),
            recent_window_days: 7,
        }
    }
}

impl AppConfig {
    pub fn store_id(&self) -> StoreId {
        match &self.store_id {
            Some(id) if !id.trim().is_empty() => StoreId::new(id.trim()),
            _ => StoreId::for_restaurant(&self.restaurant_name),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = fs::read_to_string(path_ref)
        .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path_ref, e)))?;
    parse_config(&contents).map_err(|e| {
        Error::Config(format!(
            "Failed to parse TOML from config file {:?}: {}",
            path_ref, e
        ))
    })
}

fn parse_config(contents: &str) -> std::result::Result<AppConfig, toml::de::Error> {
    toml::from_str(contents)
}

/// Resolves the config file from `RESTO_TILL_CONFIG`, falling back to defaults
/// when the file does not exist, then applies `RESTO_TILL_DB`.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        tracing::info!("No config file at {}, using defaults", path);
        AppConfig::default()
    };

    if let Ok(db_path) = env::var(DATABASE_PATH_VAR) {
        if !db_path.trim().is_empty() {
            config.database_path = db_path;
        }
    }

    if config.recent_window_days == 0 {
        return Err(Error::Config(
            "recent_window_days must be at least 1".to_string(),
        ));
    }

    Ok(config)
}

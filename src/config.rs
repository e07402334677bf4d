//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the fishing-config.toml
//! file. It covers the default fishing spot, the store location, logging, the engine's
//! fan-out and any extra species profiles.
//!
//! The documented caps (species per report, date-range lengths, historical window)
//! are constants in their modules, not configuration.

use crate::species::{SpeciesProfile, SpeciesRegistry};
use crate::Location;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "fishing-config.toml";

/// Application configuration loaded from fishing-config.toml
///
/// Every section is optional; missing ones take their defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Spot details used to fill in what a query leaves out
    pub location: LocationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub history: HistoryConfig,
    /// Extra or overriding species profiles
    pub species: Vec<SpeciesProfile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Depth bands in metres
    pub depths: Vec<f64>,
    pub bottom_type: Option<String>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: "Bergen Outer Reef".to_string(),
            latitude: 60.39,
            longitude: 5.32,
            depths: vec![10.0, 20.0, 40.0],
            bottom_type: Some("rock".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON store file holding lunar phases, migration events and catch history
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "fishing-store.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter used when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Days computed concurrently in a multi-day report
    pub max_parallel_days: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_parallel_days: 4 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Catch records further than this from the requested spot are ignored
    pub radius_km: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { radius_km: 50.0 }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(location = %config.location.name, "configuration loaded");
                    config
                }
                Err(e) => {
                    warn!("invalid config file format: {e}; using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.as_ref().display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save current configuration as pretty TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Built-in registry with configured species appended or overriding by code.
    pub fn species_registry(&self) -> SpeciesRegistry {
        let mut registry = SpeciesRegistry::builtin();
        for profile in &self.species {
            registry.insert(profile.clone());
        }
        registry
    }

    /// Default spot, used to fill name, depths and bottom type on queries.
    pub fn default_location(&self) -> Location {
        let mut location = Location::new(self.location.latitude, self.location.longitude, &self.location.name)
            .with_depths(self.location.depths.clone());
        location.bottom_type = self.location.bottom_type.clone();
        location
    }

    pub fn max_parallel_days(&self) -> usize {
        self.engine.max_parallel_days.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.location.name, "Bergen Outer Reef");
        assert_eq!(config.storage.path, "fishing-store.json");
        assert_eq!(config.engine.max_parallel_days, 4);
        assert_eq!(config.history.radius_km, 50.0);
        assert!(config.species.is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.location.name, parsed.location.name);
        assert_eq!(config.location.depths, parsed.location.depths);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        assert_eq!(config.location.name, "Bergen Outer Reef");
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "this is = = not toml").unwrap();
        let config = Config::load_from_path(file.path());
        assert_eq!(config.storage.path, "fishing-store.json");
    }

    #[test]
    fn test_species_added_from_config() {
        let toml_str = r#"
            [location]
            name = "Lofoten"
            latitude = 68.2
            longitude = 14.5

            [storage]
            path = "store.json"

            [logging]
            level = "debug"

            [engine]
            max_parallel_days = 0

            [history]
            radius_km = 25.0

            [[species]]
            code = "skrei"
            name = "Skrei Cod"
            peak_day = 60
            spread_days = 20.0
            base_probability = 0.05
            peak_probability = 0.95
            depths = [60.0, 100.0]
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let registry = config.species_registry();
        let skrei = registry.get("SKREI").unwrap();
        assert_eq!(skrei.confidence, 0.6);
        assert!(registry.contains("COD"));
        assert_eq!(config.max_parallel_days(), 1);
        assert_eq!(config.default_location().depths, vec![10.0, 20.0, 40.0]);
    }

    #[test]
    fn test_partial_file_keeps_given_sections() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"
            [location]
            name = "Lofoten"
            latitude = 68.2
            longitude = 14.5
            "#,
        )
        .unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.location.name, "Lofoten");
        assert_eq!(config.location.latitude, 68.2);
        assert_eq!(config.location.depths, vec![10.0, 20.0, 40.0]);
        assert_eq!(config.storage.path, "fishing-store.json");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.max_parallel_days(), 4);
        assert_eq!(config.history.radius_km, 50.0);
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.location.name = "Saved Spot".to_string();
        config.save(file.path()).unwrap();
        assert_eq!(Config::load_from_path(file.path()).location.name, "Saved Spot");
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use homestage_fixtures::{Fixture, FixtureKind, UNIVERSE_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::AudioConfig;
use crate::output::ArtNetConfig;
use crate::pattern::SelectionPolicy;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "homestage.json";

/// One patched fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub class: FixtureKind,
    /// Zero-based first channel.
    #[serde(default)]
    pub address: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub selection: SelectionPolicy,
    /// Fixed RNG seed for reproducible shows.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub artnet: ArtNetConfig,
}

/// Everything the stage reads at startup. Missing keys fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub debug: bool,
    /// Capture device name; `None` leaves audio analysis idle.
    pub microphone: Option<String>,
    pub fixtures: Vec<FixtureConfig>,
    pub audio: AudioConfig,
    pub patterns: PatternConfig,
    pub output: OutputConfig,
}

impl StageConfig {
    /// Patch every configured fixture, named after its class and position
    /// unless the config names it.
    pub fn build_fixtures(&self) -> Vec<Fixture> {
        self.fixtures
            .iter()
            .enumerate()
            .map(|(i, fc)| {
                let name = fc
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", fc.class, i + 1));
                Fixture::new(&name, fc.class, fc.address)
            })
            .collect()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Failed to parse config file: {0}")]
    ParseError(String),
    #[error("Failed to serialize config: {0}")]
    SerializeError(String),
    #[error("Config validation errors: {}", .0.join(", "))]
    ValidationError(Vec<String>),
}

/// Loads and saves the stage configuration file.
pub struct ConfigManager {
    config_path: PathBuf,
    config: StageConfig,
}

impl ConfigManager {
    /// If no path is provided, defaults to `homestage.json` in the current
    /// working directory.
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self {
            config_path,
            config: StageConfig::default(),
        }
    }

    /// Load the config file, writing one with defaults if there is none.
    pub fn load(&mut self) -> Result<StageConfig, ConfigError> {
        if !self.config_path.exists() {
            log::info!(
                "No config at {}, writing defaults",
                self.config_path.display()
            );
            self.save()?;
            return Ok(self.config.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config: StageConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Self::validate(&config).map_err(ConfigError::ValidationError)?;

        self.config = config;
        Ok(self.config.clone())
    }

    /// Save the current config, pretty-printed.
    pub fn save(&self) -> Result<(), ConfigError> {
        // Ensure config directory exists (if config is in a subdirectory)
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Replace the config and save it.
    pub fn update_config(&mut self, config: StageConfig) -> Result<(), ConfigError> {
        Self::validate(&config).map_err(ConfigError::ValidationError)?;
        self.config = config;
        self.save()
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn validate(config: &StageConfig) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let audio = &config.audio;
        if audio.sample_rate == 0 {
            errors.push("audio.sample_rate must be positive".to_string());
        }
        if audio.block_size == 0 {
            errors.push("audio.block_size must be positive".to_string());
        }
        if !audio.fft_size.is_power_of_two() {
            errors.push("audio.fft_size must be a power of two".to_string());
        }
        if !(1..=16).contains(&audio.band_count) {
            errors.push("audio.band_count must be between 1 and 16".to_string());
        }

        let artnet = &config.output.artnet;
        if !(1.0..=1000.0).contains(&artnet.fps) {
            errors.push("output.artnet.fps must be between 1 and 1000".to_string());
        }
        if artnet.universe > 0x7fff {
            errors.push("output.artnet.universe must be below 32768".to_string());
        }

        for (i, fixture) in config.fixtures.iter().enumerate() {
            if fixture.address >= UNIVERSE_SIZE {
                errors.push(format!(
                    "fixtures[{}].address must be below {}",
                    i, UNIVERSE_SIZE
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_config_manager_new() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("stage.json");

        let manager = ConfigManager::new(Some(config_path.clone()));
        assert_eq!(manager.config_path(), config_path);
        assert_eq!(manager.config(), &StageConfig::default());
    }

    #[test]
    fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("stage.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        let config = manager.load().unwrap();

        assert!(config_path.exists());
        assert_eq!(config, StageConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("stage.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        let mut config = StageConfig::default();
        config.microphone = Some("USB Audio".to_string());
        config.patterns.selection = SelectionPolicy::Section;
        config.fixtures.push(FixtureConfig {
            class: FixtureKind::MiniSpider,
            address: 40,
            name: None,
        });
        manager.update_config(config.clone()).unwrap();

        let mut manager2 = ConfigManager::new(Some(config_path));
        let loaded = manager2.load().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_parses_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("stage.json");
        fs::write(
            &config_path,
            r#"{
                "debug": true,
                "fixtures": [
                    {"class": "MovingHeadLight", "address": 0},
                    {"class": "LEDWash", "address": 14},
                    {"class": "MiniSpider"}
                ],
                "patterns": {"selection": "section"},
                "output": {"artnet": {"destination": "10.0.0.20", "universe": 2}}
            }"#,
        )
        .unwrap();

        let mut manager = ConfigManager::new(Some(config_path));
        let config = manager.load().unwrap();

        assert!(config.debug);
        assert_eq!(config.microphone, None);
        assert_eq!(config.audio, AudioConfig::default());
        assert_eq!(config.patterns.selection, SelectionPolicy::Section);
        assert_eq!(config.output.artnet.universe, 2);
        assert_eq!(config.output.artnet.port, 6454);

        let fixtures = config.build_fixtures();
        assert_eq!(fixtures.len(), 3);
        assert_eq!(fixtures[1].kind, FixtureKind::LedWash);
        assert_eq!(fixtures[1].address, 14);
        assert_eq!(fixtures[2].address, 0);
        assert_eq!(fixtures[2].name, "MiniSpider 3");
    }

    #[test]
    fn test_unknown_fixture_class_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("stage.json");
        fs::write(&config_path, r#"{"fixtures": [{"class": "FogMachine"}]}"#).unwrap();

        let mut manager = ConfigManager::new(Some(config_path));
        assert!(matches!(manager.load(), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation() {
        let mut config = StageConfig::default();
        assert!(ConfigManager::validate(&config).is_ok());

        config.audio.fft_size = 1000;
        config.output.artnet.fps = 0.0;
        config.fixtures.push(FixtureConfig {
            class: FixtureKind::LedWash,
            address: 512,
            name: None,
        });
        let errors = ConfigManager::validate(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}

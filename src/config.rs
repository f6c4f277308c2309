use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::constants::{demo, reveal};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RevealConfig {
    /// Milliseconds between reveal ticks; one character is exposed per tick
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Skip the timer entirely and show transcripts all at once
    #[serde(default = "default_synchronous")]
    pub synchronous: bool,
}

fn default_tick_ms() -> u64 {
    reveal::DEFAULT_TICK_MS
}

fn default_synchronous() -> bool {
    false
}

impl Default for RevealConfig {
    fn default() -> Self {
        RevealConfig {
            tick_ms: default_tick_ms(),
            synchronous: default_synchronous(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DemoConfig {
    /// Delay between fragments when replaying a transcript file
    #[serde(default = "default_fragment_delay_ms")]
    pub fragment_delay_ms: u64,
}

fn default_fragment_delay_ms() -> u64 {
    demo::DEFAULT_FRAGMENT_DELAY_MS
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            fragment_delay_ms: default_fragment_delay_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reveal: RevealConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".streamscribe"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.yaml"))
    }

    /// Directory where recorded audio blobs are saved
    pub fn recordings_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("recordings"))
    }

    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config: Config = serde_yaml::from_str(&contents)
                .context("Failed to parse config file")?;

            config.validate()?;

            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            println!("Created default config at: {}", config_path.display());
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.reveal.tick_ms == 0 {
            bail!("reveal tick_ms must be greater than 0");
        }
        if self.reveal.tick_ms > 1000 {
            bail!("reveal tick_ms must be <= 1000 (1 second per character)");
        }

        if self.demo.fragment_delay_ms > 10_000 {
            bail!("demo fragment_delay_ms must be <= 10000 (10 seconds)");
        }

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir)
            .context("Failed to create config directory")?;

        let config_path = Self::config_path()?;
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, yaml)
            .context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reveal.tick_ms, 15);
        assert!(!config.reveal.synchronous);
    }

    #[test]
    fn test_zero_tick_rejected() {
        let mut config = Config::default();
        config.reveal.tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: Config = serde_yaml::from_str("reveal:\n  synchronous: true\n").unwrap();
        assert!(config.reveal.synchronous);
        assert_eq!(config.reveal.tick_ms, 15);
        assert_eq!(config.demo.fragment_delay_ms, 400);
    }
}

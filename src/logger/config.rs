//! Runtime configuration for the logger

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub console: ConsoleConfig,
    pub file: FileConfig,
    /// Plain level or `EnvFilter` directive string
    pub level: String,
}

impl LoggerConfig {
    pub fn new(console: ConsoleConfig, file: FileConfig, level: String) -> Result<Self> {
        let config = Self {
            console,
            file,
            level,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.env_filter()
            .with_context(|| format!("Invalid log level: {}", self.level))?;

        self.file.validate().context("Invalid file configuration")?;

        if !self.console.enabled && !self.file.enabled {
            anyhow::bail!("At least one output (console or file) must be enabled");
        }

        Ok(())
    }

    /// Builds the filter used by the subscriber registry.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.level).map_err(anyhow::Error::from)
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// ANSI colours, only applied when stdout is a terminal
    pub colored: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            colored: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub append: bool,
    pub format: LogFormat,
    pub rotation: RotationConfig,
}

impl FileConfig {
    /// Pure validation; the writer creates missing directories.
    pub fn validate(&self) -> Result<()> {
        if self.enabled {
            if self.path.as_os_str().is_empty() {
                anyhow::bail!("File path cannot be empty when file output is enabled");
            }
            self.rotation
                .validate()
                .context("Invalid rotation configuration")?;
        }
        Ok(())
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("logs/freelancelot.log"),
            append: true,
            format: LogFormat::Json,
            rotation: RotationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(LogFormat::Full),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!(
                "Invalid log format '{}'. Valid formats are: full, compact, json",
                s
            ),
        }
    }
}

/// Size-based rotation: `app.log` -> `app.log.1` ... `app.log.{max_files}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Bytes written before the active file is rotated
    pub max_size: u64,
    pub max_files: usize,
    /// Gzip rotated files
    pub compress: bool,
}

impl RotationConfig {
    pub fn new(max_size: u64, max_files: usize, compress: bool) -> Result<Self> {
        let config = Self {
            max_size,
            max_files,
            compress,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            anyhow::bail!("Maximum file size must be greater than 0");
        }
        if self.max_files == 0 {
            anyhow::bail!("Maximum number of files must be greater than 0");
        }
        Ok(())
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_size: 10 * 1024 * 1024,
            max_files: 5,
            compress: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_levels_accepted() {
        let config = LoggerConfig {
            level: "info,freelancelot::jobs=debug".to_string(),
            ..LoggerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_output_rejected() {
        let mut config = LoggerConfig::default();
        config.console.enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rotation_bounds() {
        assert!(RotationConfig::new(0, 5, false).is_err());
        assert!(RotationConfig::new(1024, 0, false).is_err());
        assert!(RotationConfig::new(1024, 1, true).is_ok());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}

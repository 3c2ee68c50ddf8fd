//! CLI argument validation functions
//!
//! Value parsers for arguments that need more than a type check.

use std::fs;
use std::path::PathBuf;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// Validate rollback steps is a positive number
pub fn validate_rollback_steps(steps_str: &str) -> Result<u32, String> {
    let steps: u32 = steps_str.parse().map_err(|_| {
        format!("Rollback steps must be a valid positive number, got: '{}'", steps_str)
    })?;

    if steps == 0 {
        return Err("Rollback steps must be greater than 0".to_string());
    }

    // Upper bound against accidental mass rollbacks
    if steps > 100 {
        return Err("Rollback steps cannot exceed 100".to_string());
    }

    Ok(steps)
}

/// Validate the poll interval override, in seconds
pub fn validate_interval(interval_str: &str) -> Result<u64, String> {
    let seconds: u64 = interval_str.parse().map_err(|_| {
        format!("Interval must be a number of seconds, got: '{}'", interval_str)
    })?;

    if !(10..=3600).contains(&seconds) {
        return Err(format!(
            "Interval must be between 10 and 3600 seconds, got: {}",
            seconds
        ));
    }

    Ok(seconds)
}

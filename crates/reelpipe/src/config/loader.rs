use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Loads the YAML config at `path`. A missing file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        let config = Config::default();
        validate_config(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    // An empty document deserializes to unit, not to a mapping.
    let config: Config = if content.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(content)?
    };

    validate_config(&config)?;

    Ok(config)
}

/// Writes the default configuration to `path`, creating parent directories.
pub fn save_default_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let config = Config::default();
    let yaml = serde_yaml::to_string(&config)?;
    std::fs::write(path, yaml).map_err(|e| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    log::info!("Wrote default config to {}", path.display());
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.worker.max_retries < 1 {
        return Err(ConfigError::Validation {
            message: "worker.max_retries must be at least 1".to_string(),
        });
    }

    if config.worker.idle_poll_seconds < 1 {
        return Err(ConfigError::Validation {
            message: "worker.idle_poll_seconds must be at least 1".to_string(),
        });
    }

    if config.upload.min_delay_minutes > config.upload.max_delay_minutes {
        return Err(ConfigError::Validation {
            message: format!(
                "upload.min_delay_minutes ({}) exceeds upload.max_delay_minutes ({})",
                config.upload.min_delay_minutes, config.upload.max_delay_minutes
            ),
        });
    }

    Ok(())
}

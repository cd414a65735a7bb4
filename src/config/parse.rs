//! Configuration file parsing and discovery

use crate::config::types::PipelineConfig;
use crate::error::{ConfigError, ConfigResult, PipelineError};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["assetpipe.yml", "assetpipe.yaml"];

/// Environment file read from the project root
const ENV_FILE_NAME: &str = ".env";

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<PipelineConfig, PipelineError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read file: {}", e)))?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<PipelineConfig, PipelineError> {
    // An empty file is a valid "all defaults" configuration
    if yaml.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Load the configuration and the project root it applies to.
///
/// With an explicit path the root is the file's directory. Otherwise the
/// working directory and its parents are searched; when nothing is found the
/// defaults apply to the working directory.
pub fn load_config(explicit: Option<&Path>) -> Result<(PipelineConfig, PathBuf), PipelineError> {
    if let Some(path) = explicit {
        let config = parse_config_file(path)?;
        return Ok((config, config_root_dir(path)));
    }

    let cwd = env::current_dir()?;
    match find_config_file_from(cwd.clone()) {
        Ok(path) => {
            let config = parse_config_file(&path)?;
            Ok((config, config_root_dir(&path)))
        }
        Err(ConfigError::NotFound(searched)) => {
            tracing::debug!(%searched, "no config file found, using defaults");
            Ok((PipelineConfig::default(), cwd))
        }
        Err(e) => Err(e.into()),
    }
}

/// Directory a config path applies to; a bare file name means the working directory
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Snapshot the environment, merging `<root>/.env` underneath the process
/// environment. A missing `.env` file is not an error.
pub fn load_environment(root: &Path) -> Result<HashMap<String, String>, PipelineError> {
    let mut vars = HashMap::new();

    match dotenvy::from_path_iter(root.join(ENV_FILE_NAME)) {
        Ok(iter) => {
            for item in iter {
                let (key, value) = item.map_err(|e| {
                    ConfigError::Invalid(format!("Failed to parse {}: {}", ENV_FILE_NAME, e))
                })?;
                vars.insert(key, value);
            }
        }
        Err(e) if e.not_found() => {}
        Err(e) => {
            return Err(
                ConfigError::Invalid(format!("Failed to read {}: {}", ENV_FILE_NAME, e)).into(),
            )
        }
    }

    vars.extend(env::vars());
    Ok(vars)
}

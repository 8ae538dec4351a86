use std::fs;
use std::path::Path;

use serde_yaml::Value;

use crate::config::model::Config;
use crate::error::ConfigError;

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let root: Value = serde_yaml::from_str(contents).map_err(ConfigError::Malformed)?;
    let mut root = match root {
        Value::Mapping(map) => map,
        _ => {
            return Err(ConfigError::InvalidShape(
                "top level of configuration file is not a mapping".to_string(),
            ))
        }
    };
    match root.remove("targets") {
        Some(Value::Mapping(targets)) => Ok(Config { targets }),
        Some(_) => Err(ConfigError::InvalidShape(
            "\"targets\" key does not map to a mapping of targets".to_string(),
        )),
        None => Err(ConfigError::InvalidShape(
            "configuration file does not contain a \"targets\" key".to_string(),
        )),
    }
}

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use system::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use thiserror::Error;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay to join (default: 127.0.0.1:12345)
    pub relay_addr: SocketAddr,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Where the canvas is written on exit (default: whiteboard.png)
    pub export_path: PathBuf,
    /// Also push the canvas to the relay on exit
    pub save_on_exit: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid socket address: {value}")]
    InvalidAddress { name: &'static str, value: String },
    #[error("{name} is not a valid canvas dimension: {value}")]
    InvalidDimension { name: &'static str, value: String },
    #[error("{name} is not a boolean: {value}")]
    InvalidFlag { name: &'static str, value: String },
}

impl std::default::Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_addr: SocketAddr::from(([127, 0, 0, 1], 12345)),
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            export_path: PathBuf::from("whiteboard.png"),
            save_on_exit: false,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let relay_addr = match lookup("RELAY_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidAddress {
                name: "RELAY_ADDR",
                value,
            })?,
            None => defaults.relay_addr,
        };
        Ok(Self {
            relay_addr,
            canvas_width: dimension(&lookup, "CANVAS_WIDTH", defaults.canvas_width)?,
            canvas_height: dimension(&lookup, "CANVAS_HEIGHT", defaults.canvas_height)?,
            export_path: lookup("EXPORT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_path),
            save_on_exit: match lookup("SAVE_ON_EXIT") {
                Some(value) => flag("SAVE_ON_EXIT", value)?,
                None => defaults.save_on_exit,
            },
        })
    }
}

fn dimension<F>(lookup: &F, name: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => {
            let parsed = value.trim().parse::<u32>();
            match parsed {
                Ok(parsed) if parsed > 0 => Ok(parsed),
                _ => Err(ConfigError::InvalidDimension { name, value }),
            }
        }
        None => Ok(default),
    }
}

fn flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn it_should_fall_back_to_defaults() {
        let config = config_from(&[]).expect("");
        assert_eq!(config.relay_addr, SocketAddr::from(([127, 0, 0, 1], 12345)));
        assert_eq!((config.canvas_width, config.canvas_height), (1920, 1080));
        assert!(!config.save_on_exit);
    }

    #[test]
    fn it_should_read_overrides() {
        let config = config_from(&[
            ("RELAY_ADDR", "10.0.0.2:4000"),
            ("CANVAS_WIDTH", "640"),
            ("SAVE_ON_EXIT", "yes"),
        ])
        .expect("");
        assert_eq!(config.relay_addr.port(), 4000);
        assert_eq!(config.canvas_width, 640);
        assert!(config.save_on_exit);
    }

    #[test]
    fn it_should_reject_bad_values() {
        assert!(matches!(
            config_from(&[("CANVAS_HEIGHT", "0")]),
            Err(ConfigError::InvalidDimension { .. })
        ));
        assert!(matches!(
            config_from(&[("RELAY_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress { .. })
        ));
        assert!(matches!(
            config_from(&[("SAVE_ON_EXIT", "maybe")]),
            Err(ConfigError::InvalidFlag { .. })
        ));
    }
}

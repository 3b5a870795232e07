use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::permissions::RoleTable;

pub const DEFAULT_SESSION_DIR: &str = ".medialib";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Switches for behaviour that differed between deployments of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub multi_select_taxonomy: bool,
    pub registration: bool,
    pub view_modes: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            multi_select_taxonomy: true,
            registration: true,
            view_modes: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub session_dir: PathBuf,
    pub request_timeout_secs: Option<u64>,
    pub features: Features,
    pub roles: RoleTable,
}

impl Config {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            session_dir: PathBuf::from(DEFAULT_SESSION_DIR),
            request_timeout_secs: None,
            features: Features::default(),
            roles: RoleTable::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let api_url = env::var("MEDIALIB_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("MEDIALIB_API_URL"))?;

        let mut config = Config::new(api_url);

        if let Ok(dir) = env::var("MEDIALIB_SESSION_DIR") {
            if !dir.trim().is_empty() {
                config.session_dir = PathBuf::from(dir);
            }
        }

        if let Ok(raw) = env::var("MEDIALIB_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "MEDIALIB_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
            config.request_timeout_secs = (secs > 0).then_some(secs);
        }

        config.features = Features {
            multi_select_taxonomy: flag("MEDIALIB_MULTI_SELECT", true)?,
            registration: flag("MEDIALIB_REGISTRATION", true)?,
            view_modes: flag("MEDIALIB_VIEW_MODES", true)?,
        };

        Ok(config)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

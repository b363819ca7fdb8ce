use std::fmt;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use config::{Config, Environment, Map};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// bind address, empty means all interfaces
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub auth_token: Option<String>,
    /// serve prometheus metrics on this port when set
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("AUTH_TOKEN environment variable not set")]
    MissingAuthToken,
}

/// the bearer secret, never empty
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: Option<String>) -> Result<Self, SettingsError> {
        match token {
            Some(token) if !token.is_empty() => Ok(Self(token)),
            _ => Err(SettingsError::MissingAuthToken),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// keep the secret out of debug output
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

impl Settings {
    /// reads command line arguments, the optional config file and the process environment
    pub fn load() -> Result<Self> {
        let opts = Command::new(clap::crate_name!())
            .version(clap::crate_version!())
            .about(clap::crate_description!())
            .author(clap::crate_authors!())
            .args([
                Arg::new("config")
                    .help("path of an optional config file")
                    .takes_value(true)
                    .short('c')
                    .long("config")
                    .default_value("./config.yaml"),
                Arg::new("level")
                    .help("log level, overrides LOG_LEVEL")
                    .possible_values([
                        "Trace", "Debug", "Info", "Warning", "Error", "Critical",
                    ])
                    .ignore_case(true)
                    .takes_value(true)
                    .long("log"),
            ])
            .get_matches();

        let config_path = opts.value_of("config").unwrap_or("./config.yaml");

        let mut settings =
            Self::from_sources(Some(config_path), None).context("can't load config")?;

        if let Some(level) = opts.value_of("level") {
            settings.log_level = level.to_string();
        }

        Ok(settings)
    }

    /// layers defaults, the config file (if it exists) and environment variables;
    /// `env` replaces the process environment when given
    pub fn from_sources(
        config_path: Option<&str>,
        env: Option<Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("host", "")?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?;

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(Environment::default().source(env))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn bind_host(&self) -> &str {
        if self.host.is_empty() {
            "0.0.0.0"
        } else {
            self.host.as_str()
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup and passed down explicitly; nothing reads the environment
//! after `ServerConfig::from_env` returns.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `DATA_DIR` | Directory holding the record database | `./data` |
//! | `JWT_SECRET` | HS256 signing secret for doctor tokens | Required (fails closed) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `TUMOR_INFERENCE_URL` | Brain-tumor inference endpoint | Optional |
//! | `ALZHEIMER_INFERENCE_URL` | Alzheimer inference endpoint | Optional |
//! | `INFERENCE_TIMEOUT_SECS` | Timeout for inference calls | `30` |

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// The record database (`clinic.redb`) is created inside this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable holding the token signing secret.
///
/// When unset or empty the server still starts, but login returns a server
/// error and every protected route answers 401.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const TUMOR_INFERENCE_URL_ENV: &str = "TUMOR_INFERENCE_URL";
pub const ALZHEIMER_INFERENCE_URL_ENV: &str = "ALZHEIMER_INFERENCE_URL";
pub const INFERENCE_TIMEOUT_SECS_ENV: &str = "INFERENCE_TIMEOUT_SECS";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 30;

/// File name of the embedded database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "clinic.redb";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },

    #[error("{var} must be an absolute http(s) URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{var} must use http or https, got {scheme:?}")]
    UnsupportedScheme { var: &'static str, scheme: String },

    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var} must be `json` or `pretty`, got {value:?}")]
    InvalidLogFormat { var: &'static str, value: String },
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Fully parsed server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Token signing secret. `None` means authentication fails closed.
    pub jwt_secret: Option<String>,
    pub log_format: LogFormat,
    pub tumor_inference_url: Option<Url>,
    pub alzheimer_inference_url: Option<Url>,
    pub inference_timeout: Duration,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = non_empty(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match non_empty(PORT_ENV) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: PORT_ENV,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let data_dir = non_empty(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let log_format = match non_empty(LOG_FORMAT_ENV) {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::InvalidLogFormat {
                        var: LOG_FORMAT_ENV,
                        value,
                    })
                }
            },
            None => LogFormat::default(),
        };

        let inference_timeout = match non_empty(INFERENCE_TIMEOUT_SECS_ENV) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: INFERENCE_TIMEOUT_SECS_ENV,
                        value,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_INFERENCE_TIMEOUT_SECS),
        };

        Ok(Self {
            host,
            port,
            data_dir,
            jwt_secret: non_empty(JWT_SECRET_ENV),
            log_format,
            tumor_inference_url: parse_endpoint(
                TUMOR_INFERENCE_URL_ENV,
                non_empty(TUMOR_INFERENCE_URL_ENV),
            )?,
            alzheimer_inference_url: parse_endpoint(
                ALZHEIMER_INFERENCE_URL_ENV,
                non_empty(ALZHEIMER_INFERENCE_URL_ENV),
            )?,
            inference_timeout,
        })
    }

    /// Path of the embedded database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_endpoint(var: &'static str, value: Option<String>) -> Result<Option<Url>, ConfigError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { var, source })?;
    match url.scheme() {
        "http" | "https" => Ok(Some(url)),
        other => Err(ConfigError::UnsupportedScheme {
            var,
            scheme: other.to_string(),
        }),
    }
}

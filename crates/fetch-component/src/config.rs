//! Declarative component configuration.
//!
//! A [`FetchConfig`] can be read from YAML (with `${VAR}` / `${VAR:-default}`
//! expansion), from `FETCH_*` environment variables, or built in code, and is
//! turned into [`ComponentOptions`] once at startup.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::client::HttpConfig;
use crate::component::ComponentOptions;
use crate::request::RequestOptions;

/// Environment variable names.
pub mod vars {
    pub const FETCH_METHOD: &str = "FETCH_METHOD";
    pub const FETCH_ATTEMPTS: &str = "FETCH_ATTEMPTS";
    pub const FETCH_RETRY_DELAY_MS: &str = "FETCH_RETRY_DELAY_MS";
    pub const FETCH_TIMEOUT_MS: &str = "FETCH_TIMEOUT_MS";
    pub const FETCH_PREVENT_THROWING: &str = "FETCH_PREVENT_THROWING";
    pub const FETCH_USER_AGENT: &str = "FETCH_USER_AGENT";
    pub const FETCH_CONNECT_TIMEOUT_MS: &str = "FETCH_CONNECT_TIMEOUT_MS";
}

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("valid env var pattern"));

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("invalid method: {0}")]
    InvalidMethod(String),
}

/// Serializable description of a component's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Headers sent with every call.
    pub default_headers: BTreeMap<String, String>,
    /// Default method name.
    pub method: Option<String>,
    /// Default attempt budget.
    pub attempts: Option<u32>,
    /// Default pause between attempts (ms).
    pub retry_delay_ms: Option<u64>,
    /// Default per-attempt deadline (ms).
    pub timeout_ms: Option<u64>,
    pub prevent_throwing: bool,
    /// Client settings.
    pub http: HttpSection,
}

/// Client settings of a [`FetchConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub connect_timeout_ms: u64,
    /// Falls back to the crate's user agent when unset.
    pub user_agent: Option<String>,
    pub pool_max_idle_per_host: usize,
    pub gzip: bool,
}

impl Default for HttpSection {
    fn default() -> Self {
        let http = HttpConfig::default();
        Self {
            connect_timeout_ms: http.connect_timeout.as_millis() as u64,
            user_agent: None,
            pool_max_idle_per_host: http.pool_max_idle_per_host,
            gzip: http.gzip,
        }
    }
}

impl FetchConfig {
    /// Parse YAML, expanding environment variables first.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents, |var| std::env::var(var).ok())?;

        let config: FetchConfig = serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Create config from `FETCH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create config from variables resolved through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.method = lookup(vars::FETCH_METHOD);
        config.attempts = parse_var(&lookup, vars::FETCH_ATTEMPTS)?;
        config.retry_delay_ms = parse_var(&lookup, vars::FETCH_RETRY_DELAY_MS)?;
        config.timeout_ms = parse_var(&lookup, vars::FETCH_TIMEOUT_MS)?;

        if let Some(value) = lookup(vars::FETCH_PREVENT_THROWING) {
            config.prevent_throwing = matches!(value.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(agent) = lookup(vars::FETCH_USER_AGENT) {
            config.http.user_agent = Some(agent);
        }
        if let Some(connect_timeout_ms) = parse_var(&lookup, vars::FETCH_CONNECT_TIMEOUT_MS)? {
            config.http.connect_timeout_ms = connect_timeout_ms;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts == Some(0) {
            return Err(ConfigError::InvalidValue {
                var: "attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(method) = &self.method {
            parse_method(method)?;
        }
        Ok(())
    }

    /// Validate headers and method and build the component options.
    pub fn into_component_options(self) -> Result<ComponentOptions, ConfigError> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let header_name = HeaderName::try_from(name.as_str()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
            let header_value = HeaderValue::try_from(value.as_str()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
            default_headers.insert(header_name, header_value);
        }

        let method = self.method.as_deref().map(parse_method).transpose()?;

        let defaults = RequestOptions {
            method,
            attempts: self.attempts,
            retry_delay: self.retry_delay_ms.map(Duration::from_millis),
            timeout: self.timeout_ms.map(Duration::from_millis),
            ..RequestOptions::default()
        };

        let mut http = HttpConfig {
            connect_timeout: Duration::from_millis(self.http.connect_timeout_ms),
            pool_max_idle_per_host: self.http.pool_max_idle_per_host,
            gzip: self.http.gzip,
            ..HttpConfig::default()
        };
        if let Some(agent) = self.http.user_agent {
            http.user_agent = agent;
        }

        Ok(ComponentOptions {
            default_headers,
            default_fetcher_options: defaults,
            prevent_throwing: self.prevent_throwing,
            http,
        })
    }
}

fn parse_method(method: &str) -> Result<Method, ConfigError> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| ConfigError::InvalidMethod(method.to_string()))
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected integer, got '{}'", v),
        }),
        None => Ok(None),
    }
}

/// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
///
/// Substituted values are copied as-is and never expanded again.
fn expand_env_vars(
    content: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(content.len());
    let mut last = 0;

    for cap in ENV_VAR_PATTERN.captures_iter(content) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let var_name = &cap[1];
        let default = cap.get(2).map(|m| m.as_str());

        let value = match lookup(var_name) {
            Some(v) => v,
            None => match default {
                Some(d) => d.to_string(),
                None => {
                    return Err(ConfigError::EnvVarNotFound {
                        var: var_name.to_string(),
                    })
                }
            },
        };

        result.push_str(&content[last..full_match.start()]);
        result.push_str(&value);
        last = full_match.end();
    }

    result.push_str(&content[last..]);
    Ok(result)
}

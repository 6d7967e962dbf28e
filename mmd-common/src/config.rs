//! Configuration loading and resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The database URL has no compiled default: startup fails if no tier supplies one.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Secret key used when nothing else is configured. Development only.
pub const DEFAULT_SECRET_KEY: &str = "dev-key-change-in-production";

/// Default listening port
pub const DEFAULT_PORT: u16 = 5000;

/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Environment variable names
pub const ENV_SECRET_KEY: &str = "SECRET_KEY";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";
pub const ENV_SEED: &str = "MMD_SEED";
pub const ENV_LTV: &str = "MMD_LTV";
pub const ENV_CHURN_RATE: &str = "MMD_CHURN_RATE";
pub const ENV_MRR_FACTOR: &str = "MMD_MRR_FACTOR";

/// Business assumptions that are not derived from fact data
///
/// `ltv` and `churn_rate` are reported as-is; `mrr_factor` scales total revenue
/// into the monthly recurring revenue estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiAssumptions {
    pub ltv: f64,
    pub churn_rate: f64,
    pub mrr_factor: f64,
}

impl Default for KpiAssumptions {
    fn default() -> Self {
        Self {
            ltv: 1200.0,
            churn_rate: 5.0,
            mrr_factor: 0.1,
        }
    }
}

/// Contents of the optional TOML config file
///
/// All fields are optional; absent keys fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub secret_key: Option<String>,
    pub database_url: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub seed_sample_data: Option<bool>,
    #[serde(default)]
    pub assumptions: TomlAssumptions,
}

/// `[assumptions]` table of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlAssumptions {
    pub ltv: Option<f64>,
    pub churn_rate: Option<f64>,
    pub mrr_factor: Option<f64>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub secret_key: Option<String>,
    pub database_url: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub no_seed: bool,
}

/// Fully resolved dashboard configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub secret_key: String,
    /// True when `secret_key` fell back to [`DEFAULT_SECRET_KEY`]
    pub secret_key_is_default: bool,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub seed_sample_data: bool,
    pub assumptions: KpiAssumptions,
}

impl DashboardConfig {
    /// Resolve configuration from CLI, environment, config file and defaults
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file_config = match locate_config_file(cli.config_file.as_deref()) {
            Some(path) => load_toml_config(&path),
            None => TomlConfig::default(),
        };

        Self::resolve_with(cli, &file_config)
    }

    /// Resolve configuration against an already-loaded TOML config
    pub fn resolve_with(cli: &CliOverrides, file: &TomlConfig) -> Result<Self> {
        let (secret_key, secret_key_is_default) = match cli
            .secret_key
            .clone()
            .or_else(|| env_string(ENV_SECRET_KEY))
            .or_else(|| file.secret_key.clone())
        {
            Some(key) => (key, false),
            None => (DEFAULT_SECRET_KEY.to_string(), true),
        };

        let database_url = cli
            .database_url
            .clone()
            .or_else(|| env_string(ENV_DATABASE_URL))
            .or_else(|| file.database_url.clone())
            .ok_or_else(|| {
                Error::Config(format!(
                    "{} is not set (pass --database-url, set the environment variable, or add database_url to the config file)",
                    ENV_DATABASE_URL
                ))
            })?;

        let port = match cli.port {
            Some(port) => port,
            None => match env_parsed::<u16>(ENV_PORT)? {
                Some(port) => port,
                None => file.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let host = cli
            .host
            .clone()
            .or_else(|| env_string(ENV_HOST))
            .or_else(|| file.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let seed_sample_data = if cli.no_seed {
            false
        } else {
            match env_flag(ENV_SEED)? {
                Some(flag) => flag,
                None => file.seed_sample_data.unwrap_or(true),
            }
        };

        let defaults = KpiAssumptions::default();
        let assumptions = KpiAssumptions {
            ltv: resolve_assumption(ENV_LTV, file.assumptions.ltv, defaults.ltv)?,
            churn_rate: resolve_assumption(
                ENV_CHURN_RATE,
                file.assumptions.churn_rate,
                defaults.churn_rate,
            )?,
            mrr_factor: resolve_assumption(
                ENV_MRR_FACTOR,
                file.assumptions.mrr_factor,
                defaults.mrr_factor,
            )?,
        };

        Ok(Self {
            secret_key,
            secret_key_is_default,
            database_url,
            host,
            port,
            seed_sample_data,
            assumptions,
        })
    }

    /// `host:port` string suitable for binding a listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Find the config file to load, if any
///
/// An explicit path is returned even when it does not exist so the caller can
/// warn about it. Otherwise the per-user location is tried, then `/etc/mmd` on Linux.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let user_config = dirs::config_dir().map(|d| d.join("mmd").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/mmd/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load a TOML config file
///
/// Missing or malformed files are not fatal: a warning is logged and an empty
/// config is returned so the remaining tiers apply.
pub fn load_toml_config(path: &Path) -> TomlConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Config file {} not readable ({}), using defaults", path.display(), e);
            return TomlConfig::default();
        }
    };

    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => {
            info!("Loaded config file: {}", path.display());
            config
        }
        Err(e) => {
            warn!("Config file {} is malformed ({}), ignoring it", path.display(), e);
            TomlConfig::default()
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", name, raw))),
        None => Ok(None),
    }
}

fn env_flag(name: &str) -> Result<Option<bool>> {
    match env_string(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::Config(format!(
                "{} must be a boolean (true/false), got {:?}",
                name, raw
            ))),
        },
        None => Ok(None),
    }
}

fn resolve_assumption(env_name: &str, file_value: Option<f64>, default: f64) -> Result<f64> {
    let value = env_parsed::<f64>(env_name)?
        .or(file_value)
        .unwrap_or(default);

    if !value.is_finite() {
        return Err(Error::Config(format!("{} must be a finite number", env_name)));
    }

    Ok(value)
}

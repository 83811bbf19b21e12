//! Daemon configuration
//!
//! Optional `batchdesk.toml` in the working directory, overridden by
//! `BATCHDESK__*` environment variables (`BATCHDESK__POOL__MAX_CONNECTIONS=8`).

use anyhow::{Context, Result};
use batchdesk_api_rpc::RpcServerConfig;
use batchdesk_core::application::worker::constants::{DEFAULT_BATCH_WORKERS, DEFAULT_QUEUE_CAPACITY};
use batchdesk_infra_sqlite::PoolSettings;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite://~/.batchdesk/batchdesk.db";
const CONFIG_FILE: &str = "batchdesk";
const ENV_PREFIX: &str = "BATCHDESK";

/// Only for local development; a warning is logged when it is in use
pub const DEV_JWT_SECRET: &str = "batchdesk-dev-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    pub idle_timeout_secs: u64,
    pub health_check_period_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let settings = PoolSettings::default();
        Self {
            max_connections: settings.max_connections,
            min_connections: settings.min_connections,
            max_lifetime_secs: settings.max_lifetime.as_secs(),
            idle_timeout_secs: settings.idle_timeout.as_secs(),
            health_check_period_secs: settings.health_check_period.as_secs(),
            connect_timeout_secs: settings.connect_timeout.as_secs(),
        }
    }
}

impl PoolConfig {
    pub fn settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections.max(1),
            min_connections: self.min_connections,
            max_lifetime: Duration::from_secs(self.max_lifetime_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            health_check_period: Duration::from_secs(self.health_check_period_secs.max(1)),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        let defaults = RpcServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    /// Admin account created at startup when no account has this email
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_BATCH_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub database_url: String,
    pub log_format: LogFormat,
    pub pool: PoolConfig,
    pub rpc: RpcConfig,
    pub auth: AuthConfig,
    pub batch: BatchConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            log_format: LogFormat::default(),
            pool: PoolConfig::default(),
            rpc: RpcConfig::default(),
            auth: AuthConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Read `batchdesk.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::build(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    /// Parse a TOML document on its own
    pub fn from_toml(toml: &str) -> Result<Self> {
        Self::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Database URL with a leading `~` in the file path expanded
    pub fn database_url(&self) -> String {
        match self.database_url.strip_prefix("sqlite://") {
            Some(path) => format!("sqlite://{}", shellexpand::tilde(path)),
            None => self.database_url.clone(),
        }
    }

    /// Directory the database file lives in, when the URL names a file
    pub fn database_dir(&self) -> Option<PathBuf> {
        let url = self.database_url();
        let path = url.strip_prefix("sqlite://")?;
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path.contains(":memory:") {
            return None;
        }
        PathBuf::from(path)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.to_path_buf())
    }

    pub fn rpc_server(&self) -> RpcServerConfig {
        RpcServerConfig {
            host: self.rpc.host.clone(),
            port: self.rpc.port,
        }
    }

    /// Configured secret, or the development one (second value is `true`)
    pub fn jwt_secret(&self) -> (String, bool) {
        match self.auth.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => (secret.to_string(), false),
            _ => (DEV_JWT_SECRET.to_string(), true),
        }
    }
}

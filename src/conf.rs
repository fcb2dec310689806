//! The layered configuration for Kamino.
//!
//! Loaded from a YAML file (path given by `--config`, default `kamino.yml`)
//! with environment variables prefixed `KAMINO__` overlaid on top, exactly
//! the way the teacher layers `thorium.yml` under a `THORIUM__` prefix.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::errors::{EngineError, ErrorKind};

fn default_true() -> bool {
    true
}

/// How verbose `tracing` should be.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        write!(f, "{s}")
    }
}

/// Where and how to bind the HTTP edge.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Server {
    #[serde(default = "Server::default_interface")]
    pub interface: String,
    #[serde(default = "Server::default_port")]
    pub port: u16,
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Server {
    fn default_interface() -> String {
        "0.0.0.0".to_owned()
    }

    fn default_port() -> u16 {
        8080
    }
}

/// Credentials and behavior for talking to the Proxmox cluster.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Hypervisor {
    /// Base URL of the cluster API, e.g. `https://pve.lab.internal:8006/api2/json`.
    pub host: String,
    /// The `PVEAPIToken=...` credential value.
    pub token: String,
    /// Skip TLS verification; defaults to `true` for lab deployments
    /// (spec.md §4.A: "TLS verification is configurable (default
    /// insecure-skip for lab use)").
    #[serde(default = "default_true")]
    pub insecure_tls: bool,
    /// Per-request HTTP timeout.
    #[serde(default = "Hypervisor::default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Comma-separated node names, mirroring `PROXMOX_NODES`.
    pub nodes: Vec<String>,
    /// The pool whose VMs must never be touched by destructive operations.
    pub critical_pool: Option<String>,
    /// The auth realm principals are rendered against (`user@realm`).
    pub realm: String,
    /// The storage id polled by `WaitForDisk` (`STORAGE_ID`).
    #[serde(default = "Hypervisor::default_storage_id")]
    pub storage_id: String,
}

impl Hypervisor {
    fn default_http_timeout() -> u64 {
        30
    }

    fn default_storage_id() -> String {
        "local-lvm".to_owned()
    }
}

/// Bounds and scripts used by the Cloning Engine's router-configuration step.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Engine {
    #[serde(default = "Engine::default_min_pod_id")]
    pub min_pod_id: u32,
    #[serde(default = "Engine::default_max_pod_id")]
    pub max_pod_id: u32,
    pub router_name: String,
    pub router_vmid: Option<u32>,
    pub router_node: Option<String>,
    #[serde(default = "Engine::default_clone_timeout")]
    pub clone_timeout_secs: u64,
    #[serde(default = "Engine::default_router_wait_timeout")]
    pub router_wait_timeout_secs: u64,
    pub wan_script_path: String,
    pub vip_script_path: String,
    pub vyos_script_path: String,
    #[serde(default = "Engine::default_wan_ip_base")]
    pub wan_ip_base: String,
}

impl Engine {
    fn default_min_pod_id() -> u32 {
        1001
    }

    fn default_max_pod_id() -> u32 {
        1250
    }

    fn default_clone_timeout() -> u64 {
        180
    }

    fn default_router_wait_timeout() -> u64 {
        120
    }

    fn default_wan_ip_base() -> String {
        "172.16.".to_owned()
    }

    /// Sanity checks applied at startup, fail-fast per spec.md §7 kind 1.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_pod_id >= self.max_pod_id {
            return Err(EngineError::new(
                ErrorKind::ConfigInvalid,
                format!(
                    "min_pod_id ({}) must be less than max_pod_id ({})",
                    self.min_pod_id, self.max_pod_id
                ),
            ));
        }
        if self.wan_script_path.trim().is_empty()
            || self.vip_script_path.trim().is_empty()
            || self.vyos_script_path.trim().is_empty()
        {
            return Err(EngineError::new(
                ErrorKind::ConfigInvalid,
                "router script paths must not be empty",
            ));
        }
        Ok(())
    }
}

/// Catalog storage (spec.md §4.B).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Catalog {
    pub database_url: String,
    #[serde(default = "Catalog::default_max_connections")]
    pub max_connections: u32,
    pub upload_dir: String,
}

impl Catalog {
    fn default_max_connections() -> u32 {
        25
    }
}

/// Directory service (LDAP) connection info (spec.md §4.C).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Directory {
    pub url: String,
    pub bind_dn: String,
    pub bind_password: String,
    pub search_base: String,
}

/// The top-level config object.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Conf {
    pub server: Server,
    pub hypervisor: Hypervisor,
    pub engine: Engine,
    pub catalog: Catalog,
    pub directory: Directory,
}

impl Conf {
    /// Loads config from `path`, layered under `KAMINO__`-prefixed env vars.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let conf: Conf = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Yaml))
            .add_source(
                config::Environment::with_prefix("kamino")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(conf)
    }

    /// Validates cross-field invariants that `serde` defaults can't express.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.engine.validate()?;
        if self.catalog.upload_dir.trim().is_empty() {
            return Err(EngineError::new(
                ErrorKind::ConfigInvalid,
                "catalog.upload_dir must be set",
            ));
        }
        Ok(())
    }
}

//! Runtime configuration
//!
//! Loaded from a TOML file (path in `OUTDIAL_CONFIG`, default
//! `config.toml`); every section and field is optional and falls back to
//! the defaults below.

use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
    pub worker: WorkerConfig,
    pub telephony: TelephonyConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Milliseconds between scheduling cycles.
    pub fixed_rate_ms: u64,
    /// Slot budget per cycle.
    pub batch_size: usize,
    /// Backpressure limit on the dispatch queue.
    pub max_queue_depth: usize,
    /// round-robin | priority | remaining-calls
    pub strategy: String,
    pub watchdog_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fixed_rate_ms: 1000,
            batch_size: 100,
            max_queue_depth: 1000,
            strategy: "round-robin".to_string(),
            watchdog_interval_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub pool_size: usize,
    pub queue_poll_timeout_ms: u64,
    pub shutdown_wait_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: 20,
            queue_poll_timeout_ms: 1000,
            shutdown_wait_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    /// Simulated call duration bounds for the mock provider.
    pub mock_min_duration_ms: u64,
    pub mock_max_duration_ms: u64,
    pub mock_sync_failure_rate: f64,
    pub mock_no_callback_rate: f64,
    pub mock_callback_failure_rate: f64,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            mock_min_duration_ms: 5000,
            mock_max_duration_ms: 15_000,
            mock_sync_failure_rate: 0.005,
            mock_no_callback_rate: 0.01,
            mock_callback_failure_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// TTL for rolling per-campaign counters in the coordination store.
    pub ttl_hours: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

impl Config {
    pub fn load() -> Self {
        let path =
            std::env::var("OUTDIAL_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        if !Path::new(&path).exists() {
            info!("No config file at {}, using defaults", path);
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path);
                    config
                }
                Err(e) => {
                    warn!("Invalid config file {}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Could not read config file {}: {}, using defaults", path, e);
                Self::default()
            }
        }
    }
}

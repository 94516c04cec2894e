//! Local settings loaded once at startup
//!
//! Settings come from a JSON file next to the binary (path selectable on
//! the command line). They are immutable for the process lifetime; the
//! only configuration that changes at runtime is the masterserver-issued
//! [`RemoteConfig`], which starts from the seed value stored here.

use crate::beacon;
use crate::masterserver::RemoteConfig;
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Base URL of the masterserver directory service
    pub masterserver_url: String,
    /// Cadence of the beacon query / expiry / flush cycle
    pub tick_interval_ms: u64,
    /// Silent tick cycles a listing survives before it is delisted
    pub expire_ticks: u32,
    /// UDP port the beacon protocol runs on
    #[serde(default = "default_beacon_port")]
    pub beacon_port: u16,
    /// Masterserver config to run with until the first successful fetch
    #[serde(default)]
    pub remote: RemoteConfig,
}

fn default_beacon_port() -> u16 {
    beacon::BEACON_PORT
}

impl Settings {
    /// Reads and validates the settings file
    ///
    /// Any failure here aborts startup; running with half-initialized
    /// settings would leave the roster and sync cycles in an undefined
    /// state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let raw = fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_json::from_str(&raw)?;

        if settings.tick_interval_ms == 0 {
            return Err("tickIntervalMs must be greater than zero".into());
        }
        if settings.remote.heartbeat_interval_ms == 0 {
            return Err("remote.heartbeatIntervalMs must be greater than zero".into());
        }

        Ok(settings)
    }
}

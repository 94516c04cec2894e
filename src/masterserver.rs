//! HTTP client for the masterserver directory service
//!
//! Two endpoints are consumed: `GET /config` for the masterserver-issued
//! client configuration and `PUT /serverListings` for batched roster
//! actions. Responses to listing pushes are ignored beyond their status;
//! the protocol is fire-and-forget.

use crate::sync_queue::DirectoryAction;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for any single masterserver request, so a stalled remote
/// cannot pile up in-flight tasks behind it
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration issued by the masterserver
///
/// Compared structurally after every fetch; a changed value reschedules
/// the heartbeat cycle with the new interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Announcement shown in the status report
    pub service_message: String,
    /// Cadence of the config-refresh / re-announce cycle
    pub heartbeat_interval_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            service_message: String::new(),
            heartbeat_interval_ms: 10_000,
        }
    }
}

/// Client for the masterserver HTTP API
///
/// Cheap to clone; spawned request tasks each carry their own copy.
#[derive(Debug, Clone)]
pub struct MasterClient {
    http: reqwest::Client,
    base_url: String,
}

impl MasterClient {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches the current masterserver-issued configuration
    pub async fn fetch_config(&self) -> Result<RemoteConfig, reqwest::Error> {
        self.http
            .get(format!("{}/config", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json::<RemoteConfig>()
            .await
    }

    /// Pushes one ordered batch of roster actions
    pub async fn push_listings(&self, batch: &[DirectoryAction]) -> Result<(), reqwest::Error> {
        self.http
            .put(format!("{}/serverListings", self.base_url))
            .json(batch)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

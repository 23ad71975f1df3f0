//! Sync configuration.
//!
//! `SyncOptions` live in the key-value store next to the data they govern,
//! under the `options` key, so every client opening the same database sees
//! the same endpoint and autosync interval.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{KeyValueStore, OPTIONS_KEY};
use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Autosync interval used when none is configured
pub const DEFAULT_AUTOSYNC_MINS: u64 = 10;
/// Autosync never runs more often than this
pub const MIN_AUTOSYNC_MINS: u64 = 5;
/// Autosync never waits longer than a week
pub const MAX_AUTOSYNC_MINS: u64 = 7 * 24 * 60;
/// Per-request HTTP timeout used when none is configured
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Remote sync settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncOptions {
    /// Base URL of the spreadsheet web app; sync is off while unset
    #[serde(default)]
    pub apps_script_url: Option<String>,
    #[serde(default = "default_autosync_mins")]
    pub autosync_mins: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_autosync_mins() -> u64 {
    DEFAULT_AUTOSYNC_MINS
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            apps_script_url: None,
            autosync_mins: DEFAULT_AUTOSYNC_MINS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SyncOptions {
    /// Normalized remote endpoint, if one is configured
    pub fn endpoint(&self) -> Option<String> {
        normalize_text_option(self.apps_script_url.clone())
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// Whether a remote endpoint is configured
    pub fn is_configured(&self) -> bool {
        self.endpoint().is_some()
    }

    /// Set or clear the endpoint, validating its scheme
    pub fn set_endpoint(&mut self, raw: Option<String>) -> Result<()> {
        self.apps_script_url = match normalize_text_option(raw) {
            Some(url) => Some(normalize_endpoint(&url)?),
            None => None,
        };
        Ok(())
    }

    /// Autosync period with the minimum enforced
    pub fn autosync_interval(&self) -> Duration {
        autosync_interval(self.autosync_mins)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(if self.request_timeout_secs == 0 {
            DEFAULT_REQUEST_TIMEOUT_SECS
        } else {
            self.request_timeout_secs
        })
    }

    /// Load options, falling back to defaults when none are stored
    pub async fn load<S: KeyValueStore>(kv: &S) -> Result<Self> {
        match kv.get(OPTIONS_KEY).await? {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Persist options
    pub async fn save<S: KeyValueStore>(&self, kv: &S) -> Result<()> {
        let mut normalized = self.clone();
        normalized.apps_script_url = self.endpoint();
        kv.set(OPTIONS_KEY, serde_json::to_value(&normalized)?).await
    }
}

/// Convert a configured minute count into the autosync period.
///
/// Zero means "use the default"; anything outside
/// `MIN_AUTOSYNC_MINS..=MAX_AUTOSYNC_MINS` is clamped into it.
pub fn autosync_interval(minutes: u64) -> Duration {
    let minutes = if minutes == 0 {
        DEFAULT_AUTOSYNC_MINS
    } else {
        minutes.clamp(MIN_AUTOSYNC_MINS, MAX_AUTOSYNC_MINS)
    };
    Duration::from_secs(minutes * 60)
}

fn normalize_endpoint(raw: &str) -> Result<String> {
    let url = raw.trim();
    if is_http_url(url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "Apps Script URL must include http:// or https://".to_string(),
        ))
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatcher::DEFAULT_PAST_PURCHASES_TIMEOUT;

/// Plugin configuration, read from `plugins.inapp-purchase` in `tauri.conf.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IapConfig {
    /// Products queried when `query_products` is called without ids.
    pub product_ids: Option<Vec<String>>,
    pub past_purchases_timeout_secs: Option<u64>,
}

impl IapConfig {
    pub fn past_purchases_timeout(&self) -> Duration {
        self.past_purchases_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PAST_PURCHASES_TIMEOUT)
    }
}

use crate::domain::package::Catalog;
use crate::error::{Result, UpgradeError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identity a genuine confirmation message must name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfig {
    pub till_number: String,
    pub business_name: String,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            till_number: "3106479".to_string(),
            business_name: "ECERTIFY INC".to_string(),
        }
    }
}

/// Endpoints for the push-payment provider. Credentials come from the
/// environment (`PAYHERO_API_KEY`, `PAYHERO_CHANNEL_ID`), never from the
/// config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub base_url: String,
    /// Where the provider should deliver its payment callbacks.
    pub callback_url: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "https://backend.payhero.co.ke".to_string(),
            callback_url: "http://localhost:8080/callbacks/payhero".to_string(),
        }
    }
}

/// Process-wide immutable configuration, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub merchant: MerchantConfig,
    pub catalog: Catalog,
    pub gateway: GatewaySettings,
}

impl AppConfig {
    /// Reads a JSON config file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| UpgradeError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| UpgradeError::Config(format!("cannot parse {}: {e}", path.display())))
    }
}

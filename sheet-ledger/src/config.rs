//! Configuration for the ledger

use crate::error::{Error, Result};
use crate::partition::PartitionResolver;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Target spreadsheet id
    pub spreadsheet_id: String,

    /// IANA time zone for partitions, markers and timestamps
    pub time_zone: String,

    /// Sheets API base URL
    pub sheets_base_url: String,

    /// Per-request timeout for store calls (seconds)
    pub request_timeout_secs: u64,

    /// Marketplace used when a submission omits one
    pub default_marketplace: Option<String>,

    /// Replaces the key file's `token_uri` when set
    pub token_uri: Option<String>,

    /// Service-account key JSON (contents, not a path)
    #[serde(skip_serializing)]
    pub credentials_json: Option<String>,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("time_zone", &self.time_zone)
            .field("sheets_base_url", &self.sheets_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("default_marketplace", &self.default_marketplace)
            .field("token_uri", &self.token_uri)
            .field("credentials_json", &self.credentials_json.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            time_zone: "Asia/Manila".to_string(),
            sheets_base_url: "https://sheets.googleapis.com/v4".to_string(),
            request_timeout_secs: 30,
            default_marketplace: None,
            token_uri: None,
            credentials_json: None,
        }
    }
}

impl LedgerConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LedgerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = LedgerConfig::default();

        if let Ok(id) = std::env::var("SPREADSHEET_ID") {
            config.spreadsheet_id = id;
        }

        if let Ok(tz) = std::env::var("LEDGER_TIME_ZONE") {
            config.time_zone = tz;
        }

        if let Ok(url) = std::env::var("SHEETS_BASE_URL") {
            config.sheets_base_url = url;
        }

        if let Ok(credentials) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            config.credentials_json = Some(credentials);
        }

        if let Ok(marketplace) = std::env::var("LEDGER_DEFAULT_MARKETPLACE") {
            config.default_marketplace = Some(marketplace);
        }

        if let Ok(uri) = std::env::var("GOOGLE_TOKEN_URI") {
            config.token_uri = Some(uri);
        }

        Ok(config)
    }

    /// Reject configurations that cannot serve requests
    pub fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(Error::Config("Spreadsheet id is required".to_string()));
        }

        if self.credentials_json.as_deref().map_or(true, |c| c.trim().is_empty()) {
            return Err(Error::Config(
                "Service account credentials are required".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config("Request timeout cannot be 0".to_string()));
        }

        self.resolver()?;
        Ok(())
    }

    /// Resolver for the configured time zone
    pub fn resolver(&self) -> Result<PartitionResolver> {
        PartitionResolver::from_name(&self.time_zone)
    }
}

use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use sheet_ledger::LedgerConfig;
use std::collections::HashMap;
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub identity: IdentityConfig,
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub custom_token: CustomTokenConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IdentityConfig {
    pub url: String,
    pub anon_key: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PermissionsConfig {
    /// Categories granted to users with no permission record
    pub default_categories: Vec<String>,
    /// Pre-provisioned permission records, keyed by identity user id
    #[serde(default)]
    pub users: HashMap<String, UserPermissions>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct UserPermissions {
    #[serde(default)]
    pub allowed_categories: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct CustomTokenConfig {
    /// Service-account key JSON used to mint custom tokens
    #[serde(skip_serializing)]
    pub service_account_key: Option<String>,
}

impl std::fmt::Debug for CustomTokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomTokenConfig")
            .field(
                "service_account_key",
                &self.service_account_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            // Start with default configuration
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.workers", 4)?
            .set_default("ledger.spreadsheet_id", "")?
            .set_default("ledger.time_zone", "Asia/Manila")?
            .set_default("ledger.sheets_base_url", "https://sheets.googleapis.com/v4")?
            .set_default("ledger.request_timeout_secs", 30)?
            .set_default("identity.url", "")?
            .set_default("identity.anon_key", "")?
            .set_default("identity.request_timeout_secs", 10)?
            .set_default("permissions.default_categories", vec!["dashboard"])?;

        // Add environment-specific config file if it exists
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        } else {
            builder = builder.add_source(
                File::with_name(&format!("config/{}", environment)).required(false),
            );
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("DASHBOARD")
                .separator("__")
                .list_separator(","),
        );

        // Well-known variables shared with the rest of the deployment
        if let Ok(credentials) = env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            builder = builder.set_override("ledger.credentials_json", credentials)?;
        }

        if let Ok(spreadsheet_id) = env::var("SPREADSHEET_ID") {
            builder = builder.set_override("ledger.spreadsheet_id", spreadsheet_id)?;
        }

        if let Ok(url) = env::var("SUPABASE_URL") {
            builder = builder.set_override("identity.url", url)?;
        }

        if let Ok(anon_key) = env::var("SUPABASE_ANON_KEY") {
            builder = builder.set_override("identity.anon_key", anon_key)?;
        }

        if let Ok(key) = env::var("FIREBASE_SERVICE_ACCOUNT_KEY") {
            builder = builder.set_override("custom_token.service_account_key", key)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".to_string());
        }

        if self.server.workers == 0 {
            return Err("At least one worker is required".to_string());
        }

        self.ledger.validate().map_err(|e| e.to_string())?;

        if self.identity.url.trim().is_empty() {
            return Err("Identity provider URL is required".to_string());
        }

        if self.identity.anon_key.trim().is_empty() {
            return Err("Identity provider anon key is required".to_string());
        }

        if self.permissions.default_categories.is_empty() {
            return Err("At least one default category is required".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                workers: 1,
            },
            ledger: LedgerConfig {
                spreadsheet_id: "sheet-1".to_string(),
                credentials_json: Some("{}".to_string()),
                ..LedgerConfig::default()
            },
            identity: IdentityConfig {
                url: "https://project.supabase.co".to_string(),
                anon_key: "anon".to_string(),
                request_timeout_secs: 10,
            },
            permissions: PermissionsConfig {
                default_categories: vec!["dashboard".to_string()],
                users: HashMap::new(),
            },
            custom_token: CustomTokenConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_identity_rejected() {
        let mut config = valid();
        config.identity.anon_key = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_time_zone_rejected() {
        let mut config = valid();
        config.ledger.time_zone = "Mars/Olympus".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.contains("time zone"));
    }

    #[test]
    fn test_missing_spreadsheet_rejected() {
        let mut config = valid();
        config.ledger.spreadsheet_id = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_token_key_redacted() {
        let config = CustomTokenConfig {
            service_account_key: Some("secret".to_string()),
        };
        assert!(!format!("{:?}", config).contains("secret"));
    }
}

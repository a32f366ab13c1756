use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Monthly budget used when `MONTHLY_BUDGET` is not set.
pub const DEFAULT_MONTHLY_BUDGET: Decimal = Decimal::ONE_THOUSAND;

/// Connection details for the remote bill mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub database_url: String,
    pub merchant_id: String,
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Durable image directory
    pub storage_dir: PathBuf,
    /// Volatile image directory (captured photos, crop output)
    pub cache_dir: PathBuf,
    pub monthly_budget: Decimal,
    /// `None` unless both `DATABASE_URL` and `MERCHANT_ID` are set
    pub remote: Option<RemoteConfig>,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Call `dotenv().ok()` first to pick up a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `SERVER_PORT` or
    /// `MONTHLY_BUDGET` cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("SERVER_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue { key: "SERVER_PORT", value: raw })?,
            None => 3000,
        };

        let monthly_budget = match var("MONTHLY_BUDGET") {
            Some(raw) => {
                let parsed = Decimal::from_str(&raw)
                    .ok()
                    .filter(|budget| !budget.is_sign_negative());
                parsed.ok_or(ConfigError::InvalidValue { key: "MONTHLY_BUDGET", value: raw })?
            }
            None => DEFAULT_MONTHLY_BUDGET,
        };

        let remote = match (var("DATABASE_URL"), var("MERCHANT_ID")) {
            (Some(database_url), Some(merchant_id)) => Some(RemoteConfig {
                database_url,
                merchant_id,
            }),
            _ => None,
        };

        Ok(Self {
            host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            storage_dir: var("BILLS_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/bills")),
            cache_dir: var("BILLS_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("billsnap")),
            monthly_budget,
            remote,
        })
    }

    /// Creates the image directories and replaces both paths with their
    /// canonical absolute form, so image URIs built from them are absolute.
    pub async fn prepare_storage(&mut self) -> std::io::Result<()> {
        for dir in [&mut self.storage_dir, &mut self.cache_dir] {
            tokio::fs::create_dir_all(&*dir).await?;
            *dir = tokio::fs::canonicalize(&*dir).await?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

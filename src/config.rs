use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.json";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config due to missing fields or invalid syntax: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("failed to read config at {0:?}: {1}")]
    Unreadable(PathBuf, #[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Endpoints and limits used when refreshing credentials. Every field has a
/// default, so a missing `config.json` is not an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub refresh_timeout_secs: u64,
    pub eks_token_expiry_secs: u64,
    #[serde(alias = "googleTokenURL")]
    pub google_token_url: String,
    #[serde(alias = "azureAuthorityURL")]
    pub azure_authority_url: String,
    #[serde(alias = "azureManagementURL")]
    pub azure_management_url: String,
    pub azure_api_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_timeout_secs: 30,
            eks_token_expiry_secs: 860,
            google_token_url: "https://oauth2.googleapis.com/token".to_string(),
            azure_authority_url: "https://login.microsoftonline.com".to_string(),
            azure_management_url: "https://management.azure.com".to_string(),
            azure_api_version: "2023-08-01".to_string(),
        }
    }
}

impl Config {
    fn load_from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        match File::open(&config_path) {
            Ok(file) => Self::load_from_reader(file),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(Error::Unreadable(config_path, err)),
        }
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn eks_token_expiry(&self) -> Duration {
        Duration::from_secs(self.eks_token_expiry_secs)
    }
}

use super::open_registry;
use chrono::{TimeDelta, Utc};
use cluster_auth::{AuthProvider, Config, CredentialManager, ExecCredential, Providers};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] cluster_auth::config::Error),

    #[error(transparent)]
    Credentials(#[from] cluster_auth::Error),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("no cluster given and no cluster is selected")]
    NoCluster,

    #[error("cluster {0} has no credential expressible as an ExecCredential")]
    Unsupported(String),

    #[error("invalid credential json: {0}")]
    Serde(#[from] serde_json::Error),
}

pub async fn exec_credentials(config_dir: &Path, id: Option<String>) -> Result<(), Error> {
    let config = Config::load(config_dir)?;
    let registry = Arc::new(open_registry(config_dir)?);
    let id = match id {
        Some(id) => id,
        None => registry.current_cluster().ok_or(Error::NoCluster)?.id,
    };

    let manager = CredentialManager::new(registry, Providers::new(&config)?, config.refresh_timeout());
    let record = manager.ensure_valid(&id).await?;

    let expires_at = match &record.auth_provider {
        AuthProvider::Aws(_) => TimeDelta::from_std(config.eks_token_expiry())
            .ok()
            .map(|lifetime| Utc::now() + lifetime),
        provider => provider.expires_at(),
    };
    let credential =
        ExecCredential::for_cluster(&record, expires_at).ok_or(Error::Unsupported(record.id))?;
    println!("{}", serde_json::to_string(&credential)?);
    Ok(())
}

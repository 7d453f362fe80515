pub mod clusters;
pub mod credentials;
pub mod kubeconfig;

use cluster_auth::config::SETTINGS_FILE;
use cluster_auth::{ClusterRegistry, FileStore};
use std::path::Path;
use tracing::debug;

/// Opens the registry persisted under `config_dir`.
pub fn open_registry(config_dir: &Path) -> cluster_auth::Result<ClusterRegistry> {
    let store = FileStore::new(config_dir.join(SETTINGS_FILE));
    debug!(path = ?store.path(), "opening settings");
    ClusterRegistry::open(store)
}

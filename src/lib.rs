//! Credential lifecycle management for Kubernetes clusters.
//!
//! Clusters live in a durable [`ClusterRegistry`]. Each one authenticates with
//! static kubeconfig credentials or through an identity provider (AWS, Azure,
//! Google, OIDC). [`CredentialManager::ensure_valid`] hands out records whose
//! credentials are valid right now, refreshing them at most once per cluster
//! at a time. Session registries open terminals and port forwards on top of
//! it and are closed when their cluster is deleted.

pub mod config;
pub mod error;
pub mod kubeconfig;
pub mod manager;
pub mod providers;
pub mod registry;
pub mod sessions;
pub mod store;
pub mod types;
pub mod utils;

pub use config::Config;
pub use error::{AuthCause, AuthError, Error, Result};
pub use manager::CredentialManager;
pub use providers::Providers;
pub use registry::{ClusterDeletionHook, ClusterRegistry};
pub use store::{FileStore, MemoryStore, SettingsStore};
pub use types::{AuthProvider, ClusterRecord, ExecCredential, ProviderKind};

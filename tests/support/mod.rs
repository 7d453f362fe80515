#![allow(dead_code)]

use chrono::Utc;
use cluster_auth::types::{GooglePayload, OidcPayload};
use cluster_auth::{
    AuthProvider, ClusterRecord, ClusterRegistry, Config, CredentialManager, MemoryStore, Providers,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(5);

pub fn registry_with(records: Vec<ClusterRecord>) -> (Arc<ClusterRegistry>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let registry = ClusterRegistry::open(store.clone()).expect("empty store opens");
    registry.add(records).expect("memory store accepts writes");
    (Arc::new(registry), store)
}

pub fn config_for(server: &MockServer) -> Config {
    Config {
        google_token_url: format!("{}/token", server.uri()),
        azure_authority_url: server.uri(),
        azure_management_url: server.uri(),
        ..Config::default()
    }
}

pub fn manager(registry: Arc<ClusterRegistry>, server: &MockServer, timeout: Duration) -> CredentialManager {
    let providers = Providers::new(&config_for(server)).expect("client builds");
    CredentialManager::new(registry, providers, timeout)
}

pub fn static_cluster(id: &str) -> ClusterRecord {
    let mut record = ClusterRecord::new(id, format!("https://{id}.example.com:6443"));
    record.token = format!("{id}-static-token");
    record
}

/// Google cluster whose credential expires `expires_in_secs` from now.
pub fn google_cluster(id: &str, expires_in_secs: i64) -> ClusterRecord {
    let mut record = ClusterRecord::new(id, format!("https://{id}.gke.example.com"));
    record.token = "id.old".to_string();
    record.auth_provider = AuthProvider::Google(GooglePayload {
        access_token: "ya29.old".to_string(),
        id_token: "id.old".to_string(),
        refresh_token: "1//refresh".to_string(),
        token_type: "Bearer".to_string(),
        expires: Utc::now().timestamp() + expires_in_secs,
        client_id: "dashboard.apps.googleusercontent.com".to_string(),
        cluster_id: None,
    });
    record
}

pub fn oidc_cluster(id: &str, issuer: &str, expires_in_secs: i64) -> ClusterRecord {
    let mut record = ClusterRecord::new(id, format!("https://{id}.example.com"));
    record.token = "id.old".to_string();
    record.auth_provider = AuthProvider::Oidc(OidcPayload {
        client_id: "dashboard".to_string(),
        client_secret: "s3cret".to_string(),
        id_token: "id.old".to_string(),
        idp_issuer_url: issuer.to_string(),
        refresh_token: "rt.old".to_string(),
        certificate_authority: String::new(),
        access_token: "at.old".to_string(),
        expiry: Utc::now().timestamp() + expires_in_secs,
        cluster_id: None,
    });
    record
}

pub fn google_payload(record: &ClusterRecord) -> &GooglePayload {
    match &record.auth_provider {
        AuthProvider::Google(payload) => payload,
        other => panic!("expected a google cluster, got {:?}", other.kind()),
    }
}

pub fn oidc_payload(record: &ClusterRecord) -> &OidcPayload {
    match &record.auth_provider {
        AuthProvider::Oidc(payload) => payload,
        other => panic!("expected an oidc cluster, got {:?}", other.kind()),
    }
}

//! Kubeconfig import and export.
//!
//! Only the embedded-data subset of the format is understood: file references
//! (`certificate-authority`, `client-key`, ...) and exec/auth-provider plugins
//! are ignored. Cloud providers are configured on the record after import.

use crate::types::{AuthProvider, ClusterRecord, StaticCredential};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read kubeconfig {0:?}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("invalid kubeconfig: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// A context that could not be turned into a cluster record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("context {context}: cluster {cluster:?} is not defined")]
    MissingCluster { context: String, cluster: String },

    #[error("context {context}: user {user:?} is not defined")]
    MissingUser { context: String, user: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubeconfigDocument {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub clusters: Vec<NamedCluster>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contexts: Vec<NamedContext>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<NamedUser>,
    #[serde(
        rename = "current-context",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(
        rename = "certificate-authority-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate_authority_data: Option<String>,
    #[serde(
        rename = "insecure-skip-tls-verify",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub insecure_skip_tls_verify: Option<bool>,
    #[serde(default)]
    pub server: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: UserSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSpec {
    #[serde(
        rename = "client-certificate-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_certificate_data: Option<String>,
    #[serde(
        rename = "client-key-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_key_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSpec {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

// kubectl writes `users: null` for an empty list.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Records built from the resolvable contexts, plus one error per context
/// that referenced an undefined cluster or user.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub records: Vec<ClusterRecord>,
    pub errors: Vec<ImportError>,
}

impl KubeconfigDocument {
    pub fn parse(contents: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents =
            fs::read_to_string(path).map_err(|err| Error::Read(path.to_path_buf(), err))?;
        Self::parse(&contents)
    }

    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterSpec> {
        self.clusters
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.cluster)
    }

    pub fn user(&self, name: &str) -> Option<&UserSpec> {
        self.users.iter().find(|u| u.name == name).map(|u| &u.user)
    }
}

/// Turns every context of `document` into a cluster record named after the
/// context. Unresolvable contexts are reported, never fatal.
pub fn import(document: &KubeconfigDocument) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    for named in &document.contexts {
        let context = &named.context;
        let Some(cluster) = document.cluster(&context.cluster) else {
            warn!(context = %named.name, cluster = %context.cluster, "skipping context");
            outcome.errors.push(ImportError::MissingCluster {
                context: named.name.clone(),
                cluster: context.cluster.clone(),
            });
            continue;
        };
        let Some(user) = document.user(&context.user) else {
            warn!(context = %named.name, user = %context.user, "skipping context");
            outcome.errors.push(ImportError::MissingUser {
                context: named.name.clone(),
                user: context.user.clone(),
            });
            continue;
        };

        let record = to_record(&named.name, context, cluster, user);
        debug!(
            context = %named.name,
            credential = credential_label(record.static_credential()),
            "imported context"
        );
        outcome.records.push(record);
    }
    outcome
}

fn to_record(name: &str, context: &ContextSpec, cluster: &ClusterSpec, user: &UserSpec) -> ClusterRecord {
    let owned = |value: &Option<String>| value.clone().unwrap_or_default();
    ClusterRecord {
        id: name.to_string(),
        name: name.to_string(),
        url: cluster.server.clone(),
        certificate_authority_data: owned(&cluster.certificate_authority_data),
        client_certificate_data: owned(&user.client_certificate_data),
        client_key_data: owned(&user.client_key_data),
        token: owned(&user.token),
        username: owned(&user.username),
        password: owned(&user.password),
        insecure_skip_tls_verify: cluster.insecure_skip_tls_verify.unwrap_or(false),
        auth_provider: AuthProvider::Kubeconfig,
        namespace: context
            .namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
    }
}

fn credential_label(credential: StaticCredential<'_>) -> &'static str {
    match credential {
        StaticCredential::ClientCertificate { .. } => "client-certificate",
        StaticCredential::Token(_) => "token",
        StaticCredential::Basic { .. } => "basic",
        StaticCredential::None => "none",
    }
}

/// Builds a kubeconfig with one cluster, user and context per record, all
/// named after the record id. The first record becomes the current context.
pub fn export(records: &[ClusterRecord]) -> KubeconfigDocument {
    let present = |value: &str| (!value.is_empty()).then(|| value.to_string());
    let mut document = KubeconfigDocument {
        api_version: Some("v1".to_string()),
        kind: Some("Config".to_string()),
        current_context: records.first().map(|r| r.id.clone()),
        ..Default::default()
    };
    for record in records {
        document.clusters.push(NamedCluster {
            name: record.id.clone(),
            cluster: ClusterSpec {
                certificate_authority_data: present(&record.certificate_authority_data),
                insecure_skip_tls_verify: record.insecure_skip_tls_verify.then_some(true),
                server: record.url.clone(),
            },
        });
        document.users.push(NamedUser {
            name: record.id.clone(),
            user: UserSpec {
                client_certificate_data: present(&record.client_certificate_data),
                client_key_data: present(&record.client_key_data),
                token: present(&record.token),
                username: present(&record.username),
                password: present(&record.password),
            },
        });
        document.contexts.push(NamedContext {
            name: record.id.clone(),
            context: ContextSpec {
                cluster: record.id.clone(),
                user: record.id.clone(),
                namespace: present(&record.namespace),
            },
        });
    }
    document
}

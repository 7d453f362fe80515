use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const EXEC_CREDENTIAL_KIND: &str = "ExecCredential";
pub const EXEC_CREDENTIAL_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";

/// Identity provider a cluster authenticates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Kubeconfig,
    Aws,
    Azure,
    Google,
    Oidc,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Kubeconfig => "kubeconfig",
            ProviderKind::Aws => "aws",
            ProviderKind::Azure => "azure",
            ProviderKind::Google => "google",
            ProviderKind::Oidc => "oidc",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsPayload {
    #[serde(rename = "accessKeyID")]
    pub access_key_id: String,
    #[serde(rename = "secretKey")]
    pub secret_key: String,
    pub region: String,
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzurePayload {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    #[serde(rename = "subscriptionID")]
    pub subscription_id: String,
    #[serde(rename = "resourceGroupName")]
    pub resource_group_name: String,
    pub admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GooglePayload {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "idToken")]
    pub id_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "tokenType")]
    pub token_type: String,
    /// Absolute expiry, epoch seconds.
    pub expires: i64,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clusterID", default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcPayload {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    #[serde(rename = "idToken")]
    pub id_token: String,
    #[serde(rename = "idpIssuerURL")]
    pub idp_issuer_url: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "certificateAuthority")]
    pub certificate_authority: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    /// Absolute expiry, epoch seconds.
    pub expiry: i64,
    #[serde(rename = "clusterID", default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
}

/// Authentication scheme of a cluster. Static credentials (token, basic auth,
/// client certificate) live on the record itself and are covered by
/// `Kubeconfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthProvider {
    Kubeconfig,
    Aws(AwsPayload),
    Azure(AzurePayload),
    Google(GooglePayload),
    Oidc(OidcPayload),
}

impl AuthProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            AuthProvider::Kubeconfig => ProviderKind::Kubeconfig,
            AuthProvider::Aws(_) => ProviderKind::Aws,
            AuthProvider::Azure(_) => ProviderKind::Azure,
            AuthProvider::Google(_) => ProviderKind::Google,
            AuthProvider::Oidc(_) => ProviderKind::Oidc,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, AuthProvider::Kubeconfig)
    }

    /// Expiry stored with the payload. Only Google and OIDC persist one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AuthProvider::Google(p) => DateTime::from_timestamp(p.expires, 0),
            AuthProvider::Oidc(p) => DateTime::from_timestamp(p.expiry, 0),
            _ => None,
        }
    }
}

/// Static credential carried directly on a record, in classification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticCredential<'a> {
    ClientCertificate { certificate: &'a str, key: &'a str },
    Token(&'a str),
    Basic { username: &'a str, password: &'a str },
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PersistedCluster", into = "PersistedCluster")]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub certificate_authority_data: String,
    pub client_certificate_data: String,
    pub client_key_data: String,
    pub token: String,
    pub username: String,
    pub password: String,
    pub insecure_skip_tls_verify: bool,
    pub auth_provider: AuthProvider,
    pub namespace: String,
}

impl ClusterRecord {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            url: url.into(),
            certificate_authority_data: String::new(),
            client_certificate_data: String::new(),
            client_key_data: String::new(),
            token: String::new(),
            username: String::new(),
            password: String::new(),
            insecure_skip_tls_verify: false,
            auth_provider: AuthProvider::Kubeconfig,
            namespace: String::from("default"),
        }
    }

    pub fn static_credential(&self) -> StaticCredential<'_> {
        if !self.client_certificate_data.is_empty() && !self.client_key_data.is_empty() {
            StaticCredential::ClientCertificate {
                certificate: &self.client_certificate_data,
                key: &self.client_key_data,
            }
        } else if !self.token.is_empty() {
            StaticCredential::Token(&self.token)
        } else if !self.username.is_empty() && !self.password.is_empty() {
            StaticCredential::Basic {
                username: &self.username,
                password: &self.password,
            }
        } else {
            StaticCredential::None
        }
    }
}

/// On-disk shape of a cluster: one tag plus up to four optional payloads.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedCluster {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    certificate_authority_data: String,
    #[serde(default)]
    client_certificate_data: String,
    #[serde(default)]
    client_key_data: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(rename = "insecureSkipTLSVerify", default)]
    insecure_skip_tls_verify: bool,
    #[serde(default)]
    auth_provider: String,
    #[serde(rename = "authProviderAWS", default, skip_serializing_if = "Option::is_none")]
    auth_provider_aws: Option<AwsPayload>,
    #[serde(rename = "authProviderAzure", default, skip_serializing_if = "Option::is_none")]
    auth_provider_azure: Option<AzurePayload>,
    #[serde(rename = "authProviderGoogle", default, skip_serializing_if = "Option::is_none")]
    auth_provider_google: Option<GooglePayload>,
    #[serde(rename = "authProviderOIDC", default, skip_serializing_if = "Option::is_none")]
    auth_provider_oidc: Option<OidcPayload>,
    #[serde(default)]
    namespace: String,
}

impl TryFrom<PersistedCluster> for ClusterRecord {
    type Error = String;

    fn try_from(value: PersistedCluster) -> Result<Self, Self::Error> {
        fn payload<T>(id: &str, tag: &str, payload: Option<T>) -> Result<T, String> {
            payload.ok_or_else(|| format!("cluster {id}: authProvider {tag} has no payload"))
        }

        let id = value.id;
        let auth_provider = match value.auth_provider.as_str() {
            // Older settings files carry an empty tag for kubeconfig clusters.
            "" | "kubeconfig" => AuthProvider::Kubeconfig,
            "aws" => AuthProvider::Aws(payload(&id, "aws", value.auth_provider_aws)?),
            "azure" => AuthProvider::Azure(payload(&id, "azure", value.auth_provider_azure)?),
            "google" => AuthProvider::Google(payload(&id, "google", value.auth_provider_google)?),
            "oidc" => AuthProvider::Oidc(payload(&id, "oidc", value.auth_provider_oidc)?),
            other => return Err(format!("cluster {id}: unknown authProvider {other:?}")),
        };

        Ok(Self {
            name: if value.name.is_empty() {
                id.clone()
            } else {
                value.name
            },
            id,
            url: value.url,
            certificate_authority_data: value.certificate_authority_data,
            client_certificate_data: value.client_certificate_data,
            client_key_data: value.client_key_data,
            token: value.token,
            username: value.username,
            password: value.password,
            insecure_skip_tls_verify: value.insecure_skip_tls_verify,
            auth_provider,
            namespace: value.namespace,
        })
    }
}

impl From<ClusterRecord> for PersistedCluster {
    fn from(value: ClusterRecord) -> Self {
        let mut persisted = PersistedCluster {
            id: value.id,
            name: value.name,
            url: value.url,
            certificate_authority_data: value.certificate_authority_data,
            client_certificate_data: value.client_certificate_data,
            client_key_data: value.client_key_data,
            token: value.token,
            username: value.username,
            password: value.password,
            insecure_skip_tls_verify: value.insecure_skip_tls_verify,
            auth_provider: value.auth_provider.kind().to_string(),
            auth_provider_aws: None,
            auth_provider_azure: None,
            auth_provider_google: None,
            auth_provider_oidc: None,
            namespace: value.namespace,
        };
        match value.auth_provider {
            AuthProvider::Kubeconfig => {}
            AuthProvider::Aws(p) => persisted.auth_provider_aws = Some(p),
            AuthProvider::Azure(p) => persisted.auth_provider_azure = Some(p),
            AuthProvider::Google(p) => persisted.auth_provider_google = Some(p),
            AuthProvider::Oidc(p) => persisted.auth_provider_oidc = Some(p),
        }
        persisted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub title: String,
    pub url: String,
    pub namespace: String,
}

/// The persisted settings blob. `settings` is owned by the dashboard and kept
/// verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub settings: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExecCredentialStatus {
    #[serde(
        rename = "expirationTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        rename = "clientCertificateData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_certificate_data: Option<String>,
    #[serde(
        rename = "clientKeyData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_key_data: Option<String>,
}

/// Output understood by kubectl's exec credential plugin protocol.
#[derive(Debug, Deserialize, Serialize)]
pub struct ExecCredential {
    pub kind: String,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub spec: HashMap<String, serde_json::Value>,
    pub status: ExecCredentialStatus,
}

impl ExecCredential {
    /// Builds the plugin output for a validated record. Basic auth cannot be
    /// expressed as an exec credential, so such records yield `None`.
    pub fn for_cluster(record: &ClusterRecord, expires_at: Option<DateTime<Utc>>) -> Option<Self> {
        let mut status = ExecCredentialStatus {
            expiration_timestamp: expires_at,
            token: None,
            client_certificate_data: None,
            client_key_data: None,
        };
        match record.static_credential() {
            StaticCredential::ClientCertificate { certificate, key } => {
                status.client_certificate_data = Some(decode_pem(certificate));
                status.client_key_data = Some(decode_pem(key));
            }
            StaticCredential::Token(token) => status.token = Some(token.to_string()),
            StaticCredential::Basic { .. } | StaticCredential::None => return None,
        }
        Some(Self {
            kind: EXEC_CREDENTIAL_KIND.to_string(),
            api_version: EXEC_CREDENTIAL_API_VERSION.to_string(),
            spec: HashMap::new(),
            status,
        })
    }
}

// kubeconfig embeds PEM as base64, the exec protocol wants the PEM itself.
fn decode_pem(data: &str) -> String {
    STANDARD
        .decode(data.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| data.to_string())
}

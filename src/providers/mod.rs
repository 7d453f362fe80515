//! Credential strategies, one per identity provider.
//!
//! Each strategy knows whether its payload is expired and how to exchange it
//! for a fresh credential. [`Providers`] dispatches on the record's
//! [`AuthProvider`] so callers never match on provider kinds themselves.

pub mod aws;
pub mod azure;
pub mod google;
pub mod oidc;
pub mod static_auth;

use crate::config::Config;
use crate::error::AuthError;
use crate::types::{AuthProvider, ClusterRecord, ProviderKind};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

pub use aws::AwsStrategy;
pub use azure::AzureStrategy;
pub use google::GoogleStrategy;
pub use oidc::OidcStrategy;
pub use static_auth::StaticStrategy;

/// Connection credential produced by a refresh. Fields left `None` keep the
/// value already on the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuedCredential {
    pub token: Option<String>,
    pub client_certificate_data: Option<String>,
    pub client_key_data: Option<String>,
    pub certificate_authority_data: Option<String>,
    pub server: Option<String>,
}

impl IssuedCredential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Writes the credential onto `record`. A bearer token replaces a client
    /// certificate pair and vice versa, so the record classifies as the
    /// credential that was just issued.
    pub fn apply(&self, record: &mut ClusterRecord) {
        if let Some(token) = &self.token {
            record.token = token.clone();
            record.client_certificate_data.clear();
            record.client_key_data.clear();
        }
        if let (Some(certificate), Some(key)) = (&self.client_certificate_data, &self.client_key_data)
        {
            record.client_certificate_data = certificate.clone();
            record.client_key_data = key.clone();
            record.token.clear();
        }
        if let Some(ca) = &self.certificate_authority_data {
            record.certificate_authority_data = ca.clone();
        }
        if let Some(server) = &self.server {
            record.url = server.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refreshed<P> {
    pub payload: P,
    pub credential: IssuedCredential,
}

impl Refreshed<AuthProvider> {
    pub fn apply(&self, record: &mut ClusterRecord) {
        record.auth_provider = self.payload.clone();
        self.credential.apply(record);
    }
}

#[allow(async_fn_in_trait)]
pub trait RefreshCredentials {
    type Payload;

    fn is_expired(&self, payload: &Self::Payload, now: DateTime<Utc>) -> bool;

    async fn refresh(
        &self,
        payload: &Self::Payload,
        cluster: &ClusterRecord,
        now: DateTime<Utc>,
    ) -> Result<Refreshed<Self::Payload>, AuthError>;
}

#[derive(Debug, Clone)]
pub struct Providers {
    pub kubeconfig: StaticStrategy,
    pub aws: AwsStrategy,
    pub azure: AzureStrategy,
    pub google: GoogleStrategy,
    pub oidc: OidcStrategy,
}

impl Providers {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(config.refresh_timeout()).build()?;
        Ok(Self {
            kubeconfig: StaticStrategy,
            aws: AwsStrategy::new(config.eks_token_expiry()),
            azure: AzureStrategy::new(
                client.clone(),
                &config.azure_authority_url,
                &config.azure_management_url,
                &config.azure_api_version,
            ),
            google: GoogleStrategy::new(client.clone(), &config.google_token_url),
            oidc: OidcStrategy::new(client, config.refresh_timeout()),
        })
    }

    pub fn is_expired(&self, provider: &AuthProvider, now: DateTime<Utc>) -> bool {
        match provider {
            AuthProvider::Kubeconfig => self.kubeconfig.is_expired(&(), now),
            AuthProvider::Aws(p) => self.aws.is_expired(p, now),
            AuthProvider::Azure(p) => self.azure.is_expired(p, now),
            AuthProvider::Google(p) => self.google.is_expired(p, now),
            AuthProvider::Oidc(p) => self.oidc.is_expired(p, now),
        }
    }

    pub async fn refresh(
        &self,
        cluster: &ClusterRecord,
        now: DateTime<Utc>,
    ) -> Result<Refreshed<AuthProvider>, AuthError> {
        fn wrap<P>(refreshed: Refreshed<P>, into: fn(P) -> AuthProvider) -> Refreshed<AuthProvider> {
            Refreshed {
                payload: into(refreshed.payload),
                credential: refreshed.credential,
            }
        }

        debug!(cluster = %cluster.id, provider = %cluster.auth_provider.kind(), "refreshing");
        Ok(match &cluster.auth_provider {
            AuthProvider::Kubeconfig => {
                let refreshed = self.kubeconfig.refresh(&(), cluster, now).await?;
                wrap(refreshed, |()| AuthProvider::Kubeconfig)
            }
            AuthProvider::Aws(p) => wrap(self.aws.refresh(p, cluster, now).await?, AuthProvider::Aws),
            AuthProvider::Azure(p) => {
                wrap(self.azure.refresh(p, cluster, now).await?, AuthProvider::Azure)
            }
            AuthProvider::Google(p) => {
                wrap(self.google.refresh(p, cluster, now).await?, AuthProvider::Google)
            }
            AuthProvider::Oidc(p) => wrap(self.oidc.refresh(p, cluster, now).await?, AuthProvider::Oidc),
        })
    }

    /// AWS and Azure credentials are minted per request and never stored.
    pub fn persists_refresh(kind: ProviderKind) -> bool {
        matches!(kind, ProviderKind::Google | ProviderKind::Oidc)
    }
}

/// Body of an OAuth2 token endpoint response. Google, OIDC issuers and Entra
/// ID all answer with a subset of these fields.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expiry: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TokenResponse {
    fn rejection(&self) -> Option<String> {
        match (&self.error, &self.error_description, &self.message) {
            (Some(error), Some(description), _) => Some(format!("{error}: {description}")),
            (Some(error), None, _) => Some(error.clone()),
            (None, _, Some(message)) => Some(message.clone()),
            _ => None,
        }
    }

    /// Absolute `expiry`, accepted as RFC 3339 or epoch seconds.
    pub fn absolute_expiry(&self) -> Option<DateTime<Utc>> {
        match self.expiry.as_ref()? {
            serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            serde_json::Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0),
            _ => None,
        }
    }
}

/// `now` plus a relative `expires_in`. Values past chrono's range are
/// rejected instead of overflowing.
pub(crate) fn expires_after(
    provider: ProviderKind,
    now: DateTime<Utc>,
    expires_in: i64,
) -> Result<DateTime<Utc>, AuthError> {
    TimeDelta::try_seconds(expires_in)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| AuthError::rejected(provider, "expires_in out of range"))
}

pub(crate) async fn request_token(
    client: &Client,
    provider: ProviderKind,
    url: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let response = client
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|err| AuthError::network(provider, err))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| AuthError::network(provider, err))?;

    let parsed = serde_json::from_str::<TokenResponse>(&body).ok();
    if let Some(reason) = parsed.as_ref().and_then(TokenResponse::rejection) {
        return Err(AuthError::rejected(provider, reason));
    }
    if !status.is_success() {
        return Err(AuthError::rejected(provider, format!("{status}: {}", body.trim())));
    }
    parsed.ok_or_else(|| AuthError::rejected(provider, "unreadable token response"))
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: ProviderKind,
    response: Response,
) -> Result<T, AuthError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| AuthError::network(provider, err))?;
    if !status.is_success() {
        return Err(AuthError::rejected(provider, format!("{status}: {}", body.trim())));
    }
    serde_json::from_str(&body)
        .map_err(|err| AuthError::rejected(provider, format!("unexpected response: {err}")))
}

pub(crate) fn require(
    provider: ProviderKind,
    fields: &[(&str, &str)],
) -> Result<(), AuthError> {
    let missing: Vec<_> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::malformed(provider, format!("missing {}", missing.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bearer_replaces_certificate_pair() {
        let mut record = ClusterRecord::new("aks", "https://aks");
        record.client_certificate_data = "cert".to_string();
        record.client_key_data = "key".to_string();
        IssuedCredential::bearer("t0k3n").apply(&mut record);
        assert_eq!(record.token, "t0k3n");
        assert!(record.client_certificate_data.is_empty());
        assert_eq!(record.url, "https://aks");
    }

    #[test]
    fn expiry_accepts_rfc3339_and_epoch() {
        let rfc: TokenResponse =
            serde_json::from_value(json!({ "expiry": "2024-01-01T00:00:00Z" })).unwrap();
        let epoch: TokenResponse = serde_json::from_value(json!({ "expiry": 1704067200 })).unwrap();
        assert_eq!(rfc.absolute_expiry(), epoch.absolute_expiry());
        assert!(rfc.absolute_expiry().is_some());
    }

    #[test]
    fn error_and_message_fields_are_rejections() {
        let error: TokenResponse = serde_json::from_value(
            json!({ "error": "invalid_grant", "error_description": "Token has been revoked" }),
        )
        .unwrap();
        assert_eq!(
            error.rejection().as_deref(),
            Some("invalid_grant: Token has been revoked")
        );
        let message: TokenResponse =
            serde_json::from_value(json!({ "message": "refresh token expired" })).unwrap();
        assert_eq!(message.rejection().as_deref(), Some("refresh token expired"));
    }

    #[test]
    fn require_lists_every_blank_field() {
        let err = require(ProviderKind::Aws, &[("accessKeyID", ""), ("region", " "), ("clusterID", "eks")])
            .unwrap_err();
        assert_eq!(
            err.cause,
            crate::error::AuthCause::MalformedCredentials("missing accessKeyID, region".to_string())
        );
    }
}

use super::{read_json, request_token, require, IssuedCredential, RefreshCredentials, Refreshed};
use crate::error::AuthError;
use crate::kubeconfig::KubeconfigDocument;
use crate::types::{AzurePayload, ClusterRecord, ProviderKind};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CredentialResults {
    #[serde(default)]
    kubeconfigs: Vec<CredentialResult>,
}

#[derive(Debug, Deserialize)]
struct CredentialResult {
    #[serde(default)]
    name: String,
    value: String,
}

/// AKS credentials fetched through the ARM `listCluster*Credential` actions
/// with a service principal. Fetched on every request.
#[derive(Debug, Clone)]
pub struct AzureStrategy {
    client: Client,
    authority_url: String,
    management_url: String,
    api_version: String,
}

impl AzureStrategy {
    pub fn new(client: Client, authority_url: &str, management_url: &str, api_version: &str) -> Self {
        Self {
            client,
            authority_url: authority_url.trim_end_matches('/').to_string(),
            management_url: management_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        }
    }

    async fn management_token(&self, payload: &AzurePayload) -> Result<String, AuthError> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority_url, payload.tenant_id);
        let scope = format!("{}/.default", self.management_url);
        let response = request_token(
            &self.client,
            ProviderKind::Azure,
            &url,
            &[
                ("grant_type", "client_credentials"),
                ("client_id", &payload.client_id),
                ("client_secret", &payload.client_secret),
                ("scope", &scope),
            ],
        )
        .await?;
        response
            .access_token
            .ok_or_else(|| AuthError::rejected(ProviderKind::Azure, "response has no access_token"))
    }

    /// ARM action URL for the cluster. Each id is one percent-encoded path
    /// segment.
    fn credential_url(&self, payload: &AzurePayload, cluster_name: &str) -> Result<Url, AuthError> {
        let action = if payload.admin {
            "listClusterAdminCredential"
        } else {
            "listClusterUserCredential"
        };
        let mut url = Url::parse(&self.management_url).map_err(|err| {
            AuthError::malformed(ProviderKind::Azure, format!("management url: {err}"))
        })?;
        url.path_segments_mut()
            .map_err(|()| AuthError::malformed(ProviderKind::Azure, "management url cannot be a base"))?
            .pop_if_empty()
            .extend([
                "subscriptions",
                payload.subscription_id.as_str(),
                "resourceGroups",
                payload.resource_group_name.as_str(),
                "providers",
                "Microsoft.ContainerService",
                "managedClusters",
                cluster_name,
                action,
            ]);
        url.query_pairs_mut().append_pair("api-version", &self.api_version);
        Ok(url)
    }

    async fn cluster_kubeconfig(
        &self,
        payload: &AzurePayload,
        cluster_name: &str,
        token: &str,
    ) -> Result<KubeconfigDocument, AuthError> {
        let url = self.credential_url(payload, cluster_name)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .body("")
            .send()
            .await
            .map_err(|err| AuthError::network(ProviderKind::Azure, err))?;
        let results: CredentialResults = read_json(ProviderKind::Azure, response).await?;

        let first = results
            .kubeconfigs
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::rejected(ProviderKind::Azure, "no kubeconfig returned"))?;
        debug!(kubeconfig = %first.name, "received aks credentials");
        let yaml = STANDARD.decode(first.value.trim()).map_err(|err| {
            AuthError::rejected(ProviderKind::Azure, format!("kubeconfig is not base64: {err}"))
        })?;
        let yaml = String::from_utf8_lossy(&yaml);
        KubeconfigDocument::parse(&yaml)
            .map_err(|err| AuthError::rejected(ProviderKind::Azure, err.to_string()))
    }
}

/// First user's credential and first cluster's endpoint of an AKS kubeconfig.
fn issued_from(document: &KubeconfigDocument) -> Result<IssuedCredential, AuthError> {
    let user = document
        .users
        .first()
        .map(|u| &u.user)
        .ok_or_else(|| AuthError::rejected(ProviderKind::Azure, "kubeconfig has no user"))?;
    let present = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

    let mut issued = IssuedCredential::default();
    match (present(&user.client_certificate_data), present(&user.client_key_data)) {
        (Some(certificate), Some(key)) => {
            issued.client_certificate_data = Some(certificate);
            issued.client_key_data = Some(key);
        }
        _ => {
            issued.token = Some(present(&user.token).ok_or_else(|| {
                AuthError::rejected(ProviderKind::Azure, "kubeconfig user has no usable credential")
            })?);
        }
    }
    if let Some(cluster) = document.clusters.first() {
        issued.certificate_authority_data = present(&cluster.cluster.certificate_authority_data);
        issued.server = Some(cluster.cluster.server.clone()).filter(|s| !s.is_empty());
    }
    Ok(issued)
}

impl RefreshCredentials for AzureStrategy {
    type Payload = AzurePayload;

    fn is_expired(&self, _payload: &AzurePayload, _now: DateTime<Utc>) -> bool {
        true
    }

    async fn refresh(
        &self,
        payload: &AzurePayload,
        cluster: &ClusterRecord,
        _now: DateTime<Utc>,
    ) -> Result<Refreshed<AzurePayload>, AuthError> {
        require(
            ProviderKind::Azure,
            &[
                ("clientID", &payload.client_id),
                ("clientSecret", &payload.client_secret),
                ("tenantID", &payload.tenant_id),
                ("subscriptionID", &payload.subscription_id),
                ("resourceGroupName", &payload.resource_group_name),
                ("name", &cluster.name),
            ],
        )?;

        let token = self.management_token(payload).await?;
        let document = self.cluster_kubeconfig(payload, &cluster.name, &token).await?;
        Ok(Refreshed {
            payload: payload.clone(),
            credential: issued_from(&document)?,
        })
    }
}

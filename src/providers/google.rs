use super::{expires_after, request_token, require, IssuedCredential, RefreshCredentials, Refreshed};
use crate::error::AuthError;
use crate::types::{ClusterRecord, GooglePayload, ProviderKind};
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GoogleStrategy {
    client: Client,
    token_url: String,
}

impl GoogleStrategy {
    pub fn new(client: Client, token_url: &str) -> Self {
        Self {
            client,
            token_url: token_url.to_string(),
        }
    }
}

impl RefreshCredentials for GoogleStrategy {
    type Payload = GooglePayload;

    fn is_expired(&self, payload: &GooglePayload, now: DateTime<Utc>) -> bool {
        now.timestamp() >= payload.expires
    }

    async fn refresh(
        &self,
        payload: &GooglePayload,
        _cluster: &ClusterRecord,
        now: DateTime<Utc>,
    ) -> Result<Refreshed<GooglePayload>, AuthError> {
        require(
            ProviderKind::Google,
            &[
                ("clientID", &payload.client_id),
                ("refreshToken", &payload.refresh_token),
            ],
        )?;

        let response = request_token(
            &self.client,
            ProviderKind::Google,
            &self.token_url,
            &[
                ("grant_type", "refresh_token"),
                ("client_id", &payload.client_id),
                ("refresh_token", &payload.refresh_token),
            ],
        )
        .await?;

        let access_token = response
            .access_token
            .ok_or_else(|| AuthError::rejected(ProviderKind::Google, "response has no access_token"))?;
        let expires_in = response.expires_in.unwrap_or_default();
        let expires = expires_after(ProviderKind::Google, now, expires_in)?;
        debug!(expires_in, "google token refreshed");

        let refreshed = GooglePayload {
            access_token,
            id_token: response.id_token.unwrap_or_else(|| payload.id_token.clone()),
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| payload.refresh_token.clone()),
            token_type: response
                .token_type
                .unwrap_or_else(|| payload.token_type.clone()),
            expires: expires.timestamp(),
            client_id: payload.client_id.clone(),
            cluster_id: payload.cluster_id.clone(),
        };
        Ok(Refreshed {
            credential: IssuedCredential::bearer(&refreshed.id_token),
            payload: refreshed,
        })
    }
}

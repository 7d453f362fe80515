use super::{expires_after, read_json, request_token, require, IssuedCredential, RefreshCredentials, Refreshed};
use crate::error::AuthError;
use crate::types::{ClusterRecord, OidcPayload, ProviderKind};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::{Certificate, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

#[derive(Debug, Deserialize)]
struct ProviderMetadata {
    token_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    exp: i64,
}

/// Generic OpenID Connect refresh-token flow against the issuer's discovered
/// token endpoint.
#[derive(Debug, Clone)]
pub struct OidcStrategy {
    client: Client,
    timeout: Duration,
}

impl OidcStrategy {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// The shared client, or a dedicated one trusting the payload's
    /// certificate authority.
    fn client_for(&self, payload: &OidcPayload) -> Result<Client, AuthError> {
        let ca = payload.certificate_authority.trim();
        if ca.is_empty() {
            return Ok(self.client.clone());
        }
        let pem = if ca.starts_with("-----BEGIN") {
            ca.as_bytes().to_vec()
        } else {
            STANDARD.decode(ca).map_err(|err| {
                AuthError::malformed(ProviderKind::Oidc, format!("certificateAuthority: {err}"))
            })?
        };
        let certificate = Certificate::from_pem(&pem).map_err(|err| {
            AuthError::malformed(ProviderKind::Oidc, format!("certificateAuthority: {err}"))
        })?;
        Client::builder()
            .timeout(self.timeout)
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| AuthError::network(ProviderKind::Oidc, err))
    }

    async fn token_endpoint(&self, client: &Client, issuer: &str) -> Result<String, AuthError> {
        let url = format!("{}{DISCOVERY_PATH}", issuer.trim_end_matches('/'));
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|err| AuthError::network(ProviderKind::Oidc, err))?;
        let metadata: ProviderMetadata = read_json(ProviderKind::Oidc, response).await?;
        Ok(metadata.token_endpoint)
    }
}

impl RefreshCredentials for OidcStrategy {
    type Payload = OidcPayload;

    fn is_expired(&self, payload: &OidcPayload, now: DateTime<Utc>) -> bool {
        now.timestamp() >= payload.expiry
    }

    async fn refresh(
        &self,
        payload: &OidcPayload,
        _cluster: &ClusterRecord,
        now: DateTime<Utc>,
    ) -> Result<Refreshed<OidcPayload>, AuthError> {
        require(
            ProviderKind::Oidc,
            &[
                ("clientID", &payload.client_id),
                ("idpIssuerURL", &payload.idp_issuer_url),
                ("refreshToken", &payload.refresh_token),
            ],
        )?;

        let client = self.client_for(payload)?;
        let token_endpoint = self.token_endpoint(&client, &payload.idp_issuer_url).await?;
        debug!(%token_endpoint, "discovered oidc token endpoint");

        let response = request_token(
            &client,
            ProviderKind::Oidc,
            &token_endpoint,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", &payload.refresh_token),
                ("client_id", &payload.client_id),
                ("client_secret", &payload.client_secret),
            ],
        )
        .await?;

        let id_token = response
            .id_token
            .clone()
            .ok_or_else(|| AuthError::rejected(ProviderKind::Oidc, "response has no id_token"))?;
        let expiry = match (response.absolute_expiry(), response.expires_in) {
            (Some(expiry), _) => expiry,
            (None, Some(secs)) => expires_after(ProviderKind::Oidc, now, secs)?,
            (None, None) => id_token_expiry(&id_token).ok_or_else(|| {
                AuthError::rejected(ProviderKind::Oidc, "response carries no expiry")
            })?,
        };

        let refreshed = OidcPayload {
            id_token,
            access_token: response
                .access_token
                .unwrap_or_else(|| payload.access_token.clone()),
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| payload.refresh_token.clone()),
            expiry: expiry.timestamp(),
            ..payload.clone()
        };
        Ok(Refreshed {
            credential: IssuedCredential::bearer(&refreshed.id_token),
            payload: refreshed,
        })
    }
}

/// `exp` claim of an unverified JWT.
fn id_token_expiry(id_token: &str) -> Option<DateTime<Utc>> {
    let claims = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(claims.trim_end_matches('=')).ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthCause;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload(issuer: &str) -> OidcPayload {
        OidcPayload {
            client_id: "dashboard".to_string(),
            client_secret: "s3cret".to_string(),
            id_token: "id.old".to_string(),
            idp_issuer_url: issuer.to_string(),
            refresh_token: "rt.old".to_string(),
            certificate_authority: String::new(),
            access_token: "at.old".to_string(),
            expiry: 0,
            cluster_id: None,
        }
    }

    async fn issuer() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": server.uri(),
                "token_endpoint": format!("{}/token", server.uri())
            })))
            .mount(&server)
            .await;
        server
    }

    fn jwt(exp: i64) -> String {
        let claims = URL_SAFE_NO_PAD.encode(json!({ "sub": "u", "exp": exp }).to_string());
        format!("eyJhbGciOiJSUzI1NiJ9.{claims}.sig")
    }

    #[tokio::test]
    async fn refresh_uses_discovered_endpoint_and_rotates_tokens() {
        let server = issuer().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("client_secret=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "id.new",
                "access_token": "at.new",
                "refresh_token": "rt.new",
                "expiry": "2030-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let strategy = OidcStrategy::new(Client::new(), Duration::from_secs(5));
        let record = ClusterRecord::new("oidc", "https://k8s");
        let refreshed = strategy
            .refresh(&payload(&server.uri()), &record, Utc::now())
            .await
            .unwrap();

        assert_eq!(refreshed.payload.id_token, "id.new");
        assert_eq!(refreshed.payload.refresh_token, "rt.new");
        assert_eq!(refreshed.payload.expiry, 1_893_456_000);
        assert_eq!(refreshed.payload.client_secret, "s3cret");
        assert_eq!(refreshed.credential.token.as_deref(), Some("id.new"));
    }

    #[tokio::test]
    async fn falls_back_to_id_token_exp_claim() {
        let server = issuer().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": jwt(1_900_000_000)
            })))
            .mount(&server)
            .await;

        let strategy = OidcStrategy::new(Client::new(), Duration::from_secs(5));
        let record = ClusterRecord::new("oidc", "https://k8s");
        let refreshed = strategy
            .refresh(&payload(&server.uri()), &record, Utc::now())
            .await
            .unwrap();
        assert_eq!(refreshed.payload.expiry, 1_900_000_000);
        assert_eq!(refreshed.payload.refresh_token, "rt.old");
    }

    #[tokio::test]
    async fn overflowing_expires_in_is_rejected() {
        let server = issuer().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "id.new",
                "expires_in": i64::MAX
            })))
            .mount(&server)
            .await;

        let strategy = OidcStrategy::new(Client::new(), Duration::from_secs(5));
        let record = ClusterRecord::new("oidc", "https://k8s");
        let err = strategy
            .refresh(&payload(&server.uri()), &record, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.cause, AuthCause::Provider("expires_in out of range".to_string()));
    }

    #[tokio::test]
    async fn message_field_is_fatal() {
        let server = issuer().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "refresh token revoked"
            })))
            .mount(&server)
            .await;

        let strategy = OidcStrategy::new(Client::new(), Duration::from_secs(5));
        let record = ClusterRecord::new("oidc", "https://k8s");
        let err = strategy
            .refresh(&payload(&server.uri()), &record, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(
            err.cause,
            AuthCause::Provider("refresh token revoked".to_string())
        );
    }

    #[test]
    fn garbage_certificate_authority_is_malformed() {
        let strategy = OidcStrategy::new(Client::new(), Duration::from_secs(5));
        let mut payload = payload("https://issuer");
        payload.certificate_authority = "not base64 !!".to_string();
        let err = strategy.client_for(&payload).unwrap_err();
        assert!(matches!(err.cause, AuthCause::MalformedCredentials(_)));
    }
}

use super::{require, IssuedCredential, RefreshCredentials, Refreshed};
use crate::error::AuthError;
use crate::types::{AwsPayload, ClusterRecord, ProviderKind};
use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    self, SignableBody, SignableRequest, SignatureLocation, SigningParams, SigningSettings,
};
use aws_sigv4::sign;
use aws_smithy_runtime_api::client::identity::Identity;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use http::Request;
use std::time::{Duration, SystemTime};

const K8S_AWS_ID_HEADER: &str = "x-k8s-aws-id";
const TOKEN_PREFIX: &str = "k8s-aws-v1";
const CREDENTIALS_SOURCE: &str = "cluster-auth";

/// EKS bearer tokens: a presigned STS `GetCallerIdentity` URL the cluster's
/// authenticator replays. Minted on every request.
#[derive(Debug, Clone)]
pub struct AwsStrategy {
    expires_in: Duration,
}

impl AwsStrategy {
    pub fn new(expires_in: Duration) -> Self {
        Self { expires_in }
    }

    pub fn presign(&self, payload: &AwsPayload, now: DateTime<Utc>) -> Result<String, AuthError> {
        let malformed = |err: &dyn std::fmt::Display| AuthError::malformed(ProviderKind::Aws, err.to_string());
        require(
            ProviderKind::Aws,
            &[
                ("accessKeyID", &payload.access_key_id),
                ("secretKey", &payload.secret_key),
                ("region", &payload.region),
                ("clusterID", &payload.cluster_id),
            ],
        )?;

        let credentials = Credentials::new(
            &payload.access_key_id,
            &payload.secret_key,
            None,
            None,
            CREDENTIALS_SOURCE,
        );
        let identity = Identity::from(credentials);
        let region = Region::new(payload.region.clone()).to_string();

        let mut settings = SigningSettings::default();
        settings.expires_in = Some(self.expires_in);
        settings.signature_location = SignatureLocation::QueryParams;

        let params = sign::v4::SigningParams::builder()
            .identity(&identity)
            .region(&region)
            .name("sts")
            .time(SystemTime::from(now))
            .settings(settings)
            .build()
            .map_err(|err| malformed(&err))?;

        let uri = format!(
            "https://sts.{region}.amazonaws.com/?Action=GetCallerIdentity&Version=2011-06-15"
        );
        let request = SignableRequest::new(
            "GET",
            &uri,
            [(K8S_AWS_ID_HEADER, payload.cluster_id.as_str())].into_iter(),
            SignableBody::Bytes(&[]),
        )
        .map_err(|err| malformed(&err))?;

        let (instructions, _) = http_request::sign(request, &SigningParams::V4(params))
            .map_err(|err| malformed(&err))?
            .into_parts();

        let mut request = Request::builder()
            .uri(&uri)
            .body(())
            .map_err(|err| malformed(&err))?;
        instructions.apply_to_request_http1x(&mut request);

        let encoded = URL_SAFE_NO_PAD.encode(request.uri().to_string());
        Ok(format!("{TOKEN_PREFIX}.{encoded}"))
    }
}

impl RefreshCredentials for AwsStrategy {
    type Payload = AwsPayload;

    fn is_expired(&self, _payload: &AwsPayload, _now: DateTime<Utc>) -> bool {
        true
    }

    async fn refresh(
        &self,
        payload: &AwsPayload,
        _cluster: &ClusterRecord,
        now: DateTime<Utc>,
    ) -> Result<Refreshed<AwsPayload>, AuthError> {
        let token = self.presign(payload, now)?;
        Ok(Refreshed {
            payload: payload.clone(),
            credential: IssuedCredential::bearer(token),
        })
    }
}

use super::{IssuedCredential, RefreshCredentials, Refreshed};
use crate::error::AuthError;
use crate::types::ClusterRecord;
use chrono::{DateTime, Utc};

/// Kubeconfig credentials (client certificate, token, basic auth) stored on
/// the record. They never expire and refreshing them changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticStrategy;

impl RefreshCredentials for StaticStrategy {
    type Payload = ();

    fn is_expired(&self, _payload: &(), _now: DateTime<Utc>) -> bool {
        false
    }

    async fn refresh(
        &self,
        _payload: &(),
        _cluster: &ClusterRecord,
        _now: DateTime<Utc>,
    ) -> Result<Refreshed<()>, AuthError> {
        Ok(Refreshed {
            payload: (),
            credential: IssuedCredential::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refresh_leaves_record_untouched() {
        let mut record = ClusterRecord::new("kind", "https://127.0.0.1:6443");
        record.token = "static".to_string();
        let before = record.clone();

        assert!(!StaticStrategy.is_expired(&(), Utc::now()));
        let refreshed = StaticStrategy.refresh(&(), &record, Utc::now()).await.unwrap();
        refreshed.credential.apply(&mut record);
        assert_eq!(record, before);
    }
}

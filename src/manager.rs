//! Credential lifecycle manager.
//!
//! [`CredentialManager::ensure_valid`] is the only way collaborators obtain
//! connection credentials. Refreshes are coalesced per cluster id: while one
//! is outstanding every other caller for the same id awaits its result. The
//! refresh runs on its own task, so a caller that goes away does not cancel
//! it and the result is still persisted for the next caller.

use crate::error::{AuthCause, AuthError, Result};
use crate::providers::Providers;
use crate::registry::ClusterRegistry;
use crate::types::ClusterRecord;
use chrono::Utc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type SharedRefresh = Shared<BoxFuture<'static, Result<ClusterRecord>>>;
type InFlight = Arc<Mutex<HashMap<String, SharedRefresh>>>;

pub struct CredentialManager {
    registry: Arc<ClusterRegistry>,
    providers: Providers,
    refresh_timeout: Duration,
    in_flight: InFlight,
}

impl CredentialManager {
    pub fn new(registry: Arc<ClusterRegistry>, providers: Providers, refresh_timeout: Duration) -> Self {
        Self {
            registry,
            providers,
            refresh_timeout,
            in_flight: Arc::default(),
        }
    }

    pub fn registry(&self) -> &Arc<ClusterRegistry> {
        &self.registry
    }

    /// Returns the record for `cluster_id` carrying a credential that is
    /// valid now, refreshing it first when the provider says it expired.
    pub async fn ensure_valid(&self, cluster_id: &str) -> Result<ClusterRecord> {
        let record = self.registry.get(cluster_id)?;
        if record.auth_provider.is_static()
            || !self.providers.is_expired(&record.auth_provider, Utc::now())
        {
            return Ok(record);
        }
        self.join_refresh(&record).await
    }

    fn join_refresh(&self, record: &ClusterRecord) -> SharedRefresh {
        let mut in_flight = self.in_flight.lock();
        if let Some(refresh) = in_flight.get(&record.id) {
            debug!(cluster = %record.id, "joining in-flight refresh");
            return refresh.clone();
        }

        let provider = record.auth_provider.kind();
        let task = tokio::spawn(refresh(
            self.registry.clone(),
            self.providers.clone(),
            self.refresh_timeout,
            InFlightEntry {
                in_flight: self.in_flight.clone(),
                cluster_id: record.id.clone(),
            },
        ));
        let shared = async move {
            match task.await {
                Ok(result) => result,
                Err(err) => Err(AuthError::new(provider, AuthCause::Aborted(err.to_string())).into()),
            }
        }
        .boxed()
        .shared();
        in_flight.insert(record.id.clone(), shared.clone());
        shared
    }
}

/// Removes the cluster's single-flight entry when the refresh task ends,
/// including when it panics.
struct InFlightEntry {
    in_flight: InFlight,
    cluster_id: String,
}

impl Drop for InFlightEntry {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.cluster_id);
    }
}

async fn refresh(
    registry: Arc<ClusterRegistry>,
    providers: Providers,
    timeout: Duration,
    entry: InFlightEntry,
) -> Result<ClusterRecord> {
    let id = entry.cluster_id.as_str();
    // A refresh that finished between the caller's check and this task may
    // already have stored a valid credential.
    let record = registry.get(id)?;
    let started = Utc::now();
    if record.auth_provider.is_static() || !providers.is_expired(&record.auth_provider, started) {
        return Ok(record);
    }

    let provider = record.auth_provider.kind();
    info!(cluster = %id, %provider, "refreshing credentials");
    let refreshed = match tokio::time::timeout(timeout, providers.refresh(&record, started)).await {
        Ok(Ok(refreshed)) => refreshed,
        Ok(Err(err)) => {
            warn!(cluster = %id, "refresh failed: {err}");
            return Err(err.into());
        }
        Err(_) => {
            warn!(cluster = %id, ?timeout, "refresh timed out");
            return Err(AuthError::new(provider, AuthCause::Timeout(timeout)).into());
        }
    };

    if let Some(expires) = refreshed.payload.expires_at() {
        if expires <= Utc::now() {
            warn!(cluster = %id, %expires, "refreshed credential is already expired");
            return Err(AuthError::new(provider, AuthCause::ZeroValidity).into());
        }
    }

    if Providers::persists_refresh(provider) {
        // The record may have been re-pointed at another provider meanwhile.
        let mut applied = false;
        let stored = registry.update(id, |stored| {
            if stored.auth_provider.kind() == provider {
                refreshed.apply(stored);
                applied = true;
            }
        })?;
        if !applied {
            warn!(cluster = %id, %provider, "provider changed during refresh, result discarded");
            return Err(AuthError::new(
                provider,
                AuthCause::Aborted("provider changed during refresh".to_string()),
            )
            .into());
        }
        debug!(cluster = %id, "stored refreshed credentials");
        Ok(stored)
    } else {
        let mut issued = record;
        refreshed.apply(&mut issued);
        Ok(issued)
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("refresh_timeout", &self.refresh_timeout)
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}


//! Id-keyed registries of live sessions (terminals, port forwards).
//!
//! A registry never refreshes credentials itself: it asks the
//! [`CredentialManager`] for a validated record and hands it to a
//! [`Connector`] that owns the actual transport. The transport and the
//! registry share a [`CancellationToken`]; whichever side cancels it ends the
//! session.

pub mod port_forward;
pub mod terminal;

use crate::error::{Error, Result};
use crate::manager::CredentialManager;
use crate::registry::ClusterDeletionHook;
use crate::types::ClusterRecord;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

pub use port_forward::PortForwardRequest;
pub use terminal::TerminalRequest;

pub trait SessionRequest: Clone + Send + Sync + 'static {
    fn cluster_id(&self) -> &str;

    /// Rejects requests that could never be connected.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

#[allow(async_fn_in_trait)]
pub trait Connector<R>: Send + Sync + 'static {
    /// Opens the transport for `request` against `cluster`. Returns once the
    /// transport is established. The transport cancels `shutdown` when it
    /// closes and must stop once `shutdown` is cancelled.
    async fn connect(
        &self,
        cluster: &ClusterRecord,
        request: &R,
        shutdown: CancellationToken,
    ) -> std::result::Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct Session<R> {
    pub id: Uuid,
    pub request: R,
    shutdown: CancellationToken,
}

impl<R> Session<R> {
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

type Sessions<R> = Arc<Mutex<HashMap<Uuid, Session<R>>>>;

pub struct SessionRegistry<R, C> {
    manager: Arc<CredentialManager>,
    connector: C,
    sessions: Sessions<R>,
}

pub type TerminalSessions<C> = SessionRegistry<TerminalRequest, C>;
pub type PortForwardSessions<C> = SessionRegistry<PortForwardRequest, C>;

impl<R: SessionRequest, C: Connector<R>> SessionRegistry<R, C> {
    /// Creates the registry and subscribes it to cluster deletions, so a
    /// deleted cluster's sessions are closed.
    pub fn new(manager: Arc<CredentialManager>, connector: C) -> Arc<Self> {
        let registry = Arc::new(Self {
            manager,
            connector,
            sessions: Arc::default(),
        });
        let hook = Arc::downgrade(&registry);
        registry.manager.registry().subscribe(hook);
        registry
    }

    pub async fn add(&self, request: R) -> Result<Session<R>> {
        request.validate().map_err(Error::InvalidRequest)?;
        let cluster = self.manager.ensure_valid(request.cluster_id()).await?;

        let session = Session {
            id: Uuid::new_v4(),
            request,
            shutdown: CancellationToken::new(),
        };
        self.connector
            .connect(&cluster, &session.request, session.shutdown.clone())
            .await
            .map_err(Error::Transport)?;

        {
            // Deletion hooks take this lock, so a delete either already removed
            // the cluster or will find the session once it is inserted.
            let mut sessions = self.sessions.lock();
            if let Err(err) = self.manager.registry().get(&cluster.id) {
                drop(sessions);
                session.close();
                debug!(cluster = %cluster.id, "cluster deleted while connecting");
                return Err(err);
            }
            sessions.insert(session.id, session.clone());
        }
        self.watch(&session);
        info!(session = %session.id, cluster = %cluster.id, "session opened");
        Ok(session)
    }

    pub fn get(&self, id: Uuid) -> Option<Session<R>> {
        self.sessions.lock().get(&id).cloned()
    }

    pub fn list(&self) -> Vec<Session<R>> {
        self.sessions.lock().values().cloned().collect()
    }

    /// Closes and forgets the session. Unknown ids are ignored.
    pub fn remove(&self, id: Uuid) -> Option<Session<R>> {
        let session = self.sessions.lock().remove(&id)?;
        session.close();
        debug!(session = %id, "session removed");
        Some(session)
    }

    /// Closes every session of `cluster_id` and returns how many were open.
    pub fn close_cluster(&self, cluster_id: &str) -> usize {
        let closed: Vec<_> = {
            let mut sessions = self.sessions.lock();
            let ids: Vec<_> = sessions
                .values()
                .filter(|s| s.request.cluster_id() == cluster_id)
                .map(|s| s.id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for session in &closed {
            session.close();
        }
        if !closed.is_empty() {
            info!(cluster = %cluster_id, count = closed.len(), "closed sessions");
        }
        closed.len()
    }

    // Drops the session once its transport reports closure.
    fn watch(&self, session: &Session<R>) {
        let sessions = Arc::downgrade(&self.sessions);
        let shutdown = session.shutdown.clone();
        let id = session.id;
        tokio::spawn(async move {
            shutdown.cancelled().await;
            if let Some(sessions) = sessions.upgrade() {
                if sessions.lock().remove(&id).is_some() {
                    debug!(session = %id, "transport closed");
                }
            }
        });
    }
}

impl<R: SessionRequest, C: Connector<R>> ClusterDeletionHook for SessionRegistry<R, C> {
    fn cluster_deleted(&self, cluster_id: &str) {
        self.close_cluster(cluster_id);
    }
}

impl<R, C> Drop for SessionRegistry<R, C> {
    fn drop(&mut self) {
        for session in self.sessions.lock().values() {
            session.close();
        }
    }
}

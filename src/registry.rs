//! Durable cluster registry.
//!
//! The registry is the single writer of [`ClusterRecord`]s. Every mutation is
//! applied to a copy of the in-memory settings, persisted, and only then
//! published; a failed write leaves the previous state in place.

use crate::error::{Error, Result};
use crate::store::{self, SettingsStore};
use crate::types::{Bookmark, ClusterRecord, Settings};
use parking_lot::{Mutex, RwLock};
use std::sync::Weak;
use tracing::{debug, info, warn};

/// Notified after a cluster has been deleted and the deletion persisted.
pub trait ClusterDeletionHook: Send + Sync {
    fn cluster_deleted(&self, cluster_id: &str);
}

pub struct ClusterRegistry {
    store: Box<dyn SettingsStore>,
    state: RwLock<Settings>,
    hooks: Mutex<Vec<Weak<dyn ClusterDeletionHook>>>,
}

impl ClusterRegistry {
    /// Loads the current settings blob from `store`. An empty store yields an
    /// empty registry.
    pub fn open(store: impl SettingsStore + 'static) -> Result<Self> {
        let settings = match store.read()? {
            Some(blob) => serde_json::from_slice(&blob).map_err(store::Error::from)?,
            None => Settings::default(),
        };
        debug!(clusters = settings.clusters.len(), "loaded settings");
        Ok(Self {
            store: Box::new(store),
            state: RwLock::new(settings),
            hooks: Mutex::new(Vec::new()),
        })
    }

    pub fn get(&self, id: &str) -> Result<ClusterRecord> {
        self.state
            .read()
            .clusters
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<ClusterRecord> {
        self.state.read().clusters.values().cloned().collect()
    }

    /// Inserts `records`, replacing any record that already uses the same id.
    pub fn add(&self, records: Vec<ClusterRecord>) -> Result<()> {
        let count = records.len();
        self.mutate(|settings| {
            for record in records {
                settings.clusters.insert(record.id.clone(), record);
            }
            Ok(())
        })?;
        info!(count, "added clusters");
        Ok(())
    }

    pub fn edit(&self, record: ClusterRecord) -> Result<()> {
        let id = record.id.clone();
        self.mutate(|settings| match settings.clusters.get_mut(&record.id) {
            Some(stored) => {
                *stored = record;
                Ok(())
            }
            None => Err(Error::NotFound(record.id)),
        })?;
        debug!(cluster = %id, "edited cluster");
        Ok(())
    }

    /// Applies `change` to the stored record with `id` and returns the result.
    /// Fields `change` does not touch keep their current value even if the
    /// caller's copy of the record is stale.
    pub fn update(
        &self,
        id: &str,
        change: impl FnOnce(&mut ClusterRecord),
    ) -> Result<ClusterRecord> {
        self.mutate(|settings| {
            let record = settings
                .clusters
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            change(record);
            Ok(record.clone())
        })
    }

    /// Removes a cluster and closes every session that still references it.
    pub fn delete(&self, id: &str) -> Result<ClusterRecord> {
        let removed = self.mutate(|settings| {
            let removed = settings
                .clusters
                .remove(id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            if settings.cluster.as_deref() == Some(id) {
                settings.cluster = None;
            }
            Ok(removed)
        })?;
        info!(cluster = %id, "deleted cluster");
        self.notify_deleted(id);
        Ok(removed)
    }

    pub fn change_cluster(&self, id: &str) -> Result<()> {
        self.mutate(|settings| {
            if !settings.clusters.contains_key(id) {
                return Err(Error::NotFound(id.to_string()));
            }
            settings.cluster = Some(id.to_string());
            Ok(())
        })
    }

    pub fn current_cluster(&self) -> Option<ClusterRecord> {
        let state = self.state.read();
        let id = state.cluster.as_ref()?;
        state.clusters.get(id).cloned()
    }

    /// Sets the default namespace of the selected cluster.
    pub fn set_namespace(&self, namespace: &str) -> Result<()> {
        self.mutate(|settings| {
            let id = settings.cluster.clone().ok_or(Error::NoCurrentCluster)?;
            let record = settings
                .clusters
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(id.clone()))?;
            record.namespace = namespace.to_string();
            Ok(())
        })
    }

    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.state.read().bookmarks.clone()
    }

    pub fn edit_bookmarks(&self, bookmarks: Vec<Bookmark>) -> Result<()> {
        self.mutate(|settings| {
            settings.bookmarks = bookmarks;
            Ok(())
        })
    }

    pub fn settings(&self) -> serde_json::Value {
        self.state.read().settings.clone()
    }

    pub fn edit_settings(&self, app_settings: serde_json::Value) -> Result<()> {
        self.mutate(|settings| {
            settings.settings = app_settings;
            Ok(())
        })
    }

    pub fn subscribe(&self, hook: Weak<dyn ClusterDeletionHook>) {
        self.hooks.lock().push(hook);
    }

    fn mutate<T>(&self, change: impl FnOnce(&mut Settings) -> Result<T>) -> Result<T> {
        let mut state = self.state.write();
        let mut next = state.clone();
        let output = change(&mut next)?;
        let blob = serde_json::to_vec_pretty(&next).map_err(store::Error::from)?;
        if let Err(err) = self.store.write(&blob) {
            warn!("settings write failed, keeping previous state: {err}");
            return Err(err.into());
        }
        *state = next;
        Ok(output)
    }

    fn notify_deleted(&self, id: &str) {
        let hooks: Vec<_> = {
            let mut hooks = self.hooks.lock();
            hooks.retain(|hook| hook.strong_count() > 0);
            hooks.iter().filter_map(Weak::upgrade).collect()
        };
        for hook in hooks {
            hook.cluster_deleted(id);
        }
    }
}

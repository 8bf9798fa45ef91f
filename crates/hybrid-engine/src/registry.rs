//! Table of named, shared sources.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use hybrid_ipc::EngineEvent;

use crate::source::MediaSource;

/// Sources addressed by their stable name.
///
/// The registry only does bookkeeping: adding a source never starts it.
/// Removing one stops it, as does replacing it with a different source of
/// the same name, so a source dropped from the table never keeps its
/// producer thread running. Sources are stopped after the table lock is
/// released, so a slow device teardown never blocks lookups.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: RwLock<BTreeMap<String, Arc<MediaSource>>>,
    event_tx: Option<Sender<EngineEvent>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that reports changes on `event_tx`.
    pub fn with_events(event_tx: Sender<EngineEvent>) -> Self {
        Self {
            sources: RwLock::new(BTreeMap::new()),
            event_tx: Some(event_tx),
        }
    }

    /// Register `source` under its own name.
    ///
    /// A different source already registered under that name is stopped and
    /// returned. Re-adding the same handle is a no-op.
    #[instrument(name = "registry_add", skip_all, fields(source = %source.name()))]
    pub fn add_source(&self, source: Arc<MediaSource>) -> Option<Arc<MediaSource>> {
        let name = source.name().to_string();
        let kind = source.kind();
        let previous = self.sources.write().insert(name.clone(), Arc::clone(&source));

        match previous {
            Some(previous) if Arc::ptr_eq(&previous, &source) => None,
            Some(previous) => {
                previous.stop();
                info!(source = %name, "Source replaced");
                self.send_event(EngineEvent::SourceReplaced { name });
                Some(previous)
            }
            None => {
                info!(source = %name, "Source added");
                self.send_event(EngineEvent::SourceAdded { name, kind });
                None
            }
        }
    }

    /// Stop and unregister the source called `name`.
    ///
    /// Returns false if no such source is registered.
    #[instrument(name = "registry_remove", skip(self))]
    pub fn remove_source(&self, name: &str) -> bool {
        let Some(source) = self.sources.write().remove(name) else {
            debug!("No source to remove");
            return false;
        };

        source.stop();
        info!(source = %name, "Source removed");
        self.send_event(EngineEvent::SourceRemoved {
            name: name.to_string(),
        });
        true
    }

    /// Stop and unregister every source.
    #[instrument(name = "registry_remove_all", skip(self))]
    pub fn remove_all(&self) {
        let drained = std::mem::take(&mut *self.sources.write());
        for (name, source) in drained {
            source.stop();
            self.send_event(EngineEvent::SourceRemoved { name });
        }
    }

    /// Shared handle to the source called `name`.
    pub fn get_source(&self, name: &str) -> Option<Arc<MediaSource>> {
        self.sources.read().get(name).cloned()
    }

    /// Snapshot of the registered names.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.read().keys().cloned().collect()
    }

    /// True if a source is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.sources.read().contains_key(name)
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }

    fn send_event(&self, event: EngineEvent) {
        if let Some(tx) = &self.event_tx {
            if let Err(e) = tx.try_send(event) {
                warn!("Failed to send event: {}", e);
            }
        }
    }
}

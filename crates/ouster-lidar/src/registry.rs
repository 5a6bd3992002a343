//! In-process registry of live sensor connections, keyed by identifier.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;

use crate::sensor::SensorHandle;
use crate::types::{LidarError, LidarResult, SensorIdentity};

/// A sensor handle shared between the registry and in-flight operations.
///
/// The async mutex serializes access to one sensor without blocking others.
pub type SharedHandle = Arc<AsyncMutex<Box<dyn SensorHandle>>>;

/// A registered sensor connection.
pub struct ConnectionEntry {
    pub identifier: String,
    pub identity: SensorIdentity,
    pub connected_at: DateTime<Utc>,
    handle: SharedHandle,
}

impl ConnectionEntry {
    pub fn new(identifier: impl Into<String>, identity: SensorIdentity, handle: Box<dyn SensorHandle>) -> Self {
        Self {
            identifier: identifier.into(),
            identity,
            connected_at: Utc::now(),
            handle: Arc::new(AsyncMutex::new(handle)),
        }
    }

    pub fn handle(&self) -> SharedHandle {
        self.handle.clone()
    }

    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            identifier: self.identifier.clone(),
            identity: self.identity.clone(),
            connected_at: self.connected_at,
        }
    }
}

impl std::fmt::Debug for ConnectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEntry")
            .field("identifier", &self.identifier)
            .field("identity", &self.identity)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

/// Lightweight copy of an entry's cached metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub identifier: String,
    pub identity: SensorIdentity,
    pub connected_at: DateTime<Utc>,
}

/// Returned by [`ConnectionRegistry::register`] when the identifier is taken.
/// Carries the rejected entry back so its handle can be released.
#[derive(Debug)]
pub struct RegisterConflict {
    pub entry: ConnectionEntry,
}

impl From<RegisterConflict> for LidarError {
    fn from(conflict: RegisterConflict) -> Self {
        LidarError::AlreadyConnected(conflict.entry.identifier)
    }
}

/// The authoritative set of live sensor connections.
///
/// Holds at most one entry per identifier and keeps insertion order.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: Mutex<Vec<ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConnectionEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an entry. Fails if the identifier is already registered.
    pub fn register(&self, entry: ConnectionEntry) -> Result<(), Box<RegisterConflict>> {
        let mut entries = self.lock();
        if entries.iter().any(|e| e.identifier == entry.identifier) {
            return Err(Box::new(RegisterConflict { entry }));
        }
        tracing::debug!("Registered sensor {}", entry.identifier);
        entries.push(entry);
        Ok(())
    }

    /// Remove an entry and hand it back; the caller releases its handle.
    pub fn unregister(&self, identifier: &str) -> LidarResult<ConnectionEntry> {
        let mut entries = self.lock();
        let index = entries
            .iter()
            .position(|e| e.identifier == identifier)
            .ok_or_else(|| LidarError::NotConnected(identifier.to_string()))?;
        tracing::debug!("Unregistered sensor {identifier}");
        Ok(entries.remove(index))
    }

    /// Get the shared handle for a registered sensor.
    pub fn get(&self, identifier: &str) -> LidarResult<SharedHandle> {
        self.lock()
            .iter()
            .find(|e| e.identifier == identifier)
            .map(ConnectionEntry::handle)
            .ok_or_else(|| LidarError::NotConnected(identifier.to_string()))
    }

    /// Cached summary of a registered sensor.
    pub fn summary(&self, identifier: &str) -> LidarResult<ConnectionSummary> {
        self.lock()
            .iter()
            .find(|e| e.identifier == identifier)
            .map(ConnectionEntry::summary)
            .ok_or_else(|| LidarError::NotConnected(identifier.to_string()))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.lock().iter().any(|e| e.identifier == identifier)
    }

    /// Snapshot of registered identifiers, in insertion order.
    pub fn list_identifiers(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.identifier.clone()).collect()
    }

    /// Snapshot of every entry's cached metadata, in insertion order.
    pub fn summaries(&self) -> Vec<ConnectionSummary> {
        self.lock().iter().map(ConnectionEntry::summary).collect()
    }

    /// Remove and return every entry.
    pub fn drain(&self) -> Vec<ConnectionEntry> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

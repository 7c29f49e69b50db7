//! Borrowed connection handle

use std::ops::Deref;
use std::sync::Arc;

use deadpool::managed::Object;
use kvpool_core::CacheConnection;

use super::manager::{PoolEntry, SourceManager};

/// A connection borrowed from a source's pool
///
/// When dropped, the connection is returned to its pool unless it was
/// marked broken, in which case it is discarded.
pub struct PooledConnection {
    source: Arc<str>,
    object: Option<Object<SourceManager>>,
    broken: bool,
}

impl PooledConnection {
    pub(crate) fn new(source: Arc<str>, object: Object<SourceManager>) -> Self {
        Self {
            source,
            object: Some(object),
            broken: false,
        }
    }

    fn entry(&self) -> &PoolEntry {
        self.object.as_ref().expect("connection taken")
    }

    /// Name of the source this connection was borrowed from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Sequence number of the physical connection within its pool
    pub fn id(&self) -> u64 {
        self.entry().id()
    }

    /// Whether `AUTH` already succeeded on the physical connection
    pub fn is_authenticated(&self) -> bool {
        self.entry().is_authenticated()
    }

    /// Mark the connection as broken so it is discarded instead of reused
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Whether the connection was marked broken
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub(crate) fn mark_authenticated(&mut self) {
        if let Some(object) = self.object.as_mut() {
            object.mark_authenticated();
        }
    }

    /// Remove the connection from its pool and close it
    pub(crate) async fn discard(mut self) {
        if let Some(object) = self.object.take() {
            let entry = Object::take(object);
            if let Err(e) = entry.connection().close().await {
                tracing::debug!(
                    source = %self.source,
                    connection_id = entry.id(),
                    error = %e,
                    "error while closing discarded connection"
                );
            }
            tracing::debug!(
                source = %self.source,
                connection_id = entry.id(),
                "discarded connection"
            );
        }
    }
}

impl Deref for PooledConnection {
    type Target = dyn CacheConnection;

    fn deref(&self) -> &Self::Target {
        self.entry().connection()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            if self.broken {
                // Detached from the pool; the connection closes when dropped.
                drop(Object::take(object));
            }
        }
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("source", &self.source)
            .field("id", &self.object.as_ref().map(|o| o.id()))
            .field("broken", &self.broken)
            .finish()
    }
}

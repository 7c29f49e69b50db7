//! `deadpool` manager for cache connections

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use deadpool::managed::{Manager, Metrics, Pool, RecycleError, RecycleResult};
use kvpool_core::{CacheConnection, ConnectionFactory, Endpoint, KvError};

/// Pool of connections to one source
pub type SourcePool = Pool<SourceManager>;

/// A physical connection held by the pool, with per-connection state
pub struct PoolEntry {
    id: u64,
    connection: Box<dyn CacheConnection>,
    authenticated: bool,
}

impl PoolEntry {
    fn new(id: u64, connection: Box<dyn CacheConnection>) -> Self {
        Self {
            id,
            connection,
            authenticated: false,
        }
    }

    /// Sequence number of the physical connection within its pool, starting at 1
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The underlying connection
    pub fn connection(&self) -> &(dyn CacheConnection + 'static) {
        self.connection.as_ref()
    }

    /// Whether `AUTH` already succeeded on this connection
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub(crate) fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }
}

/// Opens and validates connections for one source
pub struct SourceManager {
    source: Arc<str>,
    endpoint: Endpoint,
    factory: Arc<dyn ConnectionFactory>,
    validate_on_borrow: bool,
    created: AtomicU64,
}

impl SourceManager {
    /// Create a manager for the given source and endpoint
    pub fn new(
        source: Arc<str>,
        endpoint: Endpoint,
        factory: Arc<dyn ConnectionFactory>,
        validate_on_borrow: bool,
    ) -> Self {
        Self {
            source,
            endpoint,
            factory,
            validate_on_borrow,
            created: AtomicU64::new(0),
        }
    }

    /// Number of physical connections opened so far
    pub fn connections_created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }
}

impl Manager for SourceManager {
    type Type = PoolEntry;
    type Error = KvError;

    async fn create(&self) -> Result<PoolEntry, KvError> {
        let connection = self.factory.connect(&self.endpoint).await.map_err(|e| {
            tracing::warn!(
                source = %self.source,
                endpoint = %self.endpoint,
                error = %e,
                "failed to open connection"
            );
            e
        })?;

        let id = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            source = %self.source,
            connection_id = id,
            driver = self.factory.driver_name(),
            "opened new connection"
        );
        Ok(PoolEntry::new(id, connection))
    }

    async fn recycle(&self, entry: &mut PoolEntry, _metrics: &Metrics) -> RecycleResult<KvError> {
        if entry.connection.is_closed() {
            return Err(RecycleError::Backend(KvError::Closed(format!(
                "connection {} is closed",
                entry.id
            ))));
        }

        if self.validate_on_borrow {
            if let Err(e) = entry.connection.ping().await {
                tracing::debug!(
                    source = %self.source,
                    connection_id = entry.id,
                    error = %e,
                    "idle connection failed validation"
                );
                return Err(RecycleError::Backend(e));
            }
        }

        Ok(())
    }
}

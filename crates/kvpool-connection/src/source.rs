//! Named sources and their configuration

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use deadpool::Runtime;
use deadpool::managed::{Object, PoolError, TimeoutType, Timeouts};
use kvpool_core::settings::parse_value;
use kvpool_core::{
    ConfigSource, ConnectionFactory, DEFAULT_HOST, DEFAULT_PORT, Endpoint, KvError, Result,
};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::pool::{PoolConfig, PoolStats, PooledConnection, SourceManager, SourcePool};

/// Configuration of one named source
#[derive(Clone, PartialEq, Eq)]
pub struct SourceConfig {
    name: String,
    endpoint: Endpoint,
    password: Option<String>,
    pool: PoolConfig,
}

impl SourceConfig {
    /// Create a source with the default endpoint and pool configuration
    ///
    /// Surrounding whitespace is trimmed from the name.
    pub fn new(name: impl Into<String>) -> Self {
        let pool = PoolConfig::default();
        Self {
            name: name.into().trim().to_string(),
            endpoint: Endpoint::default().with_timeout(pool.timeout()),
            password: None,
            pool,
        }
    }

    /// Read a source from `redis.<name>.*` configuration keys
    ///
    /// Missing keys fall back to their defaults; present but invalid values
    /// are configuration errors.
    pub fn from_config(name: &str, config: &dyn ConfigSource) -> Result<Self> {
        let key = |field: &str| format!("redis.{}.{}", name, field);
        let parsed = |field: &str, default: u64| -> Result<u64> {
            let key = key(field);
            parse_value(config.get_string(&key), &key, default)
        };

        let host = config
            .get_string(&key("host"))
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_value(config.get_string(&key("port")), &key("port"), DEFAULT_PORT)?;
        let database: u16 = parse_value(config.get_string(&key("database")), &key("database"), 0)?;
        let password = config.get_string(&key("password")).filter(|p| !p.is_empty());

        let defaults = PoolConfig::default();
        let max_total: usize = parse_value(
            config.get_string(&key("max_total")),
            &key("max_total"),
            defaults.max_total(),
        )?;
        let max_idle: usize = parse_value(
            config.get_string(&key("max_idle")),
            &key("max_idle"),
            defaults.max_idle(),
        )?;

        let pool = defaults
            .with_max_total(max_total)
            .with_max_idle(max_idle)
            .with_max_wait_ms(parsed("max_wait_secs", 1800)?.saturating_mul(1000))
            .with_eviction_interval_ms(parsed("eviction_interval_secs", 180)?.saturating_mul(1000))
            .with_min_evictable_idle_ms(parsed("min_evictable_idle_secs", 60)?.saturating_mul(1000))
            .with_timeout_ms(parsed("timeout_secs", 180)?.saturating_mul(1000))
            .with_validate_on_borrow(config.get_bool_or(&key("validate_on_borrow"), true)?);

        pool.validate()
            .map_err(|e| KvError::Configuration(format!("source '{}': {}", name, e)))?;

        Ok(Self {
            name: name.trim().to_string(),
            endpoint: Endpoint::new(host, port)
                .with_database(database)
                .with_timeout(pool.timeout()),
            password,
            pool,
        })
    }

    /// Set the endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Set the password used to authenticate borrowed connections
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Set the pool configuration
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint the pool connects to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Password, if one is configured
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Pool configuration
    pub fn pool(&self) -> &PoolConfig {
        &self.pool
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pool", &self.pool)
            .finish()
    }
}

/// A named endpoint together with its connection pool
pub struct Source {
    name: Arc<str>,
    config: SourceConfig,
    pool: SourcePool,
    next_eviction: Mutex<Instant>,
    release_lock: Mutex<()>,
}

impl Source {
    /// Build the pool for a source
    ///
    /// No connection is opened here; the pool fills on demand.
    pub fn new(config: SourceConfig, factory: Arc<dyn ConnectionFactory>) -> Result<Self> {
        config
            .pool
            .validate()
            .map_err(|e| KvError::Configuration(format!("source '{}': {}", config.name, e)))?;

        let name: Arc<str> = Arc::from(config.name.as_str());
        let manager = SourceManager::new(
            name.clone(),
            config.endpoint.clone(),
            factory,
            config.pool.validate_on_borrow(),
        );

        let pool = SourcePool::builder(manager)
            .max_size(config.pool.max_total())
            .wait_timeout(Some(config.pool.max_wait()))
            .create_timeout(Some(config.pool.timeout()))
            .recycle_timeout(Some(config.pool.timeout()))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| {
                KvError::Configuration(format!("failed to build pool for '{}': {}", name, e))
            })?;

        let next_eviction = Mutex::new(Instant::now() + config.pool.eviction_interval());

        Ok(Self {
            name,
            config,
            pool,
            next_eviction,
            release_lock: Mutex::new(()),
        })
    }

    /// Source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Password, if one is configured
    pub fn password(&self) -> Option<&str> {
        self.config.password()
    }

    /// Current pool statistics
    pub fn stats(&self) -> PoolStats {
        self.pool.status().into()
    }

    /// Number of physical connections opened over the pool's lifetime
    pub fn connections_created(&self) -> u64 {
        self.pool.manager().connections_created()
    }

    /// Whether the pool was closed
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Borrow a connection without waiting for a free slot
    ///
    /// Returns `Ok(None)` when every slot is in use.
    pub(crate) async fn try_get(&self) -> Result<Option<Object<SourceManager>>> {
        let mut timeouts = Timeouts::default();
        timeouts.wait = Some(Duration::ZERO);
        timeouts.create = Some(self.config.pool.timeout());
        timeouts.recycle = Some(self.config.pool.timeout());

        match self.pool.timeout_get(&timeouts).await {
            Ok(object) => Ok(Some(object)),
            Err(PoolError::Timeout(TimeoutType::Wait)) => Ok(None),
            Err(PoolError::Closed) => Err(KvError::Closed(format!(
                "pool for source '{}' is closed",
                self.name
            ))),
            Err(PoolError::Backend(e)) => Err(KvError::AcquireFailed {
                source_name: self.name.to_string(),
                reason: e.to_string(),
            }),
            Err(e) => Err(KvError::AcquireFailed {
                source_name: self.name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Take back a borrowed connection
    ///
    /// Broken or closed connections are discarded, as are connections that
    /// would push the idle count above `max_idle`.
    pub(crate) async fn release(&self, connection: PooledConnection) {
        if connection.is_broken() || connection.is_closed() {
            tracing::debug!(source = %self.name, "discarding broken connection on release");
            connection.discard().await;
            return;
        }

        if self.pool.is_closed() {
            tracing::debug!(source = %self.name, "pool closed, discarding released connection");
            connection.discard().await;
            return;
        }

        // Check and return under one lock so concurrent releases cannot
        // overshoot max_idle.
        let connection = {
            let _guard = self.release_lock.lock();
            let idle = self.stats().idle();
            if idle < self.config.pool.max_idle() {
                drop(connection);
                return;
            }
            tracing::debug!(
                source = %self.name,
                idle = idle,
                max_idle = self.config.pool.max_idle(),
                "idle limit reached, discarding released connection"
            );
            connection
        };

        connection.discard().await;
    }

    /// Drop idle connections beyond `max_idle` or idle for too long
    ///
    /// Returns the number of connections evicted.
    pub fn evict_idle(&self) -> usize {
        let max_idle = self.config.pool.max_idle();
        let min_evictable_idle = self.config.pool.min_evictable_idle();
        let kept = Cell::new(0usize);
        let evicted = Cell::new(0usize);

        let _ = self.pool.retain(|entry, metrics| {
            let keep = !entry.connection().is_closed()
                && metrics.last_used() < min_evictable_idle
                && kept.get() < max_idle;
            if keep {
                kept.set(kept.get() + 1);
            } else {
                evicted.set(evicted.get() + 1);
            }
            keep
        });

        let evicted = evicted.get();
        if evicted > 0 {
            tracing::debug!(
                source = %self.name,
                evicted = evicted,
                kept = kept.get(),
                "evicted idle connections"
            );
        }
        evicted
    }

    /// Run `evict_idle` if the source's eviction interval has elapsed
    pub(crate) fn evict_idle_if_due(&self, now: Instant) -> usize {
        {
            let mut next = self.next_eviction.lock();
            if now < *next {
                return 0;
            }
            *next = now + self.config.pool.eviction_interval();
        }
        self.evict_idle()
    }

    /// Close the pool; idle connections are dropped and waiters fail
    pub(crate) fn close(&self) {
        self.pool.close();
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

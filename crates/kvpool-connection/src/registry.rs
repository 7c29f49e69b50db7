//! Registry of named connection pools
//!
//! The registry is built once from configuration and never changes its set
//! of sources afterwards. Every source owns one pool; connections are
//! borrowed by source name and handed back with [`Registry::release`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kvpool_core::{ConfigSource, ConnectionFactory, KvError, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::pool::{PoolStats, PooledConnection};
use crate::retry::{AcquireOptions, RetryPolicy};
use crate::source::{Source, SourceConfig};

/// Configuration key listing the source names, comma separated
pub const SOURCE_NAMES_KEY: &str = "redis.names";

/// Source names used when `redis.names` is not configured
pub const DEFAULT_SOURCE_NAMES: &str = "main";

/// Sweep period of the idle evictor when no source is configured
const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(180);

/// Split a comma-separated list of source names
///
/// Names are trimmed, empty entries are skipped and duplicates collapse
/// into their first occurrence.
///
/// ```
/// use kvpool_connection::parse_source_names;
///
/// assert_eq!(parse_source_names(" main, cache2,,main "), vec!["main", "cache2"]);
/// ```
pub fn parse_source_names(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if names.iter().any(|existing| existing == name) {
            tracing::warn!(source = name, "duplicate source name ignored");
            continue;
        }
        names.push(name.to_string());
    }
    names
}

/// Lifecycle state of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryState {
    /// Pools are open and serve connections
    Initialized,
    /// Pools are closed; acquisition fails with `Closed`
    ShutDown,
}

/// Named connection pools, one per configured source
pub struct Registry {
    sources: HashMap<String, Source>,
    order: Vec<String>,
    retry: RetryPolicy,
    shut_down: AtomicBool,
    shutdown_token: CancellationToken,
}

impl Registry {
    /// Build a registry from `redis.names` and the per-source keys
    ///
    /// Fails with a configuration error if any source is misconfigured; no
    /// connection is opened until the first acquisition.
    #[tracing::instrument(skip_all)]
    pub fn initialize(config: &dyn ConfigSource, factory: Arc<dyn ConnectionFactory>) -> Result<Self> {
        let raw_names = config.get_string_or(SOURCE_NAMES_KEY, DEFAULT_SOURCE_NAMES);
        let names = parse_source_names(&raw_names);
        if names.is_empty() {
            tracing::warn!(key = SOURCE_NAMES_KEY, "no source names configured");
        }

        let configs = names
            .iter()
            .map(|name| SourceConfig::from_config(name, config))
            .collect::<Result<Vec<_>>>()?;

        Self::from_sources(configs, factory)
    }

    /// Build a registry from already assembled source configurations
    pub fn from_sources(
        configs: impl IntoIterator<Item = SourceConfig>,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        let driver = factory.driver_name();
        let mut sources = HashMap::new();
        let mut order = Vec::new();

        for config in configs {
            let name = config.name().to_string();
            if name.is_empty() {
                return Err(KvError::Configuration(
                    "source name must not be empty".to_string(),
                ));
            }
            if sources.contains_key(&name) {
                tracing::warn!(source = %name, "duplicate source ignored");
                continue;
            }

            let source = Source::new(config, factory.clone())?;
            tracing::debug!(
                source = %name,
                endpoint = %source.config().endpoint(),
                max_total = source.config().pool().max_total(),
                max_idle = source.config().pool().max_idle(),
                authenticated = source.password().is_some(),
                "registered source"
            );
            order.push(name.clone());
            sources.insert(name, source);
        }

        tracing::info!(sources = ?order, driver = driver, "connection registry initialized");

        Ok(Self {
            sources,
            order,
            retry: RetryPolicy::default(),
            shut_down: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Replace the default retry policy used by [`Registry::acquire`]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Default retry policy
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Source names in configuration order
    pub fn source_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Whether a source with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Look up a source by name
    pub fn source(&self, name: &str) -> Result<&Source> {
        self.sources
            .get(name)
            .ok_or_else(|| KvError::UnknownSource(name.to_string()))
    }

    /// Current lifecycle state
    pub fn state(&self) -> RegistryState {
        if self.shut_down.load(Ordering::SeqCst) {
            RegistryState::ShutDown
        } else {
            RegistryState::Initialized
        }
    }

    fn is_shut_down(&self) -> bool {
        self.state() == RegistryState::ShutDown
    }

    fn sources_in_order(&self) -> impl Iterator<Item = &Source> {
        self.order.iter().filter_map(|name| self.sources.get(name))
    }

    /// Borrow a connection from the named source with the default options
    pub async fn acquire(&self, name: &str) -> Result<PooledConnection> {
        self.acquire_with(name, &AcquireOptions::default()).await
    }

    /// Borrow a connection from the named source
    ///
    /// Tries the pool without waiting and retries according to the retry
    /// policy while every slot is in use. The source's `max_wait`, and the
    /// caller's deadline if earlier, bound the whole acquisition. A borrowed
    /// connection is authenticated once if the source has a password.
    #[tracing::instrument(skip(self, options), fields(source = %name))]
    pub async fn acquire_with(
        &self,
        name: &str,
        options: &AcquireOptions,
    ) -> Result<PooledConnection> {
        let source = self.source(name)?;
        if self.is_shut_down() {
            return Err(KvError::Closed("connection registry is shut down".to_string()));
        }
        if options.is_cancelled() {
            return Err(KvError::Cancelled);
        }

        let retry = options.retry().unwrap_or(&self.retry);
        let max_wait_deadline = Instant::now() + source.config().pool().max_wait();
        let deadline = options
            .deadline()
            .map_or(max_wait_deadline, |d| d.min(max_wait_deadline));
        let cancel = options
            .cancellation()
            .cloned()
            .unwrap_or_else(CancellationToken::new);

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            if let Some(object) = source.try_get().await? {
                let connection = PooledConnection::new(source.shared_name(), object);
                let connection = self.authenticate(source, connection).await?;
                tracing::debug!(
                    connection_id = connection.id(),
                    attempts = attempts,
                    "acquired connection"
                );
                return Ok(connection);
            }

            if attempts >= retry.max_attempts() {
                break;
            }
            let delay = retry.delay_for(attempts - 1);
            if Instant::now() + delay > deadline {
                tracing::debug!(attempts = attempts, "deadline reached before next retry");
                break;
            }

            tracing::debug!(
                attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                "pool exhausted, retrying"
            );
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return Err(KvError::Cancelled),
                () = self.shutdown_token.cancelled() => {
                    return Err(KvError::Closed(
                        "connection registry shut down during acquire".to_string(),
                    ));
                }
            }
        }

        tracing::warn!(attempts = attempts, "pool exhausted, giving up");
        Err(KvError::PoolExhausted {
            source_name: name.to_string(),
            attempts,
        })
    }

    async fn authenticate(
        &self,
        source: &Source,
        mut connection: PooledConnection,
    ) -> Result<PooledConnection> {
        let Some(password) = source.password() else {
            return Ok(connection);
        };
        if connection.is_authenticated() {
            return Ok(connection);
        }

        let outcome = connection.authenticate(password).await;
        match outcome {
            Ok(()) => {
                connection.mark_authenticated();
                Ok(connection)
            }
            Err(e) => {
                tracing::warn!(
                    connection_id = connection.id(),
                    error = %e,
                    "authentication failed, discarding connection"
                );
                connection.discard().await;
                Err(KvError::AcquireFailed {
                    source_name: source.name().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Hand a borrowed connection back to the named source
    ///
    /// `None` is accepted and ignored. Broken or closed connections, and
    /// connections beyond the idle limit, are discarded.
    #[tracing::instrument(skip(self, connection), fields(source = %name))]
    pub async fn release(&self, name: &str, connection: Option<PooledConnection>) -> Result<()> {
        let Some(connection) = connection else {
            return Ok(());
        };
        let source = self.source(name)?;
        if connection.source() != name {
            return Err(KvError::SourceMismatch {
                expected: name.to_string(),
                actual: connection.source().to_string(),
            });
        }

        source.release(connection).await;
        Ok(())
    }

    /// Close every pool and stop the idle evictor
    ///
    /// Only the first call has an effect.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("connection registry already shut down");
            return;
        }

        self.shutdown_token.cancel();
        for source in self.sources_in_order() {
            source.close();
        }
        tracing::info!(sources = self.order.len(), "connection registry shut down");
    }

    /// Run one idle eviction sweep over every pool
    ///
    /// Returns the number of connections evicted.
    pub fn evict_idle(&self) -> usize {
        if self.is_shut_down() {
            return 0;
        }
        self.sources_in_order().map(Source::evict_idle).sum()
    }

    /// Start a background task sweeping idle connections
    ///
    /// Each source is swept once per its eviction interval. The task ends
    /// on shutdown or when the registry is dropped.
    pub fn spawn_idle_evictor(self: &Arc<Self>) -> JoinHandle<()> {
        let period = self
            .sources_in_order()
            .map(|source| source.config().pool().eviction_interval())
            .min()
            .unwrap_or(DEFAULT_EVICTION_INTERVAL);
        let registry = Arc::downgrade(self);
        let cancel = self.shutdown_token.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(registry) = registry.upgrade() else {
                            break;
                        };
                        let now = Instant::now();
                        let evicted: usize = registry
                            .sources_in_order()
                            .map(|source| source.evict_idle_if_due(now))
                            .sum();
                        if evicted > 0 {
                            tracing::debug!(evicted = evicted, "idle eviction sweep");
                        }
                    }
                }
            }
            tracing::debug!("idle evictor stopped");
        })
    }

    /// Statistics of the named source's pool
    pub fn stats(&self, name: &str) -> Result<PoolStats> {
        Ok(self.source(name)?.stats())
    }

    /// Statistics of every pool, in configuration order
    pub fn all_stats(&self) -> Vec<(String, PoolStats)> {
        self.sources_in_order()
            .map(|source| (source.name().to_string(), source.stats()))
            .collect()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sources", &self.order)
            .field("state", &self.state())
            .field("retry", &self.retry)
            .finish()
    }
}

//! Redis driver implementation

use async_trait::async_trait;
use kvpool_core::{CacheConnection, ConnectionFactory, Endpoint, KvError, Reply, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Opens connections to Redis servers
///
/// Connections are multiplexed async connections; the database index of the
/// endpoint is selected as part of the connection URL.
#[derive(Debug, Clone, Default)]
pub struct RedisConnector;

impl RedisConnector {
    /// Create a new Redis connector
    pub fn new() -> Self {
        tracing::debug!("Redis connector initialized");
        Self
    }
}

#[async_trait]
impl ConnectionFactory for RedisConnector {
    fn driver_name(&self) -> &'static str {
        "redis"
    }

    #[tracing::instrument(skip(self, endpoint), fields(endpoint = %endpoint))]
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn CacheConnection>> {
        tracing::debug!("connecting to Redis");

        let client = redis::Client::open(endpoint.url().as_str())
            .map_err(|e| KvError::Connection(format!("Failed to create Redis client: {}", e)))?;

        let connection = tokio::time::timeout(
            endpoint.connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            KvError::Timeout(format!(
                "Connecting to {} took longer than {:?}",
                endpoint, endpoint.connect_timeout
            ))
        })?
        .map_err(|e| map_redis_error(e, "Failed to connect to Redis"))?;

        tracing::debug!("Redis connection established");
        Ok(Box::new(RedisConnection::new(
            connection,
            endpoint.command_timeout,
        )))
    }
}

/// Redis connection wrapper implementing the `CacheConnection` trait
pub struct RedisConnection {
    connection: Mutex<redis::aio::MultiplexedConnection>,
    command_timeout: Duration,
    closed: AtomicBool,
}

impl RedisConnection {
    /// Wrap an established multiplexed connection
    pub fn new(connection: redis::aio::MultiplexedConnection, command_timeout: Duration) -> Self {
        Self {
            connection: Mutex::new(connection),
            command_timeout,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_not_closed(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(KvError::Closed("Connection is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheConnection for RedisConnection {
    fn driver_name(&self) -> &str {
        "redis"
    }

    async fn command(&self, name: &str, args: &[&str]) -> Result<Reply> {
        self.ensure_not_closed()?;
        if name.trim().is_empty() {
            return Err(KvError::Command("Empty command".to_string()));
        }

        let command = name.to_uppercase();
        let mut cmd = redis::cmd(&command);
        for arg in args {
            cmd.arg(*arg);
        }

        let start = Instant::now();
        let mut conn = self.connection.lock().await;
        let result: redis::RedisResult<redis::Value> =
            match tokio::time::timeout(self.command_timeout, cmd.query_async(&mut *conn)).await {
                Ok(result) => result,
                Err(_) => {
                    // A timed-out reply may still arrive later; the connection
                    // cannot be trusted to stay in sync.
                    self.closed.store(true, Ordering::SeqCst);
                    return Err(KvError::Timeout(format!(
                        "{} did not complete within {:?}",
                        command, self.command_timeout
                    )));
                }
            };

        match result {
            Ok(value) => {
                tracing::trace!(
                    command = %command,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "command completed"
                );
                Ok(redis_value_to_reply(value))
            }
            Err(e) => {
                let err = map_redis_error(e, "Redis command failed");
                if matches!(err, KvError::Connection(_)) {
                    self.closed.store(true, Ordering::SeqCst);
                }
                Err(err)
            }
        }
    }

    async fn close(&self) -> Result<()> {
        // Multiplexed connections shut down once the last handle is dropped;
        // marking closed keeps this handle from being used or pooled again.
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Map a `redis` error onto the kvpool error kinds
pub fn map_redis_error(error: redis::RedisError, context: &str) -> KvError {
    let message = format!("{}: {}", context, error);

    if error.kind() == redis::ErrorKind::AuthenticationFailed
        || matches!(error.code(), Some("NOAUTH") | Some("WRONGPASS"))
    {
        return KvError::Authentication(message);
    }

    if error.is_timeout() {
        return KvError::Timeout(message);
    }

    if error.kind() == redis::ErrorKind::IoError
        || error.is_io_error()
        || error.is_connection_dropped()
        || error.is_connection_refusal()
    {
        return KvError::Connection(message);
    }

    KvError::Command(message)
}

/// Convert a `redis` reply into a `Reply`
pub fn redis_value_to_reply(value: redis::Value) -> Reply {
    match value {
        redis::Value::Nil => Reply::Nil,
        redis::Value::Okay => Reply::Okay,
        redis::Value::Int(n) => Reply::Int(n),
        redis::Value::Double(d) => Reply::Double(d),
        redis::Value::Boolean(b) => Reply::Bool(b),
        redis::Value::SimpleString(s) => Reply::Status(s),
        redis::Value::BulkString(bytes) => Reply::Data(bytes),
        redis::Value::VerbatimString { text, .. } => Reply::Data(text.into_bytes()),
        redis::Value::Array(items) | redis::Value::Set(items) => {
            Reply::Array(items.into_iter().map(redis_value_to_reply).collect())
        }
        redis::Value::Map(pairs) => Reply::Array(
            pairs
                .into_iter()
                .flat_map(|(k, v)| [redis_value_to_reply(k), redis_value_to_reply(v)])
                .collect(),
        ),
        redis::Value::Attribute { data, .. } => redis_value_to_reply(*data),
        other => Reply::Status(format!("{:?}", other)),
    }
}

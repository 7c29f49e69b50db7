//! Connection traits and endpoint description

use crate::{KvError, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Default cache host when none is configured
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default cache port when none is configured
pub const DEFAULT_PORT: u16 = 6379;

/// Default connect and read timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// A reply returned by the cache server
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Missing value
    Nil,
    /// Plain `OK` acknowledgement
    Okay,
    /// Simple status string (e.g. `PONG`)
    Status(String),
    /// Integer reply
    Int(i64),
    /// Floating point reply
    Double(f64),
    /// Boolean reply
    Bool(bool),
    /// Binary-safe bulk data
    Data(Vec<u8>),
    /// Nested replies
    Array(Vec<Reply>),
}

impl Reply {
    /// Interpret the reply as text, if it carries any.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Reply::Okay => Some("OK".to_string()),
            Reply::Status(s) => Some(s.clone()),
            Reply::Data(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Reply::Int(n) => Some(n.to_string()),
            Reply::Double(f) => Some(f.to_string()),
            Reply::Bool(b) => Some(b.to_string()),
            Reply::Nil | Reply::Array(_) => None,
        }
    }

    /// Whether the reply is `Nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Nil => write!(f, "(nil)"),
            Reply::Okay => write!(f, "OK"),
            Reply::Status(s) => write!(f, "{}", s),
            Reply::Int(n) => write!(f, "(integer) {}", n),
            Reply::Double(d) => write!(f, "(double) {}", d),
            Reply::Bool(b) => write!(f, "(boolean) {}", b),
            Reply::Data(bytes) => write!(f, "\"{}\"", String::from_utf8_lossy(bytes)),
            Reply::Array(items) => {
                if items.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", idx + 1, item)?;
                }
                Ok(())
            }
        }
    }
}

/// Network location and timeouts of a cache server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Logical database index
    pub database: u16,
    /// Timeout for establishing the TCP connection
    pub connect_timeout: Duration,
    /// Timeout for a single command round trip
    pub command_timeout: Duration,
}

impl Endpoint {
    /// Create an endpoint with default database and timeouts
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            database: 0,
            connect_timeout: DEFAULT_TIMEOUT,
            command_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the logical database index
    pub fn with_database(mut self, database: u16) -> Self {
        self.database = database;
        self
    }

    /// Set both connect and command timeouts
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.command_timeout = timeout;
        self
    }

    /// Render a `redis://` URL for this endpoint.
    ///
    /// Credentials are never part of the URL; authentication happens after
    /// a connection is borrowed from its pool.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.database)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

/// A single connection to a key-value cache
#[async_trait]
pub trait CacheConnection: Send + Sync {
    /// Get the driver name (e.g., "redis")
    fn driver_name(&self) -> &str;

    /// Send a command with its arguments and wait for the reply
    async fn command(&self, name: &str, args: &[&str]) -> Result<Reply>;

    /// Check that the server answers
    async fn ping(&self) -> Result<()> {
        match self.command("PING", &[]).await? {
            Reply::Status(s) if s.eq_ignore_ascii_case("PONG") => Ok(()),
            Reply::Data(ref d) if d.eq_ignore_ascii_case(b"PONG") => Ok(()),
            Reply::Okay => Ok(()),
            other => Err(KvError::Connection(format!(
                "unexpected PING reply: {}",
                other
            ))),
        }
    }

    /// Authenticate this connection with a password
    async fn authenticate(&self, password: &str) -> Result<()> {
        match self.command("AUTH", &[password]).await {
            Ok(_) => Ok(()),
            Err(KvError::Command(msg)) => Err(KvError::Authentication(msg)),
            Err(e) => Err(e),
        }
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// Opens new connections to an endpoint
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Get the driver name used for connections produced by this factory
    fn driver_name(&self) -> &'static str;

    /// Open a new physical connection
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn CacheConnection>>;
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for std::sync::Arc<T> {
    fn driver_name(&self) -> &'static str {
        (**self).driver_name()
    }

    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn CacheConnection>> {
        (**self).connect(endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedConnection {
        replies: Mutex<Vec<Result<Reply>>>,
    }

    #[async_trait]
    impl CacheConnection for ScriptedConnection {
        fn driver_name(&self) -> &str {
            "scripted"
        }

        async fn command(&self, _name: &str, _args: &[&str]) -> Result<Reply> {
            self.replies.lock().unwrap().remove(0)
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }

        fn is_closed(&self) -> bool {
            false
        }
    }

    fn scripted(replies: Vec<Result<Reply>>) -> ScriptedConnection {
        ScriptedConnection {
            replies: Mutex::new(replies),
        }
    }

    #[test]
    fn test_endpoint_defaults() {
        let endpoint = Endpoint::default();
        assert_eq!(endpoint.host, "127.0.0.1");
        assert_eq!(endpoint.port, 6379);
        assert_eq!(endpoint.database, 0);
        assert_eq!(endpoint.connect_timeout, Duration::from_secs(180));
        assert_eq!(endpoint.url(), "redis://127.0.0.1:6379/0");
    }

    #[test]
    fn test_endpoint_builder() {
        let endpoint = Endpoint::new("cache.internal", 6380)
            .with_database(3)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(endpoint.to_string(), "cache.internal:6380/3");
        assert_eq!(endpoint.command_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_reply_display() {
        assert_eq!(Reply::Nil.to_string(), "(nil)");
        assert_eq!(Reply::Int(7).to_string(), "(integer) 7");
        let array = Reply::Array(vec![Reply::Data(b"a".to_vec()), Reply::Int(2)]);
        assert_eq!(array.to_string(), "1) \"a\"\n2) (integer) 2");
        assert_eq!(Reply::Array(vec![]).to_string(), "(empty array)");
    }

    #[test]
    fn test_reply_as_text() {
        assert_eq!(Reply::Data(b"value".to_vec()).as_text().as_deref(), Some("value"));
        assert_eq!(Reply::Okay.as_text().as_deref(), Some("OK"));
        assert!(Reply::Nil.as_text().is_none());
    }

    #[tokio::test]
    async fn test_default_ping_accepts_pong() {
        let conn = scripted(vec![Ok(Reply::Status("PONG".into()))]);
        assert!(conn.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_default_ping_rejects_other_replies() {
        let conn = scripted(vec![Ok(Reply::Int(1))]);
        let err = conn.ping().await.unwrap_err();
        assert!(matches!(err, KvError::Connection(_)));
    }

    #[tokio::test]
    async fn test_default_authenticate_maps_server_errors() {
        let conn = scripted(vec![Err(KvError::Command("WRONGPASS invalid".into()))]);
        let err = conn.authenticate("secret").await.unwrap_err();
        assert!(matches!(err, KvError::Authentication(msg) if msg.contains("WRONGPASS")));
    }
}

//! Mock connections shared by the unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use kvpool_core::{CacheConnection, ConnectionFactory, Endpoint, KvError, Reply, Result};

/// Counters and failure switches shared by a factory and its connections
#[derive(Default)]
pub(crate) struct MockState {
    pub connects: AtomicUsize,
    pub auths: AtomicUsize,
    pub pings: AtomicUsize,
    pub closes: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_auth: AtomicBool,
    pub fail_ping: AtomicBool,
}

impl MockState {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn auths(&self) -> usize {
        self.auths.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_auth(&self, fail: bool) {
        self.fail_auth.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_ping(&self, fail: bool) {
        self.fail_ping.store(fail, Ordering::SeqCst);
    }
}

/// Connection that answers PING and AUTH and echoes everything else
pub(crate) struct MockConnection {
    state: Arc<MockState>,
    closed: AtomicBool,
}

#[async_trait]
impl CacheConnection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn command(&self, name: &str, args: &[&str]) -> Result<Reply> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(KvError::Connection("connection closed".into()));
        }
        match name {
            "PING" => {
                self.state.pings.fetch_add(1, Ordering::SeqCst);
                if self.state.fail_ping.load(Ordering::SeqCst) {
                    Err(KvError::Connection("connection reset by peer".into()))
                } else {
                    Ok(Reply::Status("PONG".into()))
                }
            }
            "AUTH" => {
                self.state.auths.fetch_add(1, Ordering::SeqCst);
                if self.state.fail_auth.load(Ordering::SeqCst) {
                    Err(KvError::Command("WRONGPASS invalid password".into()))
                } else {
                    Ok(Reply::Okay)
                }
            }
            _ => Ok(Reply::Data(args.join(" ").into_bytes())),
        }
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Factory producing `MockConnection`s
#[derive(Default)]
pub(crate) struct MockFactory {
    state: Arc<MockState>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<MockState> {
        self.state.clone()
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    fn driver_name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn CacheConnection>> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(KvError::Connection(format!(
                "connection refused: {}",
                endpoint
            )));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

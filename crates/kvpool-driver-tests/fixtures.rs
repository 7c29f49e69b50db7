//! Test fixtures: server lookup, configuration and registries
//!
//! Set `KVPOOL_TEST_MANUAL_CONTAINERS=1` to run against an already running
//! server (`KVPOOL_TEST_REDIS_HOST`, `KVPOOL_TEST_REDIS_PORT`) instead of a
//! testcontainers-managed one.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use kvpool_connection::{Registry, RetryPolicy};
use kvpool_core::MapConfig;
use kvpool_driver_redis::RedisConnector;

use crate::test_containers::{ContainerInfo, redis_auth_container, redis_container};

/// Which server a test runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestServer {
    /// Redis without a password
    Open,
    /// Redis with `requirepass`
    Authenticated,
}

fn use_manual_containers() -> bool {
    env::var("KVPOOL_TEST_MANUAL_CONTAINERS")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(false)
}

fn manual_server(server: TestServer) -> Result<ContainerInfo> {
    let host = env::var("KVPOOL_TEST_REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("KVPOOL_TEST_REDIS_PORT")
        .unwrap_or_else(|_| "6379".to_string())
        .parse::<u16>()
        .context("KVPOOL_TEST_REDIS_PORT must be a port number")?;
    let password = match server {
        TestServer::Open => None,
        TestServer::Authenticated => Some(
            env::var("KVPOOL_TEST_REDIS_PASSWORD")
                .context("KVPOOL_TEST_REDIS_PASSWORD is required for authenticated tests")?,
        ),
    };
    Ok(ContainerInfo {
        host,
        port,
        password,
    })
}

/// Locate (and if needed start) the server for a test
pub async fn test_server(server: TestServer) -> Result<ContainerInfo> {
    initialize_logging();

    if use_manual_containers() {
        return manual_server(server);
    }
    match server {
        TestServer::Open => redis_container().await,
        TestServer::Authenticated => redis_auth_container().await,
    }
}

/// Configuration pointing every named source at the same server
pub fn source_config(info: &ContainerInfo, names: &[&str]) -> MapConfig {
    let mut config = MapConfig::new().with("redis.names", names.join(","));
    for name in names {
        config.set(&format!("redis.{}.host", name), info.host.clone());
        config.set(&format!("redis.{}.port", name), info.port.to_string());
        config.set(&format!("redis.{}.timeout_secs", name), "5");
        if let Some(password) = &info.password {
            config.set(&format!("redis.{}.password", name), password.clone());
        }
    }
    config
}

/// Build a registry from `config` with a short retry policy
pub fn registry_from(config: &MapConfig) -> Result<Arc<Registry>> {
    let registry = Registry::initialize(config, Arc::new(RedisConnector::new()))
        .context("failed to initialize registry")?
        .with_retry_policy(RetryPolicy::new(2, std::time::Duration::from_millis(100)));
    Ok(Arc::new(registry))
}

/// Registry with one source per name, all on the given server
pub async fn test_registry(server: TestServer, names: &[&str]) -> Result<Arc<Registry>> {
    let info = test_server(server).await?;
    registry_from(&source_config(&info, names))
}

/// Initialize logging for tests (only once)
fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kvpool_connection=debug"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

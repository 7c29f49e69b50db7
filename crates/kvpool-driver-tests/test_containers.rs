//! Docker containers for integration tests
//!
//! Containers are started once per test process and cached. Two Redis
//! servers are available: an open one and one that requires a password.
//!
//! # Example
//!
//! ```rust,ignore
//! use kvpool_driver_tests::test_containers::redis_container;
//!
//! let info = redis_container().await?;
//! println!("redis at {}:{}", info.host, info.port);
//! ```

use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use testcontainers::{ContainerAsync, ContainerRequest, ImageExt, runners::AsyncRunner};
use testcontainers_modules::redis::{REDIS_PORT, Redis};

/// Password configured on the authenticated Redis container
pub const REDIS_TEST_PASSWORD: &str = "kvpool-secret";

/// Information about a running test container
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Host address (typically 127.0.0.1)
    pub host: String,
    /// Port number (randomly assigned by testcontainers)
    pub port: u16,
    /// Password required by the server, if any
    pub password: Option<String>,
}

/// Redis container kept alive for the whole test process
struct RedisContainer {
    #[allow(dead_code)]
    inner: ContainerAsync<Redis>,
    info: ContainerInfo,
}

/// Global Redis container without authentication
static REDIS_CONTAINER: Lazy<Arc<Mutex<Option<RedisContainer>>>> =
    Lazy::new(|| Arc::new(Mutex::new(None)));

/// Global Redis container with `requirepass`
static REDIS_AUTH_CONTAINER: Lazy<Arc<Mutex<Option<RedisContainer>>>> =
    Lazy::new(|| Arc::new(Mutex::new(None)));

fn cached(slot: &Mutex<Option<RedisContainer>>) -> anyhow::Result<Option<ContainerInfo>> {
    let guard = slot
        .lock()
        .map_err(|e| anyhow::anyhow!("failed to lock redis container: {}", e))?;
    Ok(guard.as_ref().map(|container| container.info.clone()))
}

async fn start(
    slot: &Mutex<Option<RedisContainer>>,
    request: ContainerRequest<Redis>,
    password: Option<&str>,
) -> anyhow::Result<ContainerInfo> {
    if let Some(info) = cached(slot)? {
        return Ok(info);
    }

    tracing::info!(authenticated = password.is_some(), "starting Redis test container");

    let container = request
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start redis container: {}", e))?;

    let host_port = container
        .get_host_port_ipv4(REDIS_PORT)
        .await
        .map_err(|e| anyhow::anyhow!("failed to get redis port: {}", e))?;

    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port: host_port,
        password: password.map(str::to_string),
    };

    tracing::info!(port = host_port, "Redis test container started successfully");

    let mut guard = slot
        .lock()
        .map_err(|e| anyhow::anyhow!("failed to lock redis container: {}", e))?;
    // Another test may have won the race; keep the first container.
    if let Some(existing) = guard.as_ref() {
        return Ok(existing.info.clone());
    }
    *guard = Some(RedisContainer {
        inner: container,
        info: info.clone(),
    });

    Ok(info)
}

/// Start (or reuse) the Redis container without a password
pub async fn redis_container() -> anyhow::Result<ContainerInfo> {
    start(&REDIS_CONTAINER, Redis::default().into(), None).await
}

/// Start (or reuse) the Redis container that requires [`REDIS_TEST_PASSWORD`]
pub async fn redis_auth_container() -> anyhow::Result<ContainerInfo> {
    let request = Redis::default().with_cmd([
        "redis-server",
        "--requirepass",
        REDIS_TEST_PASSWORD,
    ]);
    start(&REDIS_AUTH_CONTAINER, request, Some(REDIS_TEST_PASSWORD)).await
}

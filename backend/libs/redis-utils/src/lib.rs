use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisError};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Redis connection pool backed by a single multiplexed connection manager.
pub struct RedisPool {
    manager: SharedConnectionManager,
    addr_label: String,
}

impl RedisPool {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;
        let addr_label = describe_addr(&info.addr);

        let client = Client::open(info).context("failed to construct Redis client")?;
        let mut connection_manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut connection_manager)
            .await
            .context("Redis ping failed")?;

        info!("Redis connection manager ready at {}", addr_label);

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
            addr_label,
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }

    pub fn addr_label(&self) -> &str {
        &self.addr_label
    }
}

fn describe_addr(addr: &ConnectionAddr) -> String {
    match addr {
        ConnectionAddr::Tcp(host, port) => format!("{}:{}", host, port),
        ConnectionAddr::TcpTls { host, port, .. } => format!("{}:{} (tls)", host, port),
        #[allow(unreachable_patterns)]
        _ => "unix socket".to_string(),
    }
}

/// Failure of a command run through [`with_timeout`].
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("redis command timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Redis(#[from] RedisError),
}

/// Runs a Redis command future under `limit`.
pub async fn with_timeout<F, T>(limit: Duration, future: F) -> Result<T, CommandError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match timeout(limit, future).await {
        Ok(result) => result.map_err(CommandError::from),
        Err(_) => {
            debug!(timeout_ms = limit.as_millis() as u64, "Redis command timed out");
            Err(CommandError::Timeout(limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::ErrorKind;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout(Duration::from_millis(50), async {
            Ok::<_, RedisError>(42)
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_with_timeout_reports_elapsed_as_timeout() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, RedisError>(())
        })
        .await;

        assert!(matches!(
            result,
            Err(CommandError::Timeout(limit)) if limit == Duration::from_millis(10)
        ));
    }

    #[tokio::test]
    async fn test_with_timeout_keeps_io_errors_distinct_from_timeouts() {
        let result = with_timeout(Duration::from_millis(50), async {
            Err::<(), _>(RedisError::from((
                ErrorKind::IoError,
                "connection timed out",
            )))
        })
        .await;

        match result {
            Err(CommandError::Redis(err)) => assert_eq!(err.kind(), ErrorKind::IoError),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_describe_addr() {
        let addr = ConnectionAddr::Tcp("cache.internal".to_string(), 6380);
        assert_eq!(describe_addr(&addr), "cache.internal:6380");
    }
}

// Redis OrderedStore Implementation
//
// List layout: tail = left (LPUSH), head = right. BRPOPLPUSH pops the head
// of one list and pushes it onto the tail of another atomically on the
// server, which gives the exactly-one-claimant guarantee.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use taskq_core::domain::QueueName;
use taskq_core::error::{AppError, Result};
use taskq_core::port::{ClaimTimeout, OrderedStore};
use tracing::{debug, info};

fn map_redis_error(err: redis::RedisError) -> AppError {
    AppError::Store(format!("Redis error: {}", err))
}

/// BRPOPLPUSH takes whole seconds and treats 0 as "forever", so finite
/// timeouts are rounded up and never below one second
fn blocking_timeout_secs(timeout: ClaimTimeout) -> u64 {
    match timeout {
        ClaimTimeout::Infinite => 0,
        ClaimTimeout::After(d) => d.as_secs_f64().ceil().max(1.0) as u64,
    }
}

/// Redis-backed queues.
///
/// Blocking claims go over their own connection: a blocked BRPOPLPUSH holds
/// its connection on the server, and prompt commands must not queue behind
/// it. Claims issued concurrently through one store are served one after
/// another, so give each worker its own store.
///
/// Both handles reconnect on their own. The command that hits a dropped
/// connection fails with a store error; later commands use a fresh one.
pub struct RedisOrderedStore {
    conn: ConnectionManager,
    blocking: ConnectionManager,
}

impl RedisOrderedStore {
    /// Connect and verify the server answers PING
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;

        // Plain connection first so an unreachable server fails at once
        // instead of going through the reconnect backoff
        let mut check = client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut check)
            .await
            .map_err(map_redis_error)?;

        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(map_redis_error)?;
        let blocking = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        info!(reply = %pong, "Connected to Redis");

        Ok(Self { conn, blocking })
    }
}

#[async_trait]
impl OrderedStore for RedisOrderedStore {
    async fn append(&self, queue: QueueName, item: &[u8]) -> Result<()> {
        let mut conn = self.conn.clone();
        let len: u64 = conn
            .lpush(queue.key(), item)
            .await
            .map_err(map_redis_error)?;
        debug!(queue = %queue, len, "LPUSH");
        Ok(())
    }

    async fn transfer(
        &self,
        from: QueueName,
        to: QueueName,
        timeout: ClaimTimeout,
    ) -> Result<Option<Vec<u8>>> {
        let mut conn = self.blocking.clone();
        redis::cmd("BRPOPLPUSH")
            .arg(from.key())
            .arg(to.key())
            .arg(blocking_timeout_secs(timeout))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)
    }

    async fn remove_first(&self, queue: QueueName, item: &[u8]) -> Result<bool> {
        let mut conn = self.conn.clone();
        // Negative count scans from the right, i.e. from the head
        let removed: i64 = conn
            .lrem(queue.key(), -1, item)
            .await
            .map_err(map_redis_error)?;
        Ok(removed > 0)
    }

    async fn len(&self, queue: QueueName) -> Result<u64> {
        let mut conn = self.conn.clone();
        conn.llen(queue.key()).await.map_err(map_redis_error)
    }
}

/// Redis can only express whole-second claim timeouts
pub const MIN_CLAIM_TIMEOUT: Duration = Duration::from_secs(1);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::AbortHandle;
    use tokio_test::assert_ok;

    #[test]
    fn test_blocking_timeout_rounding() {
        assert_eq!(blocking_timeout_secs(ClaimTimeout::Infinite), 0);
        assert_eq!(blocking_timeout_secs(ClaimTimeout::After(Duration::ZERO)), 1);
        assert_eq!(
            blocking_timeout_secs(ClaimTimeout::After(Duration::from_millis(1500))),
            2
        );
        assert_eq!(blocking_timeout_secs(ClaimTimeout::After(Duration::from_secs(5))), 5);
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_is_store_error() {
        let err = RedisOrderedStore::connect("redis://127.0.0.1:1")
            .await
            .err()
            .unwrap();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_url_is_store_error() {
        assert!(RedisOrderedStore::connect("not a url").await.is_err());
    }

    /// Minimal RESP server that can sever every open connection while
    /// still accepting new ones
    struct FlakyServer {
        url: String,
        sessions: Arc<Mutex<Vec<AbortHandle>>>,
    }

    impl FlakyServer {
        async fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("redis://{}", listener.local_addr().unwrap());
            let sessions: Arc<Mutex<Vec<AbortHandle>>> = Arc::default();

            let accepted = sessions.clone();
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let handle = tokio::spawn(serve(socket));
                    accepted.lock().unwrap().push(handle.abort_handle());
                }
            });

            Self { url, sessions }
        }

        fn drop_connections(&self) {
            for session in self.sessions.lock().unwrap().drain(..) {
                session.abort();
            }
        }
    }

    async fn serve(socket: TcpStream) -> std::io::Result<()> {
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);
        loop {
            let Some(command) = read_command(&mut reader).await? else {
                return Ok(());
            };
            let reply: &[u8] = match command.to_ascii_uppercase().as_str() {
                "PING" => b"+PONG\r\n",
                "LLEN" => b":0\r\n",
                "LPUSH" => b":1\r\n",
                _ => b"+OK\r\n",
            };
            write.write_all(reply).await?;
        }
    }

    /// Reads one RESP array and returns its command name
    async fn read_command(
        reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    ) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let argc: usize = line.trim().trim_start_matches('*').parse().unwrap_or(0);

        let mut name = String::new();
        for i in 0..argc {
            line.clear();
            reader.read_line(&mut line).await?;
            let len: usize = line.trim().trim_start_matches('$').parse().unwrap_or(0);
            let mut arg = vec![0u8; len + 2];
            reader.read_exact(&mut arg).await?;
            if i == 0 {
                name = String::from_utf8_lossy(&arg[..len]).into_owned();
            }
        }
        Ok(Some(name))
    }

    #[tokio::test]
    async fn test_store_recovers_after_connection_loss() {
        let server = FlakyServer::start().await;
        let store = RedisOrderedStore::connect(&server.url).await.unwrap();
        assert_eq!(store.len(QueueName::Pending).await.unwrap(), 0);

        server.drop_connections();

        let mut recovered = false;
        for _ in 0..40 {
            if store.len(QueueName::Pending).await.is_ok()
                && store.append(QueueName::Pending, b"task").await.is_ok()
            {
                recovered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(recovered, "store never reconnected");
    }

    fn test_url() -> String {
        std::env::var("TASKQ_TEST_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    async fn clean_store() -> RedisOrderedStore {
        let store = RedisOrderedStore::connect(&test_url()).await.unwrap();
        let mut conn = store.conn.clone();
        for queue in QueueName::ALL {
            let _: i64 = conn.del(queue.key()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    #[ignore = "requires a Redis server (TASKQ_TEST_REDIS_URL)"]
    async fn test_redis_fifo_transfer_and_remove() {
        let store = clean_store().await;
        assert_ok!(store.append(QueueName::Pending, b"first").await);
        assert_ok!(store.append(QueueName::Pending, b"second").await);

        let claimed = store
            .transfer(QueueName::Pending, QueueName::Processing, ClaimTimeout::After(MIN_CLAIM_TIMEOUT))
            .await
            .unwrap();
        assert_eq!(claimed.as_deref(), Some(&b"first"[..]));
        assert_eq!(store.len(QueueName::Pending).await.unwrap(), 1);
        assert_eq!(store.len(QueueName::Processing).await.unwrap(), 1);

        assert!(store.remove_first(QueueName::Processing, b"first").await.unwrap());
        assert_eq!(store.len(QueueName::Processing).await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires a Redis server (TASKQ_TEST_REDIS_URL)"]
    async fn test_redis_transfer_times_out() {
        let store = clean_store().await;
        let claimed = store
            .transfer(QueueName::Pending, QueueName::Processing, ClaimTimeout::After(MIN_CLAIM_TIMEOUT))
            .await
            .unwrap();
        assert!(claimed.is_none());
    }
}

// Backing store selection from a URL

use std::sync::Arc;
use taskq_core::error::{AppError, Result};
use taskq_core::port::OrderedStore;
use taskq_infra_redis::RedisOrderedStore;
use taskq_infra_sqlite::{create_pool, run_migrations, SqliteOrderedStore};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Sqlite,
}

impl StoreKind {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("redis://") || url.starts_with("rediss://") {
            Ok(StoreKind::Redis)
        } else if url.starts_with("sqlite:") {
            Ok(StoreKind::Sqlite)
        } else {
            Err(AppError::Config(format!(
                "Unsupported store URL '{}': expected redis://, rediss:// or sqlite:",
                url
            )))
        }
    }
}

/// Expand a leading `~` in the path part of a `sqlite:` URL
pub fn expand_sqlite_url(url: &str) -> String {
    let rest = url.strip_prefix("sqlite:").unwrap_or(url);
    let path = rest.strip_prefix("//").unwrap_or(rest);
    format!("sqlite:{}", shellexpand::tilde(path))
}

/// Connect to the store named by `url`, verifying it is reachable.
/// SQLite databases are created and migrated on first use.
pub async fn connect_store(url: &str) -> Result<Arc<dyn OrderedStore>> {
    match StoreKind::from_url(url)? {
        StoreKind::Redis => {
            let store = RedisOrderedStore::connect(url).await?;
            info!(url = %url, "Connected to Redis store");
            Ok(Arc::new(store))
        }
        StoreKind::Sqlite => {
            let url = expand_sqlite_url(url);
            let pool = create_pool(&url).await?;
            run_migrations(&pool).await?;
            info!(url = %url, "Opened SQLite store");
            Ok(Arc::new(SqliteOrderedStore::new(pool)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskq_core::domain::QueueName;
    use tokio_test::assert_ok;

    #[test]
    fn test_store_kind_from_url() {
        assert_eq!(StoreKind::from_url("redis://127.0.0.1:6379").unwrap(), StoreKind::Redis);
        assert_eq!(StoreKind::from_url("rediss://cache:6380").unwrap(), StoreKind::Redis);
        assert_eq!(StoreKind::from_url("sqlite::memory:").unwrap(), StoreKind::Sqlite);
        assert!(matches!(
            StoreKind::from_url("postgres://localhost"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_expand_sqlite_url() {
        assert_eq!(expand_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(expand_sqlite_url("sqlite:///tmp/q.db"), "sqlite:/tmp/q.db");
        assert_eq!(expand_sqlite_url("sqlite:data/q.db"), "sqlite:data/q.db");

        let expanded = expand_sqlite_url("sqlite:~/q.db");
        assert!(!expanded.contains('~'));
        assert!(expanded.ends_with("/q.db"));
    }

    #[tokio::test]
    async fn test_connect_sqlite_memory() {
        let store = connect_store("sqlite::memory:").await.unwrap();

        assert_ok!(store.append(QueueName::Pending, b"x").await);
        assert_eq!(store.len(QueueName::Pending).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_fast() {
        let result = connect_store("redis://127.0.0.1:1").await;
        assert!(matches!(result, Err(AppError::Store(_))));
    }
}

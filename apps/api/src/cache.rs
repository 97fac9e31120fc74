//! # List Cache
//!
//! Short-lived memoization of list responses.
//!
//! ```text
//! GET /v1/remainder?search=cola&limit=20
//!        │
//!        ▼
//! key = "remainder-limit=20&search=cola"   (pairs sorted, url-encoded)
//!        │
//!        ├── hit  ──► cached page
//!        └── miss ──► store.get_list ──► set(key, page, ttl) ──► page
//! ```
//!
//! Entries are never invalidated, they only expire. Cache failures are
//! logged and the request falls through to the database.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::form_urlencoded;

use crate::config::ApiConfig;

/// Cache failures. Never surfaced to clients.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cached value is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// In-process TTL map used when Redis is not configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, (Instant, Vec<u8>)>>>,
}

impl MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((expires_at, bytes)) if *expires_at > Instant::now() => Some(bytes.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, bytes: Vec<u8>, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (expires_at, _)| *expires_at > now);
        entries.insert(key.to_string(), (now + ttl, bytes));
    }
}

/// List cache backend.
#[derive(Clone)]
pub enum ListCache {
    Redis(ConnectionManager),
    Memory(MemoryCache),
    Disabled,
}

impl ListCache {
    /// Picks the backend from configuration.
    ///
    /// An unreachable Redis falls back to the in-process cache.
    pub async fn connect(config: &ApiConfig) -> Self {
        if !config.cache_enabled {
            info!("List cache disabled");
            return ListCache::Disabled;
        }

        let Some(url) = config.redis_url.as_deref() else {
            info!("List cache: in-memory");
            return ListCache::memory();
        };

        let manager = match redis::Client::open(url) {
            Ok(client) => ConnectionManager::new(client).await,
            Err(e) => Err(e),
        };

        match manager {
            Ok(manager) => {
                info!("List cache: connected to Redis");
                ListCache::Redis(manager)
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect to Redis, using in-memory cache");
                ListCache::memory()
            }
        }
    }

    pub fn memory() -> Self {
        ListCache::Memory(MemoryCache::default())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            ListCache::Redis(_) => "redis",
            ListCache::Memory(_) => "memory",
            ListCache::Disabled => "disabled",
        }
    }

    /// A miss is `Ok(None)`; a transport failure is `Err`.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self {
            ListCache::Redis(manager) => {
                let mut conn = manager.clone();
                let bytes: Option<Vec<u8>> = conn.get(key).await?;
                Ok(bytes)
            }
            ListCache::Memory(memory) => Ok(memory.get(key).await),
            ListCache::Disabled => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        match self {
            ListCache::Redis(manager) => {
                let mut conn = manager.clone();
                let secs = ttl.as_secs().max(1);
                let _: () = conn.set_ex(key, bytes, secs).await?;
                Ok(())
            }
            ListCache::Memory(memory) => {
                memory.set(key, bytes, ttl).await;
                Ok(())
            }
            ListCache::Disabled => Ok(()),
        }
    }

    /// Cached JSON page for `key`. Errors count as a miss.
    pub async fn lookup(&self, key: &str) -> Option<Value> {
        let cached: Result<Value, CacheError> = match self.get(key).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).map_err(CacheError::from),
            Ok(None) => return None,
            Err(e) => Err(e),
        };

        match cached {
            Ok(page) => {
                debug!(key = %key, "List cache hit");
                Some(page)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "List cache read failed");
                None
            }
        }
    }

    /// Stores a JSON page, logging instead of failing.
    pub async fn remember(&self, key: &str, page: &Value, ttl: Duration) {
        let result = match serde_json::to_vec(page) {
            Ok(bytes) => self.set(key, bytes, ttl).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(key = %key, error = %e, "List cache write failed");
        }
    }
}

/// `"<entity>-"` followed by the query pairs, sorted by key and
/// url-encoded, so equivalent queries share an entry.
pub fn cache_key(entity: &str, query: &str) -> String {
    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    pairs.sort();

    let normalized = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{entity}-{normalized}")
}

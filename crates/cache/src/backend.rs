//! Cache backends
//!
//! One trait, two implementations: Redis when reachable at startup, an
//! in-process map otherwise. Backend errors never propagate — a failed read
//! is a miss, a failed write is dropped — so cache trouble can only ever
//! cost a redundant analysis.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Entry cap for the in-memory backend
const MEMORY_MAX_ENTRIES: usize = 10_000;

/// Backend statistics, shape varies by backend
#[derive(Debug, Clone, Serialize)]
pub struct BackendStats {
    pub backend: &'static str,
    pub connected: bool,
    pub keys: u64,
    pub hits: Option<u64>,
    pub misses: Option<u64>,
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>);
    async fn delete(&self, key: &str);
    async fn exists(&self, key: &str) -> bool;
    async fn clear(&self);
    async fn stats(&self) -> BackendStats;
}

struct StoredEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Instant::now() > at).unwrap_or(false)
    }
}

/// In-process fallback backend.
///
/// Caps at 10,000 entries and evicts the oldest 10% in insertion order when
/// full, mirroring the external backend's role without its footprint.
pub struct MemoryBackend {
    entries: DashMap<String, StoredEntry>,
    insertion_order: Mutex<VecDeque<String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_capacity(1024),
            insertion_order: Mutex::new(VecDeque::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn evict_oldest(&self) {
        let count = MEMORY_MAX_ENTRIES / 10;
        let mut order = self.insertion_order.lock();
        let mut evicted = 0;
        while evicted < count {
            let Some(key) = order.pop_front() else { break };
            if self.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        debug!(evicted, "memory cache eviction");
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.value.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) {
        if self.entries.len() >= MEMORY_MAX_ENTRIES {
            self.evict_oldest();
        }

        let entry = StoredEntry {
            value: value.clone(),
            expires_at: ttl.map(|t| Instant::now() + t),
        };
        if self.entries.insert(key.to_string(), entry).is_none() {
            self.insertion_order.lock().push_back(key.to_string());
        }
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn exists(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                drop(entry);
                self.entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    async fn clear(&self) {
        self.entries.clear();
        self.insertion_order.lock().clear();
    }

    async fn stats(&self) -> BackendStats {
        BackendStats {
            backend: "memory",
            connected: true,
            keys: self.entries.len() as u64,
            hits: Some(self.hits.load(Ordering::Relaxed)),
            misses: Some(self.misses.load(Ordering::Relaxed)),
        }
    }
}

/// Redis backend over a shared auto-reconnecting connection
pub struct RedisBackend {
    manager: redis::aio::ConnectionManager,
}

impl RedisBackend {
    /// Connect and ping within `timeout`; any failure yields `None` so the
    /// caller can fall back to the in-memory backend.
    pub async fn connect(url: &str, timeout: Duration) -> Option<Self> {
        let connect = async {
            let client = redis::Client::open(url).ok()?;
            let mut manager = client.get_connection_manager().await.ok()?;
            let pong: String = redis::cmd("PING").query_async(&mut manager).await.ok()?;
            (pong == "PONG").then_some(Self { manager })
        };
        match tokio::time::timeout(timeout, connect).await {
            Ok(backend) => backend,
            Err(_) => None,
        }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Option<Value> {
        let mut con = self.manager.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut con)
            .await
            .unwrap_or_else(|e| {
                debug!("redis get failed: {e}");
                None
            });
        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) {
        let Ok(payload) = serde_json::to_string(value) else {
            return;
        };
        let mut con = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(payload);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }
        if let Err(e) = cmd.query_async::<_, ()>(&mut con).await {
            warn!("redis set failed: {e}");
        }
    }

    async fn delete(&self, key: &str) {
        let mut con = self.manager.clone();
        if let Err(e) = redis::cmd("DEL").arg(key).query_async::<_, ()>(&mut con).await {
            debug!("redis del failed: {e}");
        }
    }

    async fn exists(&self, key: &str) -> bool {
        let mut con = self.manager.clone();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut con)
            .await
            .unwrap_or(false)
    }

    async fn clear(&self) {
        let mut con = self.manager.clone();
        if let Err(e) = redis::cmd("FLUSHDB").query_async::<_, ()>(&mut con).await {
            warn!("redis flushdb failed: {e}");
        }
    }

    async fn stats(&self) -> BackendStats {
        let mut con = self.manager.clone();
        let keys: i64 = redis::cmd("DBSIZE").query_async(&mut con).await.unwrap_or(-1);
        BackendStats {
            backend: "redis",
            connected: keys >= 0,
            keys: keys.max(0) as u64,
            hits: None,
            misses: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_roundtrip_and_delete() {
        let backend = MemoryBackend::new();
        backend.set("k1", &json!({"a": 1}), None).await;
        assert_eq!(backend.get("k1").await, Some(json!({"a": 1})));
        assert!(backend.exists("k1").await);

        backend.delete("k1").await;
        assert_eq!(backend.get("k1").await, None);
        assert!(!backend.exists("k1").await);
    }

    #[tokio::test]
    async fn memory_entries_expire() {
        let backend = MemoryBackend::new();
        backend
            .set("short", &json!("v"), Some(Duration::from_millis(10)))
            .await;
        assert!(backend.exists("short").await);

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(backend.get("short").await, None);
    }

    #[tokio::test]
    async fn memory_entry_without_ttl_survives() {
        let backend = MemoryBackend::new();
        backend.set("forever", &json!("v"), None).await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(backend.exists("forever").await);
    }

    #[tokio::test]
    async fn memory_evicts_oldest_tenth_on_overflow() {
        let backend = MemoryBackend::new();
        for i in 0..MEMORY_MAX_ENTRIES {
            backend.set(&format!("key{i}"), &json!(i), None).await;
        }
        assert_eq!(backend.entries.len(), MEMORY_MAX_ENTRIES);

        backend.set("overflow", &json!("v"), None).await;
        let stats = backend.stats().await;
        assert_eq!(stats.keys, (MEMORY_MAX_ENTRIES - MEMORY_MAX_ENTRIES / 10 + 1) as u64);
        // Oldest keys went first
        assert!(!backend.exists("key0").await);
        assert!(backend.exists("overflow").await);
        assert!(backend.exists(&format!("key{}", MEMORY_MAX_ENTRIES - 1)).await);
    }

    #[tokio::test]
    async fn memory_stats_count_hits_and_misses() {
        let backend = MemoryBackend::new();
        backend.set("k", &json!(1), None).await;
        backend.get("k").await;
        backend.get("absent").await;
        let stats = backend.stats().await;
        assert_eq!(stats.hits, Some(1));
        assert_eq!(stats.misses, Some(1));
    }

    #[tokio::test]
    async fn unreachable_redis_yields_none() {
        // Port 9 (discard) refuses connections immediately
        let backend = RedisBackend::connect("redis://127.0.0.1:9/0", Duration::from_millis(200)).await;
        assert!(backend.is_none());
    }
}

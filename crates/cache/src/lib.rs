//! Tiered verdict cache
//!
//! Process-wide K→V store with per-entry TTLs, preferring Redis and falling
//! back to an in-process map chosen once at startup. [`VerdictCache`] layers
//! the key schema and the verdict-driven TTL policy on top of the raw
//! backend.

pub mod backend;
pub mod verdict;

use backend::{BackendStats, CacheBackend, MemoryBackend, RedisBackend};
use phishlens_config::CacheSettings;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

pub use verdict::{ttl_for_verdict, TtlPolicy, VerdictCache};

/// Backend-agnostic cache handle
pub struct Cache {
    backend: Box<dyn CacheBackend>,
}

impl Cache {
    /// Connect to the configured Redis backend, falling back to the
    /// in-process map when it cannot be reached. The choice is made once;
    /// later backend failures degrade per-call, not per-backend.
    pub async fn connect(settings: &CacheSettings) -> Self {
        let url = settings.redis_url();
        match RedisBackend::connect(&url, Duration::from_secs(2)).await {
            Some(redis) => {
                info!("cache connected to redis at {}:{}", settings.redis_host, settings.redis_port);
                Self {
                    backend: Box::new(redis),
                }
            }
            None => {
                warn!("redis unavailable, using in-memory cache");
                Self::in_memory()
            }
        }
    }

    /// Purely in-process cache
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.backend.get(key).await
    }

    pub async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) {
        self.backend.set(key, value, ttl).await;
    }

    pub async fn delete(&self, key: &str) {
        self.backend.delete(key).await;
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.backend.exists(key).await
    }

    pub async fn clear(&self) {
        self.backend.clear().await;
    }

    pub async fn stats(&self) -> BackendStats {
        self.backend.stats().await
    }
}

/// First 16 hex chars of the SHA-256 of `text`
pub fn hash16(text: &str) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, text.as_bytes());
    let mut out = String::with_capacity(16);
    for byte in digest.as_ref() {
        if out.len() >= 16 {
            break;
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(16);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn facade_roundtrip_over_memory() {
        let cache = Cache::in_memory();
        assert_eq!(cache.backend_name(), "memory");

        cache.set("k", &json!({"v": true}), None).await;
        assert_eq!(cache.get("k").await, Some(json!({"v": true})));
        assert!(cache.exists("k").await);

        cache.clear().await;
        assert!(!cache.exists("k").await);
    }

    #[tokio::test]
    async fn connect_falls_back_when_redis_is_down() {
        let mut settings = phishlens_config::Settings::default().cache;
        settings.redis_host = "127.0.0.1".to_string();
        settings.redis_port = 9;
        let cache = Cache::connect(&settings).await;
        assert_eq!(cache.backend_name(), "memory");
    }

    #[test]
    fn hash16_is_stable_and_short() {
        let a = hash16("https://example.com/");
        let b = hash16("https://example.com/");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, hash16("https://example.org/"));
    }
}

//! Link preview cache
//!
//! Capacity-bounded LRU keyed by URL. A long-lived gateway cannot hold
//! previews in an unbounded process-lifetime map, so entries carry a TTL
//! and the least recently used entry goes first when the cap is hit.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::preview::fetch::LinkPreview;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct PreviewCacheConfig {
    /// Maximum entries held
    pub max_entries: usize,
    /// Entry time-to-live
    pub ttl: Duration,
}

impl Default for PreviewCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    preview: LinkPreview,
    cached_at: Instant,
    last_access: Instant,
}

/// Cache statistics snapshot
#[derive(Debug, Clone)]
pub struct PreviewCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded LRU cache for link previews
pub struct PreviewCache {
    entries: DashMap<String, CacheEntry>,
    config: PreviewCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl PreviewCache {
    pub fn new(config: PreviewCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PreviewCacheConfig {
        &self.config
    }

    /// Look up a preview, bumping its recency on hit
    pub fn get(&self, url: &str) -> Option<LinkPreview> {
        let now = Instant::now();
        match self.entries.get_mut(url) {
            Some(mut entry) => {
                if now.duration_since(entry.cached_at) > self.config.ttl {
                    drop(entry);
                    self.entries.remove(url);
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                entry.last_access = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.preview.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a preview, evicting least-recently-used entries past the cap
    pub fn insert(&self, url: &str, preview: LinkPreview) {
        let now = Instant::now();
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                preview,
                cached_at: now,
                last_access: now,
            },
        );
        self.evict_past_cap();
    }

    fn evict_past_cap(&self) {
        let over = self.entries.len().saturating_sub(self.config.max_entries);
        if over == 0 {
            return;
        }

        // Collect keys ordered by recency, oldest first
        let mut by_age: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.last_access))
            .collect();
        by_age.sort_by_key(|(_, at)| *at);

        for (key, _) in by_age.into_iter().take(over) {
            if self.entries.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        debug!(evicted = over, "Preview cache evicted past capacity");
    }

    /// Remove expired entries, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let ttl = self.config.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.cached_at) <= ttl);
        before - self.entries.len()
    }

    pub fn stats(&self) -> PreviewCacheStats {
        PreviewCacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Spawn a background task to periodically prune expired previews
pub fn spawn_cleanup_task(cache: Arc<PreviewCache>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = cache.cleanup();
            if removed > 0 {
                debug!(removed, "Preview cache cleanup");
            }
        }
    });
    info!("Preview cache cleanup task started");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(title: &str) -> LinkPreview {
        LinkPreview {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn small_cache(max_entries: usize) -> PreviewCache {
        PreviewCache::new(PreviewCacheConfig {
            max_entries,
            ttl: Duration::from_secs(60),
        })
    }

    #[test]
    fn hit_and_miss_counting() {
        let cache = small_cache(8);
        assert!(cache.get("https://a.example").is_none());
        cache.insert("https://a.example", preview("A"));
        assert_eq!(
            cache.get("https://a.example").unwrap().title.as_deref(),
            Some("A")
        );

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn capacity_bound_holds_and_oldest_goes_first() {
        let cache = small_cache(2);
        cache.insert("https://a.example", preview("A"));
        std::thread::sleep(Duration::from_millis(5));
        cache.insert("https://b.example", preview("B"));
        std::thread::sleep(Duration::from_millis(5));

        // Touch A so B becomes the least recently used
        assert!(cache.get("https://a.example").is_some());
        std::thread::sleep(Duration::from_millis(5));

        cache.insert("https://c.example", preview("C"));

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.evictions, 1);
        assert!(cache.get("https://a.example").is_some());
        assert!(cache.get("https://b.example").is_none());
        assert!(cache.get("https://c.example").is_some());
    }

    #[test]
    fn expired_entries_are_pruned() {
        let cache = PreviewCache::new(PreviewCacheConfig {
            max_entries: 8,
            ttl: Duration::from_millis(0),
        });
        cache.insert("https://a.example", preview("A"));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get("https://a.example").is_none());

        cache.insert("https://b.example", preview("B"));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.stats().entries, 0);
    }
}

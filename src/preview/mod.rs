//! Link preview service: bounded fetch, Open Graph extraction, LRU cache

pub mod cache;
pub mod fetch;

pub use cache::{spawn_cleanup_task, PreviewCache, PreviewCacheConfig, PreviewCacheStats};
pub use fetch::{extract_preview, LinkPreview, PreviewFetcher};

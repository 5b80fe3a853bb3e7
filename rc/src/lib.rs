//! RecencyCache - bounded, recency-ordered result store
//!
//! A small capability trait ([`Cache`]) plus two independent implementations:
//!
//! - [`NoopCache`] - stores nothing; useful to disable caching without an `Option`
//! - [`LruCache`] - in-memory store that evicts the least recently written entries
//!   once the configured item count or aggregate byte size is exceeded
//!
//! Stores are shared behind `Arc` and use interior mutability, so every method
//! takes `&self`.

mod cache;
mod config;
mod lru;

pub use cache::{Cache, NoopCache};
pub use config::CacheConfig;
pub use lru::{LruCache, Weigher};

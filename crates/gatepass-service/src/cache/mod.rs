//! Caching infrastructure for the service layer.
//!
//! A cache abstraction with a Redis implementation, used read-aside in front
//! of the user repository.

mod cache_interface;
pub mod cache_keys;
mod redis_cache;

pub use cache_interface::{CacheExt, CacheInterface};
pub use redis_cache::{RedisCacheService, DEFAULT_TTL};

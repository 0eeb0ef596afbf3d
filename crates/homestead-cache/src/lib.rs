//! Cache-store abstraction for Homestead
//!
//! The automation engine's derived state (rule projections, cooldown
//! markers, execution-dedupe markers) lives behind the `CacheStore` trait.
//! The cache is a rebuildable projection: losing it degrades fast-path
//! matching until the next rebuild, nothing more.

pub mod error;
pub mod memory_impl;
pub mod redis_impl;
pub mod store;

pub use error::CacheError;
pub use memory_impl::MemoryCache;
pub use redis_impl::RedisCache;
pub use store::CacheStore;

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Keyed item cache with single-flight creation.
//!
//! [`ItemCache`] hands out reference-counted [`CacheRef`] handles to items
//! implementing [`ExpirableItem`]. Concurrent misses for the same key share
//! one creation; misses for different keys never wait on each other because
//! the cache lock only guards the key mapping.

pub mod cache;
pub mod error;

pub use cache::{CacheRef, ExpirableItem, ItemCache};
pub use error::CacheError;

//! Region-keyed concurrent cache.
//!
//! Provides [`RegionCache`], a thread-safe map holding one shared value per
//! AWS region. The client factory uses it to build each regional SDK client
//! once and hand out cheap `Arc` clones afterwards.

use std::sync::Arc;

use dashmap::DashMap;

use crate::types::AwsRegion;

/// Thread-safe, region-keyed cache with compute-if-absent semantics.
///
/// # Examples
///
/// ```
/// use stowage_core::{AwsRegion, RegionCache};
///
/// let cache = RegionCache::<String>::new();
/// let region = AwsRegion::new("eu-west-1");
/// let value = cache.get_or_insert_with(&region, || format!("client for {region}"));
/// assert_eq!(value.as_str(), "client for eu-west-1");
/// ```
#[derive(Debug)]
pub struct RegionCache<T: Send + Sync> {
    inner: DashMap<AwsRegion, Arc<T>>,
}

impl<T: Send + Sync> RegionCache<T> {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Get the value for `region`, building it with `init` on first access.
    ///
    /// The entry lock is held while `init` runs, so concurrent callers for the
    /// same region observe exactly one construction.
    pub fn get_or_insert_with<F>(&self, region: &AwsRegion, init: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        self.inner
            .entry(region.clone())
            .or_insert_with(|| Arc::new(init()))
            .clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T: Send + Sync> Default for RegionCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

// src/cache.rs
use crate::models::ResolvedPrice;
use alloy::primitives::Address;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// (token, block); `Address` is already case-canonical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceCacheKey {
    pub token: Address,
    pub block_number: u64,
}

/// Per-run memo of resolved prices.
///
/// Concurrent lookups of the same key share one in-flight resolution; the
/// map lock is only held to fetch the key's slot, never across an await.
#[derive(Default)]
pub struct PriceCache {
    slots: Mutex<HashMap<PriceCacheKey, Arc<OnceCell<ResolvedPrice>>>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_resolve<F, Fut>(&self, key: PriceCacheKey, resolve: F) -> ResolvedPrice
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResolvedPrice>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(slots.entry(key).or_default())
        };
        slot.get_or_init(resolve).await.clone()
    }

    /// Number of keys seen so far
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

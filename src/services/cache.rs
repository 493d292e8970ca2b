use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::{CacheBackend, CacheKey};
use crate::models::{CacheEntry, Recommendation};

/// A user's generation counter and the number of handles referencing it
#[derive(Debug, Default)]
struct Slot {
    generation: Arc<Mutex<u64>>,
    holders: usize,
}

/// Counted reference to a user's slot
///
/// The slot leaves the map when its last handle drops, so idle users cost
/// nothing. A handle dropped mid-await (cancelled request) still releases.
struct SlotHandle<'a> {
    user_id: String,
    generation: Arc<Mutex<u64>>,
    slots: &'a DashMap<String, Slot>,
}

impl<'a> SlotHandle<'a> {
    fn acquire(slots: &'a DashMap<String, Slot>, user_id: &str) -> Self {
        let mut slot = slots.entry(user_id.to_string()).or_default();
        slot.holders += 1;
        Self {
            user_id: user_id.to_string(),
            generation: Arc::clone(&slot.generation),
            slots,
        }
    }
}

impl Drop for SlotHandle<'_> {
    fn drop(&mut self) {
        if let Entry::Occupied(mut slot) = self.slots.entry(self.user_id.clone()) {
            slot.get_mut().holders -= 1;
            if slot.get().holders == 0 {
                slot.remove();
            }
        }
    }
}

/// Snapshot of a user's cache generation taken before a recompute
///
/// Holding the ticket keeps the user's slot alive until it is redeemed.
pub struct CacheTicket<'a> {
    generation: u64,
    handle: SlotHandle<'a>,
}

/// Exclusive hold on one user's cache slot
pub struct UserSlotGuard<'a> {
    // Released before the handle so the slot is unlocked when it leaves the map
    generation: OwnedMutexGuard<u64>,
    handle: SlotHandle<'a>,
}

/// Recommendation cache in front of the synthesizer
///
/// Every active user owns a slot holding a generation counter behind an async
/// mutex. Reads, writes and invalidations for a user are serialized through
/// that slot; different users never contend. Invalidation bumps the
/// generation so a recompute that started before it cannot store its result
/// afterwards.
///
/// Backend failures are logged and swallowed: a failed read is a miss, a
/// failed write or delete leaves the request outcome untouched.
pub struct RecommendationCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    slots: DashMap<String, Slot>,
}

impl RecommendationCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            slots: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Locks the user's slot until the guard is dropped
    pub async fn lock_user(&self, user_id: &str) -> UserSlotGuard<'_> {
        let handle = SlotHandle::acquire(&self.slots, user_id);
        let generation = Arc::clone(&handle.generation).lock_owned().await;
        UserSlotGuard { generation, handle }
    }

    /// Returns the cached list, or `None` on a miss
    ///
    /// Expired and undecodable entries are evicted and reported as misses.
    pub async fn get(&self, user_id: &str) -> Option<Vec<Recommendation>> {
        let _guard = self.lock_user(user_id).await;
        self.read_entry(user_id).await
    }

    /// Stores a list unconditionally, replacing any existing entry
    pub async fn put(&self, user_id: &str, recommendations: &[Recommendation], ttl: Duration) {
        let _guard = self.lock_user(user_id).await;
        self.write_entry(user_id, recommendations, ttl).await;
    }

    /// Captures the current generation before a recompute
    pub async fn ticket(&self, user_id: &str) -> CacheTicket<'_> {
        let handle = SlotHandle::acquire(&self.slots, user_id);
        let generation = *handle.generation.lock().await;
        CacheTicket { generation, handle }
    }

    /// Stores a recomputed list only if no invalidation happened since `ticket`
    ///
    /// Returns whether the entry was written.
    pub async fn put_if_current(
        &self,
        ticket: &CacheTicket<'_>,
        recommendations: &[Recommendation],
    ) -> bool {
        let user_id = &ticket.handle.user_id;
        let current = ticket.handle.generation.lock().await;
        if *current != ticket.generation {
            tracing::debug!(
                user_id = %user_id,
                "Discarding recomputed recommendations superseded by a newer event"
            );
            return false;
        }
        self.write_entry(user_id, recommendations, self.ttl).await
    }

    /// Removes the user's entry; absent entries are a no-op
    pub async fn invalidate(&self, user_id: &str) {
        let mut guard = self.lock_user(user_id).await;
        self.invalidate_locked(&mut guard).await;
    }

    /// Invalidates while the caller already holds the user's slot
    pub async fn invalidate_locked(&self, guard: &mut UserSlotGuard<'_>) {
        *guard.generation += 1;

        let user_id = &guard.handle.user_id;
        let key = CacheKey::Recommendations(user_id.clone());
        if let Err(e) = self.backend.delete(&key).await {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Failed to invalidate cached recommendations"
            );
        }
    }

    async fn read_entry(&self, user_id: &str) -> Option<Vec<Recommendation>> {
        let key = CacheKey::Recommendations(user_id.to_string());

        let raw = match self.backend.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Evicting undecodable cache entry");
                self.evict(&key).await;
                return None;
            }
        };

        if entry.is_expired(Utc::now()) {
            tracing::debug!(user_id = %user_id, "Evicting expired cache entry");
            self.evict(&key).await;
            return None;
        }

        Some(entry.recommendations)
    }

    async fn write_entry(
        &self,
        user_id: &str,
        recommendations: &[Recommendation],
        ttl: Duration,
    ) -> bool {
        let key = CacheKey::Recommendations(user_id.to_string());
        let entry = CacheEntry::new(recommendations.to_vec(), ttl);

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return false;
            }
        };

        match self.backend.set(&key, json, ttl).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to cache recommendations");
                false
            }
        }
    }

    async fn evict(&self, key: &CacheKey) {
        if let Err(e) = self.backend.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to evict cache entry");
        }
    }
}

use crate::domain_model::UserId;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Per-user read cache with a fixed freshness window.
///
/// Entries older than `ttl` are treated as missing. Callers bypass the cache
/// with `force_refresh` and drop entries after local mutations.
///
/// Every invalidation bumps the user's generation. A fetch only stores its
/// result if the generation it started under is still current, so a read
/// that overlaps a mutation never caches what it saw before the mutation.
pub struct FreshnessCache<V> {
    ttl: Duration,
    slots: DashMap<UserId, Slot<V>>,
}

struct Slot<V> {
    generation: u64,
    cached: Option<(V, Instant)>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Slot {
            generation: 0,
            cached: None,
        }
    }
}

impl<V: Clone> FreshnessCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: DashMap::new(),
        }
    }

    pub fn get(&self, user: UserId) -> Option<V> {
        let slot = self.slots.get(&user)?;
        match &slot.cached {
            Some((value, fetched_at)) if fetched_at.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub fn invalidate(&self, user: UserId) {
        let mut slot = self.slots.entry(user).or_default();
        slot.generation += 1;
        slot.cached = None;
    }

    fn generation(&self, user: UserId) -> u64 {
        self.slots.get(&user).map_or(0, |slot| slot.generation)
    }

    /// Stores `value` unless `user` was invalidated since `generation` was read.
    fn put_if_current(&self, user: UserId, generation: u64, value: V) {
        let mut slot = self.slots.entry(user).or_default();
        if slot.generation == generation {
            slot.cached = Some((value, Instant::now()));
        }
    }

    /// Returns the cached value unless stale or `force_refresh`, otherwise
    /// runs `fetch` and stores its result.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        user: UserId,
        force_refresh: bool,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if !force_refresh {
            if let Some(value) = self.get(user) {
                return Ok(value);
            }
        }

        let generation = self.generation(user);
        let value = fetch().await?;
        self.put_if_current(user, generation, value.clone());
        Ok(value)
    }
}

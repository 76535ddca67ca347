use crate::application_port::FriendshipError;
use crate::domain_model::*;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub(super) struct StoredRequest {
    pub seq: u64,
    pub request: FriendRequest,
}

pub(super) struct StoredEdge {
    pub seq: u64,
    pub edge: FriendshipEdge,
}

#[derive(Default)]
pub(super) struct MemoryState {
    next_seq: u64,
    pub requests: HashMap<FriendRequestId, StoredRequest>,
    // keyed by (owner, friend)
    pub edges: HashMap<(UserId, UserId), StoredEdge>,
    pub profiles: HashMap<UserId, Identity>,
}

impl MemoryState {
    pub fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub fn edge_exists(&self, a: UserId, b: UserId) -> bool {
        self.edges.contains_key(&(a, b))
    }

    pub fn pending_between(&self, a: UserId, b: UserId) -> bool {
        let pair = UserPair::new(a, b);
        self.requests.values().any(|r| {
            r.request.is_pending() && UserPair::new(r.request.sender_id, r.request.receiver_id) == pair
        })
    }
}

/// Process-local backing store shared by the memory adapters. Every adapter
/// call runs its checks and writes under a single lock acquisition.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, FriendshipError> {
        self.state
            .lock()
            .map_err(|e| FriendshipError::Store(format!("memory store poisoned: {e}")))
    }
}

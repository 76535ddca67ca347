use super::store::{MemoryState, MemoryStore, StoredRequest};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;

pub struct MemoryFriendRequestRepo {
    store: Arc<MemoryStore>,
}

impl MemoryFriendRequestRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn pending_newest_first(
        state: &MemoryState,
        keep: impl Fn(&FriendRequest) -> bool,
    ) -> Vec<FriendRequest> {
        let mut rows: Vec<&StoredRequest> = state
            .requests
            .values()
            .filter(|r| r.request.is_pending() && keep(&r.request))
            .collect();
        rows.sort_by(|x, y| {
            y.request
                .created_at
                .cmp(&x.request.created_at)
                .then(y.seq.cmp(&x.seq))
        });
        rows.into_iter().map(|r| r.request.clone()).collect()
    }
}

#[async_trait::async_trait]
impl FriendRequestRepo for MemoryFriendRequestRepo {
    async fn create(
        &self,
        sender: UserId,
        receiver: UserId,
        message: Option<&str>,
    ) -> Result<FriendRequest, FriendshipError> {
        if sender == receiver {
            return Err(FriendshipError::InvalidTarget);
        }

        let mut state = self.store.lock()?;
        if state.edge_exists(sender, receiver) {
            return Err(FriendshipError::AlreadyFriends);
        }
        if state.pending_between(sender, receiver) {
            return Err(FriendshipError::DuplicateRequest);
        }

        let request = FriendRequest {
            id: FriendRequestId(uuid::Uuid::new_v4()),
            sender_id: sender,
            receiver_id: receiver,
            status: FriendRequestStatus::Pending,
            message: message.map(str::to_owned),
            created_at: Utc::now(),
            edge_creation_pending: false,
        };
        let seq = state.next_seq();
        state.requests.insert(
            request.id,
            StoredRequest {
                seq,
                request: request.clone(),
            },
        );

        Ok(request)
    }

    async fn get(
        &self,
        request_id: FriendRequestId,
    ) -> Result<Option<FriendRequest>, FriendshipError> {
        let state = self.store.lock()?;
        Ok(state.requests.get(&request_id).map(|r| r.request.clone()))
    }

    async fn list_received(&self, user: UserId) -> Result<Vec<FriendRequest>, FriendshipError> {
        let state = self.store.lock()?;
        Ok(Self::pending_newest_first(&state, |r| r.receiver_id == user))
    }

    async fn list_sent(&self, user: UserId) -> Result<Vec<FriendRequest>, FriendshipError> {
        let state = self.store.lock()?;
        Ok(Self::pending_newest_first(&state, |r| r.sender_id == user))
    }

    async fn count_pending(&self, user: UserId) -> Result<u64, FriendshipError> {
        let state = self.store.lock()?;
        let count = state
            .requests
            .values()
            .filter(|r| r.request.is_pending() && r.request.receiver_id == user)
            .count();
        Ok(count as u64)
    }

    async fn transition(
        &self,
        request_id: FriendRequestId,
        acting_user: UserId,
        resolution: Resolution,
    ) -> Result<FriendRequest, FriendshipError> {
        let mut state = self.store.lock()?;
        let stored = state
            .requests
            .get_mut(&request_id)
            .ok_or(FriendshipError::NotFound)?;

        if stored.request.receiver_id != acting_user {
            return Err(FriendshipError::Forbidden);
        }
        if !stored.request.is_pending() {
            return Err(FriendshipError::AlreadyProcessed);
        }

        stored.request.status = resolution.into();
        stored.request.edge_creation_pending = resolution == Resolution::Accepted;
        Ok(stored.request.clone())
    }

    async fn settle_edge_creation(&self, a: UserId, b: UserId) -> Result<(), FriendshipError> {
        let mut state = self.store.lock()?;
        for stored in state.requests.values_mut() {
            let r = &mut stored.request;
            if UserPair::new(r.sender_id, r.receiver_id) == UserPair::new(a, b) {
                r.edge_creation_pending = false;
            }
        }
        Ok(())
    }

    async fn cancel(
        &self,
        request_id: FriendRequestId,
        acting_user: UserId,
    ) -> Result<(), FriendshipError> {
        let mut state = self.store.lock()?;
        let stored = state
            .requests
            .get(&request_id)
            .ok_or(FriendshipError::NotFound)?;

        if stored.request.sender_id != acting_user {
            return Err(FriendshipError::Forbidden);
        }
        if !stored.request.is_pending() {
            return Err(FriendshipError::AlreadyProcessed);
        }

        state.requests.remove(&request_id);
        Ok(())
    }
}

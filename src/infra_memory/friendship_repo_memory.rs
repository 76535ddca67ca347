use super::store::{MemoryState, MemoryStore, StoredEdge};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;

pub struct MemoryFriendshipRepo {
    store: Arc<MemoryStore>,
}

impl MemoryFriendshipRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn owner_edges(
        state: &MemoryState,
        owner: UserId,
        status: Option<RelationshipStatus>,
    ) -> Vec<FriendshipEdge> {
        let mut rows: Vec<&StoredEdge> = state
            .edges
            .values()
            .filter(|e| e.edge.owner_id == owner)
            .filter(|e| status.is_none_or(|s| e.edge.relationship_status == s))
            .collect();
        rows.sort_by(|x, y| {
            y.edge
                .created_at
                .cmp(&x.edge.created_at)
                .then(y.seq.cmp(&x.seq))
        });
        rows.into_iter().map(|e| e.edge.clone()).collect()
    }
}

#[async_trait::async_trait]
impl FriendshipRepo for MemoryFriendshipRepo {
    async fn create_edge_pair(&self, a: UserId, b: UserId) -> Result<(), FriendshipError> {
        if a == b {
            return Err(FriendshipError::InvalidTarget);
        }

        let mut state = self.store.lock()?;
        let now = Utc::now();
        let seq = state.next_seq();
        for (owner, friend) in [(a, b), (b, a)] {
            state.edges.entry((owner, friend)).or_insert_with(|| StoredEdge {
                seq,
                edge: FriendshipEdge {
                    owner_id: owner,
                    friend_id: friend,
                    relationship_status: RelationshipStatus::Normal,
                    created_at: now,
                    updated_at: now,
                },
            });
        }

        Ok(())
    }

    async fn remove_edge_pair(&self, a: UserId, b: UserId) -> Result<(), FriendshipError> {
        let mut state = self.store.lock()?;
        state.edges.remove(&(a, b));
        state.edges.remove(&(b, a));
        Ok(())
    }

    async fn list_friends(&self, owner: UserId) -> Result<Vec<FriendshipEdge>, FriendshipError> {
        let state = self.store.lock()?;
        Ok(Self::owner_edges(&state, owner, None))
    }

    async fn list_friends_by_status(
        &self,
        owner: UserId,
        status: RelationshipStatus,
    ) -> Result<Vec<FriendshipEdge>, FriendshipError> {
        let state = self.store.lock()?;
        Ok(Self::owner_edges(&state, owner, Some(status)))
    }

    async fn exists(&self, a: UserId, b: UserId) -> Result<bool, FriendshipError> {
        let state = self.store.lock()?;
        Ok(state.edge_exists(a, b))
    }

    async fn get_status(
        &self,
        owner: UserId,
        friend: UserId,
    ) -> Result<RelationshipStatus, FriendshipError> {
        let state = self.store.lock()?;
        state
            .edges
            .get(&(owner, friend))
            .map(|e| e.edge.relationship_status)
            .ok_or(FriendshipError::NotFound)
    }

    async fn set_status(
        &self,
        owner: UserId,
        friend: UserId,
        status: RelationshipStatus,
    ) -> Result<(), FriendshipError> {
        let mut state = self.store.lock()?;
        let stored = state
            .edges
            .get_mut(&(owner, friend))
            .ok_or(FriendshipError::NotFound)?;
        stored.edge.relationship_status = status;
        stored.edge.updated_at = Utc::now();
        Ok(())
    }
}

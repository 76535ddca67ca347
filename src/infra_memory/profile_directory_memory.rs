use super::store::MemoryStore;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

pub struct MemoryProfileDirectory {
    store: Arc<MemoryStore>,
}

impl MemoryProfileDirectory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Seeds or replaces a profile. Profiles are owned by the profile
    /// collaborator; this exists for the fake backend and tests.
    pub fn upsert(&self, identity: Identity) -> Result<(), FriendshipError> {
        let mut state = self.store.lock()?;
        state.profiles.insert(identity.id, identity);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileDirectory for MemoryProfileDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>, FriendshipError> {
        let state = self.store.lock()?;
        Ok(state.profiles.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<Identity>, FriendshipError> {
        let state = self.store.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }

    async fn search_by_username(
        &self,
        substring: &str,
        exclude: UserId,
        limit: u16,
    ) -> Result<Vec<Identity>, FriendshipError> {
        let needle = substring.to_lowercase();
        let state = self.store.lock()?;
        let mut hits: Vec<Identity> = state
            .profiles
            .values()
            .filter(|p| p.id != exclude && p.username.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        hits.sort_by(|x, y| x.username.cmp(&y.username));
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn find_by_user_code(
        &self,
        code: &UserCode,
    ) -> Result<Option<Identity>, FriendshipError> {
        let state = self.store.lock()?;
        Ok(state
            .profiles
            .values()
            .find(|p| UserCode::from_user_id(p.id) == *code)
            .cloned())
    }
}

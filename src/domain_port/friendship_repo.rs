use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait FriendshipRepo: Send + Sync {
    /// Writes both directed halves at once. Existing halves are left as-is.
    async fn create_edge_pair(&self, a: UserId, b: UserId) -> Result<(), FriendshipError>;

    /// Deletes both directed halves at once. Absent pairs are a no-op.
    async fn remove_edge_pair(&self, a: UserId, b: UserId) -> Result<(), FriendshipError>;

    async fn list_friends(&self, owner: UserId) -> Result<Vec<FriendshipEdge>, FriendshipError>;

    async fn list_friends_by_status(
        &self,
        owner: UserId,
        status: RelationshipStatus,
    ) -> Result<Vec<FriendshipEdge>, FriendshipError>;

    async fn exists(&self, a: UserId, b: UserId) -> Result<bool, FriendshipError>;

    async fn get_status(
        &self,
        owner: UserId,
        friend: UserId,
    ) -> Result<RelationshipStatus, FriendshipError>;

    /// Touches the `owner -> friend` half only.
    async fn set_status(
        &self,
        owner: UserId,
        friend: UserId,
        status: RelationshipStatus,
    ) -> Result<(), FriendshipError>;
}

use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait FriendRequestRepo: Send + Sync {
    /// Inserts a new pending request after checking self-target, existing
    /// friendship and pending duplicates (either direction).
    async fn create(
        &self,
        sender: UserId,
        receiver: UserId,
        message: Option<&str>,
    ) -> Result<FriendRequest, FriendshipError>;

    async fn get(&self, request_id: FriendRequestId)
    -> Result<Option<FriendRequest>, FriendshipError>;

    /// Pending requests addressed to `user`, newest first.
    async fn list_received(&self, user: UserId) -> Result<Vec<FriendRequest>, FriendshipError>;

    /// Pending requests sent by `user`, newest first.
    async fn list_sent(&self, user: UserId) -> Result<Vec<FriendRequest>, FriendshipError>;

    async fn count_pending(&self, user: UserId) -> Result<u64, FriendshipError>;

    /// Moves a pending request to its terminal state. Only the receiver may
    /// do so, and only the first of several concurrent callers succeeds.
    async fn transition(
        &self,
        request_id: FriendRequestId,
        acting_user: UserId,
        resolution: Resolution,
    ) -> Result<FriendRequest, FriendshipError>;

    /// Clears `edge_creation_pending` on every request between `a` and `b`,
    /// in either direction. Called once the edge pair exists or is removed.
    async fn settle_edge_creation(&self, a: UserId, b: UserId) -> Result<(), FriendshipError>;

    /// Deletes a pending request on behalf of its sender.
    async fn cancel(
        &self,
        request_id: FriendRequestId,
        acting_user: UserId,
    ) -> Result<(), FriendshipError>;
}

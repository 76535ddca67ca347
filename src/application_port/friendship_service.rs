use crate::domain_model::*;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum FriendshipError {
    #[error("cannot send a friend request to yourself")]
    InvalidTarget,
    #[error("a pending friend request already exists for this pair")]
    DuplicateRequest,
    #[error("friendship already established")]
    AlreadyFriends,
    #[error("not found")]
    NotFound,
    #[error("permission denied")]
    Forbidden,
    #[error("friend request already processed")]
    AlreadyProcessed,
    #[error("request {request_id} accepted but friendship not created: {reason}")]
    PartialAcceptFailure {
        request_id: FriendRequestId,
        /// Receiver's requested status, still to be applied by a retry.
        status: Option<RelationshipStatus>,
        reason: String,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store error: {0}")]
    Store(String),
}

/// Friends list plus received-pending count, loaded together.
#[derive(Debug, Clone, Serialize)]
pub struct FriendsOverview {
    pub friends: Vec<FriendSummary>,
    pub pending_count: u64,
}

#[async_trait::async_trait]
pub trait FriendshipService: Send + Sync {
    // region requests
    async fn send_friend_request(
        &self,
        sender: UserId,
        receiver: UserId,
        message: Option<&str>,
    ) -> Result<FriendRequest, FriendshipError>;
    async fn accept_friend_request(
        &self,
        request_id: FriendRequestId,
        receiver: UserId,
    ) -> Result<FriendRequest, FriendshipError>;
    async fn accept_friend_request_with_status(
        &self,
        request_id: FriendRequestId,
        receiver: UserId,
        status: RelationshipStatus,
    ) -> Result<FriendRequest, FriendshipError>;
    /// Completes an accept that failed with `PartialAcceptFailure`. Refused
    /// once the edge pair was created or the friendship was removed.
    async fn retry_edge_creation(
        &self,
        request_id: FriendRequestId,
        acting_user: UserId,
        status: Option<RelationshipStatus>,
    ) -> Result<(), FriendshipError>;
    async fn reject_friend_request(
        &self,
        request_id: FriendRequestId,
        receiver: UserId,
    ) -> Result<(), FriendshipError>;
    async fn cancel_friend_request(
        &self,
        request_id: FriendRequestId,
        sender: UserId,
    ) -> Result<(), FriendshipError>;
    async fn list_received(
        &self,
        user: UserId,
        force_refresh: bool,
    ) -> Result<Vec<FriendRequest>, FriendshipError>;
    async fn list_sent(
        &self,
        user: UserId,
        force_refresh: bool,
    ) -> Result<Vec<FriendRequest>, FriendshipError>;
    async fn count_pending(&self, user: UserId, force_refresh: bool)
    -> Result<u64, FriendshipError>;
    // endregion

    // region friends
    async fn remove_friend(&self, user: UserId, friend: UserId) -> Result<(), FriendshipError>;
    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, FriendshipError>;
    async fn list_friends(
        &self,
        user: UserId,
        force_refresh: bool,
    ) -> Result<Vec<FriendSummary>, FriendshipError>;
    async fn list_friends_by_status(
        &self,
        user: UserId,
        status: RelationshipStatus,
        force_refresh: bool,
    ) -> Result<Vec<FriendSummary>, FriendshipError>;
    async fn overview(
        &self,
        user: UserId,
        force_refresh: bool,
    ) -> Result<FriendsOverview, FriendshipError>;
    async fn get_friendship_status(
        &self,
        owner: UserId,
        friend: UserId,
    ) -> Result<RelationshipStatus, FriendshipError>;
    async fn set_friendship_status(
        &self,
        owner: UserId,
        friend: UserId,
        status: RelationshipStatus,
    ) -> Result<(), FriendshipError>;
    // endregion

    // region discovery
    async fn search_candidates(
        &self,
        query: &str,
        exclude: UserId,
    ) -> Result<Vec<Identity>, FriendshipError>;
    async fn find_by_user_code(
        &self,
        code: &str,
        exclude: UserId,
    ) -> Result<Option<Identity>, FriendshipError>;
    // endregion
}

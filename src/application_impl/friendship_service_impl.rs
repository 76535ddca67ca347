use super::freshness_cache::FreshnessCache;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Queries shorter than this never reach the profile directory.
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct FriendshipServiceConfig {
    pub cache_ttl: Duration,
    pub search_limit: u16,
}

impl Default for FriendshipServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            search_limit: 10,
        }
    }
}

pub struct RealFriendshipService {
    request_repo: Arc<dyn FriendRequestRepo>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    profile_directory: Arc<dyn ProfileDirectory>,
    search_limit: u16,
    friends_cache: FreshnessCache<Vec<FriendSummary>>,
    received_cache: FreshnessCache<Vec<FriendRequest>>,
    sent_cache: FreshnessCache<Vec<FriendRequest>>,
    pending_cache: FreshnessCache<u64>,
}

impl RealFriendshipService {
    pub fn new(
        request_repo: Arc<dyn FriendRequestRepo>,
        friendship_repo: Arc<dyn FriendshipRepo>,
        profile_directory: Arc<dyn ProfileDirectory>,
        config: FriendshipServiceConfig,
    ) -> Self {
        Self {
            request_repo,
            friendship_repo,
            profile_directory,
            search_limit: config.search_limit,
            friends_cache: FreshnessCache::new(config.cache_ttl),
            received_cache: FreshnessCache::new(config.cache_ttl),
            sent_cache: FreshnessCache::new(config.cache_ttl),
            pending_cache: FreshnessCache::new(config.cache_ttl),
        }
    }

    fn normalize_message(message: Option<&str>) -> Option<&str> {
        message.map(str::trim).filter(|m| !m.is_empty())
    }

    /// Drops every cached read a request between these users may appear in.
    fn invalidate_request_views(&self, sender: UserId, receiver: UserId) {
        self.sent_cache.invalidate(sender);
        self.received_cache.invalidate(receiver);
        self.pending_cache.invalidate(receiver);
    }

    fn invalidate_friend_views(&self, a: UserId, b: UserId) {
        self.friends_cache.invalidate(a);
        self.friends_cache.invalidate(b);
    }

    async fn summarize(
        &self,
        edges: Vec<FriendshipEdge>,
    ) -> Result<Vec<FriendSummary>, FriendshipError> {
        let ids: Vec<UserId> = edges.iter().map(|e| e.friend_id).collect();
        let mut profiles: HashMap<UserId, Identity> = self
            .profile_directory
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut out = Vec::with_capacity(edges.len());
        for edge in edges {
            match profiles.remove(&edge.friend_id) {
                Some(friend) => out.push(FriendSummary {
                    friend,
                    relationship_status: edge.relationship_status,
                    since: edge.created_at,
                }),
                None => warn!(
                    owner = %edge.owner_id,
                    friend = %edge.friend_id,
                    "friendship points at a missing profile, skipped"
                ),
            }
        }
        Ok(out)
    }

    async fn accept(
        &self,
        request_id: FriendRequestId,
        receiver: UserId,
        status: Option<RelationshipStatus>,
    ) -> Result<FriendRequest, FriendshipError> {
        let mut request = self
            .request_repo
            .transition(request_id, receiver, Resolution::Accepted)
            .await?;
        self.invalidate_request_views(request.sender_id, request.receiver_id);

        self.complete_edge_creation(&request, status).await?;
        request.edge_creation_pending = false;

        info!(%request_id, sender = %request.sender_id, %receiver, "friend request accepted");
        Ok(request)
    }

    /// Creates the edge pair of an accepted request, applies the receiver's
    /// status and settles the request. Any failure leaves the request
    /// retryable and is reported as `PartialAcceptFailure`.
    async fn complete_edge_creation(
        &self,
        request: &FriendRequest,
        status: Option<RelationshipStatus>,
    ) -> Result<(), FriendshipError> {
        let (sender, receiver) = (request.sender_id, request.receiver_id);
        let partial = |e: FriendshipError| {
            warn!(request_id = %request.id, "friend request accepted but not completed: {e}");
            FriendshipError::PartialAcceptFailure {
                request_id: request.id,
                status,
                reason: e.to_string(),
            }
        };

        self.friendship_repo
            .create_edge_pair(sender, receiver)
            .await
            .map_err(partial)?;
        self.invalidate_friend_views(sender, receiver);

        if let Some(status) = status {
            // receiver's half only; the sender keeps the default status
            self.friendship_repo
                .set_status(receiver, sender, status)
                .await
                .map_err(partial)?;
            self.friends_cache.invalidate(receiver);
        }

        if let Err(e) = self.request_repo.settle_edge_creation(sender, receiver).await {
            warn!(request_id = %request.id, "edge pair created but request left unsettled: {e}");
        }
        Ok(())
    }

    async fn fetch_friends(&self, user: UserId) -> Result<Vec<FriendSummary>, FriendshipError> {
        let edges = self.friendship_repo.list_friends(user).await?;
        self.summarize(edges).await
    }
}

#[async_trait::async_trait]
impl FriendshipService for RealFriendshipService {
    async fn send_friend_request(
        &self,
        sender: UserId,
        receiver: UserId,
        message: Option<&str>,
    ) -> Result<FriendRequest, FriendshipError> {
        if sender == receiver {
            return Err(FriendshipError::InvalidTarget);
        }
        let message = Self::normalize_message(message);
        if self.profile_directory.find_by_id(receiver).await?.is_none() {
            return Err(FriendshipError::NotFound);
        }

        let request = self.request_repo.create(sender, receiver, message).await?;
        self.invalidate_request_views(sender, receiver);

        info!(request_id = %request.id, %sender, %receiver, "friend request sent");
        Ok(request)
    }

    async fn accept_friend_request(
        &self,
        request_id: FriendRequestId,
        receiver: UserId,
    ) -> Result<FriendRequest, FriendshipError> {
        self.accept(request_id, receiver, None).await
    }

    async fn accept_friend_request_with_status(
        &self,
        request_id: FriendRequestId,
        receiver: UserId,
        status: RelationshipStatus,
    ) -> Result<FriendRequest, FriendshipError> {
        self.accept(request_id, receiver, Some(status)).await
    }

    async fn retry_edge_creation(
        &self,
        request_id: FriendRequestId,
        acting_user: UserId,
        status: Option<RelationshipStatus>,
    ) -> Result<(), FriendshipError> {
        let request = self
            .request_repo
            .get(request_id)
            .await?
            .ok_or(FriendshipError::NotFound)?;

        if request.counterpart_of(acting_user).is_none() {
            return Err(FriendshipError::Forbidden);
        }
        if request.status != FriendRequestStatus::Accepted {
            return Err(FriendshipError::InvalidInput(format!(
                "friend request is {}, not accepted",
                request.status
            )));
        }
        // settled by a completed accept, an earlier retry or a removal
        if !request.edge_creation_pending {
            return Err(FriendshipError::AlreadyProcessed);
        }
        // the status belongs to the receiver's half
        if status.is_some() && acting_user != request.receiver_id {
            return Err(FriendshipError::Forbidden);
        }

        self.complete_edge_creation(&request, status).await?;

        info!(%request_id, %acting_user, "friendship edge creation retried");
        Ok(())
    }

    async fn reject_friend_request(
        &self,
        request_id: FriendRequestId,
        receiver: UserId,
    ) -> Result<(), FriendshipError> {
        let request = self
            .request_repo
            .transition(request_id, receiver, Resolution::Rejected)
            .await?;
        self.invalidate_request_views(request.sender_id, request.receiver_id);

        info!(%request_id, sender = %request.sender_id, %receiver, "friend request rejected");
        Ok(())
    }

    async fn cancel_friend_request(
        &self,
        request_id: FriendRequestId,
        sender: UserId,
    ) -> Result<(), FriendshipError> {
        let receiver = self
            .request_repo
            .get(request_id)
            .await?
            .map(|r| r.receiver_id);

        self.request_repo.cancel(request_id, sender).await?;
        self.sent_cache.invalidate(sender);
        if let Some(receiver) = receiver {
            self.invalidate_request_views(sender, receiver);
        }

        info!(%request_id, %sender, "friend request cancelled");
        Ok(())
    }

    async fn list_received(
        &self,
        user: UserId,
        force_refresh: bool,
    ) -> Result<Vec<FriendRequest>, FriendshipError> {
        self.received_cache
            .get_or_fetch(user, force_refresh, || self.request_repo.list_received(user))
            .await
    }

    async fn list_sent(
        &self,
        user: UserId,
        force_refresh: bool,
    ) -> Result<Vec<FriendRequest>, FriendshipError> {
        self.sent_cache
            .get_or_fetch(user, force_refresh, || self.request_repo.list_sent(user))
            .await
    }

    async fn count_pending(
        &self,
        user: UserId,
        force_refresh: bool,
    ) -> Result<u64, FriendshipError> {
        self.pending_cache
            .get_or_fetch(user, force_refresh, || self.request_repo.count_pending(user))
            .await
    }

    async fn remove_friend(&self, user: UserId, friend: UserId) -> Result<(), FriendshipError> {
        // an outstanding accept between the pair must not bring the edges back
        self.request_repo.settle_edge_creation(user, friend).await?;
        self.friendship_repo.remove_edge_pair(user, friend).await?;
        self.invalidate_friend_views(user, friend);

        info!(%user, %friend, "friend removed");
        Ok(())
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, FriendshipError> {
        self.friendship_repo.exists(a, b).await
    }

    async fn list_friends(
        &self,
        user: UserId,
        force_refresh: bool,
    ) -> Result<Vec<FriendSummary>, FriendshipError> {
        self.friends_cache
            .get_or_fetch(user, force_refresh, || self.fetch_friends(user))
            .await
    }

    async fn list_friends_by_status(
        &self,
        user: UserId,
        status: RelationshipStatus,
        force_refresh: bool,
    ) -> Result<Vec<FriendSummary>, FriendshipError> {
        if !force_refresh {
            if let Some(all) = self.friends_cache.get(user) {
                return Ok(all
                    .into_iter()
                    .filter(|f| f.relationship_status == status)
                    .collect());
            }
        }

        let edges = self
            .friendship_repo
            .list_friends_by_status(user, status)
            .await?;
        self.summarize(edges).await
    }

    async fn overview(
        &self,
        user: UserId,
        force_refresh: bool,
    ) -> Result<FriendsOverview, FriendshipError> {
        let (friends, pending_count) = futures_util::try_join!(
            self.list_friends(user, force_refresh),
            self.count_pending(user, force_refresh),
        )?;

        Ok(FriendsOverview {
            friends,
            pending_count,
        })
    }

    async fn get_friendship_status(
        &self,
        owner: UserId,
        friend: UserId,
    ) -> Result<RelationshipStatus, FriendshipError> {
        self.friendship_repo.get_status(owner, friend).await
    }

    async fn set_friendship_status(
        &self,
        owner: UserId,
        friend: UserId,
        status: RelationshipStatus,
    ) -> Result<(), FriendshipError> {
        self.friendship_repo.set_status(owner, friend, status).await?;
        self.friends_cache.invalidate(owner);

        info!(%owner, %friend, %status, "relationship status changed");
        Ok(())
    }

    async fn search_candidates(
        &self,
        query: &str,
        exclude: UserId,
    ) -> Result<Vec<Identity>, FriendshipError> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            return Ok(Vec::new());
        }

        self.profile_directory
            .search_by_username(query, exclude, self.search_limit)
            .await
    }

    async fn find_by_user_code(
        &self,
        code: &str,
        exclude: UserId,
    ) -> Result<Option<Identity>, FriendshipError> {
        let code = match code.parse::<UserCode>() {
            Ok(code) => code,
            Err(e) => {
                debug!("ignoring malformed user code {code:?}: {e}");
                return Ok(None);
            }
        };

        let found = self.profile_directory.find_by_user_code(&code).await?;
        Ok(found.filter(|identity| identity.id != exclude))
    }
}

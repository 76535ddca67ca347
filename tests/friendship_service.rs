use harmony::application_impl::*;
use harmony::application_port::*;
use harmony::domain_model::*;
use harmony::domain_port::*;
use harmony::infra_memory::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Memory friendship store whose edge creation can be switched off and whose
/// next friends listing can be held after it has read the store.
struct FlakyFriendshipRepo {
    inner: MemoryFriendshipRepo,
    fail_edges: AtomicBool,
    hold_next_read: AtomicBool,
    read_done: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl FriendshipRepo for FlakyFriendshipRepo {
    async fn create_edge_pair(&self, a: UserId, b: UserId) -> Result<(), FriendshipError> {
        if self.fail_edges.load(Ordering::SeqCst) {
            return Err(FriendshipError::Store("connection reset".to_string()));
        }
        self.inner.create_edge_pair(a, b).await
    }

    async fn remove_edge_pair(&self, a: UserId, b: UserId) -> Result<(), FriendshipError> {
        self.inner.remove_edge_pair(a, b).await
    }

    async fn list_friends(&self, owner: UserId) -> Result<Vec<FriendshipEdge>, FriendshipError> {
        let edges = self.inner.list_friends(owner).await;
        if self.hold_next_read.swap(false, Ordering::SeqCst) {
            self.read_done.notify_one();
            self.release.notified().await;
        }
        edges
    }

    async fn list_friends_by_status(
        &self,
        owner: UserId,
        status: RelationshipStatus,
    ) -> Result<Vec<FriendshipEdge>, FriendshipError> {
        self.inner.list_friends_by_status(owner, status).await
    }

    async fn exists(&self, owner: UserId, friend: UserId) -> Result<bool, FriendshipError> {
        self.inner.exists(owner, friend).await
    }

    async fn get_status(
        &self,
        owner: UserId,
        friend: UserId,
    ) -> Result<RelationshipStatus, FriendshipError> {
        self.inner.get_status(owner, friend).await
    }

    async fn set_status(
        &self,
        owner: UserId,
        friend: UserId,
        status: RelationshipStatus,
    ) -> Result<(), FriendshipError> {
        self.inner.set_status(owner, friend, status).await
    }
}

struct Fixture {
    service: RealFriendshipService,
    requests: Arc<MemoryFriendRequestRepo>,
    friendships: Arc<FlakyFriendshipRepo>,
    directory: Arc<MemoryProfileDirectory>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(FriendshipServiceConfig::default())
    }

    fn with_config(config: FriendshipServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let requests = Arc::new(MemoryFriendRequestRepo::new(store.clone()));
        let friendships = Arc::new(FlakyFriendshipRepo {
            inner: MemoryFriendshipRepo::new(store.clone()),
            fail_edges: AtomicBool::new(false),
            hold_next_read: AtomicBool::new(false),
            read_done: Notify::new(),
            release: Notify::new(),
        });
        let directory = Arc::new(MemoryProfileDirectory::new(store));
        let service = RealFriendshipService::new(
            requests.clone(),
            friendships.clone(),
            directory.clone(),
            config,
        );
        Self {
            service,
            requests,
            friendships,
            directory,
        }
    }

    fn user(&self, username: &str) -> UserId {
        let id = fake_id(username);
        self.directory
            .upsert(Identity {
                id,
                name: username.to_uppercase(),
                username: username.to_string(),
                avatar_url: None,
            })
            .unwrap();
        id
    }

    async fn friends(&self, a: UserId, b: UserId) {
        let request = self.service.send_friend_request(a, b, None).await.unwrap();
        self.service
            .accept_friend_request(request.id, b)
            .await
            .unwrap();
    }
}

fn friend_ids(friends: &[FriendSummary]) -> Vec<UserId> {
    friends.iter().map(|f| f.friend.id).collect()
}

// region scenarios

#[tokio::test]
async fn accepted_request_creates_both_edges() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    let request = fx.service.send_friend_request(a, b, Some("hi")).await.unwrap();
    assert_eq!(request.message.as_deref(), Some("hi"));
    assert_eq!(request.status, FriendRequestStatus::Pending);

    let accepted = fx.service.accept_friend_request(request.id, b).await.unwrap();
    assert_eq!(accepted.status, FriendRequestStatus::Accepted);
    assert!(!accepted.edge_creation_pending);
    let stored = fx.requests.get(request.id).await.unwrap().unwrap();
    assert!(!stored.edge_creation_pending);

    assert!(fx.service.are_friends(a, b).await.unwrap());
    assert!(fx.service.are_friends(b, a).await.unwrap());

    let of_a = fx.service.list_friends(a, false).await.unwrap();
    let of_b = fx.service.list_friends(b, false).await.unwrap();
    assert_eq!(friend_ids(&of_a), vec![b]);
    assert_eq!(friend_ids(&of_b), vec![a]);
    assert_eq!(of_a[0].relationship_status, RelationshipStatus::Normal);
    assert_eq!(of_b[0].relationship_status, RelationshipStatus::Normal);
    assert_eq!(of_a[0].friend.username, "bob");
}

#[tokio::test]
async fn rejected_request_leaves_no_edge_and_allows_resend() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    let request = fx.service.send_friend_request(a, b, None).await.unwrap();
    fx.service.reject_friend_request(request.id, b).await.unwrap();

    assert!(!fx.service.are_friends(a, b).await.unwrap());
    assert!(fx.service.list_received(b, false).await.unwrap().is_empty());
    assert_eq!(
        fx.requests.get(request.id).await.unwrap().unwrap().status,
        FriendRequestStatus::Rejected
    );

    fx.service.send_friend_request(a, b, None).await.unwrap();
}

#[tokio::test]
async fn status_change_is_one_sided() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));
    fx.friends(a, b).await;

    fx.service
        .set_friendship_status(b, a, RelationshipStatus::Blocked)
        .await
        .unwrap();

    let of_b = fx.service.list_friends(b, false).await.unwrap();
    let of_a = fx.service.list_friends(a, false).await.unwrap();
    assert_eq!(of_b[0].relationship_status, RelationshipStatus::Blocked);
    assert_eq!(of_a[0].relationship_status, RelationshipStatus::Normal);

    // symmetry of existence survives the status change
    assert!(fx.service.are_friends(a, b).await.unwrap());
    assert!(fx.service.are_friends(b, a).await.unwrap());
}

#[tokio::test]
async fn cancelled_request_disappears_and_allows_resend() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    let request = fx.service.send_friend_request(a, b, None).await.unwrap();
    assert_eq!(fx.service.list_received(b, false).await.unwrap().len(), 1);
    assert_eq!(fx.service.list_sent(a, false).await.unwrap().len(), 1);

    fx.service.cancel_friend_request(request.id, a).await.unwrap();

    assert!(fx.service.list_received(b, false).await.unwrap().is_empty());
    assert!(fx.service.list_sent(a, false).await.unwrap().is_empty());
    fx.service.send_friend_request(a, b, None).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_accepts_resolve_once() {
    let fx = Arc::new(Fixture::new());
    let (a, b) = (fx.user("alice"), fx.user("bob"));
    let request = fx.service.send_friend_request(a, b, None).await.unwrap();

    let first = tokio::spawn({
        let fx = fx.clone();
        async move { fx.service.accept_friend_request(request.id, b).await }
    });
    let second = tokio::spawn({
        let fx = fx.clone();
        async move { fx.service.accept_friend_request(request.id, b).await }
    });
    let outcomes = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(FriendshipError::AlreadyProcessed)))
    );
    assert!(fx.service.are_friends(a, b).await.unwrap());
}

// endregion

// region properties

#[tokio::test]
async fn self_requests_are_invalid() {
    let fx = Fixture::new();
    let a = fx.user("alice");

    assert!(matches!(
        fx.service.send_friend_request(a, a, None).await,
        Err(FriendshipError::InvalidTarget)
    ));
}

#[tokio::test]
async fn one_pending_request_per_pair_in_either_direction() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    fx.service.send_friend_request(a, b, None).await.unwrap();
    assert!(matches!(
        fx.service.send_friend_request(a, b, None).await,
        Err(FriendshipError::DuplicateRequest)
    ));
    assert!(matches!(
        fx.service.send_friend_request(b, a, None).await,
        Err(FriendshipError::DuplicateRequest)
    ));
}

#[tokio::test]
async fn requests_between_friends_are_refused() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));
    fx.friends(a, b).await;

    assert!(matches!(
        fx.service.send_friend_request(b, a, None).await,
        Err(FriendshipError::AlreadyFriends)
    ));
}

#[tokio::test]
async fn unknown_receivers_are_not_found() {
    let fx = Fixture::new();
    let a = fx.user("alice");

    assert!(matches!(
        fx.service.send_friend_request(a, fake_id("ghost"), None).await,
        Err(FriendshipError::NotFound)
    ));
}

#[tokio::test]
async fn messages_are_trimmed_but_not_capped() {
    let fx = Fixture::new();
    let (a, b, c, d) = (
        fx.user("alice"),
        fx.user("bob"),
        fx.user("carol"),
        fx.user("dave"),
    );

    let blank = fx.service.send_friend_request(a, b, Some("   ")).await.unwrap();
    assert_eq!(blank.message, None);

    let padded = fx
        .service
        .send_friend_request(a, c, Some("  hello  "))
        .await
        .unwrap();
    assert_eq!(padded.message.as_deref(), Some("hello"));

    let long = "x".repeat(2000);
    let request = fx
        .service
        .send_friend_request(a, d, Some(&long))
        .await
        .unwrap();
    assert_eq!(request.message.as_deref(), Some(long.as_str()));
}

#[tokio::test]
async fn removal_is_symmetric_and_idempotent() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));
    fx.friends(a, b).await;

    fx.service.remove_friend(a, b).await.unwrap();
    assert!(!fx.service.are_friends(a, b).await.unwrap());
    assert!(!fx.service.are_friends(b, a).await.unwrap());

    fx.service.remove_friend(a, b).await.unwrap();
    fx.service.remove_friend(b, a).await.unwrap();
    assert!(fx.service.list_friends(b, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn resolved_requests_are_terminal() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    let request = fx.service.send_friend_request(a, b, None).await.unwrap();
    fx.service.reject_friend_request(request.id, b).await.unwrap();

    assert!(matches!(
        fx.service.accept_friend_request(request.id, b).await,
        Err(FriendshipError::AlreadyProcessed)
    ));
    assert!(matches!(
        fx.service.reject_friend_request(request.id, b).await,
        Err(FriendshipError::AlreadyProcessed)
    ));
    assert!(matches!(
        fx.service.cancel_friend_request(request.id, a).await,
        Err(FriendshipError::AlreadyProcessed)
    ));
}

#[tokio::test]
async fn only_the_receiver_resolves_and_only_the_sender_cancels() {
    let fx = Fixture::new();
    let (a, b, c) = (fx.user("alice"), fx.user("bob"), fx.user("carol"));

    let request = fx.service.send_friend_request(a, b, None).await.unwrap();

    for intruder in [a, c] {
        assert!(matches!(
            fx.service.accept_friend_request(request.id, intruder).await,
            Err(FriendshipError::Forbidden)
        ));
        assert!(matches!(
            fx.service.reject_friend_request(request.id, intruder).await,
            Err(FriendshipError::Forbidden)
        ));
    }
    for intruder in [b, c] {
        assert!(matches!(
            fx.service.cancel_friend_request(request.id, intruder).await,
            Err(FriendshipError::Forbidden)
        ));
    }

    let missing = FriendRequestId(uuid::Uuid::new_v4());
    assert!(matches!(
        fx.service.accept_friend_request(missing, b).await,
        Err(FriendshipError::NotFound)
    ));
    assert!(fx.requests.get(request.id).await.unwrap().unwrap().is_pending());
}

// endregion

// region accept with status

#[tokio::test]
async fn accept_with_status_sets_only_the_receivers_edge() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    let request = fx.service.send_friend_request(a, b, None).await.unwrap();
    fx.service
        .accept_friend_request_with_status(request.id, b, RelationshipStatus::Close)
        .await
        .unwrap();

    assert_eq!(
        fx.service.get_friendship_status(b, a).await.unwrap(),
        RelationshipStatus::Close
    );
    assert_eq!(
        fx.service.get_friendship_status(a, b).await.unwrap(),
        RelationshipStatus::Normal
    );

    let close = fx
        .service
        .list_friends_by_status(b, RelationshipStatus::Close, false)
        .await
        .unwrap();
    assert_eq!(friend_ids(&close), vec![a]);
    assert!(
        fx.service
            .list_friends_by_status(a, RelationshipStatus::Close, true)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn status_of_strangers_is_not_found() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    assert!(matches!(
        fx.service.get_friendship_status(a, b).await,
        Err(FriendshipError::NotFound)
    ));
    assert!(matches!(
        fx.service
            .set_friendship_status(a, b, RelationshipStatus::Close)
            .await,
        Err(FriendshipError::NotFound)
    ));
}

// endregion

// region partial accept

#[tokio::test]
async fn failed_edge_creation_is_reported_and_retryable_once() {
    let fx = Fixture::new();
    let (a, b, c) = (fx.user("alice"), fx.user("bob"), fx.user("carol"));
    let request = fx.service.send_friend_request(a, b, None).await.unwrap();

    fx.friendships.fail_edges.store(true, Ordering::SeqCst);
    match fx.service.accept_friend_request(request.id, b).await {
        Err(FriendshipError::PartialAcceptFailure {
            request_id, status, ..
        }) => {
            assert_eq!(request_id, request.id);
            assert_eq!(status, None);
        }
        other => panic!("expected partial accept failure, got {other:?}"),
    }

    // the request stays accepted; accepting again is not the way out
    assert!(!fx.service.are_friends(a, b).await.unwrap());
    assert!(matches!(
        fx.service.accept_friend_request(request.id, b).await,
        Err(FriendshipError::AlreadyProcessed)
    ));

    // still failing: the retry reports the same way and stays available
    assert!(matches!(
        fx.service.retry_edge_creation(request.id, a, None).await,
        Err(FriendshipError::PartialAcceptFailure { .. })
    ));

    fx.friendships.fail_edges.store(false, Ordering::SeqCst);
    assert!(matches!(
        fx.service.retry_edge_creation(request.id, c, None).await,
        Err(FriendshipError::Forbidden)
    ));
    fx.service
        .retry_edge_creation(request.id, a, None)
        .await
        .unwrap();

    assert!(fx.service.are_friends(a, b).await.unwrap());
    assert!(fx.service.are_friends(b, a).await.unwrap());

    assert!(matches!(
        fx.service.retry_edge_creation(request.id, b, None).await,
        Err(FriendshipError::AlreadyProcessed)
    ));
    assert_eq!(fx.service.list_friends(a, true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn retry_cannot_restore_a_removed_friendship() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    let request = fx.service.send_friend_request(a, b, None).await.unwrap();
    fx.service.accept_friend_request(request.id, b).await.unwrap();
    fx.service.remove_friend(a, b).await.unwrap();

    for actor in [a, b] {
        assert!(matches!(
            fx.service.retry_edge_creation(request.id, actor, None).await,
            Err(FriendshipError::AlreadyProcessed)
        ));
    }
    assert!(!fx.service.are_friends(a, b).await.unwrap());
    assert!(!fx.service.are_friends(b, a).await.unwrap());
}

#[tokio::test]
async fn removal_settles_a_failed_accept() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));
    let request = fx.service.send_friend_request(a, b, None).await.unwrap();

    fx.friendships.fail_edges.store(true, Ordering::SeqCst);
    assert!(fx.service.accept_friend_request(request.id, b).await.is_err());
    fx.friendships.fail_edges.store(false, Ordering::SeqCst);

    fx.service.remove_friend(b, a).await.unwrap();
    assert!(matches!(
        fx.service.retry_edge_creation(request.id, b, None).await,
        Err(FriendshipError::AlreadyProcessed)
    ));
    assert!(!fx.service.are_friends(a, b).await.unwrap());

    // a fresh request starts over
    let again = fx.service.send_friend_request(b, a, None).await.unwrap();
    fx.service.accept_friend_request(again.id, a).await.unwrap();
    assert!(fx.service.are_friends(a, b).await.unwrap());
}

#[tokio::test]
async fn retry_applies_the_status_chosen_on_accept() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));
    let request = fx.service.send_friend_request(a, b, None).await.unwrap();

    fx.friendships.fail_edges.store(true, Ordering::SeqCst);
    let status = match fx
        .service
        .accept_friend_request_with_status(request.id, b, RelationshipStatus::Close)
        .await
    {
        Err(FriendshipError::PartialAcceptFailure { status, .. }) => status,
        other => panic!("expected partial accept failure, got {other:?}"),
    };
    assert_eq!(status, Some(RelationshipStatus::Close));
    fx.friendships.fail_edges.store(false, Ordering::SeqCst);

    // the status belongs to the receiver's half
    assert!(matches!(
        fx.service.retry_edge_creation(request.id, a, status).await,
        Err(FriendshipError::Forbidden)
    ));
    fx.service
        .retry_edge_creation(request.id, b, status)
        .await
        .unwrap();

    assert_eq!(
        fx.service.get_friendship_status(b, a).await.unwrap(),
        RelationshipStatus::Close
    );
    assert_eq!(
        fx.service.get_friendship_status(a, b).await.unwrap(),
        RelationshipStatus::Normal
    );
}

#[tokio::test]
async fn retry_requires_an_accepted_request() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));
    let request = fx.service.send_friend_request(a, b, None).await.unwrap();

    assert!(matches!(
        fx.service.retry_edge_creation(request.id, b, None).await,
        Err(FriendshipError::InvalidInput(_))
    ));
    assert!(!fx.service.are_friends(a, b).await.unwrap());
}

// endregion

// region cache

#[tokio::test]
async fn local_mutations_invalidate_cached_reads() {
    let fx = Fixture::with_config(FriendshipServiceConfig {
        cache_ttl: Duration::from_secs(3600),
        search_limit: 10,
    });
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    assert!(fx.service.list_friends(a, false).await.unwrap().is_empty());
    assert_eq!(fx.service.count_pending(b, false).await.unwrap(), 0);

    let request = fx.service.send_friend_request(a, b, None).await.unwrap();
    assert_eq!(fx.service.count_pending(b, false).await.unwrap(), 1);

    fx.service.accept_friend_request(request.id, b).await.unwrap();
    assert_eq!(fx.service.count_pending(b, false).await.unwrap(), 0);
    assert_eq!(friend_ids(&fx.service.list_friends(a, false).await.unwrap()), vec![b]);

    fx.service.remove_friend(b, a).await.unwrap();
    assert!(fx.service.list_friends(a, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn a_read_racing_an_accept_does_not_cache_stale_friends() {
    let fx = Fixture::with_config(FriendshipServiceConfig {
        cache_ttl: Duration::from_secs(3600),
        search_limit: 10,
    });
    let (a, b) = (fx.user("alice"), fx.user("bob"));
    let request = fx.service.send_friend_request(a, b, None).await.unwrap();

    fx.friendships.hold_next_read.store(true, Ordering::SeqCst);
    let read = fx.service.list_friends(a, false);
    let accept = async {
        fx.friendships.read_done.notified().await;
        fx.service.accept_friend_request(request.id, b).await.unwrap();
        fx.friendships.release.notify_one();
    };
    let (stale, ()) = tokio::join!(read, accept);

    // the held read saw the store before the accept
    assert!(stale.unwrap().is_empty());
    assert_eq!(
        friend_ids(&fx.service.list_friends(a, false).await.unwrap()),
        vec![b]
    );
}

#[tokio::test]
async fn writes_behind_the_service_need_force_refresh() {
    let fx = Fixture::with_config(FriendshipServiceConfig {
        cache_ttl: Duration::from_secs(3600),
        search_limit: 10,
    });
    let (a, b) = (fx.user("alice"), fx.user("bob"));

    assert!(fx.service.list_received(b, false).await.unwrap().is_empty());

    // another process writes straight to the store
    fx.requests.create(a, b, None).await.unwrap();

    assert!(fx.service.list_received(b, false).await.unwrap().is_empty());
    assert_eq!(fx.service.list_received(b, true).await.unwrap().len(), 1);
    assert_eq!(fx.service.list_received(b, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn overview_combines_friends_and_pending_count() {
    let fx = Fixture::new();
    let (a, b, c, d) = (
        fx.user("alice"),
        fx.user("bob"),
        fx.user("carol"),
        fx.user("dave"),
    );
    fx.friends(a, b).await;
    fx.service.send_friend_request(c, a, None).await.unwrap();
    fx.service.send_friend_request(d, a, None).await.unwrap();

    let overview = fx.service.overview(a, true).await.unwrap();
    assert_eq!(friend_ids(&overview.friends), vec![b]);
    assert_eq!(overview.pending_count, 2);
}

// endregion

// region discovery

#[tokio::test]
async fn search_ignores_short_queries_and_caps_results() {
    let fx = Fixture::with_config(FriendshipServiceConfig {
        cache_ttl: Duration::from_secs(30),
        search_limit: 3,
    });
    let me = fx.user("player_zero");
    for i in 1..=5 {
        fx.user(&format!("player_{i}"));
    }

    assert!(fx.service.search_candidates("p", me).await.unwrap().is_empty());
    assert!(fx.service.search_candidates("  p  ", me).await.unwrap().is_empty());

    let found = fx.service.search_candidates("PLAYER", me).await.unwrap();
    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|p| p.id != me));
    let usernames: Vec<&str> = found.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(usernames, vec!["player_1", "player_2", "player_3"]);
}

#[tokio::test]
async fn user_codes_resolve_to_profiles() {
    let fx = Fixture::new();
    let (a, b) = (fx.user("alice"), fx.user("bob"));
    let code = UserCode::from_user_id(b);

    let found = fx
        .service
        .find_by_user_code(&code.to_string(), a)
        .await
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(b));

    let lowercase = code.digits().to_lowercase();
    assert!(fx.service.find_by_user_code(&lowercase, a).await.unwrap().is_some());

    // own code and malformed codes find nobody
    assert!(fx.service.find_by_user_code(code.digits(), b).await.unwrap().is_none());
    assert!(fx.service.find_by_user_code("#12", a).await.unwrap().is_none());
}

// endregion

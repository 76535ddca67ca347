//! Walks one friendship lifecycle against the in-memory backend.
//!
//! `cargo run --bin friendship_demo`

use harmony::application_impl::*;
use harmony::application_port::*;
use harmony::domain_model::*;
use harmony::infra_memory::*;
use harmony::logger::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "friendship_demo=debug,harmony=debug".to_string(),
    })?;

    // region initialization
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryProfileDirectory::new(store.clone()));
    let users: Vec<Identity> = ["alice", "bob", "carol"]
        .into_iter()
        .map(|username| Identity {
            id: fake_id(username),
            name: username.to_string(),
            username: username.to_string(),
            avatar_url: None,
        })
        .collect();
    for user in &users {
        directory.upsert(user.clone())?;
        info!(username = %user.username, code = %UserCode::from_user_id(user.id), "profile seeded");
    }
    let (alice, bob, carol) = (users[0].id, users[1].id, users[2].id);

    let service: Arc<dyn FriendshipService> = Arc::new(RealFriendshipService::new(
        Arc::new(MemoryFriendRequestRepo::new(store.clone())),
        Arc::new(MemoryFriendshipRepo::new(store)),
        directory,
        FriendshipServiceConfig::default(),
    ));
    // endregion

    // region requests
    let to_bob = service
        .send_friend_request(alice, bob, Some("hey, it's alice"))
        .await?;
    let to_carol = service.send_friend_request(alice, carol, None).await?;

    match service.send_friend_request(bob, alice, None).await {
        Err(FriendshipError::DuplicateRequest) => info!("reverse request refused as duplicate"),
        other => warn!(?other, "unexpected reverse request outcome"),
    }

    info!(pending = service.count_pending(bob, false).await?, "bob's inbox");

    service
        .accept_friend_request_with_status(to_bob.id, bob, RelationshipStatus::Close)
        .await?;
    service.reject_friend_request(to_carol.id, carol).await?;
    // endregion

    // region friends
    let overview = service.overview(alice, true).await?;
    info!(
        friends = overview.friends.len(),
        pending = overview.pending_count,
        "alice's overview"
    );
    info!(
        from_bob = %service.get_friendship_status(bob, alice).await?,
        from_alice = %service.get_friendship_status(alice, bob).await?,
        "relationship status"
    );

    let found = service.search_candidates("ca", alice).await?;
    info!(?found, "search for \"ca\"");

    let code = UserCode::from_user_id(carol).to_string();
    let by_code = service.find_by_user_code(&code, alice).await?;
    info!(%code, ?by_code, "lookup by user code");

    service.remove_friend(bob, alice).await?;
    info!(
        still_friends = service.are_friends(alice, bob).await?,
        "after removal"
    );
    // endregion

    Ok(())
}

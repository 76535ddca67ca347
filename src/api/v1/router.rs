use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::domain_model::*;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let verifier = server.token_verifier.clone();
    let service = server.friendship_service.clone();

    // region requests
    let send_request = warp::post()
        .and(warp::path!("friend_requests"))
        .and(warp::body::json())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::send_friend_request);

    let received = warp::get()
        .and(warp::path!("friend_requests" / "received"))
        .and(warp::query::<handler::RefreshQuery>())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::list_received);

    let sent = warp::get()
        .and(warp::path!("friend_requests" / "sent"))
        .and(warp::query::<handler::RefreshQuery>())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::list_sent);

    let count = warp::get()
        .and(warp::path!("friend_requests" / "count"))
        .and(warp::query::<handler::RefreshQuery>())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::count_pending);

    let accept = warp::post()
        .and(warp::path!("friend_requests" / FriendRequestId / "accept"))
        .and(warp::body::bytes())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::accept_friend_request);

    let reject_request = warp::post()
        .and(warp::path!("friend_requests" / FriendRequestId / "reject"))
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::reject_friend_request);

    let retry = warp::post()
        .and(warp::path!("friend_requests" / FriendRequestId / "retry"))
        .and(warp::body::bytes())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::retry_edge_creation);

    let cancel = warp::delete()
        .and(warp::path!("friend_requests" / FriendRequestId))
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::cancel_friend_request);
    // endregion

    // region friends
    let friends = warp::get()
        .and(warp::path!("friends"))
        .and(warp::query::<handler::FriendsQuery>())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::list_friends);

    let overview = warp::get()
        .and(warp::path!("friends" / "overview"))
        .and(warp::query::<handler::RefreshQuery>())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::overview);

    let remove = warp::delete()
        .and(warp::path!("friends" / UserId))
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::remove_friend);

    let get_status = warp::get()
        .and(warp::path!("friends" / UserId / "status"))
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::get_friendship_status);

    let set_status = warp::put()
        .and(warp::path!("friends" / UserId / "status"))
        .and(warp::body::json())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::set_friendship_status);
    // endregion

    // region discovery
    let search = warp::get()
        .and(warp::path!("users" / "search"))
        .and(warp::query::<handler::SearchQuery>())
        .and(with_verification(verifier.clone()))
        .and(with(service.clone()))
        .and_then(handler::search_candidates);

    let by_code = warp::get()
        .and(warp::path!("users" / "code" / String))
        .and(with_verification(verifier))
        .and(with(service))
        .and_then(handler::find_by_user_code);
    // endregion

    let requests = send_request
        .or(received)
        .or(sent)
        .or(count)
        .or(accept)
        .or(reject_request)
        .or(retry)
        .or(cancel);
    let friends = friends.or(overview).or(remove).or(get_status).or(set_status);
    let users = search.or(by_code);

    requests.or(friends).or(users)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    token_verifier: Arc<dyn TokenVerifier>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let token_verifier = token_verifier.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                let user_id = token_verifier
                    .verify_token(token)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok(user_id)
            } else {
                Err(reject::custom(ApiErrorCode::InvalidToken))
            }
        }
    })
}

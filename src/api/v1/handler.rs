use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::hyper::body::Bytes;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn reply<T: Serialize>(data: T) -> warp::reply::Json {
    warp::reply::json(&ApiResponse::ok(data))
}

fn rejected(error: FriendshipError) -> warp::Rejection {
    reject::custom(ApiErrorCode::from(error))
}

/// An empty body reads as `T::default()`.
pub fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, warp::Rejection> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| reject::custom(ApiErrorCode::InvalidInput))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub force_refresh: bool,
}

// region requests

#[derive(Debug, Deserialize)]
pub struct SendFriendRequestBody {
    pub receiver_id: UserId,
    pub message: Option<String>,
}

pub async fn send_friend_request(
    body: SendFriendRequestBody,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let request = friendship_service
        .send_friend_request(user_id, body.receiver_id, body.message.as_deref())
        .await
        .map_err(rejected)?;
    Ok(reply(request))
}

pub async fn list_received(
    query: RefreshQuery,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let requests = friendship_service
        .list_received(user_id, query.force_refresh)
        .await
        .map_err(rejected)?;
    Ok(reply(requests))
}

pub async fn list_sent(
    query: RefreshQuery,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let requests = friendship_service
        .list_sent(user_id, query.force_refresh)
        .await
        .map_err(rejected)?;
    Ok(reply(requests))
}

#[derive(Debug, Serialize)]
pub struct PendingCountResponse {
    pub pending_count: u64,
}

pub async fn count_pending(
    query: RefreshQuery,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let pending_count = friendship_service
        .count_pending(user_id, query.force_refresh)
        .await
        .map_err(rejected)?;
    Ok(reply(PendingCountResponse { pending_count }))
}

#[derive(Debug, Default, Deserialize)]
pub struct AcceptBody {
    pub status: Option<RelationshipStatus>,
}

pub async fn accept_friend_request(
    request_id: FriendRequestId,
    body: Bytes,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let body: AcceptBody = optional_json(&body)?;
    let request = match body.status {
        Some(status) => {
            friendship_service
                .accept_friend_request_with_status(request_id, user_id, status)
                .await
        }
        None => {
            friendship_service
                .accept_friend_request(request_id, user_id)
                .await
        }
    }
    .map_err(rejected)?;
    Ok(reply(request))
}

pub async fn reject_friend_request(
    request_id: FriendRequestId,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    friendship_service
        .reject_friend_request(request_id, user_id)
        .await
        .map_err(rejected)?;
    Ok(reply(()))
}

pub async fn retry_edge_creation(
    request_id: FriendRequestId,
    body: Bytes,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // same optional body as accept
    let body: AcceptBody = optional_json(&body)?;
    friendship_service
        .retry_edge_creation(request_id, user_id, body.status)
        .await
        .map_err(rejected)?;
    Ok(reply(()))
}

pub async fn cancel_friend_request(
    request_id: FriendRequestId,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    friendship_service
        .cancel_friend_request(request_id, user_id)
        .await
        .map_err(rejected)?;
    Ok(reply(()))
}

// endregion

// region friends

#[derive(Debug, Default, Deserialize)]
pub struct FriendsQuery {
    pub status: Option<RelationshipStatus>,
    #[serde(default)]
    pub force_refresh: bool,
}

pub async fn list_friends(
    query: FriendsQuery,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let friends = match query.status {
        Some(status) => {
            friendship_service
                .list_friends_by_status(user_id, status, query.force_refresh)
                .await
        }
        None => {
            friendship_service
                .list_friends(user_id, query.force_refresh)
                .await
        }
    }
    .map_err(rejected)?;
    Ok(reply(friends))
}

pub async fn overview(
    query: RefreshQuery,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let overview = friendship_service
        .overview(user_id, query.force_refresh)
        .await
        .map_err(rejected)?;
    Ok(reply(overview))
}

pub async fn remove_friend(
    friend_id: UserId,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    friendship_service
        .remove_friend(user_id, friend_id)
        .await
        .map_err(rejected)?;
    Ok(reply(()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: RelationshipStatus,
}

pub async fn get_friendship_status(
    friend_id: UserId,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let status = friendship_service
        .get_friendship_status(user_id, friend_id)
        .await
        .map_err(rejected)?;
    Ok(reply(StatusBody { status }))
}

pub async fn set_friendship_status(
    friend_id: UserId,
    body: StatusBody,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    friendship_service
        .set_friendship_status(user_id, friend_id, body.status)
        .await
        .map_err(rejected)?;
    Ok(reply(body))
}

// endregion

// region discovery

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search_candidates(
    query: SearchQuery,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let candidates = friendship_service
        .search_candidates(&query.q, user_id)
        .await
        .map_err(rejected)?;
    Ok(reply(candidates))
}

pub async fn find_by_user_code(
    code: String,
    user_id: UserId,
    friendship_service: Arc<dyn FriendshipService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    // path segments arrive percent-encoded, so "#" shows up as "%23"
    let code = code.strip_prefix("%23").unwrap_or(&code);
    let identity = friendship_service
        .find_by_user_code(code, user_id)
        .await
        .map_err(rejected)?;
    Ok(reply(identity))
}

// endregion

use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, "Route not found".to_string())
    } else if let Some(e) = err.find::<reject::MissingHeader>() {
        (ApiErrorCode::InvalidToken, e.to_string())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::NotFound, "Method not allowed".to_string())
    } else {
        (
            ApiErrorCode::InternalError,
            format!("Unhandled error: {:?}", err),
        )
    };

    let status = code.status_code();
    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
pub enum ApiErrorCode {
    #[error("Cannot send a friend request to yourself")]
    InvalidTarget,
    #[error("A pending friend request already exists")]
    DuplicateRequest,
    #[error("Already friends")]
    AlreadyFriends,
    #[error("Not found")]
    NotFound,
    #[error("Permission denied")]
    Forbidden,
    #[error("Friend request already processed")]
    AlreadyProcessed,
    #[error("Friend request accepted but friendship not created, retry edge creation")]
    PartialAcceptFailure,
    #[error("Invalid input")]
    InvalidInput,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidTarget | ApiErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::DuplicateRequest
            | ApiErrorCode::AlreadyFriends
            | ApiErrorCode::AlreadyProcessed => StatusCode::CONFLICT,
            ApiErrorCode::PartialAcceptFailure | ApiErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<FriendshipError> for ApiErrorCode {
    fn from(error: FriendshipError) -> Self {
        match error {
            FriendshipError::InvalidTarget => ApiErrorCode::InvalidTarget,
            FriendshipError::DuplicateRequest => ApiErrorCode::DuplicateRequest,
            FriendshipError::AlreadyFriends => ApiErrorCode::AlreadyFriends,
            FriendshipError::NotFound => ApiErrorCode::NotFound,
            FriendshipError::Forbidden => ApiErrorCode::Forbidden,
            FriendshipError::AlreadyProcessed => ApiErrorCode::AlreadyProcessed,
            FriendshipError::PartialAcceptFailure {
                request_id,
                status,
                reason,
            } => {
                warn!(%request_id, ?status, "partial accept: {}", reason);
                ApiErrorCode::PartialAcceptFailure
            }
            FriendshipError::InvalidInput(_) => ApiErrorCode::InvalidInput,
            FriendshipError::Store(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::TokenInvalid | AuthError::TokenExpired => ApiErrorCode::InvalidToken,
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

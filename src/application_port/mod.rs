mod auth_service;
mod friendship_service;

pub use auth_service::*;
pub use friendship_service::*;

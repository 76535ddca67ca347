mod auth_service_fake;
mod auth_service_jwt;
mod freshness_cache;
mod friendship_service_impl;

pub use auth_service_fake::*;
pub use auth_service_jwt::*;
pub use freshness_cache::*;
pub use friendship_service_impl::*;

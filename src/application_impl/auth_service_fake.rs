use crate::application_port::*;
use crate::domain_model::UserId;

pub const FAKE_TOKEN_PREFIX: &str = "fake-access-token:";

/// Accepts `fake-access-token:<subject>` where the subject is either a user id
/// or a username; usernames map to a stable v5 id.
#[derive(Debug, Default)]
pub struct FakeTokenVerifier;

impl FakeTokenVerifier {
    pub fn new() -> Self {
        Self
    }

    pub fn token_for(user: UserId) -> String {
        format!("{FAKE_TOKEN_PREFIX}{user}")
    }
}

#[async_trait::async_trait]
impl TokenVerifier for FakeTokenVerifier {
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let Some(subject) = token.strip_prefix(FAKE_TOKEN_PREFIX) else {
            return Err(AuthError::TokenInvalid);
        };
        if subject.is_empty() {
            return Err(AuthError::TokenInvalid);
        }
        Ok(subject.parse().unwrap_or_else(|_| fake_id(subject)))
    }
}

pub fn fake_id(username: &str) -> UserId {
    UserId(uuid::Uuid::new_v5(
        &uuid::Uuid::NAMESPACE_OID,
        username.as_bytes(),
    ))
}

use crate::application_port::*;
use crate::domain_model::*;

/// Read-only view over the profiles owned by the profile collaborator.
#[async_trait::async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>, FriendshipError>;

    /// Unknown ids are skipped; order of the result is unspecified.
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<Identity>, FriendshipError>;

    /// Case-insensitive substring match on username.
    async fn search_by_username(
        &self,
        substring: &str,
        exclude: UserId,
        limit: u16,
    ) -> Result<Vec<Identity>, FriendshipError>;

    /// The code is `UserCode::from_user_id` of the profile id. Stores that
    /// keep it in a column must hold exactly that derivation.
    async fn find_by_user_code(&self, code: &UserCode)
    -> Result<Option<Identity>, FriendshipError>;
}

use super::util::escape_like;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

const PROFILE_COLUMNS: &str = "id, name, username, avatar_url";

pub struct MySqlProfileDirectory {
    pool: MySqlPool,
}

impl MySqlProfileDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlProfileDirectory { pool }
    }

    fn row_to_identity(row: &MySqlRow) -> Result<Identity, FriendshipError> {
        let decode = |e: sqlx::Error| FriendshipError::Store(format!("decode profile: {e}"));

        Ok(Identity {
            id: row.try_get::<UserId, _>("id").map_err(decode)?,
            name: row.try_get::<String, _>("name").map_err(decode)?,
            username: row.try_get::<String, _>("username").map_err(decode)?,
            avatar_url: row
                .try_get::<Option<String>, _>("avatar_url")
                .map_err(decode)?,
        })
    }

    /// `profiles.user_code` is written by the profile owner; a row whose
    /// column disagrees with the code derived from its id is not a match.
    fn verify_user_code(identity: Identity, code: &UserCode) -> Option<Identity> {
        let derived = UserCode::from_user_id(identity.id);
        if derived == *code {
            Some(identity)
        } else {
            warn!(
                user = %identity.id,
                stored = %code,
                %derived,
                "profiles.user_code does not match the derived code, ignored"
            );
            None
        }
    }
}

#[async_trait::async_trait]
impl ProfileDirectory for MySqlProfileDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>, FriendshipError> {
        let row = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| FriendshipError::Store(format!("select profile: {e}")))?;

        row.as_ref().map(Self::row_to_identity).transpose()
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<Identity>, FriendshipError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FriendshipError::Store(format!("select profiles: {e}")))?;

        rows.iter().map(Self::row_to_identity).collect()
    }

    async fn search_by_username(
        &self,
        substring: &str,
        exclude: UserId,
        limit: u16,
    ) -> Result<Vec<Identity>, FriendshipError> {
        let pattern = format!("%{}%", escape_like(&substring.to_lowercase()));

        let rows = sqlx::query(&format!(
            r#"
SELECT {PROFILE_COLUMNS}
FROM profiles
WHERE LOWER(username) LIKE ? AND id <> ?
ORDER BY username ASC
LIMIT ?
"#
        ))
        .bind(pattern)
        .bind(exclude)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("search profiles: {e}")))?;

        rows.iter().map(Self::row_to_identity).collect()
    }

    async fn find_by_user_code(
        &self,
        code: &UserCode,
    ) -> Result<Option<Identity>, FriendshipError> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_code = ?"
        ))
        .bind(code.digits())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("select profile by code: {e}")))?;

        let identity = row.as_ref().map(Self::row_to_identity).transpose()?;
        Ok(identity.and_then(|identity| Self::verify_user_code(identity, code)))
    }
}

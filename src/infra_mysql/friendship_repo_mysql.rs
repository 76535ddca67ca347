use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlFriendshipRepo {
    pool: MySqlPool,
}

impl MySqlFriendshipRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_edge(row: &MySqlRow) -> Result<FriendshipEdge, FriendshipError> {
        let decode = |e: sqlx::Error| FriendshipError::Store(format!("decode friendship: {e}"));

        Ok(FriendshipEdge {
            owner_id: row.try_get::<UserId, _>("user_id").map_err(decode)?,
            friend_id: row.try_get::<UserId, _>("friend_id").map_err(decode)?,
            relationship_status: row
                .try_get::<RelationshipStatus, _>("relationship_status")
                .map_err(decode)?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(decode)?,
            updated_at: row
                .try_get::<DateTime<Utc>, _>("updated_at")
                .map_err(decode)?,
        })
    }
}

#[async_trait::async_trait]
impl FriendshipRepo for MySqlFriendshipRepo {
    async fn create_edge_pair(&self, a: UserId, b: UserId) -> Result<(), FriendshipError> {
        if a == b {
            return Err(FriendshipError::InvalidTarget);
        }

        let now = Utc::now().trunc_subsecs(6);

        // single statement: both halves land together or not at all
        sqlx::query(
            r#"
INSERT INTO friends (user_id, friend_id, relationship_status, created_at, updated_at)
VALUES (?, ?, 'normal', ?, ?), (?, ?, 'normal', ?, ?)
ON DUPLICATE KEY UPDATE id = id
"#,
        )
        .bind(a)
        .bind(b)
        .bind(now)
        .bind(now)
        .bind(b)
        .bind(a)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("insert friendship pair: {e}")))?;

        Ok(())
    }

    async fn remove_edge_pair(&self, a: UserId, b: UserId) -> Result<(), FriendshipError> {
        sqlx::query(
            r#"
DELETE FROM friends
WHERE (user_id = ? AND friend_id = ?) OR (user_id = ? AND friend_id = ?)
"#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .execute(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("delete friendship pair: {e}")))?;

        Ok(())
    }

    async fn list_friends(&self, owner: UserId) -> Result<Vec<FriendshipEdge>, FriendshipError> {
        let rows = sqlx::query(
            r#"
SELECT user_id, friend_id, relationship_status, created_at, updated_at
FROM friends
WHERE user_id = ?
ORDER BY created_at DESC, id DESC
"#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("list friends: {e}")))?;

        rows.iter().map(Self::row_to_edge).collect()
    }

    async fn list_friends_by_status(
        &self,
        owner: UserId,
        status: RelationshipStatus,
    ) -> Result<Vec<FriendshipEdge>, FriendshipError> {
        let rows = sqlx::query(
            r#"
SELECT user_id, friend_id, relationship_status, created_at, updated_at
FROM friends
WHERE user_id = ? AND relationship_status = ?
ORDER BY created_at DESC, id DESC
"#,
        )
        .bind(owner)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("list friends by status: {e}")))?;

        rows.iter().map(Self::row_to_edge).collect()
    }

    async fn exists(&self, a: UserId, b: UserId) -> Result<bool, FriendshipError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM friends WHERE user_id = ? AND friend_id = ?")
                .bind(a)
                .bind(b)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| FriendshipError::Store(format!("check friendship: {e}")))?;

        Ok(count > 0)
    }

    async fn get_status(
        &self,
        owner: UserId,
        friend: UserId,
    ) -> Result<RelationshipStatus, FriendshipError> {
        let status: Option<RelationshipStatus> = sqlx::query_scalar(
            "SELECT relationship_status FROM friends WHERE user_id = ? AND friend_id = ?",
        )
        .bind(owner)
        .bind(friend)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("select relationship status: {e}")))?;

        status.ok_or(FriendshipError::NotFound)
    }

    async fn set_status(
        &self,
        owner: UserId,
        friend: UserId,
        status: RelationshipStatus,
    ) -> Result<(), FriendshipError> {
        // updated_at always changes, so a matched row is never reported as 0 affected
        let res = sqlx::query(
            r#"
UPDATE friends
SET relationship_status = ?, updated_at = ?
WHERE user_id = ? AND friend_id = ?
"#,
        )
        .bind(status)
        .bind(Utc::now().trunc_subsecs(6))
        .bind(owner)
        .bind(friend)
        .execute(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("update relationship status: {e}")))?;

        if res.rows_affected() == 0 {
            return Err(FriendshipError::NotFound);
        }

        Ok(())
    }
}

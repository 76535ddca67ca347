use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

const REQUEST_COLUMNS: &str =
    "id, sender_id, receiver_id, status, message, created_at, edge_creation_pending";

pub struct MySqlFriendRequestRepo {
    pool: MySqlPool,
}

impl MySqlFriendRequestRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlFriendRequestRepo { pool }
    }

    fn row_to_request(row: &MySqlRow) -> Result<FriendRequest, FriendshipError> {
        let decode = |e: sqlx::Error| FriendshipError::Store(format!("decode friend request: {e}"));

        Ok(FriendRequest {
            id: row.try_get::<FriendRequestId, _>("id").map_err(decode)?,
            sender_id: row.try_get::<UserId, _>("sender_id").map_err(decode)?,
            receiver_id: row.try_get::<UserId, _>("receiver_id").map_err(decode)?,
            status: row
                .try_get::<FriendRequestStatus, _>("status")
                .map_err(decode)?,
            message: row.try_get::<Option<String>, _>("message").map_err(decode)?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(decode)?,
            edge_creation_pending: row
                .try_get::<bool, _>("edge_creation_pending")
                .map_err(decode)?,
        })
    }

    async fn list_pending_by(
        &self,
        column: &'static str,
        user: UserId,
    ) -> Result<Vec<FriendRequest>, FriendshipError> {
        let rows = sqlx::query(&format!(
            r#"
SELECT {REQUEST_COLUMNS}
FROM friend_requests
WHERE {column} = ? AND status = 'pending'
ORDER BY created_at DESC, id DESC
"#
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("list pending by {column}: {e}")))?;

        rows.iter().map(Self::row_to_request).collect()
    }

    /// Explains why a guarded write touched no row.
    async fn diagnose(
        &self,
        request_id: FriendRequestId,
        acting_user: UserId,
        actor_is: fn(&FriendRequest) -> UserId,
    ) -> FriendshipError {
        match self.get(request_id).await {
            Ok(None) => FriendshipError::NotFound,
            Ok(Some(request)) if actor_is(&request) != acting_user => FriendshipError::Forbidden,
            Ok(Some(request)) if !request.is_pending() => FriendshipError::AlreadyProcessed,
            Ok(Some(_)) => FriendshipError::Store(format!(
                "friend request {request_id} changed concurrently"
            )),
            Err(e) => e,
        }
    }
}

#[async_trait::async_trait]
impl FriendRequestRepo for MySqlFriendRequestRepo {
    async fn create(
        &self,
        sender: UserId,
        receiver: UserId,
        message: Option<&str>,
    ) -> Result<FriendRequest, FriendshipError> {
        if sender == receiver {
            return Err(FriendshipError::InvalidTarget);
        }

        let friends: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM friends WHERE user_id = ? AND friend_id = ?",
        )
        .bind(sender)
        .bind(receiver)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("check friendship: {e}")))?;
        if friends > 0 {
            return Err(FriendshipError::AlreadyFriends);
        }

        let request = FriendRequest {
            id: FriendRequestId(uuid::Uuid::new_v4()),
            sender_id: sender,
            receiver_id: receiver,
            status: FriendRequestStatus::Pending,
            message: message.map(str::to_owned),
            created_at: Utc::now().trunc_subsecs(6),
            edge_creation_pending: false,
        };

        let res = sqlx::query(
            r#"
INSERT INTO friend_requests (id, sender_id, receiver_id, status, message, created_at)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(request.id)
        .bind(request.sender_id)
        .bind(request.receiver_id)
        .bind(request.status)
        .bind(request.message.as_deref())
        .bind(request.created_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(request),
            Err(e) if is_dup_key(&e) => Err(FriendshipError::DuplicateRequest),
            Err(e) => Err(FriendshipError::Store(format!("insert friend request: {e}"))),
        }
    }

    async fn get(
        &self,
        request_id: FriendRequestId,
    ) -> Result<Option<FriendRequest>, FriendshipError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("select friend request: {e}")))?;

        row.as_ref().map(Self::row_to_request).transpose()
    }

    async fn list_received(&self, user: UserId) -> Result<Vec<FriendRequest>, FriendshipError> {
        self.list_pending_by("receiver_id", user).await
    }

    async fn list_sent(&self, user: UserId) -> Result<Vec<FriendRequest>, FriendshipError> {
        self.list_pending_by("sender_id", user).await
    }

    async fn count_pending(&self, user: UserId) -> Result<u64, FriendshipError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM friend_requests WHERE receiver_id = ? AND status = 'pending'",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("count pending: {e}")))?;

        Ok(count.max(0) as u64)
    }

    async fn transition(
        &self,
        request_id: FriendRequestId,
        acting_user: UserId,
        resolution: Resolution,
    ) -> Result<FriendRequest, FriendshipError> {
        let status: FriendRequestStatus = resolution.into();

        // conditional write: only the first caller to observe 'pending' wins
        let res = sqlx::query(
            r#"
UPDATE friend_requests
SET status = ?, edge_creation_pending = ?
WHERE id = ? AND receiver_id = ? AND status = 'pending'
"#,
        )
        .bind(status)
        .bind(resolution == Resolution::Accepted)
        .bind(request_id)
        .bind(acting_user)
        .execute(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("transition friend request: {e}")))?;

        if res.rows_affected() != 1 {
            return Err(self.diagnose(request_id, acting_user, |r| r.receiver_id).await);
        }

        self.get(request_id)
            .await?
            .ok_or_else(|| {
                FriendshipError::Store(format!(
                    "friend request {request_id} vanished after transition"
                ))
            })
    }

    async fn settle_edge_creation(&self, a: UserId, b: UserId) -> Result<(), FriendshipError> {
        let pair = UserPair::new(a, b);
        sqlx::query(
            r#"
UPDATE friend_requests
SET edge_creation_pending = FALSE
WHERE edge_creation_pending
  AND LEAST(sender_id, receiver_id) = ?
  AND GREATEST(sender_id, receiver_id) = ?
"#,
        )
        .bind(pair.min())
        .bind(pair.max())
        .execute(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("settle edge creation: {e}")))?;

        Ok(())
    }

    async fn cancel(
        &self,
        request_id: FriendRequestId,
        acting_user: UserId,
    ) -> Result<(), FriendshipError> {
        let res = sqlx::query(
            r#"
DELETE FROM friend_requests
WHERE id = ? AND sender_id = ? AND status = 'pending'
"#,
        )
        .bind(request_id)
        .bind(acting_user)
        .execute(&self.pool)
        .await
        .map_err(|e| FriendshipError::Store(format!("cancel friend request: {e}")))?;

        if res.rows_affected() != 1 {
            return Err(self.diagnose(request_id, acting_user, |r| r.sender_id).await);
        }

        Ok(())
    }
}

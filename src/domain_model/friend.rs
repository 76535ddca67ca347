use crate::domain_model::{Identity, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::{Database, Decode, Encode, Type};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct FriendRequestId(pub uuid::Uuid);

impl fmt::Display for FriendRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FriendRequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(FriendRequestId)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Terminal outcome a receiver may move a pending request to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Resolution {
    Accepted,
    Rejected,
}

impl From<Resolution> for FriendRequestStatus {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Accepted => FriendRequestStatus::Accepted,
            Resolution::Rejected => FriendRequestStatus::Rejected,
        }
    }
}

/// Owner-local classification of a friend.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    #[default]
    Normal,
    Close,
    Blocked,
}

macro_rules! string_enum {
    ($ty:ty, $what:literal, { $($variant:path => $s:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $($variant => $s,)+
                };
                f.write_str(s)
            }
        }

        impl FromStr for $ty {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($variant),)+
                    other => Err(format!(concat!("unknown ", $what, ": {}"), other)),
                }
            }
        }

        impl<'r, DB: Database> Decode<'r, DB> for $ty
        where
            &'r str: Decode<'r, DB>,
        {
            fn decode(value: <DB as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <&str as Decode<DB>>::decode(value)?;
                Ok(s.parse::<$ty>()?)
            }
        }

        impl<'q, DB: Database> Encode<'q, DB> for $ty
        where
            String: Encode<'q, DB>,
        {
            fn encode_by_ref(
                &self,
                buf: &mut <DB as Database>::ArgumentBuffer<'q>,
            ) -> Result<IsNull, BoxDynError> {
                self.to_string().encode_by_ref(buf)
            }
        }

        impl<DB: Database> Type<DB> for $ty
        where
            String: Type<DB>,
        {
            fn type_info() -> <DB as Database>::TypeInfo {
                <String as Type<DB>>::type_info()
            }

            fn compatible(ty: &<DB as Database>::TypeInfo) -> bool {
                <String as Type<DB>>::compatible(ty)
            }
        }
    };
}

string_enum!(FriendRequestStatus, "friend request status", {
    FriendRequestStatus::Pending => "pending",
    FriendRequestStatus::Accepted => "accepted",
    FriendRequestStatus::Rejected => "rejected",
});

string_enum!(RelationshipStatus, "relationship status", {
    RelationshipStatus::Normal => "normal",
    RelationshipStatus::Close => "close",
    RelationshipStatus::Blocked => "blocked",
});

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FriendRequest {
    pub id: FriendRequestId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: FriendRequestStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set when the request is accepted, cleared once both friendship edges
    /// exist or the pair is removed. Edge creation may only be retried while set.
    pub edge_creation_pending: bool,
}

impl FriendRequest {
    pub fn is_pending(&self) -> bool {
        self.status == FriendRequestStatus::Pending
    }

    /// The participant that is not `user`, if `user` takes part at all.
    pub fn counterpart_of(&self, user: UserId) -> Option<UserId> {
        if user == self.sender_id {
            Some(self.receiver_id)
        } else if user == self.receiver_id {
            Some(self.sender_id)
        } else {
            None
        }
    }
}

/// One directed half of a friendship, seen from `owner_id`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FriendshipEdge {
    pub owner_id: UserId,
    pub friend_id: UserId,
    pub relationship_status: RelationshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner-side edge joined with the friend's profile.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FriendSummary {
    pub friend: Identity,
    pub relationship_status: RelationshipStatus,
    pub since: DateTime<Utc>,
}

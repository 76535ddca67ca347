use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub uuid::Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(UserId)
    }
}

/// Unordered pair of users, normalized so that `min() <= max()`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct UserPair(UserId, UserId);

impl UserPair {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a < b { Self(a, b) } else { Self(b, a) }
    }

    pub fn min(&self) -> UserId {
        self.0
    }

    pub fn max(&self) -> UserId {
        self.1
    }
}

/// Durable profile record owned by the profile collaborator.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

const USER_CODE_PREFIX: char = '#';
const USER_CODE_BASE: u64 = 36;
const USER_CODE_LENGTH: usize = 6;
const USER_CODE_MULTIPLIER: u64 = 131;
const USER_CODE_MODULO: u64 = 2_176_782_336; // 36^6

/// Short public code derived from a user id, e.g. `#0A9ZQK`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct UserCode(String);

impl UserCode {
    pub fn from_user_id(id: UserId) -> Self {
        let seed = id.0.hyphenated().to_string();
        let mut hash: u64 = 0;
        for c in seed.chars() {
            hash = (hash * USER_CODE_MULTIPLIER + c as u64) % USER_CODE_MODULO;
        }

        let mut digits = ['0'; USER_CODE_LENGTH];
        for slot in digits.iter_mut().rev() {
            let d = (hash % USER_CODE_BASE) as u32;
            *slot = std::char::from_digit(d, USER_CODE_BASE as u32)
                .unwrap_or('0')
                .to_ascii_uppercase();
            hash /= USER_CODE_BASE;
        }

        UserCode(digits.iter().collect())
    }

    /// The six digits without the `#` prefix.
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", USER_CODE_PREFIX, self.0)
    }
}

impl FromStr for UserCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(USER_CODE_PREFIX).unwrap_or(trimmed);

        if digits.chars().count() != USER_CODE_LENGTH {
            return Err(format!("user code must have {USER_CODE_LENGTH} digits"));
        }
        if !digits.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err("user code must be base-36".to_string());
        }

        Ok(UserCode(digits.to_ascii_uppercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        s.parse().unwrap()
    }

    #[test]
    fn pair_is_unordered() {
        let a = uid("00000000-0000-0000-0000-000000000001");
        let b = uid("00000000-0000-0000-0000-000000000002");
        assert_eq!(UserPair::new(a, b), UserPair::new(b, a));
        assert_eq!(UserPair::new(b, a).min(), a);
        assert_eq!(UserPair::new(b, a).max(), b);
    }

    #[test]
    fn user_code_is_stable_and_well_formed() {
        let id = uid("6f1c2a1e-9a53-4d8e-b7a1-0c9f2d3e4b5a");
        let code = UserCode::from_user_id(id);
        assert_eq!(code, UserCode::from_user_id(id));

        let shown = code.to_string();
        assert!(shown.starts_with('#'));
        assert_eq!(shown.len(), 7);
        assert!(
            code.digits()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn nil_id_code_matches_manual_hash() {
        let id = UserId(uuid::Uuid::nil());
        let mut hash: u64 = 0;
        for c in "00000000-0000-0000-0000-000000000000".chars() {
            hash = (hash * 131 + c as u64) % 36u64.pow(6);
        }
        let mut expected = String::new();
        let mut h = hash;
        for _ in 0..6 {
            expected.insert(
                0,
                std::char::from_digit((h % 36) as u32, 36)
                    .unwrap()
                    .to_ascii_uppercase(),
            );
            h /= 36;
        }
        assert_eq!(UserCode::from_user_id(id).digits(), expected);
    }

    #[test]
    fn parse_accepts_prefix_and_lowercase() {
        let id = uid("6f1c2a1e-9a53-4d8e-b7a1-0c9f2d3e4b5a");
        let code = UserCode::from_user_id(id);

        let with_prefix: UserCode = code.to_string().parse().unwrap();
        let lower: UserCode = code.digits().to_lowercase().parse().unwrap();
        assert_eq!(with_prefix, code);
        assert_eq!(lower, code);
    }

    #[test]
    fn parse_rejects_malformed_codes() {
        assert!("".parse::<UserCode>().is_err());
        assert!("#ABC".parse::<UserCode>().is_err());
        assert!("#ABCDEFG".parse::<UserCode>().is_err());
        assert!("#AB-DEF".parse::<UserCode>().is_err());
    }
}

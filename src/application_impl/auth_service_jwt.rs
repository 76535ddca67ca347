use crate::application_port::*;
use crate::domain_model::UserId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub signing_key: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String, // user id as string
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

/// Verifies HS256 access tokens minted by the identity provider.
pub struct JwtHs256Verifier {
    cfg: JwtConfig,
}

impl JwtHs256Verifier {
    pub fn new(cfg: JwtConfig) -> Self {
        Self { cfg }
    }

    fn decode_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = true;
        v.set_audience(&[self.cfg.audience.clone()]);
        v.set_issuer(&[self.cfg.issuer.clone()]);
        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &v,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;
        Ok(data.claims)
    }
}

#[async_trait::async_trait]
impl TokenVerifier for JwtHs256Verifier {
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let claims = self.decode_access(token)?;
        claims.sub.parse().map_err(|_| AuthError::TokenInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn config() -> JwtConfig {
        JwtConfig {
            issuer: "harmony.auth".to_string(),
            audience: "harmony-client".to_string(),
            signing_key: b"test-signing-key".to_vec(),
        }
    }

    fn mint(cfg: &JwtConfig, sub: &str, ttl: Duration) -> String {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: sub.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&cfg.signing_key),
        )
        .unwrap()
    }

    #[test]
    fn debug_hides_signing_key() {
        let printed = format!("{:?}", config());
        assert!(!printed.contains("test-signing-key"));
        assert!(printed.contains("harmony.auth"));
    }

    #[tokio::test]
    async fn resolves_subject_to_user() {
        let cfg = config();
        let user = UserId(uuid::Uuid::new_v4());
        let token = mint(&cfg, &user.to_string(), Duration::hours(1));

        let verifier = JwtHs256Verifier::new(cfg);
        assert_eq!(verifier.verify_token(&token).await.unwrap(), user);
    }

    #[tokio::test]
    async fn expired_and_foreign_tokens_fail() {
        let cfg = config();
        let user = UserId(uuid::Uuid::new_v4()).to_string();
        let verifier = JwtHs256Verifier::new(cfg.clone());

        let expired = mint(&cfg, &user, Duration::hours(-2));
        assert!(matches!(
            verifier.verify_token(&expired).await,
            Err(AuthError::TokenExpired)
        ));

        let other = JwtConfig {
            signing_key: b"another-key".to_vec(),
            ..cfg.clone()
        };
        assert!(matches!(
            verifier.verify_token(&mint(&other, &user, Duration::hours(1))).await,
            Err(AuthError::TokenInvalid)
        ));

        assert!(matches!(
            verifier.verify_token(&mint(&cfg, "not-a-uuid", Duration::hours(1))).await,
            Err(AuthError::TokenInvalid)
        ));
    }
}

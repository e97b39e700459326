//! Bearer tokens.
//!
//! Issues and validates the HS256 bearer tokens handed out at login.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use caja_core::{Requester, Role, User};

/// What a token asserts about its holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,

    pub username: String,

    pub role: Role,

    /// Seconds since the epoch.
    pub iat: i64,

    /// Seconds since the epoch; no leeway is applied.
    pub exp: i64,

    /// Random per token.
    pub jti: String,
}

impl Claims {
    pub fn requester(&self) -> Requester {
        Requester::new(self.sub.clone(), self.role)
    }
}

/// Why a token was refused.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to generate token: {0}")]
    Encoding(String),
}

/// Signs and checks tokens with the shared HS256 secret.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Generate a token for a signed-in user.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Checks signature and expiry, returning the claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;

        Ok(token_data.claims)
    }
}

/// Token part of an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cashier() -> User {
        let now = Utc::now();
        User {
            id: "user-1".to_string(),
            username: "caja1".to_string(),
            email: "caja1@tienda.com".to_string(),
            role: Role::Cashier,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let token = manager.issue(&cashier()).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "caja1");
        assert_eq!(claims.role, Role::Cashier);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.requester(), Requester::new("user-1", Role::Cashier));
    }

    #[test]
    fn test_wrong_secret() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);
        let other = JwtManager::new("other-secret".to_string(), 3600);

        let token = manager.issue(&cashier()).unwrap();
        assert!(matches!(other.validate_token(&token), Err(TokenError::Invalid(_))));
        assert!(matches!(manager.validate_token("garbage"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".to_string(),
            username: "caja1".to_string(),
            role: Role::Cashier,
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = manager.sign(&claims).unwrap();

        assert!(matches!(manager.validate_token(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}

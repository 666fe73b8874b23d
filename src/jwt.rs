//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed with separate secrets so that one
//! kind can never be accepted where the other is expected.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token (15 minutes), stateless
    Access,
    /// Long-lived refresh token (7 days), backed by a store row
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Username
    pub username: String,
    /// User role
    pub role: UserRole,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID, makes every issued refresh token unique
    pub jti: String,
    /// Username
    pub username: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Signing keys for one token kind.
#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Configuration for JWT operations. Immutable after startup.
#[derive(Clone)]
pub struct JwtConfig {
    access: KeyPair,
    refresh: KeyPair,
}

/// Result of generating an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Result of generating a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    /// The JWT token string
    pub token: String,
    /// JWT ID
    pub jti: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

impl JwtConfig {
    /// Create a new JWT configuration. The two secrets must differ.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Result<Self, JwtError> {
        if access_secret == refresh_secret {
            return Err(JwtError::SharedSecret);
        }
        Ok(Self {
            access: KeyPair::from_secret(access_secret),
            refresh: KeyPair::from_secret(refresh_secret),
        })
    }

    /// Generate an access token carrying the username and role.
    pub fn generate_access_token(
        &self,
        username: &str,
        role: UserRole,
    ) -> Result<AccessTokenResult, JwtError> {
        let now = now_secs()?;

        let claims = AccessClaims {
            username: username.to_string(),
            role,
            token_type: TokenType::Access,
            iat: now,
            exp: now + ACCESS_TOKEN_DURATION_SECS,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.access.encoding)
            .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            duration: ACCESS_TOKEN_DURATION_SECS,
        })
    }

    /// Generate a refresh token for a user.
    /// The caller is responsible for persisting it in the refresh store.
    pub fn generate_refresh_token(&self, username: &str) -> Result<RefreshTokenResult, JwtError> {
        let now = now_secs()?;

        let jti = uuid::Uuid::new_v4().to_string();
        let exp = now + REFRESH_TOKEN_DURATION_SECS;

        let claims = RefreshClaims {
            jti: jti.clone(),
            username: username.to_string(),
            token_type: TokenType::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.refresh.encoding)
            .map_err(JwtError::Encoding)?;

        Ok(RefreshTokenResult {
            token,
            jti,
            issued_at: now,
            expires_at: exp,
            duration: REFRESH_TOKEN_DURATION_SECS,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let claims: AccessClaims = validate(token, &self.access.decoding)?;
        if claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Validate and decode a refresh token.
    /// This only checks signature and expiry; store membership is checked by the caller.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let claims: RefreshClaims = validate(token, &self.refresh.decoding)?;
        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }
}

/// Verify signature and expiry of `token` against `key`, decoding into `C`.
/// Tokens missing any field of `C` are rejected here.
fn validate<C: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<C, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    jsonwebtoken::decode::<C>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(JwtError::Decoding)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token (bad signature, malformed, expired)
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
    /// Access and refresh secrets are identical
    SharedSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
            JwtError::SharedSecret => write!(f, "Access and refresh secrets must differ"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &[u8] = b"test-access-secret-for-testing";
    const REFRESH: &[u8] = b"test-refresh-secret-for-testing";

    fn config() -> JwtConfig {
        JwtConfig::new(ACCESS, REFRESH).unwrap()
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let config = config();

        let result = config.generate_access_token("alice", UserRole::User).unwrap();
        assert_eq!(result.duration, ACCESS_TOKEN_DURATION_SECS);

        let claims = config.validate_access_token(&result.token).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, UserRole::User);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_DURATION_SECS);
    }

    #[test]
    fn test_generate_and_validate_refresh_token() {
        let config = config();

        let result = config.generate_refresh_token("alice").unwrap();
        assert_eq!(result.duration, REFRESH_TOKEN_DURATION_SECS);
        assert_eq!(
            result.expires_at - result.issued_at,
            REFRESH_TOKEN_DURATION_SECS
        );

        let claims = config.validate_refresh_token(&result.token).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.jti, result.jti);
    }

    #[test]
    fn test_identical_secrets_rejected() {
        assert!(matches!(
            JwtConfig::new(b"same-secret", b"same-secret"),
            Err(JwtError::SharedSecret)
        ));
    }

    #[test]
    fn test_tokens_not_interchangeable() {
        let config = config();

        let access = config.generate_access_token("alice", UserRole::Admin).unwrap();
        let refresh = config.generate_refresh_token("alice").unwrap();

        assert!(config.validate_refresh_token(&access.token).is_err());
        assert!(config.validate_access_token(&refresh.token).is_err());
    }

    #[test]
    fn test_refresh_claims_signed_with_access_secret_rejected() {
        // Correct claim shape, wrong secret: must fail on signature alone.
        let claims = RefreshClaims {
            jti: "jti-1".to_string(),
            username: "alice".to_string(),
            token_type: TokenType::Refresh,
            iat: now(),
            exp: now() + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(ACCESS),
        )
        .unwrap();

        assert!(matches!(
            config().validate_refresh_token(&token),
            Err(JwtError::Decoding(_))
        ));
    }

    #[test]
    fn test_access_claims_signed_with_refresh_secret_rejected() {
        let claims = AccessClaims {
            username: "alice".to_string(),
            role: UserRole::Admin,
            token_type: TokenType::Access,
            iat: now(),
            exp: now() + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(REFRESH),
        )
        .unwrap();

        assert!(matches!(
            config().validate_access_token(&token),
            Err(JwtError::Decoding(_))
        ));
    }

    #[test]
    fn test_missing_role_claim_rejected() {
        #[derive(Serialize)]
        struct NoRole {
            username: String,
            typ: TokenType,
            iat: u64,
            exp: u64,
        }

        let token = jsonwebtoken::encode(
            &Header::default(),
            &NoRole {
                username: "alice".to_string(),
                typ: TokenType::Access,
                iat: now(),
                exp: now() + 60,
            },
            &EncodingKey::from_secret(ACCESS),
        )
        .unwrap();

        assert!(config().validate_access_token(&token).is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let token = jsonwebtoken::encode(
            &Header::default(),
            &serde_json::json!({
                "username": "alice",
                "role": "superuser",
                "typ": "access",
                "iat": now(),
                "exp": now() + 60,
            }),
            &EncodingKey::from_secret(ACCESS),
        )
        .unwrap();

        assert!(config().validate_access_token(&token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        assert!(config().validate_access_token("invalid-token").is_err());
        assert!(config().validate_refresh_token("").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"access-1", b"refresh-1").unwrap();
        let config2 = JwtConfig::new(b"access-2", b"refresh-2").unwrap();

        let access = config1.generate_access_token("alice", UserRole::User).unwrap();
        let refresh = config1.generate_refresh_token("alice").unwrap();

        assert!(config2.validate_access_token(&access.token).is_err());
        assert!(config2.validate_refresh_token(&refresh.token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let now = now();

        let claims = AccessClaims {
            username: "alice".to_string(),
            role: UserRole::Admin,
            token_type: TokenType::Access,
            iat: now - 100,
            exp: now - 50, // Expired 50 seconds ago
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(ACCESS),
        )
        .unwrap();

        let result = config().validate_access_token(&token);
        assert!(matches!(result, Err(JwtError::Decoding(_))));
    }

    #[test]
    fn test_expired_refresh_token() {
        let now = now();

        let claims = RefreshClaims {
            jti: "jti-1".to_string(),
            username: "alice".to_string(),
            token_type: TokenType::Refresh,
            iat: now - REFRESH_TOKEN_DURATION_SECS - 10,
            exp: now - 10,
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(REFRESH),
        )
        .unwrap();

        assert!(config().validate_refresh_token(&token).is_err());
    }

    #[test]
    fn test_unique_refresh_tokens() {
        let config = config();

        let result1 = config.generate_refresh_token("alice").unwrap();
        let result2 = config.generate_refresh_token("alice").unwrap();

        assert_ne!(result1.jti, result2.jti);
        assert_ne!(
            result1.token, result2.token,
            "Tokens minted in the same second must still differ"
        );
    }
}

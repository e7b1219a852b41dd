//! Bearer token verification for the administrative surface.
//!
//! Tokens are issued elsewhere; this service only checks signature, expiry
//! and the role claim.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{Config, ROLE_ADMIN};
use crate::errors::{AppError, AppResult};

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin username
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case(ROLE_ADMIN)
    }
}

/// Token verification trait for dependency injection.
pub trait AuthService: Send + Sync {
    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;

    /// Verify the token and require the ADMIN role.
    fn authorize_admin(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;
        if !claims.is_admin() {
            tracing::warn!(subject = %claims.sub, role = %claims.role, "Non-admin token rejected");
            return Err(AppError::Forbidden);
        }
        Ok(claims)
    }
}

/// HMAC-SHA256 token verifier.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(config: &Config) -> Self {
        Self::from_secret(config.jwt_secret_bytes())
    }

    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
        }
    }
}

impl AuthService for JwtAuthenticator {
    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(token_data.claims)
    }
}

//! Application settings loaded from environment variables.

use std::env;

use super::constants::{
    DEFAULT_AUDIT_QUEUE_CAPACITY, DEFAULT_DATABASE_URL, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    MIN_JWT_SECRET_LENGTH,
};

/// How audit entries reach the ledger's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditWriteMode {
    /// Persist within the audited call, swallowing failures
    Inline,
    /// Enqueue on an in-process outbox drained by a background writer
    Queued,
}

impl AuditWriteMode {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("queued") {
            AuditWriteMode::Queued
        } else {
            AuditWriteMode::Inline
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    /// Redis is optional; without it the username lock is unavailable
    pub redis_url: Option<String>,
    jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub audit_write_mode: AuditWriteMode,
    pub audit_queue_capacity: usize,
    pub username_lock_enabled: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_secret", &"[REDACTED]")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("audit_write_mode", &self.audit_write_mode)
            .field("audit_queue_capacity", &self.audit_queue_capacity)
            .field("username_lock_enabled", &self.username_lock_enabled)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if JWT_SECRET is not set or is too short (security requirement).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            } else {
                panic!("JWT_SECRET environment variable must be set in production");
            }
        });

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            panic!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            jwt_secret,
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            audit_write_mode: env::var("AUDIT_WRITE_MODE")
                .map(|v| AuditWriteMode::parse(&v))
                .unwrap_or(AuditWriteMode::Inline),
            audit_queue_capacity: env::var("AUDIT_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|capacity: &usize| *capacity > 0)
                .unwrap_or(DEFAULT_AUDIT_QUEUE_CAPACITY),
            username_lock_enabled: env::var("USERNAME_LOCK_ENABLED")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Build a configuration directly, bypassing the environment.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            redis_url: None,
            jwt_secret: jwt_secret.into(),
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            audit_write_mode: AuditWriteMode::Inline,
            audit_queue_capacity: DEFAULT_AUDIT_QUEUE_CAPACITY,
            username_lock_enabled: false,
        }
    }

    /// Get JWT secret bytes for token verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

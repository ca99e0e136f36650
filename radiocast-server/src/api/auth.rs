//! Admin authentication
//!
//! `POST /auth/login` checks a password against the configured SHA-256
//! digest and issues a bearer token. Attempts are rate limited to one per
//! configured interval. Tokens live in memory for the process lifetime.
//!
//! With no digest configured, admin auth is disabled and every admin route
//! passes through.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::AppState;

/// Rejects attempts closer together than `min_interval`
struct LoginRateLimiter {
    last_attempt: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl LoginRateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_attempt: Mutex::new(None),
            min_interval,
        }
    }

    /// Record an attempt; false when it came too soon after the previous one
    fn try_acquire(&self) -> bool {
        let mut last = self.last_attempt.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();
        if let Some(last_time) = *last {
            if now.duration_since(last_time) < self.min_interval {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

/// Password check and bearer token registry
pub struct AuthService {
    password_sha256: Option<String>,
    tokens: RwLock<HashSet<String>>,
    limiter: LoginRateLimiter,
}

impl AuthService {
    pub fn new(password_sha256: Option<String>, login_min_interval: Duration) -> Self {
        Self {
            password_sha256: password_sha256.map(|h| h.trim().to_ascii_lowercase()),
            tokens: RwLock::new(HashSet::new()),
            limiter: LoginRateLimiter::new(login_min_interval),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.password_sha256.is_some()
    }

    /// Validate a password and issue a new token
    pub fn login(&self, password: &str) -> Result<String> {
        if !self.limiter.try_acquire() {
            warn!("Login attempt rejected by rate limiter");
            return Err(Error::TooManyRequests);
        }

        let Some(expected) = &self.password_sha256 else {
            return Err(Error::Unauthorized("admin login is not configured".to_string()));
        };

        if sha256_hex(password) != *expected {
            warn!("Login failed: wrong password");
            return Err(Error::Unauthorized("invalid password".to_string()));
        }

        let token = Uuid::new_v4().simple().to_string();
        self.tokens
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(token.clone());
        info!("Issued admin token");
        Ok(token)
    }

    /// Whether `token` was issued by this process
    pub fn verify(&self, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .contains(token)
    }
}

/// Lowercase hex SHA-256 digest
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let token = state.auth.login(&request.password)?;
    Ok(Json(LoginResponse { token }))
}

/// Bearer token middleware for admin routes
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if !state.auth.is_enabled() {
        debug!("Admin auth disabled, passing request through");
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match token {
        Some(token) if state.auth.verify(token) => Ok(next.run(request).await),
        Some(_) => Err(Error::Unauthorized("invalid token".to_string())),
        None => Err(Error::Unauthorized("missing bearer token".to_string())),
    }
}

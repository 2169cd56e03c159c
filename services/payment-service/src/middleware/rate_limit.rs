// Redis fixed-window rate limiting per user

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::{AsyncCommands, Client};
use shared::utils::token_extraction;
use thiserror::Error;

use crate::config::AppState;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

#[derive(Clone)]
pub struct RateLimiter {
    redis_client: Client,
    config: RateLimitConfig,
}

// Hasil evaluasi satu request terhadap window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: u64,
}

#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("Redis connection error: {0}")]
    RedisConnection(#[from] redis::RedisError),

    #[error("Redis operation error: {0}")]
    RedisOperation(redis::RedisError),
}

/// `count` sudah termasuk request saat ini
pub fn evaluate_window(count: u64, config: &RateLimitConfig, now: u64) -> RateLimitDecision {
    let window = config.window_seconds.max(1);
    let limit = config.max_requests;
    let allowed = count <= u64::from(limit);
    let remaining = u64::from(limit).saturating_sub(count) as u32;

    RateLimitDecision {
        allowed,
        limit,
        remaining,
        reset_at: (now / window + 1) * window,
    }
}

impl RateLimiter {
    pub fn new(redis_url: &str, config: RateLimitConfig) -> Result<Self, RateLimitError> {
        let redis_client = Client::open(redis_url)?;
        Ok(Self {
            redis_client,
            config,
        })
    }

    // INCR counter window sekarang, EXPIRE di-set saat counter baru dibuat
    pub async fn check(&self, identifier: &str) -> Result<RateLimitDecision, RateLimitError> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(RateLimitError::RedisConnection)?;

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let window = self.config.window_seconds.max(1);
        let key = format!("rate_limit:payment:{}:{}", identifier, now / window);

        let count: u64 = conn
            .incr(&key, 1u64)
            .await
            .map_err(RateLimitError::RedisOperation)?;

        if count == 1 {
            let _: () = conn
                .expire(&key, window as i64)
                .await
                .map_err(RateLimitError::RedisOperation)?;
        }

        Ok(evaluate_window(count, &self.config, now))
    }
}

fn apply_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(decision.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(decision.reset_at));
}

// Jalan setelah JWT middleware, jadi identifier utama adalah user id
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return next.run(request).await;
    };

    let identifier = match request.extensions().get::<AuthUser>() {
        Some(user) => format!("user:{}", user.user_id),
        None => token_extraction::extract_client_ip(request.headers())
            .map(|ip| format!("ip:{}", ip))
            .unwrap_or_else(|| "anonymous".to_string()),
    };

    let decision = match limiter.check(&identifier).await {
        Ok(decision) => decision,
        Err(e) => {
            // fail-open
            tracing::warn!("Rate limiter unavailable, request allowed: {}", e);
            return next.run(request).await;
        }
    };

    if !decision.allowed {
        tracing::warn!("Rate limit exceeded for {}", identifier);
        let mut response = AppError::RateLimited.into_response();
        apply_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            max_requests: 3,
            window_seconds: 60,
        }
    }

    #[test]
    fn test_requests_within_limit_are_allowed() {
        let decision = evaluate_window(1, &config(), 120);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.reset_at, 180);

        let decision = evaluate_window(3, &config(), 179);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_at, 180);
    }

    #[test]
    fn test_request_over_limit_is_rejected() {
        let decision = evaluate_window(4, &config(), 130);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }
}

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::ErrorResponse;

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimitLayer {
    /// Allow a burst of `requests`, refilled evenly over `per_seconds`
    pub fn new(requests: u32, per_seconds: u64) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let replenish = Duration::from_secs(per_seconds.max(1)) / burst.get();
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        RateLimitLayer {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn per_minute(requests: u32) -> Self {
        Self::new(requests, 60)
    }

    pub fn check(&self) -> Result<(), Response> {
        self.limiter.check().map_err(|_| {
            warn!("Rate limit exceeded");
            let body = ErrorResponse {
                error: "Rate limit exceeded. Please try again later.".to_string(),
                error_code: "RATE_LIMITED".to_string(),
                details: None,
            };
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        })
    }
}

/// Attach with `from_fn_with_state(Arc<RateLimitLayer>, rate_limit_middleware)`
pub async fn rate_limit_middleware(
    State(rate_limit): State<Arc<RateLimitLayer>>,
    req: Request,
    next: Next,
) -> Response {
    match rate_limit.check() {
        Ok(()) => next.run(req).await,
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let layer = RateLimitLayer::per_minute(2);

        assert!(layer.check().is_ok());
        assert!(layer.check().is_ok());

        let rejected = layer.check().unwrap_err();
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_zero_requests_still_allows_one() {
        let layer = RateLimitLayer::new(0, 60);

        assert!(layer.check().is_ok());
        assert!(layer.check().is_err());
    }
}

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use domain::Envelope;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::warn;

/// Paths subject to the ingress rate limit. Operational endpoints
/// (`/health`, `/metrics`, `/docs`) stay reachable under load.
const GUARDED_PREFIXES: &[&str] = &["/api/", "/ws"];

#[derive(Clone)]
pub struct IngressRateLimiter {
    capacity: f64,
    refill_per_second: f64,
    bucket: Arc<Mutex<TokenBucket>>,
}

#[derive(Debug)]
struct TokenBucket {
    available_tokens: f64,
    last_refill: Instant,
}

impl IngressRateLimiter {
    pub fn new(refill_per_second: u32, burst: u32) -> Self {
        let capacity = burst.max(1) as f64;
        let refill_per_second = refill_per_second.max(1) as f64;
        Self {
            capacity,
            refill_per_second,
            bucket: Arc::new(Mutex::new(TokenBucket {
                available_tokens: capacity,
                last_refill: Instant::now(),
            })),
        }
    }

    pub async fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill);
        self.refill_locked(&mut bucket, elapsed, now);

        if bucket.available_tokens >= 1.0 {
            bucket.available_tokens -= 1.0;
            return true;
        }

        false
    }

    fn refill_locked(&self, bucket: &mut TokenBucket, elapsed: Duration, now: Instant) {
        let refill_amount = elapsed.as_secs_f64() * self.refill_per_second;
        bucket.available_tokens = (bucket.available_tokens + refill_amount).min(self.capacity);
        bucket.last_refill = now;
    }
}

pub async fn enforce_ingress_rate_limit(
    State(rate_limiter): State<IngressRateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if !GUARDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return next.run(req).await;
    }

    if rate_limiter.try_acquire().await {
        return next.run(req).await;
    }

    warn!(path = %req.uri().path(), "ingress rate limit exceeded");
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(Envelope::err("rate limit exceeded")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bucket_exhausts_and_refills() {
        let limiter = IngressRateLimiter::new(2, 2);

        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(limiter.try_acquire().await);
    }
}

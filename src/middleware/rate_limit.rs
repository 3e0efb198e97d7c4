// Fixed-window rate limiting for the public auth routes.
//
// In-process only: each instance counts its own windows, which is the
// intended scope for a single-node deployment.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::AppState;

// windows map is swept once it grows past this
const MAX_TRACKED_CLIENTS: usize = 4096;

/// Counts requests per client key over a fixed window.
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    max_requests: u32,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn from_config(api: &ApiConfig) -> Self {
        Self::new(
            api.enable_rate_limiting,
            api.rate_limit_requests,
            Duration::from_secs(api.rate_limit_window_secs),
        )
    }

    pub fn new(enabled: bool, max_requests: u32, window: Duration) -> Self {
        Self {
            enabled,
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Counts one request against `key`; `false` when the window is spent.
    pub async fn try_acquire(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if windows.len() > MAX_TRACKED_CLIENTS {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows
            .entry(key.to_string())
            .or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Middleware for rate-limited routes; a no-op when limiting is disabled.
pub async fn limit_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.limiter.is_enabled() {
        return Ok(next.run(request).await);
    }

    let key = client_key(&request);
    if state.limiter.try_acquire(&key).await {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("rate limit exceeded for {}", key);
        Err(ApiError::too_many_requests("Too many requests, try again later"))
    }
}

/// First `x-forwarded-for` hop when present, else the peer address, else
/// one shared bucket.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "global".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[tokio::test]
    async fn allows_up_to_the_limit_then_refuses() {
        let limiter = RateLimiter::new(true, 3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.try_acquire("10.0.0.1").await);
        }
        assert!(!limiter.try_acquire("10.0.0.1").await);
    }

    #[tokio::test]
    async fn keys_are_tracked_independently() {
        let limiter = RateLimiter::new(true, 1, Duration::from_secs(60));
        assert!(limiter.try_acquire("10.0.0.1").await);
        assert!(!limiter.try_acquire("10.0.0.1").await);
        assert!(limiter.try_acquire("10.0.0.2").await);
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::new(true, 1, Duration::from_secs(60));
        assert!(limiter.try_acquire("10.0.0.1").await);
        assert!(!limiter.try_acquire("10.0.0.1").await);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.try_acquire("10.0.0.1").await);
    }

    #[test]
    fn client_key_prefers_the_first_forwarded_hop() {
        let request = HttpRequest::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "203.0.113.7");
    }

    #[test]
    fn client_key_falls_back_to_peer_address_then_global() {
        let mut request = HttpRequest::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&request), "global");

        let addr: SocketAddr = "192.0.2.5:443".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&request), "192.0.2.5");
    }
}

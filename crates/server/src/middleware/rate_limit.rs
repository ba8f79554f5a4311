//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: Strict limits for register/login (~10/min)
//! - `api_rate_limiter`: Relaxed limits for the rest of the API (~100/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Client IP from the reverse proxy headers, falling back to the peer address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl ClientIpKeyExtractor {
    fn header_ip<T>(req: &Request<T>, name: &str) -> Option<IpAddr> {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        // X-Forwarded-For (first hop), then X-Real-IP
        Self::header_ip(req, "x-forwarded-for")
            .or_else(|| Self::header_ip(req, "x-real-ip"))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers, which are always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// One API token is replenished every this many milliseconds (100/minute).
const API_REPLENISH_MS: u64 = 600;

/// Requests the API limiter allows back to back.
const API_BURST: u32 = 50;

/// Create rate limiter for the general API: ~100 requests per minute per IP.
///
/// Configuration: 1 request every 600 ms (replenish), burst of 50.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers, which are always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_millisecond(API_REPLENISH_MS)
        .burst_size(API_BURST)
        .finish()
        .expect("rate limiter config with per_millisecond(600) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use tower::ServiceExt;
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/api/auth/login");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap_or_default()
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let req = request(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).ok(),
            "203.0.113.7".parse().ok()
        );
    }

    #[test]
    fn test_real_ip_and_peer_fallback() {
        let req = request(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).ok(),
            "198.51.100.2".parse().ok()
        );

        let mut req = request(&[]);
        assert!(ClientIpKeyExtractor.extract(&req).is_err());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(
            ClientIpKeyExtractor.extract(&req).ok(),
            "127.0.0.1".parse().ok()
        );
    }

    #[test]
    fn test_api_quota_is_a_hundred_per_minute() {
        assert_eq!(60_000 / API_REPLENISH_MS, 100);
    }

    #[tokio::test]
    async fn test_api_limiter_stops_after_burst() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(api_rate_limiter());

        let mut statuses = Vec::new();
        for _ in 0..API_BURST + 10 {
            let req = Request::builder()
                .uri("/")
                .header("x-forwarded-for", "192.0.2.10")
                .body(Body::empty())
                .unwrap();
            statuses.push(app.clone().oneshot(req).await.unwrap().status());
        }

        assert!(statuses.iter().take(50).all(|s| *s == StatusCode::OK));
        assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
    }
}

//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `checkout_rate_limiter`: strict limits for order placement and newsletter signups (~10/min)
//! - `api_rate_limiter`: relaxed limits for catalog reads and cart quotes (~100/min)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Proxy headers carrying the real client IP, most trusted first.
const CLIENT_IP_HEADERS: [&str; 3] = ["cf-connecting-ip", "fly-client-ip", "x-real-ip"];

/// Key extractor that prefers proxy headers (Cloudflare, Fly.io), then the
/// first `X-Forwarded-For` hop, then the socket peer address.
///
/// Requests with none of these (in-process tests) share one bucket keyed by
/// the unspecified address instead of failing.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl ClientIpKeyExtractor {
    fn client_ip<T>(req: &Request<T>) -> IpAddr {
        let headers = req.headers();

        let from_header = CLIENT_IP_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        });
        if let Some(ip) = from_header {
            return ip;
        }

        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return ip;
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| addr.ip())
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(Self::client_ip(req))
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for order placement: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. `per_second(6)` and `burst_size(5)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for general API: ~100 requests per minute per IP.
///
/// Configuration: 1 request per second (replenish), burst of 50.
///
/// # Panics
///
/// This function will not panic. `per_second(1)` and `burst_size(50)` are
/// always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_prefers_cloudflare_header() {
        let req = Request::builder()
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .header("cf-connecting-ip", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            ClientIpKeyExtractor::client_ip(&req),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let req = Request::builder()
            .header("x-forwarded-for", "198.51.100.4, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            ClientIpKeyExtractor::client_ip(&req),
            "198.51.100.4".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_falls_back_to_connect_info_then_unspecified() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(
            ClientIpKeyExtractor::client_ip(&req),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );

        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.9:5000".parse::<SocketAddr>().unwrap()));
        assert_eq!(
            ClientIpKeyExtractor::client_ip(&req),
            "192.0.2.9".parse::<IpAddr>().unwrap()
        );
    }
}

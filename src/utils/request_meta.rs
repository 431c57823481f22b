use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap};

use crate::models::signup_models::{truncate_agent, UNKNOWN_ADDRESS};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Best-effort origin of a request: first `X-Forwarded-For` entry, then the peer
/// address, then `"unknown"`. The header is client controlled, so the result is
/// metadata only.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .and_then(|first| first.parse::<IpAddr>().ok());

    match forwarded.or_else(|| peer.map(|addr| addr.ip())) {
        Some(ip) => ip.to_string(),
        None => UNKNOWN_ADDRESS.to_string(),
    }
}

pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(truncate_agent)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_first_forwarded_entry_wins() {
        let h = headers(&[("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")]);
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(client_address(&h, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn test_malformed_forwarded_falls_back_to_peer() {
        let h = headers(&[("x-forwarded-for", "not-an-ip, 10.0.0.1")]);
        let peer: SocketAddr = "[::1]:5000".parse().unwrap();
        assert_eq!(client_address(&h, Some(peer)), "::1");
    }

    #[test]
    fn test_unknown_without_any_address() {
        assert_eq!(client_address(&HeaderMap::new(), None), "unknown");
        let h = headers(&[("x-forwarded-for", "garbage")]);
        assert_eq!(client_address(&h, None), "unknown");
    }

    #[test]
    fn test_user_agent_truncated() {
        let agent = "A".repeat(500);
        let h = headers(&[("user-agent", agent.as_str())]);
        assert_eq!(user_agent(&h).len(), 200);
        assert_eq!(user_agent(&HeaderMap::new()), "");
    }
}

use std::net::SocketAddr;

use axum::http::{header, HeaderMap};

/// Request metadata recorded with each upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
}

impl ClientInfo {
    /// The client address is the first `x-forwarded-for` entry, then
    /// `x-real-ip`, then the transport peer.
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let ip = header_str(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| header_str(headers, "x-real-ip").map(str::trim).filter(|v| !v.is_empty()))
            .map(str::to_owned)
            .or_else(|| peer.map(|addr| addr.ip().to_string()));

        Self {
            ip,
            user_agent: header_str(headers, header::USER_AGENT.as_str()).map(str::to_owned),
            accept_language: header_str(headers, header::ACCEPT_LANGUAGE.as_str())
                .map(str::to_owned),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

//! Client metadata extractor for audit entries.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
};

use crate::config::{
    HEADER_FORWARDED_FOR, HEADER_PROXY_CLIENT_IP, HEADER_SESSION_ID, HEADER_WL_PROXY_CLIENT_IP,
};
use crate::domain::RequestContext;

/// Request metadata captured for the audit ledger. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct ClientContext(pub RequestContext);

#[async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientContext(RequestContext {
            forwarded_for: header(headers, HEADER_FORWARDED_FOR),
            proxy_client_ip: header(headers, HEADER_PROXY_CLIENT_IP),
            wl_proxy_client_ip: header(headers, HEADER_WL_PROXY_CLIENT_IP),
            remote_addr,
            user_agent: header(headers, USER_AGENT.as_str()),
            session_id: header(headers, HEADER_SESSION_ID),
        }))
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

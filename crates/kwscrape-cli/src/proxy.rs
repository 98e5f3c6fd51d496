//! Stateless passthrough proxy that adds permissive CORS headers.
//!
//! `GET /?url=<target>` (or `/proxy?url=<target>`) fetches `target` and returns the
//! upstream status and body.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::collections::HashMap;

pub const DEFAULT_USER_AGENT: &str = "kwscrape-proxy";

#[derive(Debug, Clone)]
pub struct ProxyState {
    client: reqwest::Client,
}

pub fn router(client: reqwest::Client) -> Router {
    Router::new()
        .route("/", any(passthrough))
        .route("/proxy", any(passthrough))
        .with_state(ProxyState { client })
}

/// Upstream headers that must not be copied (connection-level, or invalidated because
/// the body has already been decoded).
fn is_hop_header(name: &str) -> bool {
    matches!(
        name,
        "connection"
            | "keep-alive"
            | "transfer-encoding"
            | "content-length"
            | "content-encoding"
            | "upgrade"
    )
}

fn cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, HEAD, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

async fn passthrough(
    State(state): State<ProxyState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let Some(target) = params.get("url").filter(|u| !u.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing \"url\" query parameter").into_response();
    };
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_USER_AGENT)
        .to_string();

    tracing::debug!(target = %target, "proxying");
    let upstream = match state
        .client
        .get(target.as_str())
        .header(reqwest::header::USER_AGENT, user_agent)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => return fetch_error(e),
    };

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut out_headers = HeaderMap::new();
    for (k, v) in upstream.headers() {
        if is_hop_header(k.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(k.as_str().as_bytes()),
            HeaderValue::from_bytes(v.as_bytes()),
        ) {
            out_headers.append(name, value);
        }
    }
    cors_headers(&mut out_headers);

    let body = match upstream.bytes().await {
        Ok(b) => b,
        Err(e) => return fetch_error(e),
    };
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    *resp.headers_mut() = out_headers;
    resp
}

fn fetch_error(e: reqwest::Error) -> Response {
    tracing::warn!("proxy fetch failed: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Error fetching the URL: {e}"),
    )
        .into_response()
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: std::net::SocketAddr, client: reqwest::Client) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("proxy listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(client)).await?;
    Ok(())
}

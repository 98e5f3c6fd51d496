use kwscrape_core::{Error, Result};
use std::time::Duration;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

/// Send the request built by `build`, retrying transport errors and non-ok statuses.
///
/// - 2xx and 404 responses are returned immediately (404 is a valid "no data" answer).
/// - On the last attempt a non-ok response is returned as-is; a transport error is
///   returned as `Error::Fetch`.
pub async fn fetch_with_retry<F>(policy: &RetryPolicy, mut build: F) -> Result<reqwest::Response>
where
    F: FnMut() -> reqwest::RequestBuilder,
{
    let attempts = policy.attempts.max(1);
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1u32;
    loop {
        let last = attempt >= attempts;
        match build().send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() || status == reqwest::StatusCode::NOT_FOUND || last {
                    return Ok(resp);
                }
                tracing::warn!(
                    "fetch failed with status {}; retrying in {}ms ({attempt}/{attempts})",
                    status.as_u16(),
                    backoff.as_millis()
                );
            }
            Err(e) => {
                if last {
                    return Err(Error::Fetch(e.to_string()));
                }
                tracing::warn!(
                    "fetch error: {e}; retrying in {}ms ({attempt}/{attempts})",
                    backoff.as_millis()
                );
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = backoff.saturating_mul(2);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            initial_backoff: Duration::from_millis(5),
        }
    }

    /// Serves `statuses` in order (repeating the last one) and counts hits.
    async fn scripted(statuses: Vec<StatusCode>) -> (SocketAddr, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new().route(
            "/",
            get({
                let hits = hits.clone();
                move || {
                    let n = hits.fetch_add(1, Ordering::SeqCst);
                    let status = statuses[n.min(statuses.len() - 1)];
                    async move { (status, "body") }
                }
            }),
        );
        (serve(app).await, hits)
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let (addr, hits) = scripted(vec![
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::BAD_GATEWAY,
            StatusCode::OK,
        ])
        .await;
        let client = reqwest::Client::new();
        let url = format!("http://{addr}/");
        let resp = fetch_with_retry(&fast(), || client.get(&url)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_terminal() {
        let (addr, hits) = scripted(vec![StatusCode::NOT_FOUND]).await;
        let client = reqwest::Client::new();
        let url = format!("http://{addr}/");
        let resp = fetch_with_retry(&fast(), || client.get(&url)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn returns_last_error_response_after_budget() {
        let (addr, hits) = scripted(vec![StatusCode::INTERNAL_SERVER_ERROR]).await;
        let client = reqwest::Client::new();
        let url = format!("http://{addr}/");
        let resp = fetch_with_retry(&fast(), || client.get(&url)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transport_error_after_budget_is_fetch_error() {
        // Bind and drop to get a port nobody listens on.
        let addr = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap()
        };
        let client = reqwest::Client::new();
        let url = format!("http://{addr}/");
        let err = fetch_with_retry(&fast(), || client.get(&url))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[test]
    fn default_policy_matches_documented_budget() {
        let p = RetryPolicy::default();
        assert_eq!(p.attempts, 3);
        assert_eq!(p.initial_backoff, Duration::from_millis(1000));
    }
}

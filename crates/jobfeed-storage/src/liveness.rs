//! Best-effort "is this posting still open" check.
//!
//! The probe only prunes obviously dead links. Anything it cannot decide,
//! including every transport failure, resolves to "keep".

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use jobfeed_core::is_absolute_http_url;
use reqwest::{Response, StatusCode};
use tracing::debug;

use crate::{default_headers, DEFAULT_USER_AGENT};

#[async_trait]
pub trait LivenessCheck: Send + Sync {
    /// `true` keeps the posting, `false` drops it as apparently closed.
    async fn probe(&self, url: &str) -> bool;
}

/// Not found, gone, or unavailable for legal reasons.
pub fn is_gone_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 404 | 410 | 451)
}

#[derive(Debug)]
pub struct LivenessProber {
    client: reqwest::Client,
    closed_markers: Vec<String>,
}

impl LivenessProber {
    /// `closed_markers` must already be lowercase.
    pub fn new(
        timeout: Duration,
        user_agent: Option<&str>,
        closed_markers: Vec<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .default_headers(default_headers())
            .build()
            .context("building liveness probe client")?;
        Ok(Self {
            client,
            closed_markers,
        })
    }

    fn has_closed_marker(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.closed_markers
            .iter()
            .any(|marker| lower.contains(marker.as_str()))
    }

    fn looks_open(&self, resp: &Response) -> bool {
        !self.has_closed_marker(resp.url().as_str()) && !is_gone_status(resp.status())
    }
}

#[async_trait]
impl LivenessCheck for LivenessProber {
    async fn probe(&self, url: &str) -> bool {
        if !is_absolute_http_url(url) {
            return false;
        }
        if self.has_closed_marker(url) {
            return false;
        }

        let head = match self.client.head(url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                debug!(url, error = %err, "liveness HEAD failed; keeping");
                return true;
            }
        };
        if !self.looks_open(&head) {
            return false;
        }
        if head.status() != StatusCode::METHOD_NOT_ALLOWED {
            return true;
        }

        // The GET body is never read; dropping the response closes it.
        match self.client.get(url).send().await {
            Ok(resp) => self.looks_open(&resp),
            Err(err) => {
                debug!(url, error = %err, "liveness GET failed; keeping");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn prober() -> LivenessProber {
        LivenessProber::new(
            Duration::from_secs(2),
            None,
            vec!["/closed".into(), "position-closed".into(), "position-filled".into()],
        )
        .expect("prober")
    }

    /// Minimal HTTP/1.1 responder: `reply(method, path)` returns the status
    /// line remainder plus any extra header lines.
    async fn stub_server(reply: fn(&str, &str) -> String) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let head = String::from_utf8_lossy(&buf[..n]).to_string();
                    let mut parts = head.split_whitespace();
                    let method = parts.next().unwrap_or_default();
                    let path = parts.next().unwrap_or_default();
                    let response = format!(
                        "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                        reply(method, path)
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn closed_marker_short_circuits_without_network() {
        // TEST-NET is unroutable: a real request would time out and keep the url.
        assert!(!prober().probe("http://192.0.2.1:9/careers/position-closed").await);
        assert!(!prober().probe("https://acme.com/jobs/1/POSITION-FILLED").await);
    }

    #[tokio::test]
    async fn non_http_urls_are_not_kept() {
        assert!(!prober().probe("").await);
        assert!(!prober().probe("ftp://acme.com/jobs/1").await);
        assert!(!prober().probe("/jobs/1").await);
    }

    #[tokio::test]
    async fn transport_failure_fails_open() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(prober().probe(&format!("http://{addr}/jobs/123")).await);
    }

    #[tokio::test]
    async fn gone_statuses_drop_and_others_keep() {
        let addr = stub_server(|_, path| match path {
            "/jobs/404" => "404 Not Found".to_string(),
            "/jobs/410" => "410 Gone".to_string(),
            "/jobs/451" => "451 Unavailable For Legal Reasons".to_string(),
            "/jobs/403" => "403 Forbidden".to_string(),
            "/jobs/500" => "500 Internal Server Error".to_string(),
            _ => "200 OK".to_string(),
        })
        .await;
        let p = prober();
        assert!(!p.probe(&format!("http://{addr}/jobs/404")).await);
        assert!(!p.probe(&format!("http://{addr}/jobs/410")).await);
        assert!(!p.probe(&format!("http://{addr}/jobs/451")).await);
        assert!(p.probe(&format!("http://{addr}/jobs/403")).await);
        assert!(p.probe(&format!("http://{addr}/jobs/500")).await);
        assert!(p.probe(&format!("http://{addr}/jobs/200")).await);
    }

    #[tokio::test]
    async fn method_not_allowed_falls_back_to_get() {
        let addr = stub_server(|method, path| match (method, path) {
            ("HEAD", _) => "405 Method Not Allowed".to_string(),
            ("GET", "/jobs/gone") => "404 Not Found".to_string(),
            _ => "200 OK".to_string(),
        })
        .await;
        let p = prober();
        assert!(!p.probe(&format!("http://{addr}/jobs/gone")).await);
        assert!(p.probe(&format!("http://{addr}/jobs/open")).await);
    }

    #[tokio::test]
    async fn redirect_to_closed_page_drops() {
        let addr = stub_server(|_, path| match path {
            "/jobs/77" => "302 Found\r\nlocation: /jobs/77/position-filled".to_string(),
            _ => "200 OK".to_string(),
        })
        .await;
        assert!(!prober().probe(&format!("http://{addr}/jobs/77")).await);
    }
}

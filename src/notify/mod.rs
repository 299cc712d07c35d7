// ABOUTME: Best-effort HTTP notifier fired on service state transitions.
// ABOUTME: POSTs JSON to <uri>/running and <uri>/stopped; failures swallowed.

use async_trait::async_trait;
use http_body_util::Full;
use hyper::Request;
use hyper::header::{CONTENT_TYPE, HOST};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::settings::CallbackSettings;

/// Body sent with every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackPayload {
    pub name: String,
    pub deployment: String,
    pub config: String,
}

/// Outbound notification capability. Both calls are fire-and-forget: they
/// never surface transport errors to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn running(&self, uri: &str, payload: &CallbackPayload);
    async fn stopped(&self, uri: &str, payload: &CallbackPayload);
}

/// HTTP notifier with short, separately configured connect and read
/// timeouts.
pub struct HttpNotifier {
    connect_timeout: Duration,
    read_timeout: Duration,
    ignore_callbacks: bool,
}

impl HttpNotifier {
    pub fn new(settings: &CallbackSettings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout,
            read_timeout: settings.read_timeout,
            ignore_callbacks: settings.ignore_callbacks,
        }
    }

    /// Host header value: host plus the port when one is written in the URI.
    fn host_header(uri: &hyper::Uri) -> Option<String> {
        let host = uri.host()?;
        Some(match uri.port_u16() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }

    fn endpoint_uri(base: &str, endpoint: &str) -> String {
        if base.ends_with('/') {
            format!("{base}{endpoint}")
        } else {
            format!("{base}/{endpoint}")
        }
    }

    async fn post(&self, base: &str, endpoint: &str, payload: &CallbackPayload) {
        if self.ignore_callbacks {
            return;
        }

        let uri = Self::endpoint_uri(base, endpoint);
        if let Err(e) = self.try_post(&uri, payload).await {
            tracing::debug!(uri = %uri, "notification failed: {e}");
        }
    }

    async fn try_post(
        &self,
        uri: &str,
        payload: &CallbackPayload,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let parsed: hyper::Uri = uri.parse()?;
        let authority = Self::host_header(&parsed).ok_or("notification uri has no host")?;
        let host = parsed.host().ok_or("notification uri has no host")?;
        let port = parsed.port_u16().unwrap_or(80);

        let stream = timeout(self.connect_timeout, TcpStream::connect((host, port))).await??;
        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("notification connection error: {e}");
            }
        });

        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method("POST")
            .uri(parsed.path_and_query().map_or("/", |pq| pq.as_str()))
            .header(HOST, authority)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(bytes::Bytes::from(body)))?;

        let response = timeout(self.read_timeout, sender.send_request(request)).await??;
        tracing::debug!(uri = %uri, status = %response.status(), "notification delivered");

        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn running(&self, uri: &str, payload: &CallbackPayload) {
        self.post(uri, "running", payload).await;
    }

    async fn stopped(&self, uri: &str, payload: &CallbackPayload) {
        self.post(uri, "stopped", payload).await;
    }
}

//! JSON-over-HTTP/1 helper.
//!
//! Opens one connection per request: plain TCP, hyper's HTTP/1 handshake,
//! connection driven in a background task. Only `http://` URLs are
//! supported.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::HttpError;

/// Characters left unescaped in a single path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a value for use as one URL path segment.
pub fn path_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub body: Bytes,
}

impl Response {
    /// True for 2xx and 3xx.
    pub fn is_accepted(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }

    /// Turn a non-accepted status into an error.
    pub fn accepted(self) -> Result<Self, HttpError> {
        if self.is_accepted() {
            Ok(self)
        } else {
            Err(HttpError::Status {
                status: self.status.as_u16(),
                body: String::from_utf8_lossy(&self.body).into_owned(),
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| HttpError::Decode(e.to_string()))
    }
}

/// Send a request with an optional JSON body and collect the response.
pub async fn request<B: Serialize + ?Sized>(
    method: Method,
    url: &str,
    body: Option<&B>,
    timeout: Duration,
) -> Result<Response, HttpError> {
    let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| HttpError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if uri.scheme_str().is_some_and(|s| s != "http") {
        return Err(HttpError::InvalidUrl {
            url: url.to_string(),
            reason: "only http:// is supported".to_string(),
        });
    }
    let authority = uri
        .authority()
        .cloned()
        .ok_or_else(|| HttpError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        })?;
    let address = format!("{}:{}", authority.host(), authority.port_u16().unwrap_or(80));
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let payload = match body {
        Some(b) => Bytes::from(serde_json::to_vec(b).map_err(|e| HttpError::Encode(e.to_string()))?),
        None => Bytes::new(),
    };

    let exchange = async move {
        let stream = tokio::net::TcpStream::connect(&address)
            .await
            .map_err(|e| HttpError::Connect {
                address: address.clone(),
                reason: e.to_string(),
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| HttpError::Handshake(e.to_string()))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "http connection closed with error");
            }
        });

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header(HOST, authority.as_str())
            .header(USER_AGENT, "alb/0.1")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(payload))
            .map_err(|e| HttpError::Request(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| HttpError::Request(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| HttpError::Body(e.to_string()))?
            .to_bytes();

        Ok(Response { status, body })
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(result) => result,
        Err(_) => {
            debug!(%url, "http request timed out");
            Err(HttpError::Timeout(timeout))
        }
    }
}

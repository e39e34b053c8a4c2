//! Transport boundary for the fleet directory.
//!
//! A [`Transport`] performs exactly one HTTP exchange and reports the status
//! and raw body. It never retries and never interprets status codes; both are
//! the client's job. Tests swap in a scripted transport to sequence responses.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::error::DirectoryError;

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing call. `path` is relative to the configured base URL and is
/// already percent-encoded where needed.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Single-exchange HTTP contract.
///
/// Returns `Ok` for every response the server produced, including 4xx/5xx.
/// `Err` is reserved for failures where no response exists (connect, timeout,
/// reset), which are always [`DirectoryError::Transport`].
pub trait Transport: Send + Sync {
    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, DirectoryError>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// Blocking `reqwest` transport with bearer-token auth.
pub struct ReqwestTransport {
    http: reqwest::blocking::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl ReqwestTransport {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Config(format!("http client build failed: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(DirectoryError::Config("base_url is empty".to_string()));
        }

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, DirectoryError> {
        let url = self.url(&req.path);
        let mut builder = match req.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
            HttpMethod::Patch => self.http.patch(&url),
        };

        builder = builder
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json");

        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| DirectoryError::Transport(format!("read body: {e}")))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let t = ReqwestTransport::new(
            "https://fleet.example/v1/",
            "tok-very-secret",
            Duration::from_secs(1),
        )
        .unwrap();
        let dbg = format!("{t:?}");
        assert!(!dbg.contains("tok-very-secret"));
        assert_eq!(t.base_url(), "https://fleet.example/v1");
    }

    #[test]
    fn url_joins_with_single_slash() {
        let t = ReqwestTransport::new("http://h/v1", "t", Duration::from_secs(1)).unwrap();
        assert_eq!(t.url("/fleet/drivers"), "http://h/v1/fleet/drivers");
        assert_eq!(t.url("fleet/drivers"), "http://h/v1/fleet/drivers");
    }

    #[test]
    fn empty_base_url_is_config_error() {
        let err = ReqwestTransport::new("", "t", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, DirectoryError::Config(_)));
    }

    #[test]
    fn request_builder_accumulates_query() {
        let r = HttpRequest::new(HttpMethod::Get, "/fleet/drivers")
            .query("driverActivationStatus", "active")
            .query("after", "c1");
        assert_eq!(r.query.len(), 2);
        assert_eq!(r.method.as_str(), "GET");
        assert!(r.body.is_none());
    }
}

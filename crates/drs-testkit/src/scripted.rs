use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use drs_directory::{DirectoryError, HttpRequest, HttpResponse, Transport};
use serde_json::Value;

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<HttpResponse, DirectoryError>>,
    requests: Vec<HttpRequest>,
}

/// Replays queued replies in order. Clones share the same script, so a test
/// keeps one handle for assertions and boxes another into the client.
///
/// Running out of replies is answered with a transport error naming the
/// request, which makes an under-scripted test fail loudly.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn push(&self, status: u16, body: impl Into<String>) -> &Self {
        self.lock()
            .replies
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push(status, body.to_string())
    }

    pub fn push_transport_error(&self, msg: &str) -> &Self {
        self.lock()
            .replies
            .push_back(Err(DirectoryError::Transport(msg.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn remaining(&self) -> usize {
        self.lock().replies.len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, DirectoryError> {
        let mut s = self.lock();
        s.requests.push(req.clone());
        s.replies.pop_front().unwrap_or_else(|| {
            Err(DirectoryError::Transport(format!(
                "script exhausted at {} {}",
                req.method, req.path
            )))
        })
    }
}

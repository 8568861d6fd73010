use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use serde_json::Value;

use crate::error::{NetError, NetResult};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

#[derive(Clone, Debug)]
enum Reply {
    Respond { status: u16, body: Vec<u8> },
    Unreachable(String),
}

/// Transport that answers from a script and records every request.
///
/// Intended for tests and offline embedding. URLs are matched exactly; an
/// unscripted URL fails with a transport error, so a test that forgets to
/// script a fallback sees the chain move on instead of hitting the network.
pub struct ScriptedTransport {
    replies: RwLock<HashMap<String, Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            replies: RwLock::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer `url` with a status and raw body.
    pub fn respond(&self, url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.replies.write().expect("lock poisoned").insert(
            url.into(),
            Reply::Respond {
                status,
                body: body.into(),
            },
        );
        self
    }

    /// Answer `url` with `200` and a JSON body.
    pub fn respond_json(&self, url: impl Into<String>, body: &Value) -> &Self {
        self.respond(url, 200, body.to_string())
    }

    /// Make `url` fail at the transport level.
    pub fn unreachable(&self, url: impl Into<String>, message: impl Into<String>) -> &Self {
        self.replies
            .write()
            .expect("lock poisoned")
            .insert(url.into(), Reply::Unreachable(message.into()));
        self
    }

    /// Number of requests made to exactly this URL.
    pub fn calls_to(&self, url: &str) -> usize {
        self.requests
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    /// Number of requests made in total.
    pub fn total_calls(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }

    /// Every request made so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> NetResult<HttpResponse> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(request.clone());

        let reply = self
            .replies
            .read()
            .expect("lock poisoned")
            .get(&request.url)
            .cloned();

        match reply {
            Some(Reply::Respond { status, body }) if status < 400 => Ok(HttpResponse {
                status,
                url: request.url.clone(),
                body,
            }),
            Some(Reply::Respond { status, body }) => Err(NetError::Status {
                status,
                url: request.url.clone(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
            Some(Reply::Unreachable(message)) => Err(NetError::Transport {
                url: request.url.clone(),
                message,
            }),
            None => Err(NetError::Transport {
                url: request.url.clone(),
                message: "no scripted reply".into(),
            }),
        }
    }
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("scripted", &self.replies.read().expect("lock poisoned").len())
            .field("calls", &self.total_calls())
            .finish()
    }
}

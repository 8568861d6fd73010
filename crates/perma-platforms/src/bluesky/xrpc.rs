//! AT Protocol XRPC access: sessions, handle resolution and threads.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use perma_chain::{Retrieval, RetrievalStrategy, StrategyError, StrategyResult};
use perma_net::{ArchiveMirror, HttpRequest, HttpTransport};
use perma_types::{PostRecord, PostReference};
use serde_json::{json, Value};
use tracing::info;
use url::Url;

use crate::config::BlueskyConfig;
use crate::fetch::{classify, get_json};

#[derive(Clone, Debug)]
struct Session {
    access_jwt: String,
    did: String,
}

/// Shared XRPC state for one run: the login session and a handle to DID
/// memo fed by every thread response.
pub struct XrpcClient {
    transport: Arc<dyn HttpTransport>,
    config: BlueskyConfig,
    session: RwLock<Option<Session>>,
    dids: RwLock<HashMap<String, String>>,
}

impl XrpcClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: BlueskyConfig) -> Self {
        Self {
            transport,
            config,
            session: RwLock::new(None),
            dids: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BlueskyConfig {
        &self.config
    }

    /// Access token, creating a session on first use.
    pub fn login(&self) -> StrategyResult<String> {
        if let Some(session) = self.session.read().expect("lock poisoned").as_ref() {
            return Ok(session.access_jwt.clone());
        }
        let (Some(identifier), Some(password)) =
            (&self.config.identifier, &self.config.app_password)
        else {
            return Err(StrategyError::Configuration(
                "no Bluesky identifier and app password".into(),
            ));
        };

        let url = format!(
            "{}/xrpc/com.atproto.server.createSession",
            self.config.service.trim_end_matches('/')
        );
        let request = HttpRequest::post_json(
            url,
            &json!({"identifier": identifier, "password": password}),
        )?;
        let response = self.transport.execute(&request).map_err(|e| match e.status() {
            Some(400) | Some(401) => StrategyError::Configuration(format!("login refused: {e}")),
            _ => classify(e),
        })?;
        let body: Value = response
            .json()
            .map_err(|e| StrategyError::Malformed(e.to_string()))?;
        let (Some(access_jwt), Some(did)) = (
            body.get("accessJwt").and_then(Value::as_str),
            body.get("did").and_then(Value::as_str),
        ) else {
            return Err(StrategyError::Malformed("createSession without token".into()));
        };

        info!(identifier = %identifier, did, "logged in to Bluesky");
        let session = Session {
            access_jwt: access_jwt.to_string(),
            did: did.to_string(),
        };
        let token = session.access_jwt.clone();
        *self.session.write().expect("lock poisoned") = Some(session);
        Ok(token)
    }

    /// DID of the logged-in account, if a session exists.
    pub fn session_did(&self) -> Option<String> {
        self.session
            .read()
            .expect("lock poisoned")
            .as_ref()
            .map(|s| s.did.clone())
    }

    pub fn remember_did(&self, handle: &str, did: &str) {
        self.dids
            .write()
            .expect("lock poisoned")
            .insert(handle.to_string(), did.to_string());
    }

    pub fn known_did(&self, handle: &str) -> Option<String> {
        self.dids.read().expect("lock poisoned").get(handle).cloned()
    }

    /// DID for a handle via `app.bsky.actor.getProfile`, memoised.
    pub fn resolve_did(&self, base: &str, token: Option<&str>, actor: &str) -> StrategyResult<String> {
        if actor.starts_with("did:") {
            return Ok(actor.to_string());
        }
        if let Some(did) = self.known_did(actor) {
            return Ok(did);
        }
        let url = xrpc_url(base, "app.bsky.actor.getProfile", &[("actor", actor)])?;
        let profile = get_json(self.transport.as_ref(), &authorize(HttpRequest::get(url), token))?;
        let did = profile
            .get("did")
            .and_then(Value::as_str)
            .ok_or_else(|| StrategyError::Malformed(format!("profile of {actor} has no did")))?;
        self.remember_did(actor, did);
        Ok(did.to_string())
    }

    /// `getPostThread` URL for a post.
    pub fn thread_url(base: &str, did: &str, rkey: &str) -> StrategyResult<String> {
        let uri = format!("at://{did}/app.bsky.feed.post/{rkey}");
        xrpc_url(
            base,
            "app.bsky.feed.getPostThread",
            &[("uri", uri.as_str()), ("depth", "1"), ("parentHeight", "1")],
        )
    }

    fn fetch_thread(
        &self,
        base: &str,
        token: Option<&str>,
        reference: &PostReference,
        mirror: Option<&ArchiveMirror>,
    ) -> StrategyResult<PostRecord> {
        let handle = reference
            .require_user_id()
            .map_err(|e| StrategyError::Malformed(e.to_string()))?;
        let did = self.resolve_did(base, token, handle)?;
        let mut url = Self::thread_url(base, &did, reference.post_id())?;
        if let Some(mirror) = mirror {
            url = mirror.raw_url(&url);
        }
        let response = get_json(self.transport.as_ref(), &authorize(HttpRequest::get(url), token))?;
        thread_record(&response, reference, self)
    }
}

fn authorize(request: HttpRequest, token: Option<&str>) -> HttpRequest {
    match token {
        Some(token) => request.bearer(token),
        None => request,
    }
}

fn xrpc_url(base: &str, method: &str, params: &[(&str, &str)]) -> StrategyResult<String> {
    let endpoint = format!("{}/xrpc/{method}", base.trim_end_matches('/'));
    Url::parse_with_params(&endpoint, params)
        .map(String::from)
        .map_err(|e| StrategyError::Configuration(format!("bad XRPC host {base}: {e}")))
}

/// Last path segment of an `at://` URI: the record key.
pub fn rkey_of(uri: &str) -> Option<&str> {
    uri.rsplit('/').next().filter(|s| !s.is_empty())
}

fn post_link(post: &Value, client: &XrpcClient) -> Option<Value> {
    let handle = post.pointer("/author/handle")?.as_str()?;
    if let Some(did) = post.pointer("/author/did").and_then(Value::as_str) {
        client.remember_did(handle, did);
    }
    let rkey = rkey_of(post.get("uri")?.as_str()?)?;
    Some(json!({"handle": handle, "rkey": rkey}))
}

/// Turn a `getPostThread` response into the stored record: the post itself
/// plus `id` and a `thread_context` naming its parent and direct replies.
pub fn thread_record(
    response: &Value,
    reference: &PostReference,
    client: &XrpcClient,
) -> StrategyResult<PostRecord> {
    let thread = response
        .get("thread")
        .ok_or_else(|| StrategyError::Malformed("response has no thread".into()))?;
    let kind = thread.get("$type").and_then(Value::as_str).unwrap_or_default();
    if kind.ends_with("#notFoundPost") || kind.ends_with("#blockedPost") {
        return Err(StrategyError::NotFound(format!("{reference}: {kind}")));
    }

    let mut post = thread
        .get("post")
        .filter(|p| p.is_object())
        .cloned()
        .ok_or_else(|| StrategyError::Malformed("thread has no post".into()))?;
    post_link(&post, client);

    let parent = thread
        .pointer("/parent/post")
        .and_then(|p| post_link(p, client))
        .unwrap_or(Value::Null);
    let replies: Vec<Value> = thread
        .get("replies")
        .and_then(Value::as_array)
        .map(|rs| {
            rs.iter()
                .filter_map(|r| r.get("post"))
                .filter_map(|p| post_link(p, client))
                .collect()
        })
        .unwrap_or_default();

    post["id"] = json!(reference.post_id());
    post["thread_context"] = json!({"parent": parent, "replies": replies});
    Ok(PostRecord::new(post))
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Authenticated `getPostThread` against the configured PDS.
pub struct SessionThread {
    client: Arc<XrpcClient>,
}

impl SessionThread {
    pub fn new(client: Arc<XrpcClient>) -> Self {
        Self { client }
    }
}

impl RetrievalStrategy for SessionThread {
    fn name(&self) -> &str {
        "bluesky-session"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        let token = self.client.login()?;
        let base = self.client.config().service.clone();
        let record = self.client.fetch_thread(&base, Some(&token), reference, None)?;
        info!(reference = %reference, "downloaded new skeet");
        Ok(Retrieval::fresh(reference.clone(), record))
    }
}

/// Unauthenticated `getPostThread` against the public AppView.
pub struct PublicThread {
    client: Arc<XrpcClient>,
}

impl PublicThread {
    pub fn new(client: Arc<XrpcClient>) -> Self {
        Self { client }
    }
}

impl RetrievalStrategy for PublicThread {
    fn name(&self) -> &str {
        "bluesky-appview"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        let base = self.client.config().appview.clone();
        let record = self.client.fetch_thread(&base, None, reference, None)?;
        info!(reference = %reference, "downloaded new skeet from public AppView");
        Ok(Retrieval::fresh(reference.clone(), record))
    }
}

/// An archived copy of the public AppView response.
pub struct ArchivedThread {
    client: Arc<XrpcClient>,
    archive: ArchiveMirror,
}

impl ArchivedThread {
    pub fn new(client: Arc<XrpcClient>, archive: ArchiveMirror) -> Self {
        Self { client, archive }
    }
}

impl RetrievalStrategy for ArchivedThread {
    fn name(&self) -> &str {
        "bluesky-archive"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        let base = self.client.config().appview.clone();
        let record = self
            .client
            .fetch_thread(&base, None, reference, Some(&self.archive))?;
        info!(reference = %reference, "recovered skeet from archive");
        Ok(Retrieval::fresh(reference.clone(), record))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use perma_net::ScriptedTransport;

    pub const APPVIEW: &str = "https://appview.example";
    pub const PDS: &str = "https://pds.example";
    pub const DID: &str = "did:plc:alice";

    pub fn config() -> BlueskyConfig {
        BlueskyConfig {
            service: PDS.into(),
            appview: APPVIEW.into(),
            identifier: None,
            app_password: None,
        }
    }

    pub fn profile_url(base: &str, handle: &str) -> String {
        format!("{base}/xrpc/app.bsky.actor.getProfile?actor={handle}")
    }

    pub fn thread_response() -> Value {
        json!({"thread": {
            "$type": "app.bsky.feed.defs#threadViewPost",
            "post": {
                "uri": "at://did:plc:alice/app.bsky.feed.post/3kabc",
                "author": {"did": DID, "handle": "alice.example", "displayName": "Alice", "avatar": "https://cdn.example/avatar/plain/did:plc:alice/bafy@jpeg"},
                "record": {"text": "hello\nthere", "createdAt": "2024-01-02T03:04:05Z"},
                "embed": {"images": [{"fullsize": "https://cdn.example/img/feed_fullsize/plain/did:plc:alice/bafk@jpeg", "thumb": "t"}]},
            },
            "parent": {"post": {
                "uri": "at://did:plc:bob/app.bsky.feed.post/3kpar",
                "author": {"did": "did:plc:bob", "handle": "bob.example"},
            }},
            "replies": [{"post": {
                "uri": "at://did:plc:carol/app.bsky.feed.post/3krep",
                "author": {"did": "did:plc:carol", "handle": "carol.example"},
            }}],
        }})
    }

    pub fn script_thread(t: &ScriptedTransport, base: &str) {
        t.respond_json(profile_url(base, "alice.example"), &json!({"did": DID}));
        let url = XrpcClient::thread_url(base, DID, "3kabc").unwrap();
        t.respond_json(url, &thread_response());
    }

    #[test]
    fn thread_record_adds_id_and_context() {
        let t = Arc::new(ScriptedTransport::new());
        let client = XrpcClient::new(t, config());
        let r = PostReference::new("alice.example", "3kabc");
        let record = thread_record(&thread_response(), &r, &client).unwrap();

        assert_eq!(record.string_at("/id").as_deref(), Some("3kabc"));
        assert_eq!(
            record.get("/thread_context/parent"),
            Some(&json!({"handle": "bob.example", "rkey": "3kpar"}))
        );
        assert_eq!(record.array_at("/thread_context/replies").len(), 1);
        assert_eq!(client.known_did("carol.example").as_deref(), Some("did:plc:carol"));
    }

    #[test]
    fn not_found_thread() {
        let t = Arc::new(ScriptedTransport::new());
        let client = XrpcClient::new(t, config());
        let resp = json!({"thread": {"$type": "app.bsky.feed.defs#notFoundPost", "uri": "at://x"}});
        let err = thread_record(&resp, &PostReference::new("a", "b"), &client).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn thread_url_encodes_uri() {
        let url = XrpcClient::thread_url(APPVIEW, DID, "3kabc").unwrap();
        assert_eq!(
            url,
            "https://appview.example/xrpc/app.bsky.feed.getPostThread?uri=at%3A%2F%2Fdid%3Aplc%3Aalice%2Fapp.bsky.feed.post%2F3kabc&depth=1&parentHeight=1"
        );
    }

    #[test]
    fn session_requires_credentials() {
        let t = Arc::new(ScriptedTransport::new());
        let s = SessionThread::new(Arc::new(XrpcClient::new(t.clone(), config())));
        let err = s
            .retrieve(&PostReference::new("alice.example", "3kabc"))
            .unwrap_err();
        assert!(matches!(err, StrategyError::Configuration(_)));
        assert_eq!(t.total_calls(), 0);
    }

    #[test]
    fn session_logs_in_once_and_sends_token() {
        let t = Arc::new(ScriptedTransport::new());
        t.respond_json(
            format!("{PDS}/xrpc/com.atproto.server.createSession"),
            &json!({"accessJwt": "jwt", "did": "did:plc:me"}),
        );
        script_thread(&t, PDS);
        let mut cfg = config();
        cfg.identifier = Some("me.example".into());
        cfg.app_password = Some("pw".into());
        let client = Arc::new(XrpcClient::new(t.clone(), cfg));
        let s = SessionThread::new(client.clone());

        let r = PostReference::new("alice.example", "3kabc");
        s.retrieve(&r).unwrap();
        s.retrieve(&r).unwrap();

        assert_eq!(t.calls_to(&format!("{PDS}/xrpc/com.atproto.server.createSession")), 1);
        assert_eq!(t.calls_to(&profile_url(PDS, "alice.example")), 1);
        assert_eq!(client.session_did().as_deref(), Some("did:plc:me"));
        let last = t.requests().pop().unwrap();
        assert!(last.headers.contains(&("Authorization".into(), "Bearer jwt".into())));
    }

    #[test]
    fn public_and_archived_threads() {
        let t = Arc::new(ScriptedTransport::new());
        let client = Arc::new(XrpcClient::new(t.clone(), config()));
        let r = PostReference::new("alice.example", "3kabc");

        assert!(PublicThread::new(client.clone()).retrieve(&r).is_err());

        t.respond_json(profile_url(APPVIEW, "alice.example"), &json!({"did": DID}));
        let mirror = ArchiveMirror::new("https://archive.example");
        let archived = mirror.raw_url(&XrpcClient::thread_url(APPVIEW, DID, "3kabc").unwrap());
        t.respond_json(archived, &thread_response());

        let got = ArchivedThread::new(client, mirror).retrieve(&r).unwrap();
        assert!(got.is_new_work);
        assert_eq!(got.record.string_at("/record/text").as_deref(), Some("hello\nthere"));
    }
}

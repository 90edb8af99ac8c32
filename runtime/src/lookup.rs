use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use replydesk_core::{ActivityDigest, Post, Profile, RecordId};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::RuntimeConfig;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Caller cancellation or internal timeout; the two are not told apart.
    #[error("lookup cancelled")]
    Cancelled,
    #[error("HTTP {status} {reason}{}", body_suffix(.body))]
    Http {
        status: u16,
        reason: String,
        body: String,
    },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl LookupError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// GETs JSON from the profile API. `path` is relative to the API base.
#[async_trait]
pub trait JsonTransport: Send + Sync {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, LookupError>;
}

/// reqwest-backed transport for the public profile API.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }
}

#[async_trait]
impl JsonTransport for HttpTransport {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, LookupError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| LookupError::Transport(format!("invalid URL for {path}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LookupError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))
    }
}

/// Two-tier profile lookup plus best-effort activity fetch.
/// Every request races the caller's token and the timeout budget.
#[derive(Clone)]
pub struct ProfileLookup {
    transport: Arc<dyn JsonTransport>,
    timeout: Duration,
}

impl ProfileLookup {
    pub fn new(transport: Arc<dyn JsonTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            Arc::new(HttpTransport::new(config.api_base.clone())),
            config.lookup_timeout,
        )
    }

    /// Exact filter first (trusted, case-sensitive); otherwise scan the full
    /// collection for a case-insensitive match.
    pub async fn lookup(
        &self,
        email: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Profile>, LookupError> {
        let exact = self
            .guarded(cancel, self.transport.get_json("users", &[("email", email.to_string())]))
            .await?;
        if let Some(first) = exact.as_array().and_then(|items| items.first()) {
            if !first.is_null() {
                return parse_profile(first.clone()).map(Some);
            }
        }

        tracing::debug!(email, "no exact-filter match; scanning full user list");
        let all = self
            .guarded(cancel, self.transport.get_json("users", &[]))
            .await?;
        let items = match all {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(LookupError::Malformed(format!(
                    "expected a user list, got {}",
                    json_kind(&other)
                )));
            }
        };
        let wanted = email.to_lowercase();
        items
            .into_iter()
            .find(|item| {
                item.get("email")
                    .and_then(Value::as_str)
                    .is_some_and(|candidate| candidate.to_lowercase() == wanted)
            })
            .map(parse_profile)
            .transpose()
    }

    /// Most recent activity titles for a profile, newest first, at most three.
    /// A profile without an id has no activity to fetch.
    pub async fn recent_activity(
        &self,
        profile_id: &RecordId,
        cancel: &CancellationToken,
    ) -> Result<ActivityDigest, LookupError> {
        if profile_id.is_empty() {
            return Ok(ActivityDigest::empty());
        }
        let posts = self
            .guarded(
                cancel,
                self.transport
                    .get_json("posts", &[("userId", profile_id.to_string())]),
            )
            .await?;
        let Value::Array(items) = posts else {
            return Ok(ActivityDigest::empty());
        };
        // non-object entries still count, as untitled posts with id 0
        let posts = items
            .into_iter()
            .map(|item| serde_json::from_value::<Post>(item).unwrap_or_default())
            .collect();
        Ok(ActivityDigest::from_posts(posts))
    }

    async fn guarded<F>(&self, cancel: &CancellationToken, request: F) -> Result<Value, LookupError>
    where
        F: Future<Output = Result<Value, LookupError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LookupError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, request) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(timeout_ms = self.timeout.as_millis() as u64, "lookup request timed out");
                    Err(LookupError::Cancelled)
                }
            },
        }
    }
}

fn parse_profile(value: Value) -> Result<Profile, LookupError> {
    serde_json::from_value(value).map_err(|e| LookupError::Malformed(format!("user record: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    use replydesk_core::RecordId;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use url::Url;

    use super::{HttpTransport, JsonTransport, LookupError, ProfileLookup};

    /// A queued reply: optional delay, then the result.
    pub(crate) type Reply = (Duration, Result<Value, LookupError>);

    /// Canned transport that records every request path + query.
    #[derive(Default)]
    pub(crate) struct StubTransport {
        requests: Mutex<Vec<String>>,
        replies: Mutex<VecDeque<Reply>>,
    }

    impl StubTransport {
        pub(crate) async fn push(&self, value: Value) {
            self.push_delayed(Duration::ZERO, Ok(value)).await;
        }

        pub(crate) async fn push_err(&self, err: LookupError) {
            self.push_delayed(Duration::ZERO, Err(err)).await;
        }

        pub(crate) async fn push_delayed(&self, delay: Duration, reply: Result<Value, LookupError>) {
            self.replies.lock().await.push_back((delay, reply));
        }

        pub(crate) async fn requests(&self) -> Vec<String> {
            self.requests.lock().await.clone()
        }
    }

    #[async_trait]
    impl JsonTransport for StubTransport {
        async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, LookupError> {
            let rendered = query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            self.requests.lock().await.push(if rendered.is_empty() {
                path.to_string()
            } else {
                format!("{path}?{rendered}")
            });
            let next = self.replies.lock().await.pop_front();
            match next {
                Some((delay, reply)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    reply
                }
                None => Err(LookupError::Transport("stub transport has no more queued replies".into())),
            }
        }
    }

    pub(crate) fn user(id: i64, name: &str, email: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "email": email,
            "address": { "city": "Gwenborough" },
            "website": "hildegard.org",
            "company": { "name": "Romaguera-Crona" }
        })
    }

    fn lookup_with(stub: &Arc<StubTransport>) -> ProfileLookup {
        ProfileLookup::new(stub.clone(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn exact_filter_hit_returns_first_record() {
        let stub = Arc::new(StubTransport::default());
        stub.push(json!([user(1, "Leanne Graham", "Sincere@april.biz")])).await;

        let found = lookup_with(&stub)
            .lookup("Sincere@april.biz", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name(), Some("Leanne Graham"));
        assert_eq!(stub.requests().await, ["users?email=Sincere@april.biz"]);
    }

    #[tokio::test]
    async fn full_scan_matches_case_insensitively() {
        let stub = Arc::new(StubTransport::default());
        stub.push(json!([])).await;
        stub.push(json!([
            user(1, "Leanne Graham", "Sincere@april.biz"),
            user(2, "Ervin Howell", "Shanna@melissa.tv")
        ]))
        .await;

        let found = lookup_with(&stub)
            .lookup("shanna@MELISSA.tv", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, RecordId::from(2));
        assert_eq!(stub.requests().await, ["users?email=shanna@MELISSA.tv", "users"]);
    }

    #[tokio::test]
    async fn null_first_element_falls_through_to_scan() {
        let stub = Arc::new(StubTransport::default());
        stub.push(json!([null])).await;
        stub.push(json!([user(1, "Leanne Graham", "Sincere@april.biz")])).await;

        let found = lookup_with(&stub)
            .lookup("nobody@x.io", &CancellationToken::new())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn http_failure_is_reported_with_status() {
        let stub = Arc::new(StubTransport::default());
        stub.push_err(LookupError::Http {
            status: 500,
            reason: "Internal Server Error".into(),
            body: "boom".into(),
        })
        .await;

        let err = lookup_with(&stub)
            .lookup("a@b.co", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "HTTP 500 Internal Server Error: boom");
    }

    #[tokio::test]
    async fn non_list_scan_body_is_malformed() {
        let stub = Arc::new(StubTransport::default());
        stub.push(json!([])).await;
        stub.push(json!({"users": []})).await;

        let err = lookup_with(&stub)
            .lookup("a@b.co", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Malformed(_)));
    }

    #[tokio::test]
    async fn timeout_reads_as_cancellation() {
        let stub = Arc::new(StubTransport::default());
        stub.push_delayed(Duration::from_millis(500), Ok(json!([]))).await;

        let lookup = ProfileLookup::new(stub.clone(), Duration::from_millis(20));
        let err = lookup
            .lookup("a@b.co", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn caller_cancellation_aborts_in_flight_request() {
        let stub = Arc::new(StubTransport::default());
        stub.push_delayed(Duration::from_secs(2), Ok(json!([]))).await;

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = lookup_with(&stub).lookup("a@b.co", &token).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn recent_activity_keeps_three_newest() {
        let stub = Arc::new(StubTransport::default());
        stub.push(json!([
            {"id": 1, "title": "one"},
            {"id": 2, "title": "two"},
            {"id": 3, "title": "three"},
            {"id": 4, "title": "four"},
            {"id": 5, "title": "five"}
        ]))
        .await;

        let digest = lookup_with(&stub)
            .recent_activity(&RecordId::from(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(digest.titles(), ["five", "four", "three"]);
        assert_eq!(stub.requests().await, ["posts?userId=1"]);
    }

    #[tokio::test]
    async fn recent_activity_tolerates_non_list_body() {
        let stub = Arc::new(StubTransport::default());
        stub.push(json!({"error": "nope"})).await;

        let digest = lookup_with(&stub)
            .recent_activity(&RecordId::from(1), &CancellationToken::new())
            .await
            .unwrap();
        assert!(digest.is_empty());
    }

    #[tokio::test]
    async fn null_titles_and_string_ids_stay_in_the_digest() {
        let stub = Arc::new(StubTransport::default());
        stub.push(json!([
            {"id": 1, "title": "one"},
            {"id": 2, "title": "two"},
            {"id": "3", "title": "three"},
            {"id": 4, "title": null},
            {"id": 5, "title": "five"}
        ]))
        .await;

        let digest = lookup_with(&stub)
            .recent_activity(&RecordId::from(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(digest.titles(), ["five", "", "three"]);
    }

    #[tokio::test]
    async fn string_profile_id_resolves_and_feeds_activity_query() {
        let stub = Arc::new(StubTransport::default());
        stub.push(json!([{"id": "7", "name": "Seven", "email": "a@b.co"}])).await;
        stub.push(json!([])).await;

        let lookup = lookup_with(&stub);
        let token = CancellationToken::new();
        let found = lookup.lookup("a@b.co", &token).await.unwrap().unwrap();
        assert_eq!(found.id.as_str(), "7");
        lookup.recent_activity(&found.id, &token).await.unwrap();
        assert_eq!(stub.requests().await[1], "posts?userId=7");
    }

    #[tokio::test]
    async fn profile_without_id_skips_activity_request() {
        let stub = Arc::new(StubTransport::default());
        let digest = lookup_with(&stub)
            .recent_activity(&RecordId::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(digest.is_empty());
        assert!(stub.requests().await.is_empty());
    }

    /// Serve one canned HTTP response on a local port. The handle yields the
    /// request head that was received.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&head).into_owned()
        });
        (Url::parse(&format!("http://{addr}/")).unwrap(), handle)
    }

    #[tokio::test]
    async fn http_transport_maps_server_error_with_status_and_body() {
        let (base, server) = serve_once("500 Internal Server Error", "boom").await;
        let err = HttpTransport::new(base)
            .get_json("users", &[("email", "a@b.co".to_string())])
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Http { status: 500, .. }));
        assert_eq!(err.to_string(), "HTTP 500 Internal Server Error: boom");

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /users?email=a%40b.co HTTP/1.1"));
        assert!(head.to_ascii_lowercase().contains("accept: application/json"));
    }

    #[tokio::test]
    async fn http_transport_reports_invalid_json_as_malformed() {
        let (base, _server) = serve_once("200 OK", "{not json").await;
        let err = HttpTransport::new(base).get_json("users", &[]).await.unwrap_err();
        assert!(matches!(err, LookupError::Malformed(_)));
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn http_transport_returns_parsed_body_on_success() {
        let (base, server) = serve_once("200 OK", r#"[{"id": 1, "title": "one"}]"#).await;
        let value = HttpTransport::new(base)
            .get_json("posts", &[("userId", "1".to_string())])
            .await
            .unwrap();
        assert_eq!(value, json!([{"id": 1, "title": "one"}]));
        assert!(server.await.unwrap().starts_with("GET /posts?userId=1 "));
    }
}

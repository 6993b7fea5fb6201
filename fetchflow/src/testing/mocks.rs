//! Scripted doubles for resolvers and transports.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::oneshot;

use crate::errors::{ResolveError, TransportError};
use crate::stages::StageResolver;
use crate::transport::{HttpTransport, JsonResponse};

type Reply<O> = Result<O, ResolveError>;

/// A resolver that answers the n-th call with the n-th scripted reply.
///
/// Replies are either ready up front ([`push_ready`](Self::push_ready)) or
/// held behind a gate ([`push_gate`](Self::push_gate)) so a test can choose
/// the order in which overlapping calls complete.
pub struct ScriptedResolver<I, O> {
    name: String,
    replies: Mutex<VecDeque<oneshot::Receiver<Reply<O>>>>,
    inputs: Mutex<Vec<I>>,
}

impl<I, O> ScriptedResolver<I, O> {
    /// Creates a resolver with no scripted replies.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(VecDeque::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Queues a reply that is available immediately.
    pub fn push_ready(&self, reply: Reply<O>) {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive in the queue, so the send cannot fail.
        let _ = tx.send(reply);
        self.replies.lock().push_back(rx);
    }

    /// Queues a reply that is released when the returned sender fires.
    #[must_use]
    pub fn push_gate(&self) -> oneshot::Sender<Reply<O>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().push_back(rx);
        tx
    }

    /// Returns the number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inputs.lock().len()
    }
}

impl<I: Clone, O> ScriptedResolver<I, O> {
    /// Returns the inputs of every call, in order.
    #[must_use]
    pub fn received_inputs(&self) -> Vec<I> {
        self.inputs.lock().clone()
    }
}

impl<I, O> fmt::Debug for ScriptedResolver<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedResolver")
            .field("name", &self.name)
            .field("pending", &self.replies.lock().len())
            .finish()
    }
}

#[async_trait]
impl<I, O> StageResolver for ScriptedResolver<I, O>
where
    I: Clone + Send + Sync,
    O: Send,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, input: &I) -> Result<O, ResolveError> {
        self.inputs.lock().push(input.clone());
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(ResolveError::Transport(TransportError::Request(
                    "scripted reply dropped".to_string(),
                )))
            }),
            None => Err(ResolveError::Transport(TransportError::Request(
                "no scripted reply".to_string(),
            ))),
        }
    }
}

/// A request captured by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// `GET` or `POST`.
    pub method: &'static str,
    /// Request URL without query string.
    pub url: String,
    /// Query parameters, in the order given.
    pub query: Vec<(String, String)>,
    /// Bearer token, if any.
    pub bearer: Option<String>,
    /// JSON body for POST requests.
    pub body: Option<serde_json::Value>,
}

impl RecordedRequest {
    /// Returns the value of a query parameter.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// An [`HttpTransport`] answering from a routing table.
///
/// The first route whose pattern is contained in the request URL answers.
/// Routes answer every matching request with the same reply.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<(String, Result<JsonResponse, TransportError>)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route answering with `reply`.
    #[must_use]
    pub fn route(self, pattern: impl Into<String>, reply: Result<JsonResponse, TransportError>) -> Self {
        self.routes.lock().push((pattern.into(), reply));
        self
    }

    /// Adds a route answering 200 with `body`.
    #[must_use]
    pub fn route_json(self, pattern: impl Into<String>, body: serde_json::Value) -> Self {
        self.route(pattern, Ok(JsonResponse::ok(body)))
    }

    /// Returns every recorded request.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests whose URL contains `pattern`.
    #[must_use]
    pub fn call_count(&self, pattern: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.contains(pattern))
            .count()
    }

    fn answer(&self, request: RecordedRequest) -> Result<JsonResponse, TransportError> {
        let reply = self
            .routes
            .lock()
            .iter()
            .find(|(pattern, _)| request.url.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());
        self.requests.lock().push(request);
        reply.unwrap_or_else(|| Ok(JsonResponse::with_status(404, serde_json::Value::Null)))
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<JsonResponse, TransportError> {
        self.answer(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            bearer: None,
            body: None,
        })
    }

    async fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<JsonResponse, TransportError> {
        self.answer(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            query: Vec::new(),
            bearer: bearer.map(str::to_string),
            body: Some(body.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_resolver_replays_in_order() {
        let resolver: ScriptedResolver<u32, &str> = ScriptedResolver::new("r");
        resolver.push_ready(Ok("one"));
        resolver.push_ready(Err(ResolveError::NoMatch("two".into())));

        assert_eq!(resolver.resolve(&1).await, Ok("one"));
        assert!(resolver.resolve(&2).await.is_err());
        assert!(resolver.resolve(&3).await.is_err());
        assert_eq!(resolver.call_count(), 3);
        assert_eq!(resolver.received_inputs(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_scripted_resolver_gate() {
        let resolver: ScriptedResolver<u32, u32> = ScriptedResolver::new("r");
        let gate = resolver.push_gate();
        gate.send(Ok(5)).unwrap();
        assert_eq!(resolver.resolve(&0).await, Ok(5));
    }

    #[tokio::test]
    async fn test_scripted_transport_routes() {
        let transport = ScriptedTransport::new()
            .route_json("/geo", serde_json::json!([]))
            .route("/down", Err(TransportError::Timeout));

        let resp = transport
            .get_json("https://x/geo/1.0/direct", &[("q", "Paris".to_string())])
            .await
            .unwrap();
        assert_eq!(resp.body, serde_json::json!([]));
        assert_eq!(transport.get_json("https://x/down", &[]).await, Err(TransportError::Timeout));

        let missing = transport.get_json("https://x/other", &[]).await.unwrap();
        assert_eq!(missing.status, 404);

        assert_eq!(transport.call_count("/geo"), 1);
        assert_eq!(transport.requests()[0].query_value("q"), Some("Paris"));
    }

    #[tokio::test]
    async fn test_scripted_transport_records_post() {
        let transport = ScriptedTransport::new().route_json("/shorten", serde_json::json!({"id": "x"}));
        transport
            .post_json("https://x/v4/shorten", Some("tok"), &serde_json::json!({"long_url": "u"}))
            .await
            .unwrap();

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.bearer.as_deref(), Some("tok"));
    }
}

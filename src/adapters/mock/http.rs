//! Mock HTTP client for testing.
//!
//! Responses are configured per URL (optionally per method) and every
//! request is recorded for later assertions.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET, POST or DELETE)
    pub method: String,
    pub url: String,
    pub headers: Headers,
    /// Request body (for POST requests)
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Parse the recorded body as JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a complete response
    Success(Response),
    /// Fail the request before any response
    Error(HttpError),
    /// Stream these chunks, then end the body
    Stream(Vec<Bytes>),
    /// Stream these chunks, then fail the body read
    StreamThenError(Vec<Bytes>, HttpError),
    /// Stream these chunks, then never produce another one
    StreamThenPending(Vec<Bytes>),
}

impl MockResponse {
    /// A 200 response with a JSON body.
    pub fn json(value: serde_json::Value) -> Self {
        MockResponse::Success(Response::json_body(200, &value))
    }

    /// A streamed body made of the given NDJSON lines, one chunk per line.
    pub fn ndjson_lines(lines: &[&str]) -> Self {
        MockResponse::Stream(
            lines
                .iter()
                .map(|line| Bytes::from(format!("{}\n", line)))
                .collect(),
        )
    }
}

/// Mock HTTP client for testing.
///
/// # Example
///
/// ```ignore
/// use ollama_chat::adapters::mock::{MockHttpClient, MockResponse};
/// use ollama_chat::traits::{HttpClient, Headers};
///
/// let client = MockHttpClient::new();
/// client.set_response(
///     "http://localhost:8000/api/models",
///     MockResponse::json(serde_json::json!({"models": []})),
/// );
///
/// let response = client.get("http://localhost:8000/api/models", &Headers::new()).await?;
/// assert_eq!(response.status, 200);
/// assert_eq!(client.get_requests().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// Responses keyed by (method, url). A `None` method matches any.
    responses: Arc<Mutex<HashMap<(Option<String>, String), MockResponse>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a response for a URL, whatever the method.
    ///
    /// URLs match exactly first, then by the longest configured prefix.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        self.insert(None, url, response);
    }

    /// Set a response for one method and URL.
    pub fn set_response_for(&self, method: &str, url: &str, response: MockResponse) {
        self.insert(Some(method.to_uppercase()), url, response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock().unwrap() = Some(response);
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests with the given method.
    pub fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        self.get_requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    pub fn clear_responses(&self) {
        self.responses.lock().unwrap().clear();
    }

    fn insert(&self, method: Option<String>, url: &str, response: MockResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert((method, url.to_string()), response);
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    fn find_response(&self, method: &str, url: &str) -> Option<MockResponse> {
        let responses = self.responses.lock().unwrap();
        let applies = |key_method: &Option<String>| {
            key_method.as_deref().map_or(true, |m| m == method)
        };

        // Method-specific entries win over method-agnostic ones.
        let exact = responses
            .get(&(Some(method.to_string()), url.to_string()))
            .or_else(|| responses.get(&(None, url.to_string())));
        if let Some(response) = exact {
            return Some(response.clone());
        }

        let prefix = responses
            .iter()
            .filter(|((key_method, pattern), _)| applies(key_method) && url.starts_with(pattern.as_str()))
            .max_by_key(|((key_method, pattern), _)| (pattern.len(), key_method.is_some()))
            .map(|(_, response)| response.clone());
        if prefix.is_some() {
            return prefix;
        }

        self.default_response.lock().unwrap().clone()
    }

    fn respond(&self, method: &str, url: &str) -> Result<Response, HttpError> {
        match self.find_response(method, url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(_) => Err(HttpError::Other(
                "Stream response on non-stream request".to_string(),
            )),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("GET", url, headers, None);
        self.respond("GET", url)
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));
        self.respond("POST", url)
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("DELETE", url, headers, None);
        self.respond("DELETE", url)
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));

        match self.find_response("POST", url) {
            Some(MockResponse::Stream(chunks)) => Ok(Box::pin(stream::iter(
                chunks.into_iter().map(Ok),
            ))),
            Some(MockResponse::StreamThenError(chunks, err)) => Ok(Box::pin(
                stream::iter(chunks.into_iter().map(Ok)).chain(stream::once(async move { Err(err) })),
            )),
            Some(MockResponse::StreamThenPending(chunks)) => Ok(Box::pin(
                stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()),
            )),
            Some(MockResponse::Success(response)) if !response.is_success() => {
                Err(HttpError::ServerError {
                    status: response.status,
                    message: response.text(),
                })
            }
            Some(MockResponse::Success(response)) => {
                Ok(Box::pin(stream::iter(std::iter::once(Ok(response.body)))))
            }
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_with_response() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://localhost/api/models",
            MockResponse::Success(Response::new(200, Bytes::from("Hello"))),
        );

        let response = client
            .get("http://localhost/api/models", &Headers::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from("Hello"));

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
    }

    #[tokio::test]
    async fn test_method_specific_response_wins() {
        let client = MockHttpClient::new();
        client.set_response("http://localhost/api/conversations", MockResponse::json(serde_json::json!([])));
        client.set_response_for(
            "DELETE",
            "http://localhost/api/conversations",
            MockResponse::json(serde_json::json!({"ok": true})),
        );

        let listed = client
            .get("http://localhost/api/conversations", &Headers::new())
            .await
            .unwrap();
        assert_eq!(listed.text(), "[]");

        let deleted = client
            .delete("http://localhost/api/conversations/abc", &Headers::new())
            .await
            .unwrap();
        assert!(deleted.text().contains("ok"));
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let client = MockHttpClient::new();
        client.set_response("http://localhost/api", MockResponse::json(serde_json::json!(1)));
        client.set_response(
            "http://localhost/api/running",
            MockResponse::json(serde_json::json!(2)),
        );

        let response = client
            .get("http://localhost/api/running?x=1", &Headers::new())
            .await
            .unwrap();
        assert_eq!(response.text(), "2");
    }

    #[tokio::test]
    async fn test_post_stream_with_chunks() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://localhost/api/chat",
            MockResponse::ndjson_lines(&["{\"a\":1}", "{\"done\":true}"]),
        );

        let mut stream = client
            .post_stream("http://localhost/api/chat", "{}", &Headers::new())
            .await
            .unwrap();

        let mut chunks = Vec::new();
        while let Some(result) = stream.next().await {
            chunks.push(result.unwrap());
        }
        assert_eq!(chunks, vec![Bytes::from("{\"a\":1}\n"), Bytes::from("{\"done\":true}\n")]);
    }

    #[tokio::test]
    async fn test_stream_then_error() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://localhost/api/chat",
            MockResponse::StreamThenError(
                vec![Bytes::from("x\n")],
                HttpError::Io("reset".to_string()),
            ),
        );
        let mut stream = client
            .post_stream("http://localhost/api/chat", "{}", &Headers::new())
            .await
            .unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert_eq!(
            stream.next().await.unwrap(),
            Err(HttpError::Io("reset".to_string()))
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_post_stream_error_status() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://localhost/api/chat",
            MockResponse::Success(Response::new(502, Bytes::from("bad gateway"))),
        );
        let result = client
            .post_stream("http://localhost/api/chat", "{}", &Headers::new())
            .await;
        assert!(matches!(
            result,
            Err(HttpError::ServerError { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_no_response_configured() {
        let client = MockHttpClient::new();
        let result = client
            .get("http://localhost/missing", &Headers::new())
            .await;
        assert!(matches!(result, Err(HttpError::Other(_))));
    }

    #[tokio::test]
    async fn test_default_response() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::Success(Response::new(
            404,
            Bytes::from("Not Found"),
        )));
        let response = client
            .get("http://localhost/anything", &Headers::new())
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_recorded_json_body() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::json(serde_json::json!({})));
        client
            .post("http://localhost/api/pull", r#"{"model":"llama3"}"#, &Headers::new())
            .await
            .unwrap();
        let requests = client.requests_with_method("POST");
        assert_eq!(requests[0].json_body().unwrap()["model"], "llama3");
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::json(serde_json::json!({})));
        let cloned = client.clone();
        cloned
            .get("http://localhost/x", &Headers::new())
            .await
            .unwrap();
        assert_eq!(client.get_requests().len(), 1);
        client.clear_requests();
        assert!(cloned.get_requests().is_empty());
    }
}

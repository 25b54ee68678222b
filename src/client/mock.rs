//! Scripted HTTP transport for testing
//!
//! Replays canned responses in order and captures every request, so the
//! REST client can be exercised without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{ApiError, Result};

/// One scripted outcome
enum Scripted {
    Response(HttpResponse),
    Failure(String),
}

/// Mock transport for testing.
///
/// Queue responses via builder methods, hand `&mock` to the client, then
/// inspect the captured requests.
///
/// # Example
/// ```ignore
/// let mock = MockTransport::new().with_json(200, json!([1, 2]));
/// let mut client = RestApiClient::new(&credential, &endpoint, &mock)?;
/// client.paginated_get(true)?;
/// assert_eq!(mock.request_count(), 1);
/// ```
#[derive(Default)]
pub struct MockTransport {
    /// Outcomes returned in order; an exhausted script answers `[]`
    script: Mutex<VecDeque<Scripted>>,
    /// Captured requests for test assertions
    captured: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response.
    pub fn with_json(self, status: u16, body: Value) -> Self {
        self.with_body(status, body.to_string())
    }

    /// Queue a raw response body.
    pub fn with_body(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.push(Scripted::Response(HttpResponse::new(status, body)));
        self
    }

    /// Queue a transport failure (no response at all).
    pub fn with_failure(self, message: &str) -> Self {
        self.push(Scripted::Failure(message.to_string()));
        self
    }

    /// Queue one JSON array response per batch size.
    pub fn with_batches(self, sizes: &[usize]) -> Self {
        let mut next_id = 0;
        sizes.iter().fold(self, |mock, &size| {
            let batch: Vec<Value> = (next_id..next_id + size)
                .map(|id| serde_json::json!({"id": id}))
                .collect();
            next_id += size;
            mock.with_json(200, Value::Array(batch))
        })
    }

    fn push(&self, outcome: Scripted) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(outcome);
    }

    /// All requests sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.captured.lock().expect("capture lock poisoned").clone()
    }

    pub fn request_count(&self) -> usize {
        self.captured.lock().expect("capture lock poisoned").len()
    }

    /// Values of one query parameter across every request.
    pub fn query_values(&self, name: &str) -> Vec<Option<String>> {
        self.requests()
            .iter()
            .map(|r| r.query_param(name).map(str::to_string))
            .collect()
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.captured
            .lock()
            .expect("capture lock poisoned")
            .push(request.clone());

        let next = self.script.lock().expect("script lock poisoned").pop_front();
        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(ApiError::Network(message).into()),
            None => Ok(HttpResponse::new(200, "[]")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpMethod;
    use serde_json::json;

    #[test]
    fn test_replays_in_order_then_empty() {
        let mock = MockTransport::new()
            .with_json(200, json!({"a": 1}))
            .with_body(500, "boom");
        let request = HttpRequest::new(HttpMethod::Get, "https://api.example.com");

        assert_eq!(mock.send(&request).unwrap().json().unwrap(), json!({"a": 1}));
        assert_eq!(mock.send(&request).unwrap().status, 500);
        assert_eq!(mock.send(&request).unwrap().json().unwrap(), json!([]));
        assert_eq!(mock.request_count(), 3);
    }

    #[test]
    fn test_failure_is_network_error() {
        let mock = MockTransport::new().with_failure("connection refused");
        let request = HttpRequest::new(HttpMethod::Get, "https://api.example.com");

        let err = mock.send(&request).unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_batches_have_distinct_ids() {
        let mock = MockTransport::new().with_batches(&[2, 1]);
        let request = HttpRequest::new(HttpMethod::Get, "https://api.example.com");

        assert_eq!(
            mock.send(&request).unwrap().json().unwrap(),
            json!([{"id": 0}, {"id": 1}])
        );
        assert_eq!(mock.send(&request).unwrap().json().unwrap(), json!([{"id": 2}]));
    }
}

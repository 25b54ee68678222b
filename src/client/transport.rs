//! HTTP transport boundary
//!
//! Requests and responses are plain data. The REST client builds an
//! [`HttpRequest`], hands it to an [`HttpTransport`] and interprets the
//! [`HttpResponse`], so the paging logic never touches the network directly.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;

use crate::config::{HttpMethod, RequestBody};
use crate::constants::VERSION;
use crate::error::{ApiError, Result};

/// One fully resolved outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Username and password for transport-level basic auth
    pub basic_auth: Option<(String, String)>,
    pub timeout: Option<Duration>,
    pub verify_tls: bool,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            basic_auth: None,
            timeout: None,
            verify_tls: true,
        }
    }

    /// Value of a query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw answer from the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body as (lossy) UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON. An empty body is `null`.
    pub fn json(&self) -> std::result::Result<Value, ApiError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

/// Capability to perform one blocking HTTP exchange.
///
/// Any status code is a successful exchange; only failures to obtain a
/// response at all are errors.
pub trait HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

/// Blocking transport backed by `reqwest`.
pub struct ReqwestTransport {
    verified: HttpClient,
    unverified: HttpClient,
}

impl ReqwestTransport {
    /// Create a transport with no client-wide timeout.
    pub fn new() -> Result<Self> {
        let user_agent = format!("rest-paginator/{}", VERSION);

        let verified = HttpClient::builder()
            .user_agent(user_agent.clone())
            .timeout(None::<Duration>)
            .build()
            .map_err(ApiError::from)?;

        let unverified = HttpClient::builder()
            .user_agent(user_agent)
            .timeout(None::<Duration>)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(ApiError::from)?;

        Ok(Self {
            verified,
            unverified,
        })
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let http = if request.verify_tls {
            &self.verified
        } else {
            &self.unverified
        };

        let mut builder = http
            .request(Self::method(request.method), &request.url)
            .query(&request.query);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match &request.body {
            Some(RequestBody::Raw(text)) => builder.body(text.clone()),
            Some(RequestBody::Json(value)) => builder.json(value),
            None => builder,
        };

        let response = builder.send().map_err(ApiError::from)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(ApiError::from)?.to_vec();
        debug!("{} {} -> {}", request.method.as_str(), request.url, status);

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_json() {
        let response = HttpResponse::new(200, r#"{"items": [1, 2]}"#);
        assert_eq!(response.json().unwrap(), json!({"items": [1, 2]}));
    }

    #[test]
    fn test_response_empty_body_is_null() {
        assert_eq!(HttpResponse::new(204, "").json().unwrap(), Value::Null);
        assert_eq!(HttpResponse::new(200, "  \n").json().unwrap(), Value::Null);
    }

    #[test]
    fn test_response_invalid_json() {
        let err = HttpResponse::new(200, "<html>").json().unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_request_lookups() {
        let mut request = HttpRequest::new(HttpMethod::Get, "https://api.example.com");
        request.query.push(("skip".to_string(), "10".to_string()));
        request
            .headers
            .push(("Authorization".to_string(), "Bearer t".to_string()));

        assert_eq!(request.query_param("skip"), Some("10"));
        assert_eq!(request.query_param("limit"), None);
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert!(request.verify_tls);
    }

    #[test]
    fn test_transport_creation() {
        assert!(ReqwestTransport::new().is_ok());
    }
}

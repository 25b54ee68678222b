//! Endpoint block: URL, method, static request parts, paging and pacing

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::KeyValues;
use crate::client::PaginationStrategy;
use crate::client::pagination::split_path;
use crate::error::ConfigError;

/// HTTP method for the endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Pagination strategy name. Unknown names mean a single page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationType {
    NextPage,
    Offset,
    Page,
    #[default]
    #[serde(rename = "na", other)]
    Na,
}

/// How the request body is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyFormat {
    #[serde(rename = "RAW")]
    Raw,
    #[serde(rename = "FORM_DATA")]
    FormData,
}

/// Request body, still holding unresolved placeholders
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent verbatim
    Raw(String),
    /// Sent as a JSON document
    Json(Value),
}

/// Endpoint description as configured by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// URL template, e.g. `https://api.example.com/items?page={{page}}`
    pub endpoint_url: String,

    pub http_method: HttpMethod,

    /// Static headers (templated)
    pub endpoint_headers: KeyValues,

    /// Static query string parameters (templated)
    pub endpoint_query_string: KeyValues,

    pub body_format: Option<BodyFormat>,

    /// Body used with `RAW`
    pub text_body: String,

    /// Body used with `FORM_DATA`
    pub key_value_body: KeyValues,

    pub pagination_type: PaginationType,

    /// Offset parameter name (`offset`), or page parameter name (`page`)
    pub skip_key: Option<String>,

    /// Limit parameter name (`offset`)
    pub top_key: Option<String>,

    /// Dot-separated path to the next page URL (`next_page`)
    pub next_page_url_key: Option<String>,

    /// Dot-separated path to the record array in each response
    pub extraction_key: Option<String>,

    /// Value sent under `top_key`; falls back to the numeric value of
    /// `top_key` in the query string
    pub page_size: Option<u64>,

    /// First page number for `page` paging
    pub first_page: u64,

    /// End `offset` paging on a batch smaller than the limit
    pub stop_on_short_batch: bool,

    /// Requests per minute, -1 for unlimited
    pub requests_per_minute: i64,

    /// Per-request timeout in seconds, -1 for none
    pub timeout: i64,

    pub ignore_ssl_check: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            http_method: HttpMethod::default(),
            endpoint_headers: KeyValues::default(),
            endpoint_query_string: KeyValues::default(),
            body_format: None,
            text_body: String::new(),
            key_value_body: KeyValues::default(),
            pagination_type: PaginationType::default(),
            skip_key: None,
            top_key: None,
            next_page_url_key: None,
            extraction_key: None,
            page_size: None,
            first_page: 1,
            stop_on_short_batch: false,
            requests_per_minute: -1,
            timeout: -1,
            ignore_ssl_check: false,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl EndpointConfig {
    /// Create a config for a URL template with defaults everywhere else.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }

    /// Extraction key, when one is configured.
    pub fn extraction_key(&self) -> Option<&str> {
        non_empty(&self.extraction_key)
    }

    /// Per-request timeout; `None` when not strictly positive.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout as u64))
    }

    /// Request rate cap; `None` when unlimited.
    pub fn requests_per_minute(&self) -> Option<u32> {
        if self.requests_per_minute > 0 {
            Some(u32::try_from(self.requests_per_minute).unwrap_or(u32::MAX))
        } else {
            None
        }
    }

    /// Body to send, if a body format is configured.
    pub fn request_body(&self) -> Option<RequestBody> {
        match self.body_format? {
            BodyFormat::Raw => Some(RequestBody::Raw(self.text_body.clone())),
            BodyFormat::FormData => Some(RequestBody::Json(Value::Object(
                self.key_value_body
                    .as_map()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ))),
        }
    }

    /// Tagged paging strategy.
    ///
    /// `query` is the resolved static query string, used to discover the
    /// page size when `page_size` is not set.
    pub fn pagination_strategy(
        &self,
        query: &BTreeMap<String, Value>,
    ) -> Result<PaginationStrategy, ConfigError> {
        match self.pagination_type {
            PaginationType::Na => Ok(PaginationStrategy::Single),
            PaginationType::NextPage => {
                let key = non_empty(&self.next_page_url_key).ok_or_else(|| {
                    ConfigError::Invalid(
                        "next_page pagination requires next_page_url_key".to_string(),
                    )
                })?;
                Ok(PaginationStrategy::NextPage {
                    key_path: split_path(key),
                })
            }
            PaginationType::Offset => {
                let skip_key = non_empty(&self.skip_key).ok_or_else(|| {
                    ConfigError::Invalid("offset pagination requires skip_key".to_string())
                })?;
                let limit_key = non_empty(&self.top_key).map(str::to_string);
                let limit = self.page_size.or_else(|| {
                    limit_key
                        .as_ref()
                        .and_then(|key| query.get(key))
                        .and_then(|value| match value {
                            Value::Number(n) => n.as_u64(),
                            Value::String(s) => s.trim().parse().ok(),
                            _ => None,
                        })
                });
                if limit == Some(0) {
                    return Err(ConfigError::Invalid("page size must be positive".to_string()));
                }
                Ok(PaginationStrategy::Offset {
                    skip_key: skip_key.to_string(),
                    limit_key,
                    limit,
                    stop_on_short_batch: self.stop_on_short_batch,
                })
            }
            PaginationType::Page => {
                let page_key = non_empty(&self.skip_key).ok_or_else(|| {
                    ConfigError::Invalid("page pagination requires skip_key".to_string())
                })?;
                Ok(PaginationStrategy::Page {
                    page_key: page_key.to_string(),
                    first_page: self.first_page,
                })
            }
        }
    }

    /// Fail fast on configurations that cannot produce a request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint_url.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint_url is required".to_string()));
        }
        self.pagination_strategy(self.endpoint_query_string.as_map())?;
        Ok(())
    }
}

//! REST client orchestrating templating, paging, pacing and the loop guard

use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::{Value, json};

use super::loop_detector::LoopDetector;
use super::pagination::{Pagination, PaginationStrategy};
use super::rate_limit::RequestThrottle;
use super::transport::{HttpRequest, HttpTransport};
use crate::config::{ApiKeyDestination, Auth, CredentialConfig, EndpointConfig, HttpMethod, RequestBody};
use crate::constants::{DEFAULT_LOOP_HISTORY, RESPONSE_ERROR_KEY};
use crate::error::{ApiError, Error, Result};
use crate::logging::SecretFilter;
use crate::template::{Variables, format_template, template_map, template_value, value_to_text};

/// Header carrying bearer credentials
const AUTHORIZATION_HEADER: &str = "Authorization";

/// Construction-time knobs that do not come from the configuration blocks
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Variables merged after the endpoint and credential fields
    pub custom_variables: Variables,
    /// Field names redacted from log output
    pub secret_filter: SecretFilter,
    /// Number of recent requests remembered by the loop guard
    pub loop_history: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            custom_variables: Variables::new(),
            secret_filter: SecretFilter::default(),
            loop_history: DEFAULT_LOOP_HISTORY,
        }
    }
}

/// Per-call request parts; string leaves may still hold placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub params: BTreeMap<String, Value>,
    pub headers: BTreeMap<String, Value>,
    pub body: Option<RequestBody>,
}

/// Client for one configured endpoint.
///
/// Everything derivable from the configuration is resolved once in
/// [`RestApiClient::new`]; calls then only merge the pagination cursor in.
/// One client serves one enumeration at a time.
pub struct RestApiClient<T: HttpTransport> {
    transport: T,
    variables: Variables,
    secret_filter: SecretFilter,

    http_method: HttpMethod,
    endpoint_url: String,
    headers: BTreeMap<String, Value>,
    params: BTreeMap<String, Value>,
    body: Option<RequestBody>,
    basic_auth: Option<(String, String)>,
    timeout: Option<Duration>,
    verify_tls: bool,
    extraction_key: Option<String>,

    pagination: Pagination,
    loop_detector: LoopDetector,
    throttle: RequestThrottle,
}

impl<T: HttpTransport> RestApiClient<T> {
    /// Create a client with default options.
    pub fn new(credential: &CredentialConfig, endpoint: &EndpointConfig, transport: T) -> Result<Self> {
        Self::with_options(credential, endpoint, transport, ClientOptions::default())
    }

    /// Create a client, failing fast on inconsistent configuration.
    pub fn with_options(
        credential: &CredentialConfig,
        endpoint: &EndpointConfig,
        transport: T,
        options: ClientOptions,
    ) -> Result<Self> {
        endpoint.validate()?;
        let auth = credential.auth()?;

        let variables = build_variables(credential, endpoint, &options.custom_variables)?;
        let mut secret_filter = options.secret_filter;

        let endpoint_url = format_template(&endpoint.endpoint_url, &variables);

        let mut headers = endpoint.endpoint_headers.as_map().clone();
        if let Auth::Bearer { template } = &auth {
            headers.insert(AUTHORIZATION_HEADER.to_string(), Value::String(template.clone()));
            secret_filter.forbid(AUTHORIZATION_HEADER);
        }
        let mut headers = template_map(&headers, &variables);
        let mut params = template_map(endpoint.endpoint_query_string.as_map(), &variables);

        let strategy = endpoint.pagination_strategy(&params)?;

        let basic_auth = match auth {
            Auth::Basic { username, password } => Some((username, password)),
            Auth::ApiKey {
                name,
                value,
                destination,
            } => {
                secret_filter.forbid(&name);
                match destination {
                    ApiKeyDestination::Header => headers.insert(name, Value::String(value)),
                    ApiKeyDestination::Params => params.insert(name, Value::String(value)),
                };
                None
            }
            Auth::None | Auth::Bearer { .. } => None,
        };

        let throttle = RequestThrottle::per_minute(endpoint.requests_per_minute());

        info!(
            "REST client for {} {} (pagination: {:?}, throttle: {:?})",
            endpoint.http_method.as_str(),
            secret_filter.filter_url(&endpoint_url),
            strategy,
            throttle.interval()
        );
        debug!(
            "Static headers={} params={}",
            secret_filter.filter_map(&headers),
            secret_filter.filter_map(&params)
        );

        Ok(Self {
            transport,
            secret_filter,
            http_method: endpoint.http_method,
            pagination: Pagination::new(strategy, endpoint_url.clone()),
            endpoint_url,
            headers,
            params,
            body: endpoint.request_body(),
            basic_auth,
            timeout: endpoint.timeout(),
            verify_tls: !endpoint.ignore_ssl_check,
            extraction_key: endpoint.extraction_key().map(str::to_string),
            loop_detector: LoopDetector::new(options.loop_history),
            throttle,
            variables,
        })
    }

    /// Issue a GET request.
    pub fn get(&mut self, url: &str, can_raise: bool, options: RequestOptions) -> Result<Value> {
        self.request(HttpMethod::Get, url, can_raise, options)
    }

    /// Issue one request.
    ///
    /// Transport failures and statuses >= 400 force the enumeration to stop.
    /// They are returned as errors when `can_raise` is set, otherwise as
    /// `{"error": message}`. A repeated request is always an error.
    pub fn request(
        &mut self,
        method: HttpMethod,
        url: &str,
        can_raise: bool,
        options: RequestOptions,
    ) -> Result<Value> {
        info!(
            "Accessing endpoint {} with params={}",
            self.secret_filter.filter_url(url),
            self.secret_filter.filter_map(&options.params)
        );
        self.throttle.wait();

        let params = template_map(&options.params, &self.variables);
        let headers = template_map(&options.headers, &self.variables);
        let body = options.body.map(|body| match body {
            RequestBody::Raw(text) => RequestBody::Raw(format_template(&text, &self.variables)),
            RequestBody::Json(value) => RequestBody::Json(template_value(&value, &self.variables)),
        });

        if self.loop_detector.is_stuck_in_loop(url, &params, &headers) {
            return Err(ApiError::StuckInLoop.into());
        }

        let request = HttpRequest {
            method,
            url: url.to_string(),
            query: to_pairs(&params),
            headers: to_pairs(&headers),
            body,
            basic_auth: self.basic_auth.clone(),
            timeout: self.timeout,
            verify_tls: self.verify_tls,
        };

        let outcome = self.transport.send(&request).and_then(|response| {
            if response.status >= 400 {
                return Err(ApiError::Remote {
                    status: response.status,
                    body: response.text(),
                }
                .into());
            }
            response.json().map_err(Error::from)
        });

        match outcome {
            Ok(json_response) => {
                self.pagination.update_next_page(&json_response);
                Ok(json_response)
            }
            Err(err) => {
                warn!(
                    "Request to {} failed: {}",
                    self.secret_filter.filter_url(url),
                    err
                );
                self.pagination.set_last_batch_empty();
                if can_raise {
                    Err(err)
                } else {
                    Ok(json!({ RESPONSE_ERROR_KEY: err.to_string() }))
                }
            }
        }
    }

    /// GET the next page.
    pub fn paginated_get(&mut self, can_raise: bool) -> Result<Value> {
        self.paginated_request(HttpMethod::Get, can_raise)
    }

    /// Call the next page with the configured HTTP method.
    pub fn paginated_api_call(&mut self, can_raise: bool) -> Result<Value> {
        match self.http_method {
            HttpMethod::Get => self.paginated_get(can_raise),
            method => self.paginated_request(method, can_raise),
        }
    }

    fn paginated_request(&mut self, method: HttpMethod, can_raise: bool) -> Result<Value> {
        if !self.pagination.is_paging_started() {
            self.start_paging();
        }

        let mut params = self.params.clone();
        params.extend(self.pagination.get_params());

        let options = RequestOptions {
            params,
            headers: self.headers.clone(),
            body: self.body.clone(),
        };
        let url = self.pagination.get_next_page_url();
        self.request(method, &url, can_raise, options)
    }

    /// Whether another page should be requested. Starts paging on first use.
    pub fn has_more_data(&mut self) -> bool {
        if !self.pagination.is_paging_started() {
            self.start_paging();
        }
        self.pagination.has_next_page()
    }

    /// Reset paging and the loop guard for a fresh enumeration.
    pub fn start_paging(&mut self) {
        debug!("Start paging {}", self.secret_filter.filter_url(&self.endpoint_url));
        self.pagination
            .reset_paging(self.extraction_key.as_deref(), &self.endpoint_url);
        self.loop_detector.reset();
    }

    pub fn extraction_key(&self) -> Option<&str> {
        self.extraction_key.as_deref()
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Resolved static headers, auth included.
    pub fn headers(&self) -> &BTreeMap<String, Value> {
        &self.headers
    }

    /// Resolved static query parameters, auth included.
    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn strategy(&self) -> &PaginationStrategy {
        self.pagination.strategy()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Endpoint fields, then credential fields, then custom variables, then the
/// user-defined keys resolved against everything before them.
fn build_variables(
    credential: &CredentialConfig,
    endpoint: &EndpointConfig,
    custom: &Variables,
) -> Result<Variables> {
    let mut variables = Variables::new();
    variables.merge_object(&serde_json::to_value(endpoint)?);
    variables.merge_object(&serde_json::to_value(credential)?);
    variables.merge(custom);

    let user_defined = template_map(credential.user_defined_keys.as_map(), &variables);
    for (key, value) in user_defined {
        variables.insert(key, value);
    }
    Ok(variables)
}

fn to_pairs(map: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .map(|(k, v)| (k.clone(), value_to_text(v)))
        .collect()
}

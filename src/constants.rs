//! Crate-wide constants

/// Field names whose values never appear in logs.
pub const FORBIDDEN_KEYS: [&str; 3] = ["token", "password", "api_key_value"];

/// Key of the error-tagged value returned by soft-failing requests.
pub const RESPONSE_ERROR_KEY: &str = "error";

/// Key wrapping scalar responses handed to the connector as records.
pub const API_RESPONSE_KEY: &str = "api_response";

/// Authorization header value used by OAuth2 bearer credentials.
pub const DEFAULT_BEARER_TEMPLATE: &str = "Bearer {{token}}";

/// Number of request fingerprints remembered by the loop detector.
pub const DEFAULT_LOOP_HISTORY: usize = 100;

/// Replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Crate version, reported in the client user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for the REST pagination engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unimplemented: {0}")]
    Unimplemented(&'static str),
}

/// Errors raised while talking to the remote API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network, DNS or connection failure reported by the transport.
    #[error("Error: {0}")]
    Network(String),

    /// The remote answered with a status >= 400.
    #[error("Error {status}: {body}")]
    Remote { status: u16, body: String },

    /// A successful status whose body is not JSON.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The same request was about to be issued again.
    #[error("The rest-api client is stuck in a loop. Please check the pagination parameters.")]
    StuckInLoop,
}

impl ApiError {
    /// HTTP status carried by a remote error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL may carry credentials in its query string
        let err = err.without_url();
        if err.is_timeout() {
            ApiError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ApiError::Network(format!("Failed to connect: {}", err))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Extraction key '{0}' was not found in the incoming data")]
    ExtractionKeyNotFound(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_network_message() {
        let err = ApiError::Network("Connection refused".to_string());
        assert_eq!(err.to_string(), "Error: Connection refused");
    }

    #[test]
    fn test_api_error_remote_embeds_status_and_body() {
        let err = ApiError::Remote {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "Error 503: maintenance");
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_api_error_stuck_in_loop_mentions_pagination() {
        let err = ApiError::StuckInLoop;
        assert!(err.to_string().contains("pagination"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_config_error_extraction_key() {
        let err = ConfigError::ExtractionKeyNotFound("items".to_string());
        assert!(err.to_string().contains("'items'"));
    }

    #[test]
    fn test_error_from_api_error() {
        let err: Error = ApiError::StuckInLoop.into();

        match err {
            Error::Api(ApiError::StuckInLoop) => (),
            _ => panic!("Expected Error::Api(ApiError::StuckInLoop)"),
        }
    }

    #[test]
    fn test_error_from_config_error() {
        let err: Error = ConfigError::Invalid("bad".to_string()).into();

        match err {
            Error::Config(ConfigError::Invalid(msg)) => assert_eq!(msg, "bad"),
            _ => panic!("Expected Error::Config(ConfigError::Invalid)"),
        }
    }

    #[test]
    fn test_unimplemented_message() {
        let err = Error::Unimplemented("get_writer");
        assert!(err.to_string().contains("get_writer"));
    }

    #[test]
    fn test_config_error_from_yaml_error() {
        let yaml_str = "invalid: [yaml: content";
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let config_err: ConfigError = yaml_err.into();

        match config_err {
            ConfigError::ParseError(_) => (),
            _ => panic!("Expected ConfigError::ParseError"),
        }
    }
}

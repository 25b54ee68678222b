//! Configuration-driven REST pagination engine
//!
//! Turns a declarative endpoint description (URL template, auth, pagination
//! strategy, headers, body, rate limit) into the sequence of HTTP calls that
//! enumerates every record of a remote resource.
//!
//! ```no_run
//! use rest_paginator::{ConnectorConfig, ReqwestTransport, RestApiConnector};
//!
//! # fn main() -> rest_paginator::Result<()> {
//! let config = ConnectorConfig::load_from("connector.yaml")?;
//! let mut connector = RestApiConnector::new(&config, ReqwestTransport::new()?)?;
//! for row in connector.generate_rows(Some(1000)) {
//!     println!("{}", row?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connector;
pub mod constants;
pub mod error;
pub mod logging;
pub mod template;

pub use client::{
    ClientOptions, HttpTransport, PaginationStrategy, ReqwestTransport, RequestOptions,
    RestApiClient,
};
pub use config::{ConnectorConfig, CredentialConfig, EndpointConfig};
pub use connector::{RestApiConnector, Rows};
pub use error::{ApiError, ConfigError, Error, Result};
pub use logging::SecretFilter;
pub use template::Variables;

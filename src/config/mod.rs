//! Connector configuration
//!
//! Mirrors the endpoint and credential blocks handed over by the host. The
//! loose shape accepted here is validated into tagged values ([`Auth`],
//! [`PaginationStrategy`](crate::client::PaginationStrategy),
//! [`RequestBody`]) before any request is made.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};

mod credential;
mod endpoint;

pub use credential::{ApiKeyDestination, Auth, CredentialConfig, LoginType};
pub use endpoint::{BodyFormat, EndpointConfig, HttpMethod, PaginationType, RequestBody};

/// Full configuration of one connector instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Endpoint description
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Credentials and user-defined variables
    #[serde(default)]
    pub credential: CredentialConfig,
}

impl ConnectorConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: ConnectorConfig = serde_yaml::from_str(contents).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Build configuration from an already-parsed JSON document
    pub fn from_json_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// Load configuration from a YAML (or JSON) file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Check every block, failing on the first inconsistency
    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;
        self.credential.auth()?;
        Ok(())
    }
}

/// Ordered key/value pairs as configured by the user.
///
/// Accepts either a mapping or the host's list of `{from, to}` entries.
/// Entries with an empty key are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "KeyValuesRepr", into = "BTreeMap<String, Value>")]
pub struct KeyValues(BTreeMap<String, Value>);

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyValuesRepr {
    Map(BTreeMap<String, Value>),
    List(Vec<KeyValueEntry>),
    Text(String),
}

#[derive(Deserialize)]
struct KeyValueEntry {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: Value,
}

impl From<KeyValuesRepr> for KeyValues {
    fn from(repr: KeyValuesRepr) -> Self {
        let pairs: BTreeMap<String, Value> = match repr {
            KeyValuesRepr::Map(map) => map,
            KeyValuesRepr::List(entries) => entries
                .into_iter()
                .map(|entry| (entry.from, entry.to))
                .collect(),
            KeyValuesRepr::Text(_) => BTreeMap::new(),
        };
        KeyValues(pairs.into_iter().filter(|(k, _)| !k.is_empty()).collect())
    }
}

impl From<KeyValues> for BTreeMap<String, Value> {
    fn from(kv: KeyValues) -> Self {
        kv.0
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for KeyValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        KeyValues(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(k, _)| !k.is_empty())
                .collect(),
        )
    }
}

impl KeyValues {
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

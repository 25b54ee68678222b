//! Credential block and the authentication it resolves to

use std::fmt;

use serde::{Deserialize, Serialize};

use super::KeyValues;
use crate::constants::{DEFAULT_BEARER_TEMPLATE, REDACTED};
use crate::error::ConfigError;

/// Login scheme selected by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    #[default]
    NoAuth,
    BasicLogin,
    Token,
    #[serde(rename = "oauth_2_token")]
    OAuth2Token,
    ApiKey,
}

/// Where an API key is sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyDestination {
    #[default]
    Header,
    #[serde(alias = "query")]
    Params,
}

/// Credential description as configured by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    pub login_type: LoginType,

    pub username: String,
    pub password: String,

    /// Token for `token` and `oauth_2_token`
    pub token: String,

    pub api_key_name: String,
    pub api_key_value: String,
    pub api_key_destination: ApiKeyDestination,

    /// Authorization header template, e.g. `Bearer {{token}}`
    pub bearer_template: Option<String>,

    /// Extra template variables, themselves templated
    pub user_defined_keys: KeyValues,
}

/// Authentication applied to every request
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    /// Transport-level basic authentication
    Basic { username: String, password: String },
    /// `Authorization` header built from a template
    Bearer { template: String },
    /// Key sent as a header or as a query parameter
    ApiKey {
        name: String,
        value: String,
        destination: ApiKeyDestination,
    },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &REDACTED)
                .finish(),
            Auth::Bearer { template } => f
                .debug_struct("Bearer")
                .field("template", template)
                .finish(),
            Auth::ApiKey {
                name, destination, ..
            } => f
                .debug_struct("ApiKey")
                .field("name", name)
                .field("value", &REDACTED)
                .field("destination", destination)
                .finish(),
        }
    }
}

impl CredentialConfig {
    /// Resolve the login type into the authentication to apply.
    ///
    /// A plain `token` login only exposes `{{token}}` to templates unless a
    /// bearer template is configured; `oauth_2_token` always sends one.
    pub fn auth(&self) -> Result<Auth, ConfigError> {
        let bearer_template = self
            .bearer_template
            .as_deref()
            .filter(|t| !t.trim().is_empty());

        match self.login_type {
            LoginType::NoAuth => Ok(Auth::None),
            LoginType::BasicLogin => Ok(Auth::Basic {
                username: self.username.clone(),
                password: self.password.clone(),
            }),
            LoginType::Token => Ok(bearer_template
                .map(|template| Auth::Bearer {
                    template: template.to_string(),
                })
                .unwrap_or(Auth::None)),
            LoginType::OAuth2Token => Ok(Auth::Bearer {
                template: bearer_template
                    .unwrap_or(DEFAULT_BEARER_TEMPLATE)
                    .to_string(),
            }),
            LoginType::ApiKey => {
                if self.api_key_name.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "api_key login requires api_key_name".to_string(),
                    ));
                }
                Ok(Auth::ApiKey {
                    name: self.api_key_name.clone(),
                    value: self.api_key_value.clone(),
                    destination: self.api_key_destination,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credential(value: serde_json::Value) -> CredentialConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_no_auth_by_default() {
        assert_eq!(credential(json!({})).auth().unwrap(), Auth::None);
    }

    #[test]
    fn test_basic_login() {
        let auth = credential(json!({
            "login_type": "basic_login",
            "username": "bob",
            "password": "hunter2"
        }))
        .auth()
        .unwrap();

        assert_eq!(
            auth,
            Auth::Basic {
                username: "bob".to_string(),
                password: "hunter2".to_string()
            }
        );
        assert!(!format!("{:?}", auth).contains("hunter2"));
    }

    #[test]
    fn test_oauth2_uses_default_bearer_template() {
        let auth = credential(json!({"login_type": "oauth_2_token", "token": "abc"}))
            .auth()
            .unwrap();
        assert_eq!(
            auth,
            Auth::Bearer {
                template: "Bearer {{token}}".to_string()
            }
        );
    }

    #[test]
    fn test_token_with_and_without_template() {
        let plain = credential(json!({"login_type": "token", "token": "abc"}));
        assert_eq!(plain.auth().unwrap(), Auth::None);

        let templated = credential(json!({
            "login_type": "token",
            "token": "abc",
            "bearer_template": "Token {{token}}"
        }));
        assert_eq!(
            templated.auth().unwrap(),
            Auth::Bearer {
                template: "Token {{token}}".to_string()
            }
        );
    }

    #[test]
    fn test_api_key_destinations() {
        let header = credential(json!({
            "login_type": "api_key",
            "api_key_name": "X-Api-Key",
            "api_key_value": "k"
        }));
        match header.auth().unwrap() {
            Auth::ApiKey { destination, .. } => assert_eq!(destination, ApiKeyDestination::Header),
            other => panic!("Expected api key auth, got {:?}", other),
        }

        let query = credential(json!({
            "login_type": "api_key",
            "api_key_name": "apikey",
            "api_key_value": "k",
            "api_key_destination": "params"
        }));
        match query.auth().unwrap() {
            Auth::ApiKey { destination, .. } => assert_eq!(destination, ApiKeyDestination::Params),
            other => panic!("Expected api key auth, got {:?}", other),
        }
    }

    #[test]
    fn test_api_key_requires_name() {
        let err = credential(json!({"login_type": "api_key", "api_key_value": "k"}))
            .auth()
            .unwrap_err();
        assert!(err.to_string().contains("api_key_name"));
    }
}

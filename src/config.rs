//! Upload settings for the paste handler

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Default upload server base URL
pub const DEFAULT_URL: &str = "http://localhost:8080";

const URL_KEY: &str = "url";
const TOKEN_KEY: &str = "authorizeSDK";
/// Older records stored the token under this key
const LEGACY_TOKEN_KEY: &str = "authorizeToken";

/// Upload settings, as persisted by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Base URL of the upload server, without the API path
    pub url: String,
    /// Static token sent in the `authorizeSDK` header
    #[serde(rename = "authorizeSDK")]
    pub authorize_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            authorize_token: None,
        }
    }
}

impl Settings {
    /// Parse settings from a stored JSON value, merging over the defaults.
    ///
    /// Each key is read on its own: a missing or null key keeps its default,
    /// and a key of the wrong type is skipped with a warning without
    /// affecting the others. A value that is not an object yields the
    /// defaults.
    pub fn from_value(value: Option<Value>) -> Self {
        let mut settings = Self::default();
        let Some(value) = value else {
            return settings;
        };
        let Some(record) = value.as_object() else {
            tracing::warn!("Stored settings are not a JSON object, using defaults");
            return settings;
        };

        if let Some(url) = overlay::<String>(record, URL_KEY) {
            settings.url = url;
        }
        if let Some(token) = overlay::<String>(record, TOKEN_KEY)
            .or_else(|| overlay::<String>(record, LEGACY_TOKEN_KEY))
        {
            settings.authorize_token = Some(token);
        }
        settings
    }

    /// Both the URL and the token are set and non-empty.
    ///
    /// Pastes are only intercepted when this holds.
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty() && self.token().is_some()
    }

    /// The authorization token, if set and non-empty
    pub fn token(&self) -> Option<&str> {
        self.authorize_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// Read one stored key, or `None` when it is absent, null or mistyped
fn overlay<T: DeserializeOwned>(record: &Map<String, Value>, key: &str) -> Option<T> {
    let value = record.get(key).filter(|value| !value.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(key, "Ignoring stored setting with unexpected type: {}", e);
            None
        }
    }
}

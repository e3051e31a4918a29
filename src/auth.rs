//! Upload authorization.
//!
//! The upload server authenticates each request with a static token sent in a
//! custom header. The token comes from the settings store and is never logged
//! in full; use [`redact_token`] whenever it has to appear in a log line.

/// Header carrying the authorization token
pub const AUTHORIZE_HEADER: &str = "authorizeSDK";

/// Redact a token for safe logging.
///
/// Shows only the first few characters to help identify which token is in use
/// without exposing the full secret.
pub fn redact_token(token: &str) -> String {
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        let prefix: String = token.chars().take(4).collect();
        format!("{prefix}...")
    }
}

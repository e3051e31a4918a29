//! Shared HTTP client for uploads.
//!
//! One `reqwest::Client` is built per host and shared by every uploader, so
//! concurrent uploads from one paste reuse pooled connections and TLS
//! sessions to the upload server.
//!
//! Only connecting is bounded. Large images on slow links may take a while,
//! and an upload is never cancelled once started, so there is no overall
//! request timeout.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

const USER_AGENT: &str = concat!("paste-uploader/", env!("CARGO_PKG_VERSION"));

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn create_shared_client() -> anyhow::Result<Arc<Client>> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(4)
        .tcp_keepalive(Duration::from_secs(60))
        .build()?;

    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::HttpUploader;

    #[test]
    fn test_create_shared_client() {
        let client = create_shared_client().expect("Failed to create client");
        assert!(Arc::strong_count(&client) == 1);
    }

    #[test]
    fn test_uploaders_share_client_instance() {
        let shared_client = create_shared_client().expect("Failed to create client");
        let client_ptr = Arc::as_ptr(&shared_client);

        let first = HttpUploader::with_client(Arc::clone(&shared_client));
        let second = HttpUploader::with_client(Arc::clone(&shared_client));

        assert_eq!(Arc::as_ptr(&first.http_client()), client_ptr);
        assert_eq!(Arc::as_ptr(&second.http_client()), client_ptr);
        assert_eq!(Arc::strong_count(&shared_client), 3);
    }

    #[test]
    fn test_default_uploaders_create_separate_clients() {
        let first = HttpUploader::default();
        let second = HttpUploader::default();

        assert_ne!(
            Arc::as_ptr(&first.http_client()),
            Arc::as_ptr(&second.http_client())
        );
    }
}

//! Settings persistence and sharing
//!
//! The host owns persistence; this module models it with two pieces:
//!
//! - **SettingsStore**: load/save primitives over the stored record
//! - **SharedSettings**: the live value handed to the paste handler, updated
//!   by the settings UI and read (never written) by uploads
//!
//! [`SettingsManager`] ties the two together: it loads once at startup,
//! merging the stored record over the defaults, and saves the whole record
//! after every field edit.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::Settings;

pub mod file;

pub use file::JsonFileStore;

/// Load/save primitives provided by the host
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the raw stored record, or `None` if nothing was saved yet
    async fn load(&self) -> anyhow::Result<Option<serde_json::Value>>;

    /// Persist the whole settings record
    async fn save(&self, settings: &Settings) -> anyhow::Result<()>;
}

/// In-memory store, mostly useful for hosts without persistence and tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a raw record
    pub fn with_record(record: serde_json::Value) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(record))),
        }
    }

    /// The currently stored record
    pub fn record(&self) -> Option<serde_json::Value> {
        self.record.lock().clone()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load(&self) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.record())
    }

    async fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        *self.record.lock() = Some(serde_json::to_value(settings)?);
        Ok(())
    }
}

/// Live settings shared between the settings UI and the paste handler.
///
/// Cloning is cheap and every clone observes the same value.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings
    pub fn snapshot(&self) -> Settings {
        match self.inner.read() {
            Ok(settings) => settings.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the whole value (e.g. after a reload)
    pub fn replace(&self, settings: Settings) {
        self.update(|current| *current = settings);
    }

    /// Modify the value in place and return the updated copy
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Settings {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
        guard.clone()
    }
}

/// Settings-UI side: edits the shared value and persists it.
pub struct SettingsManager<S: SettingsStore> {
    store: S,
    shared: SharedSettings,
}

impl<S: SettingsStore> SettingsManager<S> {
    /// Load settings from `store`, merged over the defaults
    pub async fn load(store: S) -> anyhow::Result<Self> {
        let settings = Settings::from_value(store.load().await?);
        tracing::debug!(url = %settings.url, configured = settings.is_complete(), "Loaded settings");
        Ok(Self {
            store,
            shared: SharedSettings::new(settings),
        })
    }

    /// Handle for the paste handler
    pub fn shared(&self) -> SharedSettings {
        self.shared.clone()
    }

    pub fn settings(&self) -> Settings {
        self.shared.snapshot()
    }

    /// Re-read the store and replace the live value
    pub async fn reload(&self) -> anyhow::Result<Settings> {
        let settings = Settings::from_value(self.store.load().await?);
        self.shared.replace(settings.clone());
        Ok(settings)
    }

    pub async fn set_url(&self, url: impl Into<String>) -> anyhow::Result<()> {
        let url = url.into();
        tracing::info!("url: {}", url);
        let settings = self.shared.update(|s| s.url = url);
        self.store.save(&settings).await
    }

    /// Set or clear (`None`) the authorization token
    pub async fn set_authorize_token(&self, token: Option<String>) -> anyhow::Result<()> {
        tracing::info!(
            "authorizeSDK: {}",
            token
                .as_deref()
                .map(crate::auth::redact_token)
                .unwrap_or_else(|| "<none>".to_string())
        );
        let settings = self.shared.update(|s| s.authorize_token = token);
        self.store.save(&settings).await
    }
}

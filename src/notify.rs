//! Transient user notifications

use std::time::Duration;

/// How long upload errors stay on screen
pub const ERROR_NOTICE_DURATION: Duration = Duration::from_millis(5000);

/// Host surface for short on-screen messages
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, duration: Duration);
}

/// Notifier for headless hosts: messages go to the log.
///
/// Logged at info; the caller already records failures at warn.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, duration: Duration) {
        tracing::info!(duration_ms = duration.as_millis() as u64, "{}", message);
    }
}

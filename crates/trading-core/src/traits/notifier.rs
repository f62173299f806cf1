//! Notification sink trait.

use crate::error::NotifyError;
use async_trait::async_trait;

/// Fire-and-forget message sink (SMS, chat, log).
///
/// Callers log delivery failures and carry on; a failed send never aborts a run.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a text message.
    async fn send(&self, message: &str) -> Result<(), NotifyError>;

    /// Get the notifier name.
    fn name(&self) -> &str;
}

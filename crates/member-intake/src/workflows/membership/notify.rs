use tracing::info;

use super::domain::ContactChannelId;

/// Outbound applicant notification hook.
///
/// Notification is best-effort fire-and-forget: the lifecycle controller logs
/// failures and never lets them block or roll back a state transition.
pub trait Notifier: Send + Sync {
    fn send(&self, channel: ContactChannelId, text: &str) -> Result<(), NotificationError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Default notifier: records the outbound message in the log. Delivery over the
/// conversational transport is the front-end collaborator's job; this keeps an
/// audit line for every message the workflow intended to send.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, channel: ContactChannelId, text: &str) -> Result<(), NotificationError> {
        info!(channel = channel.0, message = text, "outbound applicant notification");
        Ok(())
    }
}

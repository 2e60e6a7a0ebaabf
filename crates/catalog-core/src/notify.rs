//! User-facing notifications raised by list and CRUD managers.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

/// Severity of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Operation completed.
    Success,
    /// Operation failed.
    Error,
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
}

/// Transient message shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Headline.
    pub title: String,
    /// Optional detail text.
    pub description: Option<String>,
}

impl Notification {
    /// Success notification.
    #[must_use]
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            description: None,
        }
    }

    /// Error notification.
    #[must_use]
    pub fn error(title: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            description: None,
        }
    }

    /// Attach detail text.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Sink for notifications (toast area, terminal, test recorder).
pub trait Notifier: Send + Sync {
    /// Deliver a notification.
    fn notify(&self, notification: Notification);
}

/// Emits notifications as tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let description = notification.description.as_deref().unwrap_or_default();
        match notification.level {
            NotificationLevel::Success | NotificationLevel::Info => {
                info!(title = %notification.title, description, "notification");
            }
            NotificationLevel::Warning => {
                warn!(title = %notification.title, description, "notification");
            }
            NotificationLevel::Error => {
                error!(title = %notification.title, description, "notification");
            }
        }
    }
}

/// Keeps every notification for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far, oldest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Most recent notification.
    #[must_use]
    pub fn last(&self) -> Option<Notification> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.lock().push(notification);
    }
}

//! User-facing notifications emitted by the controllers.

use std::sync::{Arc, Mutex};

/// Outcome class of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// An action went through
    Success,
    /// An action failed
    Error,
}

/// One line of feedback for the person driving the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Success or failure
    pub level: Level,
    /// Text to show
    pub message: String,
}

impl Notification {
    /// Success notification.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    /// Error notification.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    /// True for [`Level::Error`].
    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

/// Sink for notifications.
pub trait Notifier: Send + Sync {
    /// Deliver one notification. Must not block.
    fn notify(&self, notification: Notification);
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, notification: Notification) {
        self.as_ref().notify(notification)
    }
}

/// Reports through `tracing`: successes at `info`, failures at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => tracing::info!(message = %notification.message, "notification"),
            Level::Error => tracing::warn!(message = %notification.message, "notification"),
        }
    }
}

/// Collects notifications in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier(Arc<Mutex<Vec<Notification>>>);

impl MemoryNotifier {
    /// Everything delivered so far, oldest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        match self.0.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drain and return everything delivered so far.
    pub fn take(&self) -> Vec<Notification> {
        match self.0.lock() {
            Ok(mut seen) => std::mem::take(&mut *seen),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Most recent notification.
    pub fn last(&self) -> Option<Notification> {
        self.snapshot().pop()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        match self.0.lock() {
            Ok(mut seen) => seen.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

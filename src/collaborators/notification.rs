//! Notification dispatcher contract.

use crate::escalation::domain::EscalationAlert;
use crate::job::domain::StaffId;
use std::sync::{Arc, RwLock};

/// Fire-and-forget delivery of staff and admin notifications.
///
/// Implementations must not block on delivery; the engine never waits for
/// confirmation.
pub trait NotificationDispatcher: Send + Sync {
    /// Sends a message to one staff member.
    fn notify(&self, staff_id: &StaffId, message: &str);

    /// Raises an escalation alert to administrators.
    fn notify_admins(&self, alert: &EscalationAlert);
}

/// Notification captured by [`RecordingNotificationDispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedNotification {
    /// A staff notification.
    Staff {
        /// Recipient.
        staff_id: StaffId,
        /// Message body.
        message: String,
    },
    /// An admin alert.
    Admin(EscalationAlert),
}

/// Dispatcher that records every notification in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotificationDispatcher {
    sent: Arc<RwLock<Vec<RecordedNotification>>>,
}

impl RecordingNotificationDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every notification sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<RecordedNotification> {
        self.sent.read().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Returns the admin alerts sent so far.
    #[must_use]
    pub fn admin_alerts(&self) -> Vec<EscalationAlert> {
        self.sent()
            .into_iter()
            .filter_map(|notification| match notification {
                RecordedNotification::Admin(alert) => Some(alert),
                RecordedNotification::Staff { .. } => None,
            })
            .collect()
    }

    fn record(&self, notification: RecordedNotification) {
        if let Ok(mut sent) = self.sent.write() {
            sent.push(notification);
        }
    }
}

impl NotificationDispatcher for RecordingNotificationDispatcher {
    fn notify(&self, staff_id: &StaffId, message: &str) {
        self.record(RecordedNotification::Staff {
            staff_id: staff_id.clone(),
            message: message.to_owned(),
        });
    }

    fn notify_admins(&self, alert: &EscalationAlert) {
        self.record(RecordedNotification::Admin(alert.clone()));
    }
}

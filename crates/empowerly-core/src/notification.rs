use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::timer::TimerQueue;

/// How long a transient notification stays up
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A self-dismissing message for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Transient notifications with automatic dismissal
#[derive(Debug)]
pub struct NotificationCenter {
    ttl: Duration,
    active: Vec<Notification>,
    expiry: TimerQueue<Uuid>,
}

impl NotificationCenter {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            active: Vec::new(),
            expiry: TimerQueue::new(),
        }
    }

    /// Show a notification at `now`; it dismisses itself after the TTL
    pub fn show(
        &mut self,
        level: NotificationLevel,
        title: &str,
        message: &str,
        now: Instant,
    ) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            level,
            title: title.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        };
        let id = notification.id;
        log::info!("{title}: {message}");
        if self.expiry.schedule_after(now, self.ttl, id).is_none() {
            log::warn!("Notification TTL of {:?} is out of range; it stays until cleared", self.ttl);
        }
        self.active.push(notification);
        id
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.expiry.next_deadline()
    }

    /// Remove the earliest notification whose time is up
    pub fn expire_due(&mut self, now: Instant) -> Option<Notification> {
        let fired = self.expiry.pop_due(now)?;
        let position = self.active.iter().position(|n| n.id == fired.payload)?;
        Some(self.active.remove(position))
    }

    #[must_use]
    pub fn active(&self) -> &[Notification] {
        &self.active
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.expiry.len()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(NOTIFICATION_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_expires_after_ttl() {
        let mut center = NotificationCenter::default();
        let now = Instant::now();
        let id = center.show(NotificationLevel::Info, "Saved", "Profile updated", now);

        assert_eq!(center.active().len(), 1);
        assert!(center.expire_due(now + Duration::from_millis(4999)).is_none());

        let expired = center.expire_due(now + NOTIFICATION_TTL).unwrap();
        assert_eq!(expired.id, id);
        assert!(center.active().is_empty());
        assert_eq!(center.pending_timers(), 0);
    }

    #[test]
    fn test_notifications_expire_independently() {
        let mut center = NotificationCenter::new(Duration::from_secs(3));
        let start = Instant::now();
        center.show(NotificationLevel::Info, "First", "one", start);
        center.show(NotificationLevel::Warning, "Second", "two", start + Duration::from_secs(2));

        let first = center.expire_due(start + Duration::from_secs(3)).unwrap();
        assert_eq!(first.title, "First");
        assert_eq!(center.active().len(), 1);
        assert!(center.expire_due(start + Duration::from_secs(4)).is_none());
        assert_eq!(center.next_deadline(), Some(start + Duration::from_secs(5)));
    }
}

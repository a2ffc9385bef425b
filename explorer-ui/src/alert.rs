//! Transient user-facing alerts
//!
//! At most one alert is visible. Showing a new one replaces the old one and
//! restarts the dismissal deadline. The session loop sleeps until
//! [`AlertSlot::deadline`] and then calls [`AlertSlot::expire`].

use std::time::Duration;
use tokio::time::Instant;

/// How long an alert stays visible
pub const ALERT_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: u64,
    pub message: String,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct AlertSlot {
    current: Option<Alert>,
    next_id: u64,
    duration: Duration,
}

impl Default for AlertSlot {
    fn default() -> Self {
        Self::new(ALERT_DURATION)
    }
}

impl AlertSlot {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: None,
            next_id: 0,
            duration,
        }
    }

    pub fn show(&mut self, message: impl Into<String>, now: Instant) -> &Alert {
        self.next_id += 1;
        self.current.insert(Alert {
            id: self.next_id,
            message: message.into(),
            expires_at: now + self.duration,
        })
    }

    pub fn current(&self) -> Option<&Alert> {
        self.current.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|a| a.message.as_str())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.current.as_ref().map(|a| a.expires_at)
    }

    /// Dismiss the alert if its deadline has passed; true when something was dismissed
    pub fn expire(&mut self, now: Instant) -> bool {
        match &self.current {
            Some(alert) if alert.expires_at <= now => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_and_expire() {
        let mut slot = AlertSlot::new(Duration::from_secs(3));
        let start = Instant::now();
        slot.show("Please enter values between 1 and 5", start);

        assert_eq!(slot.message(), Some("Please enter values between 1 and 5"));
        assert!(!slot.expire(start + Duration::from_secs(2)));
        assert!(slot.current().is_some());
        assert!(slot.expire(start + Duration::from_secs(3)));
        assert!(slot.current().is_none());
        assert!(slot.deadline().is_none());
    }

    #[test]
    fn test_new_alert_replaces_and_restarts() {
        let mut slot = AlertSlot::new(Duration::from_secs(3));
        let start = Instant::now();
        let first_id = slot.show("first", start).id;
        let later = start + Duration::from_secs(2);
        let second = slot.show("second", later).clone();

        assert_ne!(first_id, second.id);
        assert_eq!(second.expires_at, later + Duration::from_secs(3));
        assert!(!slot.expire(start + Duration::from_secs(3)));
        assert_eq!(slot.message(), Some("second"));
    }

    #[test]
    fn test_clear() {
        let mut slot = AlertSlot::default();
        slot.show("x", Instant::now());
        slot.clear();
        assert!(slot.current().is_none());
    }
}

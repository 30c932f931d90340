//! The shell's single transient notification.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
    Error,
}

impl ToastKind {
    pub fn icon(self) -> &'static str {
        match self {
            ToastKind::Success => "✔",
            ToastKind::Info => "ℹ",
            ToastKind::Error => "✖",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

/// Holds at most one toast. Showing a new one replaces whatever is pending.
#[derive(Debug)]
pub struct ToastSlot {
    current: Option<Toast>,
    lifetime: Duration,
}

impl ToastSlot {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            current: None,
            lifetime,
        }
    }

    pub fn show(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.show_at(message, kind, Instant::now());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(message, ToastKind::Success);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.show(message, ToastKind::Info);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(message, ToastKind::Error);
    }

    fn show_at(&mut self, message: impl Into<String>, kind: ToastKind, now: Instant) {
        self.current = Some(Toast {
            message: message.into(),
            kind,
            shown_at: now,
        });
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    /// Drops the toast once its lifetime has passed. Returns true if it did,
    /// meaning the screen needs a redraw.
    pub fn expire(&mut self, now: Instant) -> bool {
        match &self.current {
            Some(toast) if now.duration_since(toast.shown_at) >= self.lifetime => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    /// How long the event loop may block before the toast needs expiring.
    pub fn time_left(&self, now: Instant) -> Option<Duration> {
        self.current
            .as_ref()
            .map(|t| self.lifetime.saturating_sub(now.duration_since(t.shown_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_toast_replaces_pending_one() {
        let mut slot = ToastSlot::new(Duration::from_secs(3));
        slot.success("Task added successfully");
        slot.error("Task title is required");

        let toast = slot.current().unwrap();
        assert_eq!(toast.message, "Task title is required");
        assert_eq!(toast.kind, ToastKind::Error);
    }

    #[test]
    fn test_expiry() {
        let start = Instant::now();
        let mut slot = ToastSlot::new(Duration::from_secs(3));
        slot.show_at("Task deleted", ToastKind::Info, start);

        assert!(!slot.expire(start + Duration::from_secs(1)));
        assert_eq!(slot.time_left(start + Duration::from_secs(1)), Some(Duration::from_secs(2)));

        assert!(slot.expire(start + Duration::from_secs(3)));
        assert!(slot.current().is_none());
        assert!(!slot.expire(start + Duration::from_secs(4)));
        assert_eq!(slot.time_left(start), None);
    }

    #[test]
    fn test_replacement_restarts_lifetime() {
        let start = Instant::now();
        let mut slot = ToastSlot::new(Duration::from_secs(3));
        slot.show_at("first", ToastKind::Info, start);
        slot.show_at("second", ToastKind::Info, start + Duration::from_secs(2));

        assert!(!slot.expire(start + Duration::from_secs(4)));
        assert_eq!(slot.current().unwrap().message, "second");
    }
}

use core::time::Duration;

use dom::MutationRecord;

/// Pointer events whose hover styling commonly rewrites attributes.
pub const HOVER_EVENTS: [&str; 4] = ["mouseover", "mouseenter", "mouseleave", "mouseout"];

const HOVER_WINDOW: Duration = Duration::from_millis(10);

/// An input event reported by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub event_type: String,
    /// Generated by the user agent rather than dispatched by a script.
    pub is_trusted: bool,
}

impl InputEvent {
    pub fn trusted(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_owned(),
            is_trusted: true,
        }
    }

    pub fn untrusted(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_owned(),
            is_trusted: false,
        }
    }
}

/// Remembers the latest trusted event so hover-driven attribute churn can be ignored.
#[derive(Debug, Default)]
pub(crate) struct EventTracker {
    last: Option<(String, Duration)>,
}

impl EventTracker {
    pub(crate) fn record(&mut self, event: &InputEvent, now: Duration) {
        if event.is_trusted {
            self.last = Some((event.event_type.clone(), now));
        }
    }

    /// True for a batch of attribute changes arriving right after a hover event.
    pub(crate) fn should_ignore(&self, records: &[MutationRecord], now: Duration) -> bool {
        if records.is_empty() || !records.iter().all(MutationRecord::is_attribute) {
            return false;
        }
        self.last.as_ref().is_some_and(|(event_type, at)| {
            HOVER_EVENTS.contains(&event_type.as_str()) && now.saturating_sub(*at) <= HOVER_WINDOW
        })
    }

    pub(crate) fn clear(&mut self) {
        self.last = None;
    }
}

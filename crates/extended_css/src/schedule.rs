use core::time::Duration;

/// Coalesces bursts of change signals into one re-apply per window.
///
/// The wrapper never runs anything itself: the engine asks it for a deadline when a change
/// arrives and asks again when the host calls back.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ThrottleWrapper {
    /// Minimum spacing between two runs.
    interval: Duration,
    /// Deadline of the run waiting to happen.
    pending: Option<Duration>,
    last_run: Option<Duration>,
}

impl ThrottleWrapper {
    pub(crate) const fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
            last_run: None,
        }
    }

    /// Request a run and return its deadline. A pending run absorbs the request.
    pub(crate) fn schedule(&mut self, now: Duration) -> Duration {
        if let Some(deadline) = self.pending {
            return deadline;
        }
        let delay = self.last_run.map_or(Duration::ZERO, |last| {
            self.interval.saturating_sub(now.saturating_sub(last))
        });
        let deadline = now.saturating_add(delay);
        self.pending = Some(deadline);
        deadline
    }

    pub(crate) const fn deadline(&self) -> Option<Duration> {
        self.pending
    }

    /// Consume the pending run if its deadline has passed.
    pub(crate) fn take_due(&mut self, now: Duration) -> bool {
        match self.pending {
            Some(deadline) if now >= deadline => {
                self.pending = None;
                self.last_run = Some(now);
                true
            }
            Some(_) | None => false,
        }
    }

    /// Record a run that happened outside the schedule, dropping any pending one.
    pub(crate) fn run_now(&mut self, now: Duration) {
        self.pending = None;
        self.last_run = Some(now);
    }

    pub(crate) fn cancel(&mut self) {
        self.pending = None;
    }
}

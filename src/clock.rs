use std::time::Duration;

/// Identifies one started clock. Ticks carry the handle of the clock that
/// produced them so that ticks from a cancelled clock can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockHandle(u64);

impl ClockHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Source of fixed-cadence ticks.
///
/// A clock keeps ticking until cancelled. It does not police how many clocks
/// run at once; the session engine owns at most one handle at a time.
pub trait Clock {
    fn start(&mut self, interval: Duration) -> ClockHandle;
    fn cancel(&mut self, handle: ClockHandle);
}

/// Clock that never ticks by itself. The caller drives ticks explicitly,
/// which keeps engine tests deterministic.
#[derive(Debug, Default)]
pub struct ManualClock {
    next_id: u64,
    active: Vec<ClockHandle>,
    started: usize,
    cancelled: usize,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles started and not yet cancelled.
    pub fn active(&self) -> &[ClockHandle] {
        &self.active
    }

    pub fn is_running(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn started_count(&self) -> usize {
        self.started
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled
    }
}

impl Clock for ManualClock {
    fn start(&mut self, _interval: Duration) -> ClockHandle {
        self.next_id += 1;
        self.started += 1;
        let handle = ClockHandle(self.next_id);
        self.active.push(handle);
        handle
    }

    fn cancel(&mut self, handle: ClockHandle) {
        if let Some(pos) = self.active.iter().position(|h| *h == handle) {
            self.active.remove(pos);
            self.cancelled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_tracks_active_handles() {
        let mut clock = ManualClock::new();
        assert!(!clock.is_running());

        let a = clock.start(Duration::from_secs(1));
        let b = clock.start(Duration::from_secs(1));
        assert_ne!(a, b);
        assert_eq!(clock.active(), &[a, b]);

        clock.cancel(a);
        assert_eq!(clock.active(), &[b]);
        assert_eq!(clock.started_count(), 2);
        assert_eq!(clock.cancelled_count(), 1);
    }

    #[test]
    fn test_cancel_unknown_handle_is_noop() {
        let mut clock = ManualClock::new();
        let a = clock.start(Duration::from_secs(1));
        clock.cancel(a);
        clock.cancel(a);
        assert_eq!(clock.cancelled_count(), 1);
        assert!(!clock.is_running());
    }
}

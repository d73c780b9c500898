use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// A transition the caller should turn into an event/log line. `None` means
/// the breaker's externally-visible state did not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Opened,
    HalfOpened,
    Closed,
}

/// Process-wide three-state circuit breaker guarding bridge execution.
///
/// Closed and Open both track errors in a rolling window; HalfOpen clears
/// that window on entry so a single clean monitoring tick can close it
/// again.
pub struct CircuitBreaker {
    state: CircuitState,
    errors: VecDeque<u64>,
    opened_at_ms: Option<u64>,
    error_threshold: usize,
    window_ms: u64,
    reset_ms: u64,
}

impl CircuitBreaker {
    pub fn new(error_threshold: usize, window_ms: u64, reset_ms: u64) -> Self {
        Self { state: CircuitState::Closed, errors: VecDeque::new(), opened_at_ms: None, error_threshold, window_ms, reset_ms }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn allows_execute(&self) -> bool {
        !matches!(self.state, CircuitState::Open)
    }

    fn prune(&mut self, now_ms: u64) {
        while let Some(&ts) = self.errors.front() {
            if now_ms.saturating_sub(ts) > self.window_ms {
                self.errors.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records one error data point, consulting the threshold in Closed and
    /// immediately reopening in HalfOpen (any new error there reverts to Open).
    pub fn record_error(&mut self, now_ms: u64) -> Transition {
        match self.state {
            CircuitState::Closed => {
                self.errors.push_back(now_ms);
                self.prune(now_ms);
                if self.errors.len() >= self.error_threshold {
                    self.state = CircuitState::Open;
                    self.opened_at_ms = Some(now_ms);
                    Transition::Opened
                } else {
                    Transition::None
                }
            }
            CircuitState::HalfOpen => {
                self.errors.clear();
                self.errors.push_back(now_ms);
                self.state = CircuitState::Open;
                self.opened_at_ms = Some(now_ms);
                Transition::Opened
            }
            CircuitState::Open => Transition::None,
        }
    }

    /// Monitoring-tick entry point: advances Open → HalfOpen once
    /// `reset_ms` has elapsed, and closes HalfOpen if no errors landed since
    /// it entered that state.
    pub fn on_monitoring_tick(&mut self, now_ms: u64) -> Transition {
        self.prune(now_ms);
        match self.state {
            CircuitState::Open => {
                let opened_at = self.opened_at_ms.unwrap_or(now_ms);
                if now_ms.saturating_sub(opened_at) >= self.reset_ms {
                    self.state = CircuitState::HalfOpen;
                    self.errors.clear();
                    Transition::HalfOpened
                } else {
                    Transition::None
                }
            }
            CircuitState::HalfOpen => {
                if self.errors.is_empty() {
                    self.state = CircuitState::Closed;
                    Transition::Closed
                } else {
                    Transition::None
                }
            }
            CircuitState::Closed => Transition::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_once_threshold_errors_land_within_window() {
        let mut cb = CircuitBreaker::new(3, 10_000, 5_000);
        assert_eq!(cb.record_error(0), Transition::None);
        assert_eq!(cb.record_error(1_000), Transition::None);
        assert_eq!(cb.record_error(2_000), Transition::Opened);
        assert!(!cb.allows_execute());
    }

    #[test]
    fn errors_outside_the_window_do_not_count() {
        let mut cb = CircuitBreaker::new(3, 1_000, 5_000);
        cb.record_error(0);
        cb.record_error(2_000); // > 1000ms after the first, so it ages out
        assert_eq!(cb.record_error(2_100), Transition::None);
    }

    #[test]
    fn half_opens_after_reset_then_closes_on_clean_tick() {
        let mut cb = CircuitBreaker::new(1, 10_000, 5_000);
        cb.record_error(0);
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.on_monitoring_tick(4_999), Transition::None);
        assert_eq!(cb.on_monitoring_tick(5_000), Transition::HalfOpened);
        assert_eq!(cb.on_monitoring_tick(5_100), Transition::Closed);
    }

    #[test]
    fn any_error_while_half_open_reopens() {
        let mut cb = CircuitBreaker::new(1, 10_000, 5_000);
        cb.record_error(0);
        cb.on_monitoring_tick(5_000);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.record_error(5_100), Transition::Opened);
    }
}

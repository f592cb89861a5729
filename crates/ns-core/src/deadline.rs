use std::time::{Duration, Instant};

/// Point in time after which a blocking call must give up.
///
/// Every blocking step (upload readiness polling, model invocation, retry sleeps)
/// receives one of these. `Deadline::none()` never expires.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(timeout: Duration) -> Self {
        Self { at: Instant::now().checked_add(timeout) }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(d) if d.is_zero())
    }

    /// True when waiting `wait` would still end before the deadline.
    pub fn allows(&self, wait: Duration) -> bool {
        match self.remaining() {
            None => true,
            Some(left) => wait < left,
        }
    }

    /// The earlier of two deadlines.
    pub fn min(self, other: Deadline) -> Deadline {
        match (self.at, other.at) {
            (Some(a), Some(b)) => Deadline::at(a.min(b)),
            (Some(_), None) => self,
            (None, _) => other,
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_expires() {
        let d = Deadline::none();
        assert!(!d.is_expired());
        assert!(d.allows(Duration::from_secs(3600)));
        assert_eq!(d.remaining(), None);
    }

    #[test]
    fn past_instant_is_expired() {
        let d = Deadline::at(Instant::now());
        std::thread::sleep(Duration::from_millis(2));
        assert!(d.is_expired());
        assert!(!d.allows(Duration::from_millis(1)));
    }

    #[test]
    fn min_picks_the_earlier_bound() {
        let near = Deadline::after(Duration::from_millis(10));
        let far = Deadline::after(Duration::from_secs(60));
        let picked = far.min(near);
        assert!(picked.remaining().unwrap() <= Duration::from_millis(10));
        assert!(Deadline::none().min(far).remaining().is_some());
    }
}

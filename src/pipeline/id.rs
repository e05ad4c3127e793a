//! Modification clocks for the pipeline.
//!
//! Every process object owns its clock. Stamps are only ever compared with
//! stamps of the same clock: a consumer records the stamp of the producer
//! output it last consumed and re-executes when it changes.

use std::fmt;

/// Value of a node-local monotonic clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeStamp(pub u64);

impl TimeStamp {
    /// Stamp of something that never happened
    pub const NEVER: TimeStamp = TimeStamp(0);

    #[inline]
    pub fn is_set(self) -> bool {
        self != Self::NEVER
    }

    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NEVER {
            write!(f, "TimeStamp(NEVER)")
        } else {
            write!(f, "TimeStamp({})", self.0)
        }
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Monotonic counter owned by one process object.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now: TimeStamp,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the new time
    #[inline]
    pub fn tick(&mut self) -> TimeStamp {
        self.now = TimeStamp(self.now.0 + 1);
        self.now
    }

    #[inline]
    pub fn now(&self) -> TimeStamp {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_is_unset() {
        assert!(!TimeStamp::NEVER.is_set());
        assert!(TimeStamp(1).is_set());
        assert_eq!(format!("{:?}", TimeStamp::NEVER), "TimeStamp(NEVER)");
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut clock = Clock::new();
        assert_eq!(clock.now(), TimeStamp::NEVER);
        let a = clock.tick();
        let b = clock.tick();
        assert!(b > a);
        assert_eq!(clock.now(), b);
        assert_eq!(b.value(), 2);
    }
}

//! Simulated time.  The machine loop moves the clock from one due
//! event to the next; nothing here waits for wall-clock time.

use std::time::Duration;

pub trait Clock {
    /// The current simulated time, measured from power-up.
    fn now(&self) -> Duration;

    /// Account for `interval` of simulated time having passed.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use tm11::Clock;
    ///
    /// fn rewind_took_a_while<C: Clock>(clk: &mut C) {
    ///   clk.consume(&Duration::from_millis(250));
    /// }
    /// ```
    fn consume(&mut self, interval: &Duration);

    /// Move the clock forward to `when`.  A time in the past leaves
    /// the clock alone.
    fn advance_to(&mut self, when: Duration) {
        if let Some(gap) = when.checked_sub(self.now()) {
            self.consume(&gap);
        }
    }
}

/// A clock which only moves when told to.
///
/// ```
/// use std::time::Duration;
/// use tm11::{BasicClock, Clock};
///
/// let mut clk = BasicClock::starting_at(Duration::from_micros(5));
/// clk.advance_to(Duration::from_micros(12));
/// assert_eq!(clk.now(), Duration::from_micros(12));
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BasicClock {
    elapsed: Duration,
}

impl BasicClock {
    pub fn new() -> BasicClock {
        BasicClock::default()
    }

    pub fn starting_at(elapsed: Duration) -> BasicClock {
        BasicClock { elapsed }
    }
}

impl Clock for BasicClock {
    fn now(&self) -> Duration {
        self.elapsed
    }

    fn consume(&mut self, interval: &Duration) {
        self.elapsed = self.elapsed.saturating_add(*interval);
    }
}

#[test]
fn test_advance_never_goes_backward() {
    let mut clk = BasicClock::new();
    clk.advance_to(Duration::from_micros(30));
    assert_eq!(clk.now(), Duration::from_micros(30));
    clk.advance_to(Duration::from_micros(10));
    assert_eq!(clk.now(), Duration::from_micros(30));
    clk.consume(&Duration::from_micros(2));
    assert_eq!(clk.now(), Duration::from_micros(32));
}

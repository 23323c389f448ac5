//! The instant at which a call into the controller happens.
//!
//! Register accesses and I/O completions each take place at some
//! simulated time.  The controller passes that time on to its host
//! when it asks for backing-store work or an interrupt, and the host
//! uses it to work out when those become due.
use core::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub simulated_time: Duration,
}

impl Context {
    #[must_use]
    pub fn at(simulated_time: Duration) -> Context {
        Context { simulated_time }
    }
}

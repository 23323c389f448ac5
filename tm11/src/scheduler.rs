//! The queue of backing-store requests waiting to complete.
//!
//! Each request is held until its simulated completion time.  The
//! queue is keyed by unit, because a unit never has more than one
//! request outstanding.
use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{event, Level};

use unibus::prelude::*;

use super::fault::ControllerFault;
use super::io::IoRequest;
use super::unit::UnitNumber;

#[derive(Debug, Default)]
pub struct IoQueue {
    due: KeyedReversePriorityQueue<UnitNumber, Duration>,
    requests: BTreeMap<UnitNumber, IoRequest>,
}

impl IoQueue {
    pub fn new() -> IoQueue {
        IoQueue::default()
    }

    /// Queue `request` to complete at `due`.
    ///
    /// # Errors
    ///
    /// A unit which already has a request queued gets
    /// [`ControllerFault::DuplicateRequest`], and its existing request
    /// stays as it was.
    pub fn push(&mut self, request: IoRequest, due: Duration) -> Result<(), ControllerFault> {
        let unit = request.unit;
        if self.requests.contains_key(&unit) {
            event!(
                Level::ERROR,
                "unit {unit} already has a request queued; refusing {request}"
            );
            return Err(ControllerFault::DuplicateRequest { unit });
        }
        event!(Level::TRACE, "queueing {request}, due at {due:?}");
        self.due.push(unit, due);
        self.requests.insert(unit, request);
        Ok(())
    }

    /// When the earliest queued request is due.
    pub fn next_due(&self) -> Option<Duration> {
        self.due.peek().map(|(_, due)| *due)
    }

    /// Remove and return the earliest request due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<IoRequest> {
        match self.due.peek() {
            Some((_, due)) if *due <= now => {
                let (unit, _) = self.due.pop()?;
                self.requests.remove(&unit)
            }
            _ => None,
        }
    }

    pub fn is_queued(&self, unit: UnitNumber) -> bool {
        self.requests.contains_key(&unit)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::BackingId;

    fn probe(n: u8, position: u64) -> IoRequest {
        let unit = UnitNumber::try_from(n).expect("valid unit");
        IoRequest::header_probe(unit, BackingId::for_unit(unit), position)
    }

    #[test]
    fn test_empty() {
        let mut q = IoQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.next_due(), None);
        assert_eq!(q.pop_due(Duration::from_secs(1)), None);
    }

    #[test]
    fn test_earliest_first() {
        let mut q = IoQueue::new();
        q.push(probe(1, 10), Duration::from_micros(300))
            .expect("unit 1 is free");
        q.push(probe(3, 30), Duration::from_micros(100))
            .expect("unit 3 is free");
        assert_eq!(q.next_due(), Some(Duration::from_micros(100)));
        assert_eq!(q.pop_due(Duration::from_micros(99)), None);
        assert_eq!(q.pop_due(Duration::from_micros(500)), Some(probe(3, 30)));
        assert_eq!(q.pop_due(Duration::from_micros(500)), Some(probe(1, 10)));
        assert!(q.is_empty());
    }

    #[test]
    fn test_duplicate_refused() {
        let mut q = IoQueue::new();
        q.push(probe(2, 0), Duration::from_micros(100))
            .expect("unit 2 is free");
        let unit = UnitNumber::try_from(2).expect("valid unit");
        assert_eq!(
            q.push(probe(2, 8), Duration::from_micros(50)),
            Err(ControllerFault::DuplicateRequest { unit })
        );
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_due(), Some(Duration::from_micros(100)));
        assert_eq!(q.pop_due(Duration::from_micros(100)), Some(probe(2, 0)));
    }
}

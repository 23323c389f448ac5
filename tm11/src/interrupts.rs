//! Pending interrupt requests.
//!
//! This stands in for the bus arbitration logic of the host machine.
//! Devices request interrupts on a priority level with a vector; the
//! request becomes deliverable after a short latency, and is granted
//! when the processor's priority is below the request's level.  Among
//! deliverable requests, the highest level wins, and within a level
//! the oldest request wins.
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::time::Duration;

use keyed_priority_queue::KeyedPriorityQueue;
use serde::Serialize;
use tracing::{event, Level};

use unibus::prelude::*;

/// Something the requesting device wants done at the moment its
/// interrupt is delivered (rather than at the moment it asked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeliveryAction {
    /// The TM11 sets tape-unit-ready and controller-ready.
    CommandEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InterruptRequest {
    pub level: PriorityLevel,
    pub vector: Vector,
    pub on_deliver: Option<DeliveryAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingInterrupt {
    pub request: InterruptRequest,
    pub due: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Precedence {
    level: PriorityLevel,
    age: Reverse<u64>,
}

#[derive(Debug)]
pub struct InterruptQueue {
    order: KeyedPriorityQueue<Vector, Precedence>,
    pending: BTreeMap<Vector, PendingInterrupt>,
    next_sequence: u64,
}

impl InterruptQueue {
    pub fn new() -> InterruptQueue {
        InterruptQueue {
            order: KeyedPriorityQueue::new(),
            pending: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    /// Queue a request which becomes deliverable at `due`.  A pending
    /// request with the same vector is replaced.
    pub fn request(&mut self, request: InterruptRequest, due: Duration) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let precedence = Precedence {
            level: request.level,
            age: Reverse(sequence),
        };
        if self.order.push(request.vector, precedence).is_some() {
            event!(
                Level::DEBUG,
                "interrupt at vector {} was already pending; replacing it",
                request.vector
            );
        }
        self.pending
            .insert(request.vector, PendingInterrupt { request, due });
    }

    /// Withdraw the pending request for `vector`, if it was made at
    /// `level`.  Returns true if something was withdrawn.
    pub fn cancel(&mut self, level: PriorityLevel, vector: Vector) -> bool {
        match self.pending.get(&vector) {
            Some(p) if p.request.level == level => {
                self.pending.remove(&vector);
                self.order.remove(&vector);
                event!(Level::DEBUG, "withdrew interrupt at {level} vector {vector}");
                true
            }
            Some(p) => {
                event!(
                    Level::WARN,
                    "not withdrawing interrupt at vector {vector}: it is pending at {} not {level}",
                    p.request.level
                );
                false
            }
            None => false,
        }
    }

    pub fn is_pending(&self, vector: Vector) -> bool {
        self.pending.contains_key(&vector)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The earliest time at which some pending request becomes
    /// deliverable.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.values().map(|p| p.due).min()
    }

    /// Remove and return the request which the processor would accept
    /// now, if any.  Requests which are not yet due are passed over,
    /// even if their level is higher.
    pub fn take_deliverable(
        &mut self,
        now: Duration,
        processor_level: PriorityLevel,
    ) -> Option<PendingInterrupt> {
        let (_, vector) = self
            .pending
            .values()
            .filter(|p| p.due <= now && p.request.level > processor_level)
            .filter_map(|p| {
                self.order
                    .get_priority(&p.request.vector)
                    .map(|precedence| (*precedence, p.request.vector))
            })
            .max()?;
        self.order.remove(&vector);
        self.pending.remove(&vector)
    }
}

impl Default for InterruptQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(level: PriorityLevel, vector: u16) -> InterruptRequest {
        InterruptRequest {
            level,
            vector: Vector::try_from(vector).expect("valid test vector"),
            on_deliver: None,
        }
    }

    #[test]
    fn test_not_delivered_before_due() {
        let mut q = InterruptQueue::new();
        q.request(request(PriorityLevel::BR5, 0o224), Duration::from_micros(10));
        assert_eq!(q.next_due(), Some(Duration::from_micros(10)));
        assert!(q
            .take_deliverable(Duration::from_micros(9), PriorityLevel::ZERO)
            .is_none());
        let delivered = q
            .take_deliverable(Duration::from_micros(10), PriorityLevel::ZERO)
            .expect("interrupt should be deliverable");
        assert_eq!(u16::from(delivered.request.vector), 0o224);
        assert!(q.is_empty());
    }

    #[test]
    fn test_masked_by_processor_priority() {
        let mut q = InterruptQueue::new();
        q.request(request(PriorityLevel::BR5, 0o224), Duration::ZERO);
        assert!(q
            .take_deliverable(Duration::ZERO, PriorityLevel::BR5)
            .is_none());
        assert!(q
            .take_deliverable(Duration::ZERO, PriorityLevel::BR4)
            .is_some());
    }

    #[test]
    fn test_highest_level_first() {
        let mut q = InterruptQueue::new();
        q.request(request(PriorityLevel::BR4, 0o60), Duration::ZERO);
        q.request(request(PriorityLevel::BR6, 0o100), Duration::ZERO);
        q.request(request(PriorityLevel::BR5, 0o224), Duration::ZERO);
        let order: Vec<u16> = std::iter::from_fn(|| {
            q.take_deliverable(Duration::ZERO, PriorityLevel::ZERO)
                .map(|p| u16::from(p.request.vector))
        })
        .collect();
        assert_eq!(order, vec![0o100, 0o224, 0o60]);
    }

    #[test]
    fn test_due_request_not_blocked_by_later_higher_one() {
        let mut q = InterruptQueue::new();
        q.request(request(PriorityLevel::BR6, 0o100), Duration::from_micros(50));
        q.request(request(PriorityLevel::BR5, 0o224), Duration::from_micros(10));
        let first = q.take_deliverable(Duration::from_micros(10), PriorityLevel::ZERO);
        assert_eq!(first.map(|p| u16::from(p.request.vector)), Some(0o224));
        assert!(q
            .take_deliverable(Duration::from_micros(10), PriorityLevel::ZERO)
            .is_none());
        let second = q.take_deliverable(Duration::from_micros(50), PriorityLevel::ZERO);
        assert_eq!(second.map(|p| u16::from(p.request.vector)), Some(0o100));
    }

    #[test]
    fn test_oldest_first_within_level() {
        let mut q = InterruptQueue::new();
        q.request(request(PriorityLevel::BR5, 0o224), Duration::ZERO);
        q.request(request(PriorityLevel::BR5, 0o220), Duration::ZERO);
        let first = q.take_deliverable(Duration::ZERO, PriorityLevel::ZERO);
        assert_eq!(first.map(|p| u16::from(p.request.vector)), Some(0o224));
    }

    #[test]
    fn test_cancel() {
        let mut q = InterruptQueue::new();
        let vector = Vector::try_from(0o224).expect("valid test vector");
        q.request(request(PriorityLevel::BR5, 0o224), Duration::ZERO);
        assert!(!q.cancel(PriorityLevel::BR4, vector));
        assert!(q.is_pending(vector));
        assert!(q.cancel(PriorityLevel::BR5, vector));
        assert!(!q.is_pending(vector));
        assert!(q
            .take_deliverable(Duration::from_secs(1), PriorityLevel::ZERO)
            .is_none());
        assert!(!q.cancel(PriorityLevel::BR5, vector));
    }

    #[test]
    fn test_rerequest_replaces() {
        let mut q = InterruptQueue::new();
        q.request(request(PriorityLevel::BR5, 0o224), Duration::from_micros(5));
        q.request(
            InterruptRequest {
                on_deliver: Some(DeliveryAction::CommandEnd),
                ..request(PriorityLevel::BR5, 0o224)
            },
            Duration::from_micros(8),
        );
        assert_eq!(q.len(), 1);
        let p = q
            .take_deliverable(Duration::from_micros(8), PriorityLevel::ZERO)
            .expect("interrupt should be deliverable");
        assert_eq!(p.request.on_deliver, Some(DeliveryAction::CommandEnd));
    }
}

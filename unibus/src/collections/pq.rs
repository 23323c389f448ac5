//! A keyed priority queue which pops the item with the *smallest*
//! priority first.  Schedulers use this with a due time as the
//! priority, so that the earliest-due item comes out first, and with
//! the item's owner as the key, so that each owner has at most one
//! item queued.
use std::borrow::Borrow;
use std::cmp::Reverse;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;

use keyed_priority_queue::KeyedPriorityQueue;

pub struct KeyedReversePriorityQueue<K: Hash + Eq, P: Ord> {
    items: KeyedPriorityQueue<K, Reverse<P>>,
}

impl<K, P> KeyedReversePriorityQueue<K, P>
where
    K: Hash + Eq,
    P: Ord,
{
    pub fn new() -> KeyedReversePriorityQueue<K, P> {
        KeyedReversePriorityQueue {
            items: KeyedPriorityQueue::new(),
        }
    }

    /// The item with the smallest priority, without removing it.
    pub fn peek(&self) -> Option<(&K, &P)> {
        self.items.peek().map(|(k, Reverse(p))| (k, p))
    }

    pub fn pop(&mut self) -> Option<(K, P)> {
        self.items.pop().map(|(k, Reverse(p))| (k, p))
    }

    /// Insert an item.  If `key` was already queued its priority is
    /// replaced, and the old priority is returned.
    pub fn push(&mut self, key: K, priority: P) -> Option<P> {
        self.items
            .push(key, Reverse(priority))
            .map(|Reverse(p)| p)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<P>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.remove(key).map(|Reverse(p)| p)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K, P> Default for KeyedReversePriorityQueue<K, P>
where
    K: Hash + Eq,
    P: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P> Debug for KeyedReversePriorityQueue<K, P>
where
    K: Hash + Eq + Debug,
    P: Ord + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedReversePriorityQueue")
            .field("items", &self.items)
            .finish()
    }
}

#[test]
fn test_empty() {
    let mut q: KeyedReversePriorityQueue<usize, usize> = KeyedReversePriorityQueue::default();
    assert!(q.is_empty());
    assert_eq!(0, q.len());
    assert_eq!(q.peek(), None);
    assert_eq!(q.pop(), None);
}

#[test]
fn test_push_replaces_priority() {
    let mut q: KeyedReversePriorityQueue<&str, u32> = KeyedReversePriorityQueue::new();
    assert_eq!(q.push("tm0", 20), None);
    assert_eq!(q.push("tm0", 40), Some(20));
    assert_eq!(q.len(), 1);
    assert_eq!(q.pop(), Some(("tm0", 40)));
    assert!(q.is_empty());
}

#[test]
fn test_earliest_first() {
    let mut q: KeyedReversePriorityQueue<u8, u32> = KeyedReversePriorityQueue::new();
    q.push(2, 300);
    q.push(0, 100);
    q.push(1, 200);
    assert_eq!(q.peek(), Some((&0, &100)));
    assert_eq!(q.pop(), Some((0, 100)));
    assert_eq!(q.pop(), Some((1, 200)));
    assert_eq!(q.pop(), Some((2, 300)));
    assert_eq!(q.pop(), None);
}

#[test]
fn test_remove() {
    let mut q: KeyedReversePriorityQueue<u8, u32> = KeyedReversePriorityQueue::new();
    q.push(3, 30);
    q.push(1, 10);
    assert_eq!(q.remove(&1), Some(10));
    assert_eq!(q.remove(&1), None);
    assert_eq!(q.pop(), Some((3, 30)));
}

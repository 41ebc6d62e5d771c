//! Deadline queue for scheduled callbacks.
//!
//! Sans-IO: the caller supplies the clock, so the queue can be driven by the
//! event loop or by tests.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

struct Entry<T> {
    deadline: Instant,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // reversed: the heap pops the earliest deadline first, FIFO on ties
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Items ordered by deadline.
pub struct TimerQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `item` to fire `delay` after `now`.
    pub fn schedule(&mut self, now: Instant, delay: Duration, item: T) {
        self.seq += 1;
        self.heap.push(Entry {
            deadline: now + delay,
            seq: self.seq,
            item,
        });
    }

    /// Remove and return every item whose deadline is at or before `now`,
    /// earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<T> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|e| e.deadline <= now) {
            if let Some(entry) = self.heap.pop() {
                due.push(entry.item);
            }
        }
        due
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.deadline)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_in_order() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(now, Duration::from_secs(3), "c");
        q.schedule(now, Duration::from_secs(1), "a");
        q.schedule(now, Duration::from_secs(2), "b");

        assert!(q.pop_due(now).is_empty());
        assert_eq!(q.next_deadline(), Some(now + Duration::from_secs(1)));
        assert_eq!(q.pop_due(now + Duration::from_secs(2)), vec!["a", "b"]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(now + Duration::from_secs(10)), vec!["c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_ties_fire_in_schedule_order() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        for n in 0..5 {
            q.schedule(now, Duration::ZERO, n);
        }
        assert_eq!(q.pop_due(now), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_clear() {
        let now = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(now, Duration::from_secs(1), ());
        q.clear();
        assert_eq!(q.next_deadline(), None);
    }
}

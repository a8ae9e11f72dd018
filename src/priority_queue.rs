/*
 * Bounded Priority Queue (C2)
 *
 * An indexed array of Fifos, one per priority level `0..=max_prio`.
 * `dequeue` returns an item from the highest non-empty level, FIFO
 * within that level.
 *
 * Per the explicit bug-fix mandated by the design notes: the original
 * (`util/prio_queue.c`) walks priority levels with an unsigned loop
 * counter that underflows past 0, and `pq_get_size` never initialises
 * its accumulator. Neither defect is reproduced here - levels are
 * iterated `max_prio..=0` (descending, inclusive of 0) using a plain
 * `for` over a `Vec` index, which has no unsigned-underflow edge case.
 */

use crate::fifo::Fifo;

pub struct PriorityQueue<T> {
    levels: Vec<Fifo<T>>,
    max_prio: u8,
}

impl<T> PriorityQueue<T> {
    pub fn new(max_prio: u8) -> Self {
        let levels = (0..=max_prio).map(|_| Fifo::new()).collect();
        Self { levels, max_prio }
    }

    pub fn enqueue(&mut self, item: T, prio: u8) {
        debug_assert!(prio <= self.max_prio);
        self.levels[prio as usize].push_back(item);
    }

    /// Remove and return an item from the highest non-empty level.
    /// Programming error to call while [`PriorityQueue::is_empty`].
    pub fn dequeue(&mut self) -> T {
        for level in (0..=self.max_prio as usize).rev() {
            if !self.levels[level].is_empty() {
                return self.levels[level].pop_front();
            }
        }
        panic!("dequeue called on empty PriorityQueue");
    }

    /// Peek the item that the next [`PriorityQueue::dequeue`] would return.
    pub fn front(&self) -> Option<&T> {
        for level in (0..=self.max_prio as usize).rev() {
            if !self.levels[level].is_empty() {
                return self.levels[level].front();
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Fifo::is_empty)
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(Fifo::len).sum()
    }
}

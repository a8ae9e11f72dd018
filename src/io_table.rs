/*
 * I/O Device Table (C4)
 *
 * Fixed-size array of `io_number` FIFOs; each holds threads waiting on
 * that device. A thread is on at most one I/O FIFO at a time, and while
 * on it does not appear on the ready queue and is not the runner.
 */

use std::sync::Arc;

use crate::fifo::Fifo;
use crate::thread::ThreadRecord;

pub struct IoTable {
    devices: Vec<Fifo<Arc<ThreadRecord>>>,
}

impl IoTable {
    pub fn new(io_number: u16) -> Self {
        Self {
            devices: (0..io_number).map(|_| Fifo::new()).collect(),
        }
    }

    pub fn io_number(&self) -> u16 {
        self.devices.len() as u16
    }

    pub fn is_valid(&self, io: u16) -> bool {
        (io as usize) < self.devices.len()
    }

    pub fn park(&mut self, io: u16, thread: Arc<ThreadRecord>) {
        self.devices[io as usize].push_back(thread);
    }

    /// Drain every thread currently parked on `io`, in FIFO arrival
    /// order, so callers can re-plan them in that same order (§5:
    /// "they are re-planned in FIFO order, so among themselves they
    /// rejoin scheduling in arrival order").
    pub fn drain(&mut self, io: u16) -> Vec<Arc<ThreadRecord>> {
        let queue = &mut self.devices[io as usize];
        let mut woken = Vec::with_capacity(queue.len());
        while !queue.is_empty() {
            woken.push(queue.pop_front());
        }
        woken
    }
}

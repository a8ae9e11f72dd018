/*
 * Logical Thread Record (C3)
 *
 * Per-thread state: priority, remaining quantum, lifecycle status, the
 * two binary synchronisation primitives (`run`, `planned`), and a handle
 * to the underlying OS thread.
 *
 * Thread records are always shared via `Arc<ThreadRecord>`: the roster
 * (in `scheduler.rs`) is the sole *owner* (it is the only place the
 * `JoinHandle` is ever taken and joined), while the ready queue and I/O
 * table hold non-owning `Arc` clones, matching §3's "containers hold
 * non-owning references".
 */

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::rendezvous::Rendezvous;
use crate::tid::Tid;

/// Lifecycle status of a logical thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Alive,
    Terminated,
}

impl ThreadStatus {
    fn to_raw(self) -> u8 {
        match self {
            ThreadStatus::Alive => 0,
            ThreadStatus::Terminated => 1,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => ThreadStatus::Alive,
            1 => ThreadStatus::Terminated,
            _ => unreachable!("invalid ThreadStatus discriminant"),
        }
    }
}

/// A function accepting a thread's priority and returning no value - the
/// `start_routine` of §3. Plain `fn` rather than a boxed closure, mirroring
/// the original's function-pointer handler and keeping thread records
/// `Send + Sync` without extra bounds.
pub type StartRoutine = fn(u8);

pub struct ThreadRecord {
    tid: Tid,
    priority: u8,
    start_routine: StartRoutine,
    time_remaining: AtomicI64,
    status: AtomicU8,

    /// Binary handoff primitive: a released, unacquired `run` grants the
    /// right to execute on the CPU.
    pub run: Rendezvous,

    /// Binary handoff primitive: signalled by `plan_thread` to
    /// acknowledge placement (running or enqueued).
    pub planned: Rendezvous,

    /// Taken exactly once, by `end`, to join the underlying OS thread.
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadRecord {
    pub fn new(
        tid: Tid,
        priority: u8,
        start_routine: StartRoutine,
        time_quantum: i64,
        join_handle: JoinHandle<()>,
    ) -> Self {
        Self {
            tid,
            priority,
            start_routine,
            time_remaining: AtomicI64::new(time_quantum),
            status: AtomicU8::new(ThreadStatus::Alive.to_raw()),
            run: Rendezvous::new(),
            planned: Rendezvous::new(),
            join_handle: Mutex::new(Some(join_handle)),
        }
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn start_routine(&self) -> StartRoutine {
        self.start_routine
    }

    pub fn status(&self) -> ThreadStatus {
        ThreadStatus::from_raw(self.status.load(Ordering::Acquire))
    }

    pub fn set_terminated(&self) {
        self.status
            .store(ThreadStatus::Terminated.to_raw(), Ordering::Release);
    }

    /// Reset after `run_next_thread` installs this thread as the runner.
    pub fn reset_quantum(&self, time_quantum: i64) {
        self.time_remaining.store(time_quantum, Ordering::SeqCst);
    }

    /// Charge one scheduler tick (§4.2.4) and report whether the quantum
    /// is now exhausted (`<= 0`), meaning the caller must preempt before
    /// returning.
    pub fn charge_tick(&self) -> bool {
        self.time_remaining.fetch_sub(1, Ordering::SeqCst) - 1 <= 0
    }

    pub fn time_remaining(&self) -> i64 {
        self.time_remaining.load(Ordering::SeqCst)
    }

    /// Take the join handle for `end` to join. Panics if called twice -
    /// a programming error, since `end` visits the roster exactly once.
    pub fn take_join_handle(&self) -> JoinHandle<()> {
        self.join_handle
            .lock()
            .take()
            .expect("join handle already taken")
    }
}

impl std::fmt::Debug for ThreadRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadRecord")
            .field("tid", &self.tid)
            .field("priority", &self.priority)
            .field("status", &self.status())
            .field("time_remaining", &self.time_remaining())
            .finish()
    }
}

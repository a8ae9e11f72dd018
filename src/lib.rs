/*
 * pts-scheduler: User-space Preemptive Thread Scheduler
 *
 * This crate implements a simulated operating-system scheduler. Client code
 * "forks" logical threads with assigned priorities; the scheduler multiplexes
 * them on top of native OS threads such that at any instant exactly one
 * logical thread executes, deciding - based on priority, quantum expiry, and
 * I/O events - which logical thread runs next.
 *
 * MODULE MAP:
 * ==========
 *
 * - error:      SchedError and the §6 sentinel constants
 * - tid:        Tid, the opaque identifier handed back by fork()
 * - rendezvous: single-permit handoff gate underlying `run` and `planned`
 * - fifo:       C1 - insertion-ordered queue
 * - priority_queue: C2 - bounded array of Fifos, one per priority level
 * - thread:     C3 - the logical thread record
 * - io_table:   C4 - fixed-size array of per-device wait Fifos
 * - scheduler:  C5 - the scheduler core: init/fork/exec/wait/signal/end
 *
 * The only type most callers need is [`Scheduler`]; everything else is
 * exposed for testing and for embedding this scheduler's pieces elsewhere.
 */

mod error;
mod fifo;
mod io_table;
mod priority_queue;
mod rendezvous;
mod scheduler;
mod thread;
mod tid;

pub use error::SchedError;
pub use scheduler::Scheduler;
pub use thread::{StartRoutine, ThreadStatus};
pub use tid::Tid;

/// Maximum legal priority (inclusive). Threads may be forked with any
/// priority in `0..=MAX_PRIO`.
pub const MAX_PRIO: u8 = 5;

/// Upper bound on `io_count` accepted by [`Scheduler::init`].
pub const MAX_NUM_EVENTS: u16 = 256;

/// Sentinel returned in place of a [`Tid`] by a failed `fork` in contexts
/// that need a concrete "no thread" value rather than a `Result`.
pub const INVALID_TID: i64 = -1;

/// `init` precondition violated, or the core was already initialised.
pub const SCHED_INIT_ERR: i32 = -1;

/// `wait` was called with an out-of-range `io` device.
pub const WAIT_ERR: i32 = -3;

/// `signal` was called with an out-of-range `io` device.
pub const SIGNAL_ERR: i32 = -4;

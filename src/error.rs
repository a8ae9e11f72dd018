/*
 * Scheduler Error Type
 *
 * The only error type this crate returns. Mirrors the negative status
 * codes of the original interface (see the crate-level SCHED_INIT_ERR /
 * WAIT_ERR / SIGNAL_ERR constants) so callers that want the raw numeric
 * code can still get one via `From<SchedError> for i32`.
 */

use crate::MAX_PRIO;

/// Everything that can go wrong calling into a [`crate::Scheduler`].
///
/// All variants are argument or lifecycle errors (§7 "argument errors" /
/// "initialization conflict" / resource exhaustion surfaced to the
/// caller). Programming errors - calling an entry point with no running
/// thread, calling `end` before `init` - remain undefined behaviour per
/// the spec and are not represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedError {
    /// `init` was called with a zero quantum, an `io_count` above
    /// [`crate::MAX_NUM_EVENTS`], or on a core that is already running.
    #[error("scheduler already initialised, or invalid init arguments")]
    Init,

    /// `fork` was called with a priority above [`MAX_PRIO`].
    #[error("invalid priority {0} (max is {MAX_PRIO})")]
    InvalidPriority(u8),

    /// `wait` was called with a device index `>= io_number`.
    #[error("invalid io device {0} for wait (io_number is {1})")]
    WaitIo(u16, u16),

    /// `signal` was called with a device index `>= io_number`.
    #[error("invalid io device {0} for signal (io_number is {1})")]
    SignalIo(u16, u16),

    /// The native OS thread for a forked logical thread could not be
    /// spawned. The reference implementation terminates the process on
    /// this condition; this crate surfaces it to the caller instead, as
    /// explicitly licensed by §7.
    #[error("failed to spawn native OS thread")]
    Spawn,
}

impl From<SchedError> for i32 {
    fn from(err: SchedError) -> i32 {
        match err {
            SchedError::Init => crate::SCHED_INIT_ERR,
            SchedError::InvalidPriority(_) => crate::INVALID_TID as i32,
            SchedError::WaitIo(..) => crate::WAIT_ERR,
            SchedError::SignalIo(..) => crate::SIGNAL_ERR,
            SchedError::Spawn => crate::SCHED_INIT_ERR,
        }
    }
}

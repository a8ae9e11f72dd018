/*
 * Logical Thread Identifier
 *
 * Thin newtype over the underlying OS thread's identifier, so the rest of
 * the crate never has to name `std::thread::ThreadId` directly.
 */

use core::fmt;

/// Identifier of the native OS thread carrying a logical thread.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tid(pub(crate) std::thread::ThreadId);

impl fmt::Debug for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tid({:?})", self.0)
    }
}

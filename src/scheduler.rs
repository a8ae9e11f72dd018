/*
 * Scheduler Core (C5)
 *
 * The state machine that holds the ready queue, I/O table, the roster of
 * every thread ever forked, the "currently running" pointer, and the
 * "all threads finished" latch. Implements the five client-invoked
 * entry points (`fork`, `exec`, `wait`, `signal`, `end`) plus `init`.
 *
 * This file plays the role the teacher splits across `scheduler.rs`
 * (implementation) and `mod.rs` (public API): here both live together
 * since the whole surface is five methods plus a constructor, and a
 * split would only add indirection.
 *
 * All mutable core state lives behind one `parking_lot::Mutex<CoreState>`
 * (§5 "a correct reimplementation may replace the token-based discipline
 * with an explicit mutex around core state"). Entry points hold that lock
 * only for bookkeeping; the two genuine suspension points - acquiring a
 * `planned` gate and acquiring a `run` gate - always happen with the lock
 * released, exactly mirroring the original's "mutator is always the
 * current runner, or is provably parked" argument.
 */

use std::cell::RefCell;
use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SchedError;
use crate::io_table::IoTable;
use crate::priority_queue::PriorityQueue;
use crate::rendezvous::Rendezvous;
use crate::thread::{StartRoutine, ThreadRecord, ThreadStatus};
use crate::tid::Tid;
use crate::{MAX_NUM_EVENTS, MAX_PRIO};

struct CoreState {
    ready_queue: PriorityQueue<Arc<ThreadRecord>>,
    io_table: IoTable,
    roster: Vec<Arc<ThreadRecord>>,
    running_thread: Option<Arc<ThreadRecord>>,
}

struct SchedulerInner {
    time_quantum: i64,
    core: Mutex<CoreState>,
    has_finished: Rendezvous,
}

thread_local! {
    /// The handle for whichever logical thread is executing on this OS
    /// thread, set by `run_logical_thread` before `start_routine` runs.
    ///
    /// The original spec assumed a single process-wide scheduler, so a
    /// `start_routine` body could reach it through free functions with
    /// no arguments. Since this crate makes `Scheduler` an owned handle
    /// instead (§3's "Handle, not file-scope global"), a `start_routine`
    /// needs some other way to call back into its own scheduler; a
    /// thread-local is the natural fit, since each logical thread is
    /// already pinned 1:1 to one OS thread for its entire lifetime.
    static CURRENT: RefCell<Option<Scheduler>> = RefCell::new(None);

    /// This OS thread's own logical thread record, set once by
    /// `run_logical_thread` alongside `CURRENT`.
    ///
    /// Entry points (`exec`/`wait`/`signal`) identify "the calling
    /// thread" from here rather than from `CoreState::running_thread`.
    /// The two usually agree, but `running_thread` is a scheduling
    /// decision (who currently holds the CPU token) while this is an
    /// identity fact (who is making the call); reading the shared
    /// pointer instead of this would be wrong the instant a thread's own
    /// entry-point call is what changes `running_thread` out from under
    /// it before the call returns (e.g. `fork` demoting the caller).
    static THIS_THREAD: RefCell<Option<Arc<ThreadRecord>>> = RefCell::new(None);
}

/// A live scheduler instance.
///
/// Cheaply `Clone`-able (an `Arc` clone): every client call site, and
/// every spawned logical thread's closure, carries its own clone rather
/// than reaching through a process-wide global. See SPEC_FULL.md §3 for
/// why this crate prefers an owned handle over a file-scope singleton.
#[derive(Clone)]
pub struct Scheduler(Arc<SchedulerInner>);

impl Scheduler {
    /// Allocate a fresh scheduler core.
    ///
    /// # Errors
    /// [`SchedError::Init`] if `quantum == 0` or `io_count` exceeds
    /// [`crate::MAX_NUM_EVENTS`].
    pub fn init(quantum: i64, io_count: u16) -> Result<Scheduler, SchedError> {
        if quantum <= 0 || io_count > MAX_NUM_EVENTS {
            log::warn!(
                "init rejected: quantum={quantum} io_count={io_count} (max {MAX_NUM_EVENTS})"
            );
            return Err(SchedError::Init);
        }

        log::info!("init: quantum={quantum} ticks, {io_count} io device(s)");
        Ok(Scheduler(Arc::new(SchedulerInner {
            time_quantum: quantum,
            core: Mutex::new(CoreState {
                ready_queue: PriorityQueue::new(MAX_PRIO),
                io_table: IoTable::new(io_count),
                roster: Vec::new(),
                running_thread: None,
            }),
            has_finished: Rendezvous::new(),
        })))
    }

    /// Fork a new logical thread running `handler(prio)` on its own
    /// native OS thread.
    ///
    /// # Errors
    /// [`SchedError::InvalidPriority`] if `prio > MAX_PRIO`,
    /// [`SchedError::Spawn`] if the OS thread could not be created.
    pub fn fork(&self, handler: StartRoutine, prio: u8) -> Result<Tid, SchedError> {
        if prio > MAX_PRIO {
            log::warn!("fork rejected: priority {prio} exceeds MAX_PRIO ({MAX_PRIO})");
            return Err(SchedError::InvalidPriority(prio));
        }

        let old_runner = self.0.core.lock().running_thread.clone();

        let (tx, rx) = mpsc::sync_channel::<(Arc<ThreadRecord>, Scheduler)>(1);
        let time_quantum = self.0.time_quantum;

        let join_handle = std::thread::Builder::new()
            .name(format!("logical-thread-p{prio}"))
            .spawn(move || {
                let (record, scheduler) = rx
                    .recv()
                    .expect("forker dropped before handing off the thread record");
                scheduler.run_logical_thread(record);
            })
            .map_err(|err| {
                log::warn!("fork: failed to spawn native OS thread: {err}");
                SchedError::Spawn
            })?;

        let tid = Tid(join_handle.thread().id());
        let record = Arc::new(ThreadRecord::new(tid, prio, handler, time_quantum, join_handle));

        self.0.core.lock().roster.push(Arc::clone(&record));

        tx.send((Arc::clone(&record), self.clone()))
            .expect("spawned logical thread dropped its receiver");

        // Guaranteed per §4.2.1: the new thread has been placed (running
        // or queued) before fork returns.
        record.planned.acquire();

        match old_runner {
            None => {
                log::debug!("fork: bootstrap, booting {tid:?} directly");
                record.run.release();
            }
            Some(old) => {
                // Cost of issuing the fork, charged to the forker.
                let forker_exhausted = old.charge_tick();

                let stole_runner = self
                    .0
                    .core
                    .lock()
                    .running_thread
                    .as_ref()
                    .map(|r| r.tid())
                    == Some(tid);

                if stole_runner {
                    log::debug!("fork: {tid:?} (prio {prio}) preempts the forker");
                    record.run.release();
                    old.run.acquire();
                } else if forker_exhausted {
                    self.preempt(old);
                }
            }
        }

        log::info!("fork: spawned {tid:?} at priority {prio}");
        Ok(tid)
    }

    /// Charge one scheduler tick to the calling thread; preempt if its
    /// quantum is now exhausted.
    pub fn exec(&self) {
        let current = self.current_thread();
        if current.charge_tick() {
            self.preempt(current);
        }
    }

    /// Park the calling thread on I/O device `io` and hand the CPU to
    /// the next runnable thread. Returns once some later `signal(io)`
    /// has woken this thread and it has been rescheduled.
    ///
    /// # Errors
    /// [`SchedError::WaitIo`] if `io >= io_number`.
    pub fn wait(&self, io: u16) -> Result<(), SchedError> {
        let io_number = self.0.core.lock().io_table.io_number();
        if io >= io_number {
            log::warn!("wait rejected: io {io} out of range (io_number is {io_number})");
            return Err(SchedError::WaitIo(io, io_number));
        }

        let current = self.current_thread();
        current.charge_tick();

        {
            let mut core = self.0.core.lock();
            core.io_table.park(io, Arc::clone(&current));
        }
        log::debug!("wait: {:?} parked on io {io}", current.tid());

        self.run_next_thread();
        current.run.acquire();
        Ok(())
    }

    /// Wake every thread parked on I/O device `io`, returning how many
    /// were woken. May preempt the caller if a woken thread outranks it.
    ///
    /// # Errors
    /// [`SchedError::SignalIo`] if `io >= io_number`.
    pub fn signal(&self, io: u16) -> Result<u32, SchedError> {
        let io_number = self.0.core.lock().io_table.io_number();
        if io >= io_number {
            log::warn!("signal rejected: io {io} out of range (io_number is {io_number})");
            return Err(SchedError::SignalIo(io, io_number));
        }

        let current = self.current_thread();
        let exhausted = current.charge_tick();

        let woken = self.0.core.lock().io_table.drain(io);
        for waiter in &woken {
            self.plan_thread(Arc::clone(waiter));
        }
        let count = woken.len() as u32;
        log::debug!("signal: io {io} woke {count} thread(s)");

        let now_running = self.0.core.lock().running_thread.clone();
        if now_running.as_ref().map(|r| r.tid()) != Some(current.tid()) {
            if let Some(new_runner) = now_running {
                new_runner.run.release();
            }
            current.run.acquire();
        } else if exhausted {
            self.preempt(current);
        }

        Ok(count)
    }

    /// Block until every forked thread has terminated, join every
    /// native OS thread, and release all scheduler resources.
    pub fn end(&self) {
        let needs_drain = !self.0.core.lock().roster.is_empty();
        if needs_drain {
            self.0.has_finished.acquire();
        }

        let roster = {
            let mut core = self.0.core.lock();
            std::mem::take(&mut core.roster)
        };

        let joined = roster.len();
        for thread in roster {
            if thread.take_join_handle().join().is_err() {
                log::warn!("end: a logical thread's OS thread panicked");
            }
        }

        log::info!("end: scheduler torn down, {joined} thread(s) joined");
    }

    // ------------------------------------------------------------------
    // Internal handoff protocol (§4.2.2)
    // ------------------------------------------------------------------

    /// Place `t` into the schedulable set with correct priority
    /// semantics, and acknowledge its placement via `t.planned`.
    ///
    /// Iterative rewrite of the original's depth-1-bounded recursion
    /// (§9's explicit preference): the demoted thread always lands in
    /// the "enqueue" arm, so there is nothing left to recurse into.
    fn plan_thread(&self, t: Arc<ThreadRecord>) {
        let mut core = self.0.core.lock();
        let current = core.running_thread.clone();

        match current {
            None => {
                core.running_thread = Some(Arc::clone(&t));
            }
            Some(current) if current.priority() < t.priority() => {
                core.ready_queue.enqueue(Arc::clone(&current), current.priority());
                current.planned.release();
                core.running_thread = Some(Arc::clone(&t));
            }
            Some(_) => {
                core.ready_queue.enqueue(Arc::clone(&t), t.priority());
            }
        }
        drop(core);

        t.planned.release();
    }

    /// Give the CPU to whoever `plan_thread` has selected, or drain the
    /// scheduler if nothing remains to run.
    fn run_next_thread(&self) {
        let mut core = self.0.core.lock();

        if core.ready_queue.is_empty() {
            let drained = core
                .running_thread
                .as_ref()
                .map_or(true, |r| r.status() == ThreadStatus::Terminated);
            if drained {
                drop(core);
                log::info!("run_next_thread: ready queue empty, scheduler draining");
                self.0.has_finished.release();
            } else {
                // Nobody is ready and the caller just gave up the CPU token
                // (parked on I/O, or demoted with no successor) without
                // finishing: no thread holds the token right now. Leaving
                // `running_thread` pointing at the parked thread would make
                // a later `plan_thread` treat it as "currently running" and
                // enqueue it a second time alongside its I/O wait.
                core.running_thread = None;
            }
            return;
        }

        let next = core.ready_queue.dequeue();
        next.reset_quantum(self.0.time_quantum);
        core.running_thread = Some(Arc::clone(&next));
        drop(core);

        next.run.release();
    }

    /// The preemption idiom of §4.2.2: re-insert `r` into scheduling,
    /// hand the CPU to whoever is now highest priority (possibly `r`
    /// itself), then block `r` until its next turn.
    fn preempt(&self, r: Arc<ThreadRecord>) {
        self.plan_thread(Arc::clone(&r));
        r.planned.acquire();
        self.run_next_thread();
        r.run.acquire();
    }

    /// The OS-thread start routine of §4.2.3.
    fn run_logical_thread(&self, record: Arc<ThreadRecord>) {
        CURRENT.with(|cell| *cell.borrow_mut() = Some(self.clone()));
        THIS_THREAD.with(|cell| *cell.borrow_mut() = Some(Arc::clone(&record)));

        self.plan_thread(Arc::clone(&record));
        record.run.acquire();

        (record.start_routine())(record.priority());

        record.set_terminated();
        log::debug!("{:?} terminated", record.tid());
        self.run_next_thread();
    }

    /// The scheduler handle for whichever logical thread is running on
    /// the calling OS thread.
    ///
    /// Since [`StartRoutine`] is a bare `fn(u8)` with no closure capture
    /// (mirroring the original's function-pointer handler, §3), a
    /// `start_routine` body has no other way to reach back into the
    /// scheduler it was forked from; this is the intended way to do so.
    ///
    /// # Panics
    /// Panics if called from a thread that is not currently running as a
    /// logical thread of some scheduler - a programming error per §7,
    /// matching [`Scheduler::current_thread`]'s "no running thread" panic.
    pub fn current() -> Scheduler {
        CURRENT.with(|cell| {
            cell.borrow()
                .clone()
                .expect("Scheduler::current() called outside a logical thread")
        })
    }

    /// The calling OS thread's own logical thread record.
    ///
    /// Deliberately reads `THIS_THREAD`, not `CoreState::running_thread`:
    /// the two can disagree mid-call (e.g. a caller that is about to
    /// demote itself), and every entry point means "me", never "whoever
    /// the core currently thinks is running".
    ///
    /// # Panics
    /// Panics if called from an OS thread that is not running as some
    /// scheduler's logical thread - a programming error per §7.
    fn current_thread(&self) -> Arc<ThreadRecord> {
        THIS_THREAD.with(|cell| {
            cell.borrow()
                .clone()
                .expect("scheduler entry point called with no running thread")
        })
    }
}

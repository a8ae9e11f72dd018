//! End-to-end scenarios from SPEC_FULL.md §8, plus a couple of the
//! invariants/laws §8 calls out separately from the six worked examples.
//!
//! Every scenario with more than one logical thread has the first thread
//! fork the rest of the cast itself, rather than having the test's own
//! main thread issue every `fork` call. `fork` only blocks its caller
//! until the new thread has been *placed* (queued or installed), not
//! until the new thread has done any work, so two `fork` calls issued
//! back-to-back from outside any logical thread race against whatever
//! the first thread does in between - there is no portable way to pin
//! down the exact interleaving. A fork issued by an already-running
//! logical thread has no such race: the handoff protocol itself
//! serializes the forker against its own forkee.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use pts_scheduler::Scheduler;

fn init_logging() {
    let _ = env_logger::try_init();
}

// ---------------------------------------------------------------------
// Scenario 1: a single thread runs to completion without hanging.
// ---------------------------------------------------------------------

static S1_LOG: Mutex<Vec<&str>> = Mutex::new(Vec::new());

fn s1_only(_prio: u8) {
    let sched = Scheduler::current();
    for _ in 0..3 {
        S1_LOG.lock().unwrap().push("H0");
        sched.exec();
    }
}

#[test]
fn single_thread_runs_to_completion() {
    init_logging();
    let sched = Scheduler::init(2, 1).expect("valid init args");
    sched.fork(s1_only, 0).expect("valid fork args");
    sched.end();

    let log = S1_LOG.lock().unwrap();
    assert_eq!(*log, vec!["H0", "H0", "H0"]);
}

// ---------------------------------------------------------------------
// Scenario 2: round-robin at equal priority.
//
// quantum = 2. A forks B (same priority) as its very first action, then
// both loop `exec`ing 4 times. The fork costs the forking thread (A) one
// tick (§4.2.4: the old runner is always charged, even when the "old
// runner" and the forker are the same thread), so A's first turn is one
// tick short of a full quantum; every turn after that is a full quantum
// for whichever thread holds the CPU. This is why the log below is a
// rotation of the naive "two at a time" pattern rather than starting
// with a full AA pair.
// ---------------------------------------------------------------------

static S2_LOG: Mutex<Vec<&str>> = Mutex::new(Vec::new());

fn s2_b(_prio: u8) {
    let sched = Scheduler::current();
    for _ in 0..4 {
        S2_LOG.lock().unwrap().push("B");
        sched.exec();
    }
}

fn s2_a(prio: u8) {
    let sched = Scheduler::current();
    sched.fork(s2_b, prio).expect("valid fork args");
    for _ in 0..4 {
        S2_LOG.lock().unwrap().push("A");
        sched.exec();
    }
}

#[test]
fn round_robin_equal_priority() {
    init_logging();
    let sched = Scheduler::init(2, 1).expect("valid init args");
    sched.fork(s2_a, 2).expect("valid fork args");
    sched.end();

    let log = S2_LOG.lock().unwrap();
    assert_eq!(*log, vec!["A", "B", "B", "A", "A", "B", "B", "A"]);
}

// ---------------------------------------------------------------------
// Scenario 3: priority preemption at fork.
//
// A (prio 1) forks B (prio 4) as its first action. Forking a
// higher-priority thread immediately hands it the CPU and blocks the
// forker until it is rescheduled (§4.2.3's "new thread stole the
// runner" case), so B runs to completion - uninterrupted, since nothing
// else at or above its priority is ready - before A resumes.
// ---------------------------------------------------------------------

static S3_LOG: Mutex<Vec<&str>> = Mutex::new(Vec::new());

fn s3_b(_prio: u8) {
    let sched = Scheduler::current();
    for _ in 0..5 {
        S3_LOG.lock().unwrap().push("B");
        sched.exec();
    }
}

fn s3_a(_prio: u8) {
    let sched = Scheduler::current();
    S3_LOG.lock().unwrap().push("A");
    sched.fork(s3_b, 4).expect("valid fork args");
    for _ in 0..4 {
        S3_LOG.lock().unwrap().push("A");
        sched.exec();
    }
}

#[test]
fn priority_preemption_at_fork() {
    init_logging();
    let sched = Scheduler::init(5, 1).expect("valid init args");
    sched.fork(s3_a, 1).expect("valid fork args");
    sched.end();

    let log = S3_LOG.lock().unwrap();
    assert_eq!(
        *log,
        vec!["A", "B", "B", "B", "B", "B", "A", "A", "A", "A"]
    );
}

// ---------------------------------------------------------------------
// Scenario 4: wait/signal symmetry.
//
// A forks B (same priority), then waits on device 0. B runs to
// completion and signals device 0 just before finishing, which wakes
// A; A then resumes and finishes.
// ---------------------------------------------------------------------

static S4_LOG: Mutex<Vec<&str>> = Mutex::new(Vec::new());

fn s4_b(_prio: u8) {
    let sched = Scheduler::current();
    S4_LOG.lock().unwrap().push("B-before-signal");
    let woken = sched.signal(0).expect("valid io");
    assert_eq!(woken, 1);
    S4_LOG.lock().unwrap().push("B-after-signal");
}

fn s4_a(prio: u8) {
    let sched = Scheduler::current();
    sched.fork(s4_b, prio).expect("valid fork args");
    S4_LOG.lock().unwrap().push("A-before-wait");
    sched.wait(0).expect("valid io");
    S4_LOG.lock().unwrap().push("A-after-wait");
}

#[test]
fn wait_signal_symmetry() {
    init_logging();
    let sched = Scheduler::init(2, 1).expect("valid init args");
    sched.fork(s4_a, 2).expect("valid fork args");
    sched.end();

    let log = S4_LOG.lock().unwrap();
    assert_eq!(
        *log,
        vec![
            "A-before-wait",
            "B-before-signal",
            "B-after-signal",
            "A-after-wait",
        ]
    );
}

// ---------------------------------------------------------------------
// Scenario 5: signal wakes a higher-priority waiter.
//
// L (prio 1) forks H (prio 4), which immediately waits on device 0 and
// so hands the CPU straight back to L. L then signals device 0; since
// the woken H outranks L, L is preempted in favor of H, which runs to
// completion, after which L resumes and finishes.
// ---------------------------------------------------------------------

static S5_LOG: Mutex<Vec<&str>> = Mutex::new(Vec::new());

fn s5_h(_prio: u8) {
    let sched = Scheduler::current();
    S5_LOG.lock().unwrap().push("H-before-wait");
    sched.wait(0).expect("valid io");
    S5_LOG.lock().unwrap().push("H-after-wait");
}

fn s5_l(_prio: u8) {
    let sched = Scheduler::current();
    S5_LOG.lock().unwrap().push("L-before-fork");
    sched.fork(s5_h, 4).expect("valid fork args");
    S5_LOG.lock().unwrap().push("L-before-signal");
    let woken = sched.signal(0).expect("valid io");
    assert_eq!(woken, 1);
    S5_LOG.lock().unwrap().push("L-after-signal");
}

#[test]
fn signal_wakes_higher_priority() {
    init_logging();
    let sched = Scheduler::init(2, 1).expect("valid init args");
    sched.fork(s5_l, 1).expect("valid fork args");
    sched.end();

    let log = S5_LOG.lock().unwrap();
    assert_eq!(
        *log,
        vec![
            "L-before-fork",
            "H-before-wait",
            "L-before-signal",
            "H-after-wait",
            "L-after-signal",
        ]
    );
}

// ---------------------------------------------------------------------
// Scenario 6: quantum reset on resume.
//
// Two equal-priority threads round-robin for several turns at quantum
// 3. A resumed thread's *next* turn is checked to run the full quantum
// again rather than whatever was left when it was last preempted -
// "verifiable by counting exec calls before its next preemption" per
// SPEC_FULL.md §8. Rather than hand-deriving one long exact log (and
// risking a transcription slip somewhere in a sequence this size), this
// collapses the log into runs of consecutive same-thread entries and
// checks their lengths directly, which is what the law actually claims.
// ---------------------------------------------------------------------

static S6_LOG: Mutex<Vec<&str>> = Mutex::new(Vec::new());

fn s6_b(_prio: u8) {
    let sched = Scheduler::current();
    for _ in 0..9 {
        S6_LOG.lock().unwrap().push("B");
        sched.exec();
    }
}

fn s6_a(prio: u8) {
    let sched = Scheduler::current();
    sched.fork(s6_b, prio).expect("valid fork args");
    for _ in 0..9 {
        S6_LOG.lock().unwrap().push("A");
        sched.exec();
    }
}

fn run_lengths(log: &[&str]) -> Vec<(&'static str, usize)> {
    let mut runs: Vec<(&'static str, usize)> = Vec::new();
    for &id in log {
        match runs.last_mut() {
            Some((last_id, count)) if *last_id == id => *count += 1,
            _ => runs.push((if id == "A" { "A" } else { "B" }, 1)),
        }
    }
    runs
}

#[test]
fn quantum_reset_on_resume() {
    init_logging();
    const QUANTUM: i64 = 3;
    let sched = Scheduler::init(QUANTUM, 1).expect("valid init args");
    sched.fork(s6_a, 3).expect("valid fork args");
    sched.end();

    let log = S6_LOG.lock().unwrap();
    let runs = run_lengths(&log);

    // A's first turn is one tick short, charged by forking B (see
    // scenario 2's comment); both threads finish (9 execs each, a
    // multiple of the quantum) so the very last run of each may also be
    // short if the thread terminates mid-quantum rather than being
    // preempted. Every run in between must be a full, freshly-reset
    // quantum.
    assert!(runs.len() > 2, "expected several preemption rounds, got {runs:?}");
    assert_eq!(runs[0], ("A", QUANTUM as usize - 1));
    for run in &runs[1..runs.len() - 1] {
        assert_eq!(run.1, QUANTUM as usize, "run {run:?} was not a full reset quantum");
    }
}

// ---------------------------------------------------------------------
// Law: FIFO within a priority level.
//
// Three threads forked at the same priority, each finishing in a single
// quantum, must run in the order they were forked - priority alone
// doesn't determine ordering among equals.
// ---------------------------------------------------------------------

static FIFO_LOG: Mutex<Vec<&str>> = Mutex::new(Vec::new());

fn fifo_c(_prio: u8) {
    FIFO_LOG.lock().unwrap().push("C");
}

fn fifo_b(prio: u8) {
    let sched = Scheduler::current();
    FIFO_LOG.lock().unwrap().push("B");
    sched.fork(fifo_c, prio).expect("valid fork args");
}

fn fifo_a(prio: u8) {
    let sched = Scheduler::current();
    FIFO_LOG.lock().unwrap().push("A");
    sched.fork(fifo_b, prio).expect("valid fork args");
}

#[test]
fn fifo_within_priority_level() {
    init_logging();
    // A generous quantum: each thread only ever does the one unit of
    // work (push + at most one fork) before terminating on its own, so
    // nothing here is preempted mid-quantum.
    let sched = Scheduler::init(100, 1).expect("valid init args");
    sched.fork(fifo_a, 2).expect("valid fork args");
    sched.end();

    let log = FIFO_LOG.lock().unwrap();
    assert_eq!(*log, vec!["A", "B", "C"]);
}

// ---------------------------------------------------------------------
// Invariant: exactly one logical thread executes at a time.
//
// Every handler bumps a shared counter around a short spin, tracking
// the concurrently-running count's high-water mark. If two logical
// threads ever overlap, the mark exceeds one.
// ---------------------------------------------------------------------

static CONCURRENT: AtomicU32 = AtomicU32::new(0);
static HIGH_WATER: AtomicU32 = AtomicU32::new(0);

fn bump_and_spin() {
    let now = CONCURRENT.fetch_add(1, Ordering::SeqCst) + 1;
    HIGH_WATER.fetch_max(now, Ordering::SeqCst);
    for _ in 0..1000 {
        std::hint::spin_loop();
    }
    CONCURRENT.fetch_sub(1, Ordering::SeqCst);
}

fn single_runner_x(_prio: u8) {
    let sched = Scheduler::current();
    for _ in 0..3 {
        bump_and_spin();
        sched.exec();
    }
}

fn single_runner_y(prio: u8) {
    let sched = Scheduler::current();
    sched.fork(single_runner_x, prio).expect("valid fork args");
    for _ in 0..3 {
        bump_and_spin();
        sched.exec();
    }
}

#[test]
fn single_runner_invariant() {
    init_logging();
    let sched = Scheduler::init(1, 1).expect("valid init args");
    sched.fork(single_runner_y, 2).expect("valid fork args");
    sched.end();

    assert_eq!(HIGH_WATER.load(Ordering::SeqCst), 1);
}

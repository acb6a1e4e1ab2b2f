use core::mem;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use parking_lot::ReentrantMutex;

use super::irq::IrqControl;
use crate::diagnostic::{self, LockOp, NestingDiagnostic};

/// Log target for lock transitions.
const LOCK_TARGET: &str = "atomic_block::lock";

/// The process-wide instance. Statically initialized, never torn down.
static GLOBAL: GlobalLockState = GlobalLockState::new();

/// Emulated global interrupt flag.
///
/// A reentrant lock keyed by thread identity stands in for the hardware
/// interrupt-enable bit: a thread that holds the lock runs "with
/// interrupts disabled", and no other thread can enter a masked region
/// until it is released. The same thread may mask again without blocking.
///
/// `depth` counts active acquisitions. It is only written while `lock` is
/// held and only feeds the nesting diagnostic; mutual exclusion comes from
/// `lock` alone.
pub struct GlobalLockState {
    lock: ReentrantMutex<()>,
    depth: AtomicU32,
    reports: AtomicUsize,
}

impl GlobalLockState {
    /// Create an independent lock state, initially unlocked with depth 0.
    ///
    /// Most code wants [`global`](Self::global); separate instances exist so
    /// that isolated regions (and tests) do not contend with the rest of
    /// the process.
    pub const fn new() -> Self {
        Self {
            lock: parking_lot::const_reentrant_mutex(()),
            depth: AtomicU32::new(0),
            reports: AtomicUsize::new(0),
        }
    }

    /// The process-wide lock state shared by every section.
    pub const fn global() -> &'static Self {
        &GLOBAL
    }

    /// Current nesting depth of the holding thread.
    ///
    /// Only stable when read by the thread that holds the lock.
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.lock.is_owned_by_current_thread()
    }

    /// Number of nesting diagnostics emitted against this state.
    pub fn nesting_reports(&self) -> usize {
        self.reports.load(Ordering::Relaxed)
    }

    /// Take the lock, blocking until it is available, and bump the depth.
    ///
    /// With `nesting_diagnostic` set, a resulting depth above 1 is reported.
    pub(crate) fn acquire(&self, nesting_diagnostic: bool) {
        // The lock stays held past this call; `release` undoes it.
        mem::forget(self.lock.lock());

        let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!(target: LOCK_TARGET, "acquire, depth {depth}");

        if nesting_diagnostic && depth > 1 {
            self.report(LockOp::Acquire, depth);
        }
    }

    /// Drop the depth, then give back one level of the lock.
    ///
    /// With `nesting_diagnostic` set, a depth above 1 before the decrement
    /// is reported. A thread that does not hold the lock has no level to
    /// give back: the call is a no-op and leaves the holder untouched.
    pub(crate) fn release(&self, nesting_diagnostic: bool) {
        if !self.lock.is_owned_by_current_thread() {
            log::trace!(target: LOCK_TARGET, "release without holding the lock, ignored");
            return;
        }

        let depth = self.depth.fetch_sub(1, Ordering::Relaxed);
        log::trace!(target: LOCK_TARGET, "release, depth {}", depth - 1);

        if nesting_diagnostic && depth > 1 {
            self.report(LockOp::Release, depth);
        }

        // SAFETY: checked above that the current thread holds the lock, so
        // there is a level from `acquire` to give back.
        unsafe { self.lock.force_unlock() };
    }

    fn report(&self, op: LockOp, depth: u32) {
        if diagnostic::report(&NestingDiagnostic { op, depth }) {
            self.reports.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for GlobalLockState {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for GlobalLockState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlobalLockState")
            .field("locked", &self.lock.is_locked())
            .field("depth", &self.depth())
            .field("nesting_reports", &self.nesting_reports())
            .finish()
    }
}

impl IrqControl for GlobalLockState {
    fn disable(&self, nesting_diagnostic: bool) {
        self.acquire(nesting_diagnostic);
    }

    fn enable(&self, nesting_diagnostic: bool) {
        self.release(nesting_diagnostic);
    }

    fn enabled(&self) -> bool {
        !self.is_held_by_current_thread()
    }
}

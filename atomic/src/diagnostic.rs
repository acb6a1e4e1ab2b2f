//! Nesting diagnostics.
//!
//! A lock meant to be taken non-reentrantly (a forced section) that is
//! entered while already held is reported here. Reports go to the `log`
//! facade under [`TARGET`] at warn level; they never fail the operation.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Log target used for every nesting report.
pub const TARGET: &str = "atomic_block::nesting";

static EMITTED: AtomicUsize = AtomicUsize::new(0);

/// Nesting reports emitted so far by every lock state in the process.
///
/// Monotonic. Stays at 0 without the `diagnostics` feature.
pub fn emitted() -> usize {
    EMITTED.load(Ordering::Relaxed)
}

/// Which side of a lock transition produced a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockOp {
    Acquire,
    Release,
}

impl fmt::Display for LockOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockOp::Acquire => f.write_str("acquire"),
            LockOp::Release => f.write_str("release"),
        }
    }
}

/// A non-fatal report that a non-reentrant section was nested.
///
/// `depth` is the nesting depth that triggered the report: the value after
/// the increment for an acquire, the value before the decrement for a
/// release. Either way it is at least 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NestingDiagnostic {
    pub op: LockOp,
    pub depth: u32,
}

impl fmt::Display for NestingDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "you nested non recursive locks ({} at depth {})",
            self.op, self.depth
        )
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "diagnostics")] {
        /// Emit `diag` on the warning channel. Returns whether it was emitted.
        pub(crate) fn report(diag: &NestingDiagnostic) -> bool {
            log::warn!(target: TARGET, "{diag}");
            EMITTED.fetch_add(1, Ordering::Relaxed);
            true
        }
    } else {
        pub(crate) fn report(_diag: &NestingDiagnostic) -> bool {
            false
        }
    }
}

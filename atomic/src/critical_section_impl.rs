//! `critical-section` backend on the process-wide lock state.
//!
//! Lets crates written against `critical_section::with` run on the host
//! under the same mutual exclusion as atomic sections. Nesting is legal
//! here, so no nesting diagnostic is armed.

use critical_section::{Impl, RawRestoreState, set_impl};

use crate::sync::{GlobalLockState, IrqControl};

struct HostCriticalSection;
set_impl!(HostCriticalSection);

// Nesting is tracked by the reentrant lock, so no restore state is kept.
// Only the crate's default `RawRestoreState = ()` is supported; none of the
// `restore-state-*` features.
unsafe impl Impl for HostCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        GlobalLockState::global().disable(false);
        ()
    }

    unsafe fn release(_restore_state: RawRestoreState) {
        GlobalLockState::global().enable(false);
    }
}

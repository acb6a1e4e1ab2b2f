use core::marker::PhantomData;

use super::global::GlobalLockState;
use super::irq::IrqControl;

/// Exit policy of an atomic section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AtomicPolicy {
    /// Leave the flag as it was found. Always correct.
    RestoreState,
    /// Unmask on exit without looking at the entry state.
    ///
    /// Only valid when interrupts are known to be enabled on entry.
    ForceOn,
}

/// Exit policy of a non-atomic section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NonAtomicPolicy {
    /// Leave the flag as it was found. Always correct.
    ///
    /// Entered with interrupts already enabled, the section neither
    /// unmasks on entry nor masks on exit.
    RestoreState,
    /// Mask on exit without looking at the entry state.
    ///
    /// Only valid when interrupts are known to be disabled on entry. Opened
    /// with interrupts enabled, there is nothing to unmask, and the thread
    /// leaves the section still masked.
    ForceOff,
}

/// What a [`SectionGuard`] does on entry and on exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Policy {
    Atomic(AtomicPolicy),
    NonAtomic(NonAtomicPolicy),
}

impl Policy {
    pub const fn is_atomic(self) -> bool {
        matches!(self, Policy::Atomic(_))
    }

    /// Forced policies hard-code the exit state. They are the
    /// non-reentrant usage, so nesting them is reported.
    pub const fn is_forced(self) -> bool {
        matches!(
            self,
            Policy::Atomic(AtomicPolicy::ForceOn) | Policy::NonAtomic(NonAtomicPolicy::ForceOff)
        )
    }
}

impl From<AtomicPolicy> for Policy {
    fn from(policy: AtomicPolicy) -> Self {
        Policy::Atomic(policy)
    }
}

impl From<NonAtomicPolicy> for Policy {
    fn from(policy: NonAtomicPolicy) -> Self {
        Policy::NonAtomic(policy)
    }
}

/// One atomic or non-atomic region.
///
/// Construction moves the flag into the section's state; dropping the
/// guard moves it back. Drop runs on every way out of the enclosing scope
/// (fallthrough, early return, `?`, unwinding panic), so the exit
/// transition happens exactly once.
///
/// The guard is tied to the thread that created it, since the emulated
/// flag is owned per thread.
#[must_use = "the section ends as soon as the guard is dropped"]
pub struct SectionGuard<'a, I: IrqControl + ?Sized = GlobalLockState> {
    irq: &'a I,
    policy: Policy,
    saved_enabled: Option<bool>,
    transitioned: bool,
    _not_send: PhantomData<*const ()>,
}

impl SectionGuard<'static> {
    /// Open a section on the process-wide lock state.
    pub fn new(policy: impl Into<Policy>) -> Self {
        Self::new_on(GlobalLockState::global(), policy)
    }
}

impl<'a, I: IrqControl + ?Sized> SectionGuard<'a, I> {
    /// Open a section on `irq`.
    ///
    /// Restore policies read the entry state first. A non-atomic restore
    /// section entered with interrupts already enabled has nothing to give
    /// back and performs no transition at all. Forced policies never read
    /// the entry state.
    pub fn new_on(irq: &'a I, policy: impl Into<Policy>) -> Self {
        let policy = policy.into();
        let nesting_diagnostic = policy.is_forced();

        let saved_enabled = if policy.is_forced() {
            None
        } else {
            Some(irq.enabled())
        };

        let transitioned = match policy {
            Policy::Atomic(_) => {
                irq.disable(nesting_diagnostic);
                true
            }
            Policy::NonAtomic(NonAtomicPolicy::RestoreState) if saved_enabled == Some(true) => false,
            Policy::NonAtomic(_) => {
                irq.enable(nesting_diagnostic);
                true
            }
        };

        Self {
            irq,
            policy,
            saved_enabled,
            transitioned,
            _not_send: PhantomData,
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Interrupt state captured on entry. `None` for forced policies.
    pub fn saved_state(&self) -> Option<bool> {
        self.saved_enabled
    }
}

impl<I: IrqControl + ?Sized> Drop for SectionGuard<'_, I> {
    fn drop(&mut self) {
        if !self.transitioned {
            return;
        }

        let nesting_diagnostic = self.policy.is_forced();
        if self.policy.is_atomic() {
            self.irq.enable(nesting_diagnostic);
        } else {
            self.irq.disable(nesting_diagnostic);
        }
    }
}

/// Run `f` with interrupts masked on the process-wide lock state.
pub fn atomic<R>(policy: AtomicPolicy, f: impl FnOnce() -> R) -> R {
    let _section = SectionGuard::new(policy);
    f()
}

/// Run `f` with interrupts unmasked, typically from inside an atomic
/// section.
pub fn non_atomic<R>(policy: NonAtomicPolicy, f: impl FnOnce() -> R) -> R {
    let _section = SectionGuard::new(policy);
    f()
}

/// Whether the calling thread currently runs with interrupts enabled.
pub fn interrupts_enabled() -> bool {
    GlobalLockState::global().enabled()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::panic::{self, AssertUnwindSafe};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Call {
        Query,
        Disable(bool),
        Enable(bool),
    }

    /// Single-level flag that records every call made on it.
    struct RecordingIrq {
        enabled: Cell<bool>,
        calls: RefCell<Vec<Call>>,
    }

    impl RecordingIrq {
        fn new(enabled: bool) -> Self {
            Self {
                enabled: Cell::new(enabled),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl IrqControl for RecordingIrq {
        fn disable(&self, nesting_diagnostic: bool) {
            self.calls.borrow_mut().push(Call::Disable(nesting_diagnostic));
            self.enabled.set(false);
        }

        fn enable(&self, nesting_diagnostic: bool) {
            self.calls.borrow_mut().push(Call::Enable(nesting_diagnostic));
            self.enabled.set(true);
        }

        fn enabled(&self) -> bool {
            self.calls.borrow_mut().push(Call::Query);
            self.enabled.get()
        }
    }

    #[test]
    fn atomic_restore_masks_then_unmasks() {
        let irq = RecordingIrq::new(true);
        {
            let guard = SectionGuard::new_on(&irq, AtomicPolicy::RestoreState);
            assert_eq!(guard.saved_state(), Some(true));
            assert_eq!(irq.calls(), [Call::Query, Call::Disable(false)]);
            assert!(!irq.enabled.get());
        }
        assert_eq!(
            irq.calls(),
            [Call::Query, Call::Disable(false), Call::Enable(false)]
        );
        assert!(irq.enabled.get());
    }

    #[test]
    fn atomic_force_on_never_reads_entry_state() {
        let irq = RecordingIrq::new(true);
        {
            let guard = SectionGuard::new_on(&irq, AtomicPolicy::ForceOn);
            assert_eq!(guard.saved_state(), None);
        }
        assert_eq!(irq.calls(), [Call::Disable(true), Call::Enable(true)]);
        assert!(irq.enabled.get());
    }

    #[test]
    fn atomic_force_on_exits_enabled_from_either_state() {
        for entry in [true, false] {
            let irq = RecordingIrq::new(entry);
            drop(SectionGuard::new_on(&irq, AtomicPolicy::ForceOn));
            assert_eq!(irq.calls(), [Call::Disable(true), Call::Enable(true)]);
            assert!(irq.enabled.get());
        }
    }

    #[test]
    fn non_atomic_force_off_exits_disabled_from_either_state() {
        for entry in [true, false] {
            let irq = RecordingIrq::new(entry);
            drop(SectionGuard::new_on(&irq, NonAtomicPolicy::ForceOff));
            assert_eq!(irq.calls(), [Call::Enable(true), Call::Disable(true)]);
            assert!(!irq.enabled.get());
        }
    }

    #[test]
    fn non_atomic_restore_unmasks_then_masks() {
        let irq = RecordingIrq::new(false);
        {
            let _guard = SectionGuard::new_on(&irq, NonAtomicPolicy::RestoreState);
            assert!(irq.enabled.get());
        }
        assert_eq!(
            irq.calls(),
            [Call::Query, Call::Enable(false), Call::Disable(false)]
        );
        assert!(!irq.enabled.get());
    }

    #[test]
    fn non_atomic_restore_when_already_enabled_is_inert() {
        let irq = RecordingIrq::new(true);
        {
            let guard = SectionGuard::new_on(&irq, NonAtomicPolicy::RestoreState);
            assert_eq!(guard.saved_state(), Some(true));
        }
        assert_eq!(irq.calls(), [Call::Query]);
        assert!(irq.enabled.get());
    }

    #[test]
    fn non_atomic_force_off_never_reads_entry_state() {
        let irq = RecordingIrq::new(false);
        {
            let _guard = SectionGuard::new_on(&irq, NonAtomicPolicy::ForceOff);
            assert!(irq.enabled.get());
        }
        assert_eq!(irq.calls(), [Call::Enable(true), Call::Disable(true)]);
        assert!(!irq.enabled.get());
    }

    #[test]
    fn early_return_runs_exit_once() {
        fn body(irq: &RecordingIrq, bail: bool) -> u32 {
            let _guard = SectionGuard::new_on(irq, AtomicPolicy::ForceOn);
            if bail {
                return 1;
            }
            2
        }

        let irq = RecordingIrq::new(true);
        assert_eq!(body(&irq, true), 1);
        assert_eq!(irq.calls(), [Call::Disable(true), Call::Enable(true)]);
    }

    #[test]
    fn question_mark_exit_runs_exit_once() {
        fn body(irq: &RecordingIrq) -> Result<(), &'static str> {
            let _guard = SectionGuard::new_on(irq, NonAtomicPolicy::ForceOff);
            Err::<(), _>("bail")?;
            Ok(())
        }

        let irq = RecordingIrq::new(false);
        assert_eq!(body(&irq), Err("bail"));
        assert_eq!(irq.calls(), [Call::Enable(true), Call::Disable(true)]);
    }

    #[test]
    fn panic_unwinds_through_exit() {
        let irq = RecordingIrq::new(true);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = SectionGuard::new_on(&irq, AtomicPolicy::RestoreState);
            panic!("inside section");
        }));

        assert!(result.is_err());
        assert_eq!(
            irq.calls(),
            [Call::Query, Call::Disable(false), Call::Enable(false)]
        );
        assert!(irq.enabled.get());
    }

    #[test]
    fn policy_classification() {
        assert!(Policy::from(AtomicPolicy::RestoreState).is_atomic());
        assert!(!Policy::from(NonAtomicPolicy::ForceOff).is_atomic());
        assert!(Policy::from(AtomicPolicy::ForceOn).is_forced());
        assert!(Policy::from(NonAtomicPolicy::ForceOff).is_forced());
        assert!(!Policy::from(NonAtomicPolicy::RestoreState).is_forced());
    }

    #[test]
    fn closure_helpers_return_value_and_restore() {
        let value = atomic(AtomicPolicy::RestoreState, || {
            assert!(!interrupts_enabled());
            non_atomic(NonAtomicPolicy::RestoreState, || {
                assert!(interrupts_enabled());
                7
            })
        });
        assert_eq!(value, 7);
        assert!(interrupts_enabled());
    }
}

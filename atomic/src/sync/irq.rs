/// Interrupt masking interface.
///
/// On target this is the global interrupt-enable bit. On the host it is
/// emulated by [`GlobalLockState`](super::GlobalLockState): "disabled"
/// means the calling thread holds the global lock.
///
/// `nesting_diagnostic` arms the nesting report for this transition. It
/// never changes the transition itself.
pub trait IrqControl {
    /// Mask interrupts, blocking until that is possible.
    fn disable(&self, nesting_diagnostic: bool);

    /// Unmask one level previously masked by [`disable`](Self::disable).
    ///
    /// Calling this without a matching `disable` on the same thread is a
    /// contract violation. The host emulation ignores such a call rather
    /// than touch a lock another thread holds.
    fn enable(&self, nesting_diagnostic: bool);

    /// Whether interrupts are enabled as seen by the caller.
    fn enabled(&self) -> bool;
}

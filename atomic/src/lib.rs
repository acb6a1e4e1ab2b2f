//! Atomic and non-atomic code blocks for host builds.
//!
//! On a microcontroller an atomic block clears the global interrupt-enable
//! bit and a non-atomic block sets it, each putting the bit back on every
//! exit path. Off target there is no such bit. This crate keeps the same
//! contract with a process-wide reentrant lock: a thread "with interrupts
//! disabled" holds the lock, so no other masked region anywhere in the
//! process runs concurrently with it.
//!
//! # Module Organization
//!
//! - [`sync::global`]: the process-wide lock state and its nesting counter
//! - [`sync::section`]: scoped atomic / non-atomic sections
//! - [`diagnostic`]: nesting reports on the `log` warning channel
//!
//! # Usage Example
//!
//! ```
//! use atomic_block::{AtomicPolicy, SectionGuard, interrupts_enabled};
//!
//! fn snapshot(counter: &std::cell::Cell<u16>) -> u16 {
//!     let _section = SectionGuard::new(AtomicPolicy::ForceOn);
//!     counter.get()
//! }
//!
//! let counter = std::cell::Cell::new(0x200);
//! assert_eq!(snapshot(&counter), 0x200);
//! assert!(interrupts_enabled());
//! ```
//!
//! # Features
//!
//! - `diagnostics` (default): report nested forced sections
//! - `critical-section`: register the lock state as the
//!   `critical-section` implementation

pub mod diagnostic;
pub mod sync;

#[cfg(feature = "critical-section")]
mod critical_section_impl;

// Re-export commonly used types
pub use diagnostic::{LockOp, NestingDiagnostic};
pub use sync::section::{atomic, interrupts_enabled, non_atomic};
pub use sync::{AtomicPolicy, GlobalLockState, IrqControl, NonAtomicPolicy, Policy, SectionGuard};

pub mod global;
pub use global::GlobalLockState;
pub mod irq;
pub use irq::IrqControl;
pub mod section;
pub use section::{AtomicPolicy, NonAtomicPolicy, Policy, SectionGuard};

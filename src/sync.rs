//! # Synchronization Primitives
//!
//! Interrupt-safe critical section abstraction. All shared kernel state is
//! accessed within a critical section to prevent data races between task
//! code and the tick / switch interrupts.
//!
//! On Cortex-M the implementation comes from `cortex-m`'s
//! `critical-section-single-core` feature: interrupts are disabled on entry
//! and restored on exit. On a single core that is the only lock the kernel
//! needs.

pub use critical_section::{CriticalSection, Mutex};

/// Execute a closure within a critical section (interrupts disabled).
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     let mut scheduler = SCHEDULER.borrow_ref_mut(cs);
///     // ...
/// });
/// ```
///
/// Keep the closure short: the tick interrupt is held off for its whole
/// duration.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}

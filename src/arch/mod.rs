//! # Architecture Abstraction Layer
//!
//! Implementations of [`Port`](crate::port::Port). Ports are only compiled
//! for bare-metal ARM targets; host builds (unit tests) use a mock port and
//! exercise the exception frame layout directly.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;

#[cfg(any(test, all(target_arch = "arm", target_os = "none")))]
mod frame;

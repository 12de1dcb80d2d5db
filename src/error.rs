//! Kernel status codes.

use core::fmt;

/// Failure reported by a kernel operation.
///
/// Operations either succeed completely or fail before touching any shared
/// state, so an error never leaves a half-linked task behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// An argument was unusable: empty or undersized stack, no free TCB
    /// slot, or `start()` with no task registered.
    Param,
    /// Reserved for stack overflow detection. Not produced yet.
    StackOverflow,
    /// Reserved for contended resources. Not produced yet.
    ResourceBusy,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param => f.write_str("invalid parameter"),
            Self::StackOverflow => f.write_str("task stack overflow"),
            Self::ResourceBusy => f.write_str("resource busy"),
        }
    }
}

pub type Result<T> = core::result::Result<T, KernelError>;

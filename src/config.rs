//! # Magenta Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed at
//! compile time; no dynamic allocation.

/// Maximum number of tasks the registry can hold, including the idle task.
/// Task slots are never reused, so this also bounds the number of
/// `create_task` calls over the lifetime of the system.
pub const MAX_TASKS: usize = 8;

/// SysTick frequency in Hz. One tick is one scheduling quantum and the
/// unit of `delay()`.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Required alignment of the initial stack top in bytes (AAPCS).
pub const STACK_ALIGN: usize = 8;

/// Size of the idle task's stack in 32-bit words.
pub const IDLE_STACK_WORDS: usize = 64;

/// Priority rank of the idle task. Lower is more important; the idle
/// task carries the least important rank.
pub const IDLE_PRIORITY: u8 = u8::MAX;

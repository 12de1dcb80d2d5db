//! # Magenta
//!
//! A minimal preemptive round-robin RTOS kernel for single-core ARM
//! Cortex-M microcontrollers.
//!
//! ## Overview
//!
//! Magenta keeps a fixed set of tasks in a circular list and rotates the CPU
//! between them:
//!
//! - **Preemption**: every tick requests a context switch; the next `Ready`
//!   task after the current one gets the CPU
//! - **Sleeping**: a task can block itself for a number of ticks with
//!   `delay()`; the tick handler counts the sleep down and makes it `Ready`
//!   again
//! - **Idle task**: installed by `init()`, never blocks, and guarantees the
//!   scheduler always has something to run
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │               Kernel API (kernel.rs)                    │
//! │   init() · create_task() · start() · delay() · on_tick()│
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Time             │  Sync             │
//! │  scheduler.rs│   time.rs          │  sync.rs          │
//! │  ─ create    │   ─ delay()        │  ─ critical_section│
//! │  ─ select    │   ─ tick_update()  │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │     Task Registry (registry.rs) · TCB (task.rs)         │
//! ├────────────────────────────────────────────────────────┤
//! │     Port trait (port.rs) / Cortex-M port (arch/)        │
//! │     PendSV · SysTick · Stack Init · First Launch        │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **Fixed-size TCB arena**: `[TaskControlBlock; MAX_TASKS]`, slots never
//!   reused
//! - **Caller-owned stacks**: each task runs on a `&'static mut [u32]`
//! - **Critical sections**: `critical_section::Mutex` around the scheduler

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod error;
pub mod kernel;
pub mod port;
pub mod registry;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod time;

pub use error::{KernelError, Result};
pub use kernel::Kernel;
pub use port::Port;
pub use task::{StackPointer, TaskControlBlock, TaskEntry, TaskHandle, TaskId, TaskState};

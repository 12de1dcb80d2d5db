//! # Port Interface
//!
//! The boundary between the portable kernel and the processor it runs on.
//! The kernel decides *which* task runs; a port builds initial stack frames,
//! drives the tick, and performs the mechanical register save/restore.
//!
//! A port is expected to:
//! - call [`Kernel::on_tick`](crate::kernel::Kernel::on_tick) exactly once
//!   per tick period from its timer interrupt, and
//! - when servicing a switch request, hand the outgoing task's stack pointer
//!   to [`Kernel::switch_context`](crate::kernel::Kernel::switch_context) and
//!   resume the stack pointer it returns.

use crate::task::{StackPointer, TaskEntry};

pub trait Port {
    /// Number of 32-bit words `initialize_stack` writes below the stack top.
    const INITIAL_FRAME_WORDS: usize;

    /// Build the first saved register frame of a task.
    ///
    /// The returned handle, once resumed by the switch path, starts
    /// executing `entry` with interrupts enabled.
    ///
    /// # Safety
    /// `stack_top` must be aligned to `STACK_ALIGN` and at least
    /// `INITIAL_FRAME_WORDS` writable words must lie directly below it.
    unsafe fn initialize_stack(entry: TaskEntry, stack_top: *mut u32) -> StackPointer;

    /// Start the periodic tick source at `TICK_HZ`.
    fn configure_tick();

    /// Ask for a context switch at the next safe point. Asserting it again
    /// before it is serviced has no additional effect.
    fn request_switch();

    /// Globally disable interrupts.
    fn disable_interrupts();

    /// Transfer control to the task whose saved context is `sp`.
    ///
    /// # Safety
    /// `sp` must come from `initialize_stack`, and this may be called only
    /// once, with interrupts disabled.
    unsafe fn launch_first_task(sp: StackPointer) -> !;

    /// Low-power wait used by the idle task.
    fn wait_for_interrupt();
}

/// Host-side port that records what the kernel asked of the hardware.
#[cfg(test)]
pub(crate) mod test_port {
    use super::*;
    use core::cell::Cell;

    std::thread_local! {
        static SWITCH_REQUESTS: Cell<usize> = Cell::new(0);
        static TICK_CONFIGURED: Cell<bool> = Cell::new(false);
    }

    pub(crate) struct TestPort;

    impl TestPort {
        /// Switch requests issued on this thread since the last call.
        pub(crate) fn take_switch_requests() -> usize {
            SWITCH_REQUESTS.with(|c| c.replace(0))
        }

        pub(crate) fn tick_configured() -> bool {
            TICK_CONFIGURED.with(Cell::get)
        }
    }

    impl Port for TestPort {
        const INITIAL_FRAME_WORDS: usize = 16;

        unsafe fn initialize_stack(_entry: TaskEntry, stack_top: *mut u32) -> StackPointer {
            StackPointer::from_ptr(stack_top.sub(Self::INITIAL_FRAME_WORDS))
        }

        fn configure_tick() {
            TICK_CONFIGURED.with(|c| c.set(true));
        }

        fn request_switch() {
            SWITCH_REQUESTS.with(|c| c.set(c.get() + 1));
        }

        fn disable_interrupts() {}

        unsafe fn launch_first_task(sp: StackPointer) -> ! {
            panic!("launched first task at {:?}", sp.as_ptr());
        }

        fn wait_for_interrupt() {}
    }

    /// A stack region that lives for the rest of the test binary.
    pub(crate) fn leak_stack(words: usize) -> &'static mut [u32] {
        std::boxed::Box::leak(std::vec![0u32; words].into_boxed_slice())
    }

    pub(crate) extern "C" fn dummy_entry() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }
}

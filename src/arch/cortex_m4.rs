//! # Cortex-M Port Layer
//!
//! Hardware-specific code for ARMv7-M (Cortex-M3/M4, Thumb-2). Implements
//! [`Port`] for the kernel, hosts the global [`KERNEL`] instance and wires
//! the `SysTick` and `PendSV` exceptions to it.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M uses a split-stack model:
//! - **MSP** (Main Stack Pointer): used by `main` before `start` and by
//!   interrupt handlers
//! - **PSP** (Process Stack Pointer): used by tasks in Thread mode
//!
//! On exception entry, the hardware automatically stacks R0–R3, R12, LR, PC,
//! and xPSR onto the process stack. The PendSV handler manually saves and
//! restores R4–R11, which completes the full context save/restore. The
//! kernel's saved-context handle is the PSP value after R4–R11 were pushed.
//!
//! ## Interrupt Priorities
//!
//! SysTick and PendSV both run at the lowest priority (0xFF). They never
//! preempt each other, and PendSV only runs once every other handler has
//! finished, so a tick's `tick_update` always completes before the switch
//! it requested is performed.
//!
//! Tasks must not use the FPU: the switch path only handles the basic
//! (non-FP) exception frame. Build for `thumbv7em-none-eabi` or
//! `thumbv7m-none-eabi`.

use core::arch::{asm, naked_asm};
use core::convert::Infallible;

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use super::frame;
use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::error::Result;
use crate::kernel::Kernel;
use crate::port::Port;
use crate::task::{StackPointer, TaskEntry, TaskHandle};

/// The kernel instance served by this port's exception handlers.
pub static KERNEL: Kernel<CortexM4> = Kernel::new();

/// Cortex-M implementation of [`Port`].
pub struct CortexM4;

impl Port for CortexM4 {
    const INITIAL_FRAME_WORDS: usize = frame::FRAME_WORDS;

    /// Initialize a task's stack frame for its first context switch.
    ///
    /// See `frame::write_initial_frame` for the layout; the returned
    /// stack pointer addresses the saved R4.
    unsafe fn initialize_stack(entry: TaskEntry, stack_top: *mut u32) -> StackPointer {
        let sp = frame::write_initial_frame(stack_top, entry as usize, task_exit as usize);
        StackPointer::from_ptr(sp)
    }

    fn configure_tick() {
        // Safety: called once from `Kernel::start` with interrupts disabled;
        // SYST and the SCB priority registers belong to the kernel from here
        // on.
        let mut cp = unsafe { cortex_m::Peripherals::steal() };
        configure_systick(&mut cp.SYST);
        set_interrupt_priorities(&mut cp.SCB);
    }

    #[inline]
    fn request_switch() {
        SCB::set_pendsv();
    }

    #[inline]
    fn disable_interrupts() {
        cortex_m::interrupt::disable();
    }

    unsafe fn launch_first_task(sp: StackPointer) -> ! {
        start_first_task(sp.as_ptr())
    }

    #[inline]
    fn wait_for_interrupt() {
        cortex_m::asm::wfi();
    }
}

// ---------------------------------------------------------------------------
// Kernel API bound to the global instance
// ---------------------------------------------------------------------------

/// See [`Kernel::init`].
pub fn init() {
    KERNEL.init();
}

/// See [`Kernel::create_task`].
pub fn create_task(
    entry: TaskEntry,
    stack: &'static mut [u32],
    priority: u8,
) -> Result<TaskHandle> {
    KERNEL.create_task(entry, stack, priority)
}

/// See [`Kernel::start`]. Does not return unless no task exists.
pub fn start() -> Result<Infallible> {
    KERNEL.start()
}

/// See [`Kernel::delay`].
pub fn delay(ticks: u32) {
    KERNEL.delay(ticks);
}

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure SysTick to fire at `TICK_HZ` from the processor clock.
fn configure_systick(syst: &mut SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Set PendSV and SysTick to the lowest interrupt priority.
fn set_interrupt_priorities(scb: &mut SCB) {
    // Safety: lowering these two priorities cannot break a priority-based
    // critical section; both handlers only touch kernel state through
    // critical sections.
    unsafe {
        scb.set_priority(SystemHandler::PendSV, 0xFF);
        scb.set_priority(SystemHandler::SysTick, 0xFF);
    }
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Switch Thread mode to PSP and branch into the first task.
///
/// # Safety
/// Must only be called once, with interrupts disabled and a stack pointer
/// produced by `initialize_stack`.
unsafe fn start_first_task(psp: *mut u32) -> ! {
    asm!(
        // Skip the software-saved R4–R11 (8 × 4 = 32 bytes)
        "adds r0, #32",
        "msr psp, r0",

        // Thread mode uses PSP from now on (CONTROL.SPSEL = 1)
        "movs r0, #2",
        "msr control, r0",
        "isb",

        // Unwind the hardware frame by hand; this is not an exception return
        "pop {{r0-r3, r12}}",
        "pop {{r4}}",          // LR (task_exit)
        "pop {{r5}}",          // PC (task entry point, bit 0 clear)
        "pop {{r6}}",          // xPSR (discarded)
        "mov lr, r4",
        "orr r5, r5, #1",      // `bx` takes the Thumb state from bit 0

        "cpsie i",
        "bx r5",

        in("r0") psp,
        options(noreturn)
    );
}

/// Parks a task whose entry function returned (entry is `fn() -> !`, so
/// this only happens through a corrupted frame).
extern "C" fn task_exit() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

// ---------------------------------------------------------------------------
// Exception handlers
// ---------------------------------------------------------------------------

/// PendSV exception handler: performs the actual context switch.
///
/// ## Sequence
/// 1. Save R4–R11 onto the current task's stack (PSP)
/// 2. `Kernel::switch_context` stores that PSP in the current TCB, selects
///    the next task and returns its saved PSP
/// 3. Restore R4–R11 from the new task's stack
/// 4. Return from exception to Thread mode on PSP (EXC_RETURN 0xFFFFFFFD);
///    hardware restores R0–R3, R12, LR, PC, xPSR
///
/// # Safety
/// Naked handler entered directly by the NVIC.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",

        "bl {switch}",

        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",

        // EXC_RETURN: Thread mode, PSP, basic frame (0xFFFFFFFD = !2)
        "mvn r0, #2",
        "bx r0",

        switch = sym pendsv_switch,
    );
}

/// Called from `PendSV` with the outgoing PSP; returns the incoming PSP.
extern "C" fn pendsv_switch(psp: *mut u32) -> *mut u32 {
    KERNEL.switch_context(StackPointer::from_ptr(psp)).as_ptr()
}

/// SysTick exception handler: one kernel tick.
#[no_mangle]
pub extern "C" fn SysTick() {
    KERNEL.on_tick();
}

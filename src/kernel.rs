//! # Kernel
//!
//! Interrupt-safe front end of Magenta.
//!
//! [`Kernel`] owns the scheduler behind a critical-section mutex together
//! with the idle task's stack, and turns scheduler decisions into requests
//! to its [`Port`]. A port crate (see `arch::cortex_m4`) places one
//! `Kernel` in a `static` and routes its interrupts to it.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► Kernel::init()         ← Reset registry, install idle task
//!         ├─► Kernel::create_task()  ← Register tasks (×N)
//!         └─► Kernel::start()        ← Launch current task (no return)
//!               ├─► Disable interrupts
//!               ├─► Configure tick
//!               └─► Port::launch_first_task()
//! ```
//!
//! ## Interrupt Entry Points
//!
//! - tick interrupt → [`Kernel::on_tick`]: update sleep counters, then
//!   request a switch (round-robin preemption every tick)
//! - switch interrupt → [`Kernel::switch_context`]: store the outgoing stack
//!   pointer, select the next task, hand back its stack pointer

use core::cell::{RefCell, UnsafeCell};
use core::convert::Infallible;
use core::marker::PhantomData;

use crate::config::{IDLE_PRIORITY, IDLE_STACK_WORDS};
use crate::error::{KernelError, Result};
use crate::port::Port;
use crate::scheduler::Scheduler;
use crate::sync::{self, Mutex};
use crate::task::{StackPointer, TaskControlBlock, TaskEntry, TaskHandle, TaskId, TaskState};

/// Stack memory of the idle task, kept inside the kernel so that `init`
/// needs no arguments.
#[repr(align(8))]
struct IdleStack(UnsafeCell<[u32; IDLE_STACK_WORDS]>);

// Safety: the cell is only borrowed by `Kernel::init`, inside a critical
// section, before any task runs on it.
unsafe impl Sync for IdleStack {}

/// Body of the idle task: wait for the next interrupt, forever.
extern "C" fn idle_task<P: Port>() -> ! {
    loop {
        P::wait_for_interrupt();
    }
}

pub struct Kernel<P: Port> {
    scheduler: Mutex<RefCell<Scheduler>>,
    idle_stack: IdleStack,
    _port: PhantomData<fn() -> P>,
}

impl<P: Port> Kernel<P> {
    pub const fn new() -> Self {
        Self {
            scheduler: Mutex::new(RefCell::new(Scheduler::new())),
            idle_stack: IdleStack(UnsafeCell::new([0; IDLE_STACK_WORDS])),
            _port: PhantomData,
        }
    }

    /// Reset the kernel and install the idle task as the current task.
    ///
    /// Application task identities restart at 0. Must be called before any
    /// other kernel function and never after `start`.
    ///
    /// # Panics
    /// If the port's initial frame does not fit in the idle stack.
    pub fn init(&'static self) {
        let idle = sync::critical_section(|cs| {
            let mut scheduler = self.scheduler.borrow_ref_mut(cs);
            scheduler.reset();

            // Safety: the registry was just cleared, so the previous idle
            // task (if any) is gone and nothing else refers to this memory.
            let stack = unsafe { &mut *self.idle_stack.0.get() };
            scheduler.create_idle_task::<P>(idle_task::<P>, stack, IDLE_PRIORITY)
        });
        if let Err(e) = idle {
            panic!("idle stack cannot hold an initial frame: {e}");
        }
        log::debug!("kernel initialized, idle task installed");
    }

    /// Create a task and link it after the current task.
    ///
    /// # Parameters
    /// - `entry`: task entry function; it must never return.
    /// - `stack`: memory the task runs on. Its top is rounded down to
    ///   `STACK_ALIGN`.
    /// - `priority`: rank recorded in the TCB (lower = more important).
    ///
    /// # Returns
    /// - `Ok(handle)`: the task is linked and `Ready`.
    /// - `Err(KernelError::Param)`: the stack is empty or too small for an
    ///   initial frame, or every TCB slot is taken. Nothing was changed.
    pub fn create_task(
        &self,
        entry: TaskEntry,
        stack: &'static mut [u32],
        priority: u8,
    ) -> Result<TaskHandle> {
        let created = sync::critical_section(|cs| {
            let mut scheduler = self.scheduler.borrow_ref_mut(cs);
            scheduler
                .create_task::<P>(entry, stack, priority)
                .map(|handle| (handle, scheduler.registry()[handle].id))
        });

        match created {
            Ok((handle, id)) => {
                log::debug!(
                    "created task {id} in slot {} (priority {priority})",
                    handle.index()
                );
                Ok(handle)
            }
            Err(e) => {
                log::warn!("task creation rejected: {e}");
                Err(e)
            }
        }
    }

    /// Launch the current task. **Does not return on success.**
    ///
    /// Fails with `KernelError::Param` if no task has been registered
    /// (`init` was never called).
    pub fn start(&self) -> Result<Infallible> {
        let (id, sp) = sync::critical_section(|cs| {
            let mut scheduler = self.scheduler.borrow_ref_mut(cs);
            let tcb = scheduler
                .registry_mut()
                .current_tcb_mut()
                .ok_or(KernelError::Param)?;
            tcb.state = TaskState::Running;
            Ok::<_, KernelError>((tcb.id, tcb.saved_context))
        })?;

        log::debug!("starting scheduler with task {id}");

        P::disable_interrupts();
        P::configure_tick();

        // Safety: `sp` was produced by `initialize_stack` at creation and
        // interrupts are disabled.
        unsafe { P::launch_first_task(sp) }
    }

    /// Put the calling task to sleep for `ticks` ticks and yield at once.
    ///
    /// `delay(0)` returns immediately without yielding.
    pub fn delay(&self, ticks: u32) {
        let blocked =
            sync::critical_section(|cs| self.scheduler.borrow_ref_mut(cs).delay(ticks));

        if let Some(id) = blocked {
            log::trace!("task {id} sleeping for {ticks} ticks");
            P::request_switch();
        }
    }

    /// Advance all sleep counters by one tick. No-op before `init`.
    pub fn tick_update(&self) {
        self.advance_tick();
    }

    /// Tick interrupt entry point: update sleep counters, then request a
    /// context switch once the kernel has a current task.
    pub fn on_tick(&self) {
        if self.advance_tick() {
            P::request_switch();
        }
    }

    fn advance_tick(&self) -> bool {
        let (has_current, woken) = sync::critical_section(|cs| {
            let mut scheduler = self.scheduler.borrow_ref_mut(cs);
            let woken = scheduler.tick_update();
            (scheduler.registry().current().is_some(), woken)
        });
        if woken > 0 {
            log::trace!("{woken} task(s) woke up");
        }
        has_current
    }

    /// Switch interrupt entry point.
    ///
    /// Stores `outgoing` as the current task's saved context, selects the
    /// next task and returns its saved context. Before `init` the outgoing
    /// context is returned unchanged.
    pub fn switch_context(&self, outgoing: StackPointer) -> StackPointer {
        sync::critical_section(|cs| {
            let mut scheduler = self.scheduler.borrow_ref_mut(cs);
            match scheduler.registry_mut().current_tcb_mut() {
                Some(tcb) => tcb.saved_context = outgoing,
                None => return outgoing,
            }
            scheduler.select_next();
            scheduler
                .registry()
                .current_tcb()
                .map_or(outgoing, |tcb| tcb.saved_context)
        })
    }

    /// Run the selection policy without a context switch.
    pub fn select_next(&self) -> Option<TaskHandle> {
        sync::critical_section(|cs| self.scheduler.borrow_ref_mut(cs).select_next())
    }

    /// Snapshot of a task's control block.
    pub fn task(&self, handle: TaskHandle) -> Option<TaskControlBlock> {
        sync::critical_section(|cs| self.scheduler.borrow_ref(cs).registry().get(handle).copied())
    }

    pub fn current_task(&self) -> Option<TaskHandle> {
        sync::critical_section(|cs| self.scheduler.borrow_ref(cs).registry().current())
    }

    pub fn current_task_id(&self) -> Option<TaskId> {
        sync::critical_section(|cs| {
            self.scheduler
                .borrow_ref(cs)
                .registry()
                .current_tcb()
                .map(|tcb| tcb.id)
        })
    }

    pub fn task_count(&self) -> usize {
        sync::critical_section(|cs| self.scheduler.borrow_ref(cs).registry().len())
    }
}

impl<P: Port> Default for Kernel<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

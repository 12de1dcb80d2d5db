//! # Scheduler
//!
//! Task lifecycle and round-robin selection for Magenta.
//!
//! ## Scheduling Algorithm
//!
//! At every switch point (`PendSV` on Cortex-M):
//! 1. **Demote**: a task still marked `Running` was preempted and becomes
//!    `Ready` again
//! 2. **Walk**: starting at the successor of the current task, follow the
//!    circular list for at most `len()` steps
//! 3. **Select**: the first `Ready` task becomes `Running` and current
//!
//! Priority is recorded in each TCB but never consulted, so every `Ready`
//! task is picked within one lap of the list. The idle task is always
//! `Ready` or `Running`, which guarantees the walk finds a task.

use core::mem::size_of;

use crate::config::STACK_ALIGN;
use crate::error::{KernelError, Result};
use crate::port::Port;
use crate::registry::TaskRegistry;
use crate::task::{TaskControlBlock, TaskEntry, TaskHandle, TaskId, TaskState};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// Registry plus identity counter. Stored inside the kernel's critical
/// section mutex; nothing here is interrupt-safe on its own.
pub struct Scheduler {
    registry: TaskRegistry,

    /// Identity handed to the next application task.
    next_id: u32,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            registry: TaskRegistry::new(),
            next_id: 0,
        }
    }

    /// Drop every task and restart identity numbering at 0.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.next_id = 0;
    }

    #[inline]
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    #[inline]
    pub(crate) fn registry_mut(&mut self) -> &mut TaskRegistry {
        &mut self.registry
    }

    /// Create an application task and link it after the current task.
    ///
    /// The task starts `Ready` with the next sequential identity. On error
    /// neither the registry nor the identity counter changes.
    pub fn create_task<P: Port>(
        &mut self,
        entry: TaskEntry,
        stack: &mut [u32],
        priority: u8,
    ) -> Result<TaskHandle> {
        let handle = self.spawn::<P>(entry, stack, priority, TaskId(self.next_id))?;
        self.next_id = self.next_id.wrapping_add(1);
        Ok(handle)
    }

    /// Create the idle task. It takes the reserved identity and does not
    /// consume a number from the application sequence.
    pub(crate) fn create_idle_task<P: Port>(
        &mut self,
        entry: TaskEntry,
        stack: &mut [u32],
        priority: u8,
    ) -> Result<TaskHandle> {
        self.spawn::<P>(entry, stack, priority, TaskId::IDLE)
    }

    fn spawn<P: Port>(
        &mut self,
        entry: TaskEntry,
        stack: &mut [u32],
        priority: u8,
        id: TaskId,
    ) -> Result<TaskHandle> {
        if self.registry.is_full() {
            return Err(KernelError::Param);
        }
        let stack_top = aligned_stack_top::<P>(stack)?;

        // Safety: `aligned_stack_top` guarantees alignment and room for the
        // initial frame below `stack_top`.
        let saved_context = unsafe { P::initialize_stack(entry, stack_top) };

        let mut tcb = TaskControlBlock::EMPTY;
        tcb.init(id, priority, saved_context);
        self.registry.insert(tcb)
    }

    /// Pick the next task to run and make it current.
    ///
    /// Returns `None` (and does nothing) if no task exists yet.
    ///
    /// # Panics
    /// If no task is `Ready`. With the idle task linked this cannot happen.
    pub fn select_next(&mut self) -> Option<TaskHandle> {
        let current = self.registry.current()?;

        let outgoing = &mut self.registry[current];
        if outgoing.state == TaskState::Running {
            outgoing.state = TaskState::Ready;
        }

        let mut candidate = current;
        for _ in 0..self.registry.len() {
            candidate = self.registry.successor(candidate);
            if self.registry[candidate].is_ready() {
                self.registry[candidate].state = TaskState::Running;
                self.registry.set_current(candidate);
                return Some(candidate);
            }
        }

        unreachable!("no ready task in the registry; the idle task is missing")
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Stack top computation
// ---------------------------------------------------------------------------

/// Top of `stack`, rounded down to `STACK_ALIGN`.
///
/// Fails with `KernelError::Param` if the stack is empty or the aligned
/// region cannot hold the port's initial frame.
fn aligned_stack_top<P: Port>(stack: &mut [u32]) -> Result<*mut u32> {
    if stack.is_empty() {
        return Err(KernelError::Param);
    }

    let base = stack.as_mut_ptr() as usize;
    let end = base + stack.len() * size_of::<u32>();
    let top = end & !(STACK_ALIGN - 1);
    let words = top.saturating_sub(base) / size_of::<u32>();

    if words < P::INITIAL_FRAME_WORDS {
        return Err(KernelError::Param);
    }

    // Derive the pointer from the slice so it keeps the slice's provenance.
    Ok(stack[words..].as_mut_ptr())
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

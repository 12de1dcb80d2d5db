//! # Task Control Block
//!
//! Defines the per-task record kept by the kernel. A TCB lives in a slot of
//! the registry arena from the moment it is created until the system is
//! reset; there is no deletion path.

use core::fmt;

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
///
/// ```text
///   ┌──────────┐    select_next()    ┌─────────┐
///   │  Ready   │ ──────────────────► │ Running │
///   └──────────┘                     └─────────┘
///        ▲  ▲                             │  │
///        │  │   preempted (next select)   │  │
///        │  └─────────────────────────────┘  │
///        │                                   │ delay(n > 0)
///        │    tick_update(): sleep_ticks 0   ▼
///        │                             ┌──────────┐
///        └──────────────────────────── │ Blocked  │
///                                      └──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Eligible to be picked by the scheduler.
    Ready,
    /// Currently owns the CPU. At most one task is in this state.
    Running,
    /// Sleeping until `sleep_ticks` reaches zero.
    Blocked,
}

// ---------------------------------------------------------------------------
// Identity and handles
// ---------------------------------------------------------------------------

/// Task identity, assigned once at creation and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u32);

impl TaskId {
    /// Identity reserved for the kernel's idle task. Application tasks are
    /// numbered from 0 and never reach this value within `MAX_TASKS`.
    pub const IDLE: Self = Self(u32::MAX);

    #[inline]
    pub const fn is_idle(self) -> bool {
        self.0 == Self::IDLE.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_idle() {
            f.write_str("idle")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Stable reference to a TCB slot in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub(crate) usize);

impl TaskHandle {
    /// Slot index of this task in the registry.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Opaque saved-context handle: the task's stack pointer while it is not
/// running. Only the port layer knows what lies behind it.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackPointer(*mut u32);

impl StackPointer {
    pub const fn null() -> Self {
        Self(core::ptr::null_mut())
    }

    #[inline]
    pub const fn from_ptr(ptr: *mut u32) -> Self {
        Self(ptr)
    }

    #[inline]
    pub const fn as_ptr(self) -> *mut u32 {
        self.0
    }
}

/// Task entry point. Tasks never return.
pub type TaskEntry = extern "C" fn() -> !;

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block (TCB).
///
/// Stored in the registry's fixed-size arena; `next` links the slots into a
/// circular list. The stack itself is caller-supplied memory referenced only
/// through `saved_context`.
#[derive(Debug, Clone, Copy)]
pub struct TaskControlBlock {
    /// Saved stack pointer. Written by the context switch path whenever the
    /// task is switched out.
    pub saved_context: StackPointer,

    /// Slot index of the successor in the circular list.
    pub(crate) next: usize,

    /// Priority rank (lower = more important). Recorded but not consulted
    /// by the round-robin policy.
    pub priority: u8,

    /// Current execution state.
    pub state: TaskState,

    /// Identity assigned at creation.
    pub id: TaskId,

    /// Remaining ticks of sleep. Only meaningful while `Blocked`.
    pub sleep_ticks: u32,
}

// Safety: `saved_context` points into a `&'static mut` stack handed over at
// creation. It is only read or written inside critical sections.
unsafe impl Send for TaskControlBlock {}

impl TaskControlBlock {
    /// An unallocated slot. Used to initialize the static arena.
    pub const EMPTY: Self = Self {
        saved_context: StackPointer::null(),
        next: 0,
        priority: 0,
        state: TaskState::Ready,
        id: TaskId(0),
        sleep_ticks: 0,
    };

    /// Fill in a freshly allocated TCB. The caller links it afterwards.
    pub(crate) fn init(&mut self, id: TaskId, priority: u8, saved_context: StackPointer) {
        self.saved_context = saved_context;
        self.priority = priority;
        self.state = TaskState::Ready;
        self.id = id;
        self.sleep_ticks = 0;
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == TaskState::Ready
    }

    /// Put the task to sleep for `ticks` ticks.
    pub(crate) fn block_for(&mut self, ticks: u32) {
        self.sleep_ticks = ticks;
        self.state = TaskState::Blocked;
    }

    /// Advance this task's sleep counter by one tick.
    ///
    /// Returns `true` if the task woke up on this tick.
    pub(crate) fn on_tick(&mut self) -> bool {
        if self.state != TaskState::Blocked {
            return false;
        }
        self.sleep_ticks = self.sleep_ticks.saturating_sub(1);
        if self.sleep_ticks == 0 {
            self.state = TaskState::Ready;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcb_initialization() {
        let mut tcb = TaskControlBlock::EMPTY;
        tcb.state = TaskState::Blocked;
        tcb.sleep_ticks = 9;

        tcb.init(TaskId(3), 5, StackPointer::null());

        assert_eq!(tcb.state, TaskState::Ready);
        assert_eq!(tcb.sleep_ticks, 0);
        assert_eq!(tcb.priority, 5);
        assert_eq!(tcb.id, TaskId(3));
    }

    #[test]
    fn test_block_and_wake() {
        let mut tcb = TaskControlBlock::EMPTY;
        tcb.init(TaskId(0), 1, StackPointer::null());

        tcb.block_for(2);
        assert_eq!(tcb.state, TaskState::Blocked);
        assert_eq!(tcb.sleep_ticks, 2);

        assert!(!tcb.on_tick());
        assert_eq!(tcb.sleep_ticks, 1);
        assert!(tcb.on_tick());
        assert_eq!(tcb.state, TaskState::Ready);
        assert_eq!(tcb.sleep_ticks, 0);

        // Further ticks leave a ready task alone
        assert!(!tcb.on_tick());
        assert_eq!(tcb.sleep_ticks, 0);
    }

    #[test]
    fn test_blocked_with_zero_counter_wakes() {
        let mut tcb = TaskControlBlock::EMPTY;
        tcb.state = TaskState::Blocked;
        tcb.sleep_ticks = 0;

        assert!(tcb.on_tick());
        assert_eq!(tcb.state, TaskState::Ready);
        assert_eq!(tcb.sleep_ticks, 0);
    }

    #[test]
    fn test_running_task_ignores_tick() {
        let mut tcb = TaskControlBlock::EMPTY;
        tcb.state = TaskState::Running;
        tcb.sleep_ticks = 4;

        assert!(!tcb.on_tick());
        assert_eq!(tcb.state, TaskState::Running);
        assert_eq!(tcb.sleep_ticks, 4);
    }

    #[test]
    fn test_idle_id_display() {
        assert!(TaskId::IDLE.is_idle());
        assert!(!TaskId(0).is_idle());
        assert_eq!(TaskId::IDLE.to_string(), "idle");
        assert_eq!(TaskId(7).to_string(), "#7");
    }
}

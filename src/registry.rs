//! # Task Registry
//!
//! Arena of TCBs linked into a singly-linked circular list.
//!
//! Slots are handed out in order and never reused. The `next` field of each
//! occupied slot names the successor slot, and following it from any task
//! returns to that task after exactly `len()` steps. The registry also holds
//! the "current" cursor: the task that owns (or is about to own) the CPU.
//!
//! ```text
//!        current
//!           │
//!           ▼
//!       ┌──────┐  next  ┌──────┐  next  ┌──────┐
//!   ┌──►│ idle │ ─────► │  B   │ ─────► │  A   │ ──┐
//!   │   └──────┘        └──────┘        └──────┘   │
//!   └──────────────────────────────────────────────┘
//! ```
//!
//! The registry itself is not interrupt-safe; the kernel only touches it
//! from inside a critical section.

use core::ops::{Index, IndexMut};

use crate::config::MAX_TASKS;
use crate::error::{KernelError, Result};
use crate::task::{TaskControlBlock, TaskHandle};

pub struct TaskRegistry {
    tasks: [TaskControlBlock; MAX_TASKS],
    len: usize,
    current: Option<usize>,
}

impl TaskRegistry {
    pub const fn new() -> Self {
        Self {
            tasks: [TaskControlBlock::EMPTY; MAX_TASKS],
            len: 0,
            current: None,
        }
    }

    /// Forget every task and the current cursor.
    pub fn clear(&mut self) {
        self.len = 0;
        self.current = None;
    }

    /// Number of linked tasks.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == MAX_TASKS
    }

    #[inline]
    pub fn current(&self) -> Option<TaskHandle> {
        self.current.map(TaskHandle)
    }

    pub(crate) fn set_current(&mut self, handle: TaskHandle) {
        debug_assert!(handle.0 < self.len);
        self.current = Some(handle.0);
    }

    pub fn get(&self, handle: TaskHandle) -> Option<&TaskControlBlock> {
        self.tasks[..self.len].get(handle.0)
    }

    pub fn current_tcb(&self) -> Option<&TaskControlBlock> {
        self.current.map(|i| &self.tasks[i])
    }

    pub(crate) fn current_tcb_mut(&mut self) -> Option<&mut TaskControlBlock> {
        match self.current {
            Some(i) => Some(&mut self.tasks[i]),
            None => None,
        }
    }

    /// The task following `handle` in the circular list.
    #[inline]
    pub fn successor(&self, handle: TaskHandle) -> TaskHandle {
        TaskHandle(self.tasks[handle.0].next)
    }

    /// Link `tcb` into the list.
    ///
    /// The first task becomes the current task and links to itself; later
    /// tasks are spliced in right after the current one. Fails with
    /// `KernelError::Param` when no slot is left, without touching the list.
    pub(crate) fn insert(&mut self, mut tcb: TaskControlBlock) -> Result<TaskHandle> {
        if self.is_full() {
            return Err(KernelError::Param);
        }

        let slot = self.len;
        match self.current {
            None => {
                tcb.next = slot;
                self.current = Some(slot);
            }
            Some(cur) => {
                tcb.next = self.tasks[cur].next;
                self.tasks[cur].next = slot;
            }
        }
        self.tasks[slot] = tcb;
        self.len += 1;

        Ok(TaskHandle(slot))
    }

    /// Walk the circular list once, starting at the current task.
    pub fn ring(&self) -> Ring<'_> {
        Ring {
            registry: self,
            cursor: self.current,
            remaining: self.len,
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<TaskHandle> for TaskRegistry {
    type Output = TaskControlBlock;

    fn index(&self, handle: TaskHandle) -> &TaskControlBlock {
        &self.tasks[..self.len][handle.0]
    }
}

impl IndexMut<TaskHandle> for TaskRegistry {
    fn index_mut(&mut self, handle: TaskHandle) -> &mut TaskControlBlock {
        &mut self.tasks[..self.len][handle.0]
    }
}

/// Iterator over the handles of the circular list, in link order.
pub struct Ring<'a> {
    registry: &'a TaskRegistry,
    cursor: Option<usize>,
    remaining: usize,
}

impl Iterator for Ring<'_> {
    type Item = TaskHandle;

    fn next(&mut self) -> Option<TaskHandle> {
        if self.remaining == 0 {
            return None;
        }
        let here = self.cursor?;
        self.remaining -= 1;
        self.cursor = Some(self.registry.tasks[here].next);
        Some(TaskHandle(here))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

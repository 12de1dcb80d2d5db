//! # Time Management
//!
//! Tick-driven sleep counters. `delay` parks the running task for a number
//! of ticks; `tick_update` runs once per tick and wakes tasks whose counter
//! has run out. Woken tasks only become `Ready`: taking the CPU is left to
//! the next `select_next`.

use crate::scheduler::Scheduler;
use crate::task::TaskId;

impl Scheduler {
    /// Block the current task for `ticks` ticks.
    ///
    /// Returns the blocked task's identity when the caller has to request a
    /// context switch. `ticks == 0`, "no current task" and a current idle
    /// task change nothing.
    pub fn delay(&mut self, ticks: u32) -> Option<TaskId> {
        if ticks == 0 {
            return None;
        }
        let tcb = self.registry_mut().current_tcb_mut()?;
        if tcb.id.is_idle() {
            // The idle task must stay schedulable.
            return None;
        }
        tcb.block_for(ticks);
        Some(tcb.id)
    }

    /// Advance every sleep counter by one tick.
    ///
    /// Visits each task exactly once, starting and ending at the current
    /// task. Returns how many tasks woke up.
    pub fn tick_update(&mut self) -> usize {
        let registry = self.registry_mut();
        let Some(start) = registry.current() else {
            return 0;
        };

        let mut woken = 0;
        let mut cursor = start;
        loop {
            if registry[cursor].on_tick() {
                woken += 1;
            }
            cursor = registry.successor(cursor);
            if cursor == start {
                break;
            }
        }
        woken
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MAX_TASKS;
    use crate::port::test_port::{dummy_entry, leak_stack, TestPort};
    use crate::scheduler::Scheduler;
    use crate::task::{TaskHandle, TaskState};
    use quickcheck_macros::quickcheck;

    fn idle_plus(n: usize) -> (Scheduler, TaskHandle, Vec<TaskHandle>) {
        let mut sched = Scheduler::new();
        let idle = sched
            .create_idle_task::<TestPort>(dummy_entry, leak_stack(64), u8::MAX)
            .unwrap();
        let tasks = (0..n)
            .map(|_| {
                sched
                    .create_task::<TestPort>(dummy_entry, leak_stack(64), 0)
                    .unwrap()
            })
            .collect();
        (sched, idle, tasks)
    }

    #[test]
    fn delay_zero_is_a_noop() {
        let (mut sched, _, tasks) = idle_plus(1);
        sched.select_next();

        assert_eq!(sched.delay(0), None);
        assert_eq!(sched.registry()[tasks[0]].state, TaskState::Running);
        assert_eq!(sched.registry()[tasks[0]].sleep_ticks, 0);
    }

    #[test]
    fn delay_without_tasks_is_a_noop() {
        let mut sched = Scheduler::new();
        assert_eq!(sched.delay(3), None);
        assert_eq!(sched.tick_update(), 0);
    }

    #[test]
    fn delay_leaves_idle_task_ready() {
        let (mut sched, idle, _) = idle_plus(0);
        assert_eq!(sched.select_next(), Some(idle));

        assert_eq!(sched.delay(5), None);
        assert_eq!(sched.registry()[idle].state, TaskState::Running);
        assert_eq!(sched.registry()[idle].sleep_ticks, 0);
        assert_eq!(sched.select_next(), Some(idle));
    }

    #[test]
    fn delay_blocks_current_task() {
        let (mut sched, _, tasks) = idle_plus(2);
        let picked = sched.select_next().unwrap();

        let id = sched.delay(3);

        assert_eq!(id, Some(sched.registry()[picked].id));
        assert_eq!(sched.registry()[picked].state, TaskState::Blocked);
        assert_eq!(sched.registry()[picked].sleep_ticks, 3);
        assert!(tasks.contains(&picked));
    }

    #[test]
    fn tick_update_counts_wakeups() {
        let (mut sched, _, tasks) = idle_plus(3);
        sched.registry_mut()[tasks[0]].block_for(1);
        sched.registry_mut()[tasks[1]].block_for(2);

        assert_eq!(sched.tick_update(), 1);
        assert_eq!(sched.registry()[tasks[0]].state, TaskState::Ready);
        assert_eq!(sched.registry()[tasks[1]].sleep_ticks, 1);

        assert_eq!(sched.tick_update(), 1);
        assert_eq!(sched.registry()[tasks[1]].state, TaskState::Ready);
        assert_eq!(sched.tick_update(), 0);
    }

    #[test]
    fn tick_update_reaches_every_task() {
        let (mut sched, _, tasks) = idle_plus(MAX_TASKS - 1);
        for &h in &tasks {
            sched.registry_mut()[h].block_for(1);
        }

        assert_eq!(sched.tick_update(), tasks.len());
        for &h in &tasks {
            assert_eq!(sched.registry()[h].state, TaskState::Ready);
        }
    }

    #[test]
    fn scenario_idle_then_single_task() {
        let mut sched = Scheduler::new();
        let idle = sched
            .create_idle_task::<TestPort>(dummy_entry, leak_stack(64), u8::MAX)
            .unwrap();
        assert_eq!(sched.registry().len(), 1);
        assert_eq!(sched.registry().current(), Some(idle));

        let a = sched
            .create_task::<TestPort>(dummy_entry, leak_stack(256), 0)
            .unwrap();
        assert_eq!(sched.registry().len(), 2);
        assert_eq!(sched.registry().current(), Some(idle));
        assert_eq!(sched.registry()[a].state, TaskState::Ready);
        assert_eq!(sched.registry()[a].id.0, 0);

        assert_eq!(sched.select_next(), Some(a));

        sched.delay(3);
        assert_eq!(sched.registry()[a].state, TaskState::Blocked);
        assert_eq!(sched.registry()[a].sleep_ticks, 3);

        // While A sleeps, only idle can run
        assert_eq!(sched.select_next(), Some(idle));

        for _ in 0..3 {
            sched.tick_update();
        }
        assert_eq!(sched.registry()[a].state, TaskState::Ready);
        assert_eq!(sched.registry()[a].sleep_ticks, 0);

        assert_eq!(sched.select_next(), Some(a));
    }

    /// After exactly `ticks` updates the delayed task is ready again, and
    /// its counter never increases or underflows on the way.
    #[quickcheck]
    fn delay_wakes_after_exact_tick_count(ticks: u16, others: u8) {
        let ticks = u32::from(ticks % 500) + 1;
        let (mut sched, _, tasks) = idle_plus(1 + others as usize % (MAX_TASKS - 1));
        let a = tasks[0];
        while sched.select_next() != Some(a) {}

        sched.delay(ticks);
        assert_eq!(sched.registry()[a].sleep_ticks, ticks);

        let mut last = ticks;
        for elapsed in 1..=ticks {
            sched.tick_update();
            // Preemption keeps going while `a` sleeps
            sched.select_next();

            let tcb = sched.registry()[a];
            assert!(tcb.sleep_ticks <= last);
            last = tcb.sleep_ticks;
            if elapsed < ticks {
                assert_eq!(tcb.state, TaskState::Blocked);
                assert_eq!(tcb.sleep_ticks, ticks - elapsed);
            }
        }

        let tcb = sched.registry()[a];
        assert_ne!(tcb.state, TaskState::Blocked);
        assert_eq!(tcb.sleep_ticks, 0);
    }
}

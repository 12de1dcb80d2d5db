//! # Magenta Example Firmware
//!
//! Three tasks sharing the CPU with the idle task:
//!
//! | Task | Priority | Behavior |
//! |------|----------|----------|
//! | `blink_task` | 1 | Toggles a status flag every 500 ticks |
//! | `sampler_task` | 2 | Counts samples, sleeps 500 ticks between them |
//! | `reporter_task` | 3 | Logs both counters every 1000 ticks |
//!
//! With `--features semihosting` the `log` output goes to the debugger.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use cortex_m_rt::entry;
use panic_halt as _;

use magenta::arch::cortex_m4 as os;

const TASK_STACK_WORDS: usize = 256;

static mut BLINK_STACK: [u32; TASK_STACK_WORDS] = [0; TASK_STACK_WORDS];
static mut SAMPLER_STACK: [u32; TASK_STACK_WORDS] = [0; TASK_STACK_WORDS];
static mut REPORTER_STACK: [u32; TASK_STACK_WORDS] = [0; TASK_STACK_WORDS];

static LED_ON: AtomicBool = AtomicBool::new(false);
static SAMPLES: AtomicU32 = AtomicU32::new(0);

// ---------------------------------------------------------------------------
// Task entry points
// ---------------------------------------------------------------------------

extern "C" fn blink_task() -> ! {
    loop {
        LED_ON.store(true, Ordering::Relaxed);
        os::delay(500);
        LED_ON.store(false, Ordering::Relaxed);
        os::delay(500);
    }
}

extern "C" fn sampler_task() -> ! {
    loop {
        SAMPLES.fetch_add(1, Ordering::Relaxed);
        os::delay(500);
    }
}

extern "C" fn reporter_task() -> ! {
    loop {
        log::info!(
            "led = {}, samples = {}",
            LED_ON.load(Ordering::Relaxed),
            SAMPLES.load(Ordering::Relaxed)
        );
        os::delay(1000);
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[cfg(feature = "semihosting")]
mod logger {
    struct Logger;

    impl log::Log for Logger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            let _ = cortex_m_semihosting::heprintln!(
                "[{level:5} {target}] {args}",
                level = record.level(),
                target = record.target(),
                args = record.args()
            );
        }

        fn flush(&self) {}
    }

    pub fn init() {
        // Thumbv7 has CAS atomics, but `set_logger_racy` keeps this usable on
        // thumbv6 as well.
        // Safety: nothing else is running yet.
        if unsafe { log::set_logger_racy(&Logger) }.is_ok() {
            log::set_max_level(log::LevelFilter::Debug);
        }
    }
}

#[cfg(not(feature = "semihosting"))]
mod logger {
    pub fn init() {}
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Firmware entry point. Initializes the kernel, creates tasks, and starts
/// the scheduler. Does not return.
#[entry]
fn main() -> ! {
    logger::init();

    os::init();

    // Safety: each stack is handed to exactly one task and never touched
    // again from here.
    let (blink, sampler, reporter) = unsafe {
        (
            &mut *core::ptr::addr_of_mut!(BLINK_STACK),
            &mut *core::ptr::addr_of_mut!(SAMPLER_STACK),
            &mut *core::ptr::addr_of_mut!(REPORTER_STACK),
        )
    };

    let tasks: [(magenta::TaskEntry, &'static mut [u32], u8); 3] = [
        (blink_task, blink, 1),
        (sampler_task, sampler, 2),
        (reporter_task, reporter, 3),
    ];
    for (entry, stack, priority) in tasks {
        if let Err(e) = os::create_task(entry, stack, priority) {
            log::error!("failed to create task: {e}");
        }
    }

    // Only returns if no task exists
    let err = match os::start() {
        Ok(never) => match never {},
        Err(e) => e,
    };
    log::error!("scheduler did not start: {err}");
    loop {
        cortex_m::asm::wfi();
    }
}

//! Time management module
//!
//! Provides the system timer, the tick counter and process sleeping. Every
//! timeout in the kernel is a per-process down-counter decremented here.

use crate::config::CFG_PRIO_COUNT;
use crate::critical::{critical_section, CriticalSection};
use crate::kernel::{self, IsrGuard, KERNEL, SCHED};
use crate::sched;
use crate::types::{OsPrio, OsTick};

/// Sleep for `timeout` ticks
///
/// The calling process leaves the ready map and the timer makes it ready again
/// after `timeout` ticks. A timeout of 0 sleeps until another process wakes it
/// up with [`os_process_wake_up`](crate::process::os_process_wake_up) or
/// [`os_process_force_wake_up`](crate::process::os_process_force_wake_up).
///
/// Does nothing when called from an interrupt handler or before the kernel runs.
pub fn os_sleep(timeout: OsTick) {
    if !KERNEL.is_running() {
        return;
    }

    critical_section(|cs| {
        if kernel::isr_nesting(cs) > 0 {
            return;
        }

        kernel::set_cur_timeout(cs, timeout);
        kernel::clear_ready(cs, kernel::cur_proc_tag(cs));
        sched::os_sched(cs);
    });
}

/// Get current tick count
pub fn os_time_get() -> OsTick {
    KERNEL.tick_get()
}

/// Advance the system time by one tick
///
/// Increments the tick counter and decrements every running timeout; a
/// process whose timeout reaches zero becomes ready. Scheduling is left to
/// the caller's interrupt exit.
pub(crate) fn system_timer(cs: &CriticalSection) {
    KERNEL.tick_increment();

    let sched = SCHED.get(cs);
    for prio in 0..CFG_PRIO_COUNT {
        let Some(process) = sched.table[prio] else {
            continue;
        };

        // SAFETY: registered records are 'static and interrupts are disabled.
        let process = unsafe { &mut *process.as_ptr() };
        if process.timeout > 0 {
            process.timeout -= 1;
            if process.timeout == 0 {
                sched.ready.insert(prio as OsPrio);
            }
        }
    }
}

/// System timer interrupt body
///
/// Call once per tick from the timer interrupt. Wraps the tick in the ISR
/// protocol so that a process whose timeout expired preempts on return.
pub fn system_timer_isr() {
    let _isr = IsrGuard::enter();
    critical_section(system_timer);
}

/// SysTick exception handler
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[cortex_m_rt::exception]
fn SysTick() {
    system_timer_isr();
}

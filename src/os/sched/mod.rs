//! Scheduler module
//!
//! Strict-priority preemptive scheduling: the highest-priority ready process
//! always owns the CPU. Two switch strategies are available:
//!
//! - Interrupt-mediated (default): the scheduler records the target priority
//!   and pends the switch interrupt. The interrupt saves the outgoing context
//!   and loads the incoming one through [`context_switch_hook`].
//! - Direct transfer (`direct-switch` feature): the scheduler updates the
//!   current priority and calls the port's context-transfer routine itself.

use crate::critical::CriticalSection;
use crate::kernel::{self, KERNEL, SCHED};
#[cfg(not(feature = "direct-switch"))]
use crate::types::OsStkPtr;

/// Process-level scheduling point
///
/// Called after any operation that may change readiness. Does nothing before
/// the kernel runs or inside an interrupt handler; in the latter case the
/// decision is deferred to the outermost [`os_int_exit`](crate::os_int_exit).
pub(crate) fn os_sched(cs: &CriticalSection) {
    if !KERNEL.is_running() || kernel::isr_nesting(cs) > 0 {
        return;
    }

    sched_common(cs);
}

/// Interrupt-level scheduling point
///
/// Never waits for the switch: with the interrupt-mediated strategy the switch
/// interrupt runs once the handler returns.
pub(crate) fn os_sched_isr(cs: &CriticalSection) {
    if !KERNEL.is_running() {
        return;
    }

    #[cfg(not(feature = "direct-switch"))]
    {
        if retarget(cs) {
            crate::port::os_ctx_sw();
        }
    }

    #[cfg(feature = "direct-switch")]
    switch_to_highest(cs);
}

/// Point the pending switch at the highest ready process
///
/// Also overwrites the target of a switch that is pended but has not run yet,
/// even when that target is now the current process. Returns whether a switch
/// must be pended.
#[cfg(not(feature = "direct-switch"))]
fn retarget(cs: &CriticalSection) -> bool {
    let sched = SCHED.get(cs);
    let next = sched.ready.get_highest();
    if next == sched.cur_prio && sched.sched_prio == sched.cur_prio {
        return false;
    }

    sched.sched_prio = next;
    true
}

#[cfg(not(feature = "direct-switch"))]
fn sched_common(cs: &CriticalSection) {
    if !retarget(cs) {
        return;
    }

    crate::port::os_ctx_sw();

    // Open a window for the pended switch and keep reopening it until this
    // process has been switched out and back in again.
    loop {
        crate::port::enable_interrupts();
        crate::port::disable_interrupts();

        let sched = SCHED.get(cs);
        if sched.cur_prio == sched.sched_prio {
            break;
        }
    }
}

#[cfg(feature = "direct-switch")]
fn sched_common(cs: &CriticalSection) {
    switch_to_highest(cs);
}

/// Transfer the CPU to the highest-priority ready process, if it is not
/// already running
#[cfg(feature = "direct-switch")]
fn switch_to_highest(cs: &CriticalSection) {
    let (save, load) = {
        let sched = SCHED.get(cs);
        let next = sched.ready.get_highest();
        let cur = sched.cur_prio;
        if next == cur {
            return;
        }

        let (Some(cur_proc), Some(next_proc)) =
            (sched.table[cur as usize], sched.table[next as usize])
        else {
            return;
        };

        sched.cur_prio = next;
        sched.sched_prio = next;

        // SAFETY: registered records are 'static; the slot is only written by
        // the port while it switches this context out.
        unsafe { (&raw mut (*cur_proc.as_ptr()).stk_ptr, (*next_proc.as_ptr()).stk_ptr) }
    };

    crate::trace!("direct switch");

    // SAFETY: `load` is the saved context of a registered, switched-out process.
    unsafe { crate::port::os_context_switch(save, load) };
}

/// Stack swap performed by the switch interrupt
///
/// Stores `sp` as the outgoing process' context (a null `sp` means there is no
/// outgoing process yet), makes the scheduled process current and returns its
/// saved context.
///
/// # Safety
/// Interrupts must be disabled. Only the switch interrupt may call this.
#[cfg(not(feature = "direct-switch"))]
pub(crate) unsafe fn context_switch_hook(sp: OsStkPtr) -> OsStkPtr {
    // SAFETY: the caller runs with interrupts disabled.
    let sched = unsafe { SCHED.get_unchecked() };

    if !sp.is_null() {
        if let Some(cur) = sched.table[sched.cur_prio as usize] {
            // SAFETY: registered records are 'static.
            unsafe { (*cur.as_ptr()).stk_ptr = sp };
        }
    }

    sched.cur_prio = sched.sched_prio;

    match sched.table[sched.cur_prio as usize] {
        // SAFETY: registered records are 'static.
        Some(next) => unsafe { next.as_ref().stk_ptr },
        None => core::ptr::null_mut(),
    }
}

#[cfg(all(test, not(feature = "direct-switch")))]
mod tests {
    use super::*;
    use crate::critical::critical_section;
    use crate::testing::Scenario;

    #[test]
    fn test_isr_scheduling_overrides_stale_switch_target() {
        let _s = Scenario::new();
        KERNEL.set_running(true);

        let (cur, sched_prio) = critical_section(|cs| {
            // Process 2 suspended and pended a switch to 5, then an interrupt
            // made it ready again before the switch ran
            {
                let sched = SCHED.get(cs);
                sched.cur_prio = 2;
                sched.sched_prio = 5;
                sched.ready.insert(5);
                sched.ready.insert(2);
            }
            os_sched_isr(cs);

            let sched = SCHED.get(cs);
            (sched.cur_prio, sched.sched_prio)
        });

        kernel::os_reset_globals();
        assert_eq!((cur, sched_prio), (2, 2));
    }

    #[test]
    fn test_isr_scheduling_targets_highest_ready() {
        let _s = Scenario::new();
        KERNEL.set_running(true);

        let sched_prio = critical_section(|cs| {
            {
                let sched = SCHED.get(cs);
                sched.cur_prio = 4;
                sched.sched_prio = 4;
                sched.ready.insert(4);
                sched.ready.insert(1);
            }
            os_sched_isr(cs);
            SCHED.get(cs).sched_prio
        });

        kernel::os_reset_globals();
        assert_eq!(sched_prio, 1);
    }
}

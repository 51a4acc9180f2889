//! Process management module
//!
//! Processes are declared statically and registered once, before the kernel
//! starts. The priority is the process identifier for every later operation.

mod pcb;

pub use pcb::{OsProcess, OsProcessFn};

use core::ptr::NonNull;

use crate::config::{CFG_PRIO_COUNT, CFG_PRIO_IDLE, CFG_STK_SIZE_MIN};
use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel::{self, KERNEL};
use crate::prio::priority_to_tag;
use crate::sched;
use crate::types::{OsPrio, OsStartState, OsStkElement};

/// Register a process
///
/// Builds the first stack frame and puts the record in the process table at
/// index `prio`. Duplicate priorities are not detected: unique priorities are
/// a configuration invariant.
///
/// # Arguments
/// * `process` - Static process record
/// * `stack` - Static stack array
/// * `name` - Process name for debugging
/// * `entry` - Process entry point
/// * `prio` - Process priority (0 = highest)
/// * `start` - Whether the process is ready when the kernel starts
///
/// # Example
/// ```ignore
/// static mut PROC: OsProcess = OsProcess::new();
/// static mut PROC_STK: [OsStkElement; 256] = [0; 256];
///
/// fn worker() -> ! {
///     loop { /* ... */ }
/// }
///
/// // In main:
/// os_process_create(
///     unsafe { &mut *(&raw mut PROC) },
///     unsafe { &mut *(&raw mut PROC_STK) },
///     "Worker",
///     worker,
///     2,
///     OsStartState::Ready,
/// ).unwrap();
/// ```
pub fn os_process_create(
    process: &'static mut OsProcess,
    stack: &'static mut [OsStkElement],
    name: &'static str,
    entry: OsProcessFn,
    prio: OsPrio,
    start: OsStartState,
) -> OsResult<()> {
    if prio >= CFG_PRIO_IDLE {
        return Err(OsError::PrioInvalid);
    }

    // SAFETY: both regions are 'static and exclusively borrowed, so the kernel
    // becomes their only user.
    unsafe {
        os_process_create_raw(
            process as *mut OsProcess,
            name,
            entry,
            prio,
            stack.as_mut_ptr(),
            stack.len(),
            start,
        )
    }
}

/// Process registration shared with the kernel's idle process
///
/// # Safety
/// `process` and the stack region must be valid for the rest of the program
/// and not used by anything else.
pub(crate) unsafe fn os_process_create_raw(
    process: *mut OsProcess,
    name: &'static str,
    entry: OsProcessFn,
    prio: OsPrio,
    stk_base: *mut OsStkElement,
    stk_size: usize,
    start: OsStartState,
) -> OsResult<()> {
    if !KERNEL.is_initialized() {
        return Err(OsError::OsNotInit);
    }

    if KERNEL.is_running() {
        return Err(OsError::OsRunning);
    }

    if !prio_in_range(prio) {
        return Err(OsError::PrioInvalid);
    }

    let Some(process) = NonNull::new(process) else {
        return Err(OsError::StkInvalid);
    };

    if stk_base.is_null() || stk_size == 0 {
        return Err(OsError::StkInvalid);
    }

    if stk_size < CFG_STK_SIZE_MIN {
        return Err(OsError::StkSizeInvalid);
    }

    critical_section(|cs| {
        // SAFETY: guaranteed exclusive by the caller.
        let pcb = unsafe { &mut *process.as_ptr() };
        pcb.init();

        pcb.name = name;
        pcb.prio = prio;
        pcb.stk_base = stk_base;
        pcb.stk_size = stk_size;
        // SAFETY: the region is valid for `stk_size` words.
        pcb.stk_ptr = unsafe { crate::port::os_task_stk_init(entry, stk_base, stk_size) };

        kernel::register(cs, process, start);
    });

    crate::debug!("registered process {=str} at priority {=u8}", name, prio);
    Ok(())
}

/// Start a process registered as suspended
///
/// A process that is waiting forever on a primitive looks the same as a
/// suspended one; starting it acts as [`os_process_force_wake_up`].
pub fn os_process_start(prio: OsPrio) {
    if !prio_in_range(prio) {
        return;
    }

    critical_section(|cs| {
        if os_process_is_suspended_cs(cs, prio) {
            kernel::set_ready(cs, priority_to_tag(prio));
            sched::os_sched(cs);
        }
    });
}

/// Wake a sleeping process before its timeout expires
///
/// Only acts on processes with a running timeout (sleeping, or waiting on a
/// primitive with a timeout; the latter observe a timeout).
pub fn os_process_wake_up(prio: OsPrio) {
    if !prio_in_range(prio) {
        return;
    }

    critical_section(|cs| {
        let woken = kernel::with_process(cs, prio, |p| {
            if p.timeout == 0 {
                return false;
            }
            p.timeout = 0;
            true
        });

        if woken == Some(true) {
            kernel::set_ready(cs, priority_to_tag(prio));
            sched::os_sched(cs);
        }
    });
}

/// Make a process ready unconditionally
///
/// A process blocked in a primitive sees the wake as a timeout. Waking a
/// process that is racing on a channel or mutex can break that primitive's
/// expectations; this is meant for administrative control only.
pub fn os_process_force_wake_up(prio: OsPrio) {
    if !prio_in_range(prio) {
        return;
    }

    critical_section(|cs| {
        if kernel::with_process(cs, prio, |p| p.timeout = 0).is_some() {
            kernel::set_ready(cs, priority_to_tag(prio));
            sched::os_sched(cs);
        }
    });
}

/// True if the process is not ready and has a running timeout
pub fn os_process_is_sleeping(prio: OsPrio) -> bool {
    if !prio_in_range(prio) {
        return false;
    }

    critical_section(|cs| {
        let ready = kernel::ready_map(cs) & priority_to_tag(prio) != 0;
        !ready && kernel::with_process(cs, prio, |p| p.timeout != 0).unwrap_or(false)
    })
}

/// True if the process is not ready and has no timeout to wake it
pub fn os_process_is_suspended(prio: OsPrio) -> bool {
    if !prio_in_range(prio) {
        return false;
    }

    critical_section(|cs| os_process_is_suspended_cs(cs, prio))
}

#[inline]
fn prio_in_range(prio: OsPrio) -> bool {
    (prio as usize) < CFG_PRIO_COUNT
}

fn os_process_is_suspended_cs(cs: &crate::critical::CriticalSection, prio: OsPrio) -> bool {
    let ready = kernel::ready_map(cs) & priority_to_tag(prio) != 0;
    !ready && kernel::with_process(cs, prio, |p| p.timeout == 0).unwrap_or(false)
}

//! Global kernel state and initialization
//!
//! This module owns the process table, the ready map, the current and
//! scheduled priority registers and the interrupt nesting counter. Other
//! kernel modules reach that state only through the `pub(crate)` functions at
//! the bottom of this file; application code only sees the public API.

use core::ptr::NonNull;

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{CFG_IDLE_STK_SIZE, CFG_PRIO_COUNT, CFG_PRIO_IDLE, CFG_SYSTICK_CLOCK_HZ, CFG_TICK_RATE_HZ};
use crate::critical::{critical_section, CriticalSection};
use crate::os::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::prio::{priority_to_tag, PrioTable};
use crate::process::OsProcess;
use crate::types::{OsNestingCtr, OsPrio, OsProcessMap, OsStartState, OsStkElement, OsTick};

// ============ Kernel State Structures ============

/// Atomic kernel flags
pub struct KernelFlags {
    initialized: AtomicBool,
    running: AtomicBool,
    tick_counter: AtomicU32,
}

impl KernelFlags {
    const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            tick_counter: AtomicU32::new(0),
        }
    }

    pub(crate) fn reset(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.tick_counter.store(0, Ordering::SeqCst);
    }

    /// Check if the OS is running
    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Check if OS is initialized
    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Get current tick count
    #[inline(always)]
    pub fn tick_get(&self) -> OsTick {
        self.tick_counter.load(Ordering::Relaxed)
    }

    /// Increment and return tick count
    #[inline(always)]
    pub(crate) fn tick_increment(&self) -> OsTick {
        self.tick_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    #[inline(always)]
    pub(crate) fn set_initialized(&self, val: bool) {
        self.initialized.store(val, Ordering::SeqCst);
    }

    #[inline(always)]
    pub(crate) fn set_running(&self, val: bool) {
        self.running.store(val, Ordering::SeqCst);
    }
}

/// Global kernel flags instance
pub(crate) static KERNEL: KernelFlags = KernelFlags::new();

/// Scheduler state
pub(crate) struct SchedState {
    /// Priority of the process that owns the CPU
    pub(crate) cur_prio: OsPrio,
    /// Priority the pending switch interrupt will hand the CPU to
    pub(crate) sched_prio: OsPrio,
    pub(crate) ready: PrioTable,
    pub(crate) table: [Option<NonNull<OsProcess>>; CFG_PRIO_COUNT],
    pub(crate) isr_nesting: OsNestingCtr,
}

impl SchedState {
    const fn new() -> Self {
        Self {
            cur_prio: CFG_PRIO_IDLE,
            sched_prio: CFG_PRIO_IDLE,
            ready: PrioTable::new(),
            table: [None; CFG_PRIO_COUNT],
            isr_nesting: 0,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Global scheduler state instance
pub(crate) static SCHED: CsCell<SchedState> = CsCell::new(SchedState::new());

/// Idle process record
static mut IDLE_PROCESS: OsProcess = OsProcess::new();

/// Idle process stack
static mut IDLE_STK: [OsStkElement; CFG_IDLE_STK_SIZE] = [0; CFG_IDLE_STK_SIZE];

// ============ Initialization ============

/// Idle process body
fn os_idle_process() -> ! {
    loop {
        crate::port::os_idle_hook();
    }
}

/// Reset global kernel state
///
/// Forgets every registered process. Must not be called while processes run.
pub(crate) fn os_reset_globals() {
    KERNEL.reset();
    crate::port::os_port_init();
    critical_section(|cs| SCHED.get(cs).reset());
}

/// Initialize the kernel
///
/// This must be called before any other OS function. It clears the process
/// table and the ready map and registers the idle process at the lowest
/// priority.
///
/// # Returns
/// * `Ok(())` - Initialization successful
/// * `Err(OsError::OsRunning)` - OS is already running
pub fn os_init() -> OsResult<()> {
    if KERNEL.is_running() {
        return Err(OsError::OsRunning);
    }

    os_reset_globals();
    KERNEL.set_initialized(true);

    // SAFETY: the idle statics are only ever handed to the kernel here, and the
    // kernel is not running, so nothing else refers to them.
    unsafe {
        crate::process::os_process_create_raw(
            &raw mut IDLE_PROCESS,
            "Idle",
            os_idle_process,
            CFG_PRIO_IDLE,
            (&raw mut IDLE_STK).cast::<OsStkElement>(),
            CFG_IDLE_STK_SIZE,
            OsStartState::Ready,
        )?;
    }

    crate::debug!("kernel initialized, {=usize} priority levels", CFG_PRIO_COUNT);
    Ok(())
}

/// Start multitasking
///
/// Hands the CPU to the highest-priority ready process. It never returns on
/// success.
///
/// # Returns
/// * `Err(OsError::OsNotInit)` - OS not initialized
/// * `Err(OsError::OsRunning)` - OS is already running
/// * `Err(OsError::OsNoAppTask)` - No application process registered
pub fn os_start() -> OsResult<()> {
    if !KERNEL.is_initialized() {
        return Err(OsError::OsNotInit);
    }

    if KERNEL.is_running() {
        return Err(OsError::OsRunning);
    }

    let sp = critical_section(|cs| {
        let sched = SCHED.get(cs);

        let has_app = sched.table[..CFG_PRIO_IDLE as usize].iter().any(Option::is_some);
        if !has_app {
            return Err(OsError::OsNoAppTask);
        }

        let prio = sched.ready.get_highest();
        let first = sched.table[prio as usize].ok_or(OsError::OsNoAppTask)?;

        sched.cur_prio = prio;
        sched.sched_prio = prio;
        crate::info!("starting kernel at priority {=u8}", prio);

        // SAFETY: registered processes are 'static and only mutated in critical sections.
        Ok(unsafe { first.as_ref().stk_ptr })
    })?;

    crate::port::disable_interrupts();
    KERNEL.set_running(true);
    crate::port::os_cpu_systick_init(CFG_SYSTICK_CLOCK_HZ / CFG_TICK_RATE_HZ);

    // SAFETY: `sp` was produced by the port's frame builder for this process.
    unsafe { crate::port::os_start_high_rdy(sp) }
}

// ============ Interrupt Nesting ============

/// Enter ISR
///
/// Must be paired with [`os_int_exit`]. Prefer [`IsrGuard`].
pub fn os_int_enter() {
    critical_section(|cs| {
        let sched = SCHED.get(cs);
        sched.isr_nesting = sched.isr_nesting.saturating_add(1);
    });
}

/// Exit ISR
///
/// When the outermost handler exits, runs the interrupt-level scheduler so a
/// process readied by the handler takes the CPU on return.
pub fn os_int_exit() {
    critical_section(|cs| {
        let sched = SCHED.get(cs);
        if sched.isr_nesting == 0 {
            return;
        }

        sched.isr_nesting -= 1;

        if sched.isr_nesting == 0 && KERNEL.is_running() {
            crate::sched::os_sched_isr(cs);
        }
    });
}

/// ISR prologue/epilogue guard
///
/// Create one at the top of every interrupt handler that touches kernel
/// objects. Dropping it runs the deferred scheduling decision.
///
/// ```ignore
/// #[interrupt]
/// fn USART1() {
///     let _isr = IsrGuard::enter();
///     RX.write_isr(&[read_byte()]);
/// }
/// ```
pub struct IsrGuard {
    _private: (),
}

impl IsrGuard {
    #[inline]
    pub fn enter() -> Self {
        os_int_enter();
        IsrGuard { _private: () }
    }
}

impl Drop for IsrGuard {
    #[inline]
    fn drop(&mut self) {
        os_int_exit();
    }
}

/// Priority of the running process
pub fn os_prio_cur() -> OsPrio {
    critical_section(|cs| SCHED.get(cs).cur_prio)
}

// ============ Internal accessors for other modules ============

/// Current priority
#[inline(always)]
pub(crate) fn prio_cur(cs: &CriticalSection) -> OsPrio {
    SCHED.get(cs).cur_prio
}

/// Tag of the current process
#[inline(always)]
pub(crate) fn cur_proc_tag(cs: &CriticalSection) -> OsProcessMap {
    priority_to_tag(prio_cur(cs))
}

/// Interrupt nesting level
#[inline(always)]
pub(crate) fn isr_nesting(cs: &CriticalSection) -> OsNestingCtr {
    SCHED.get(cs).isr_nesting
}

/// Raw ready map
#[inline(always)]
pub(crate) fn ready_map(cs: &CriticalSection) -> OsProcessMap {
    SCHED.get(cs).ready.bits()
}

/// Mark every process in `tags` ready
#[inline(always)]
pub(crate) fn set_ready(cs: &CriticalSection, tags: OsProcessMap) {
    SCHED.get(cs).ready.insert_tags(tags);
}

/// Remove every process in `tags` from the ready map
#[inline(always)]
pub(crate) fn clear_ready(cs: &CriticalSection, tags: OsProcessMap) {
    SCHED.get(cs).ready.remove_tags(tags);
}

/// Run `f` on the process registered at `prio`
pub(crate) fn with_process<R>(
    cs: &CriticalSection,
    prio: OsPrio,
    f: impl FnOnce(&mut OsProcess) -> R,
) -> Option<R> {
    let slot = SCHED.get(cs).table.get(prio as usize).copied().flatten()?;
    // SAFETY: registered processes are 'static and this is the only live
    // reference while interrupts are disabled.
    Some(f(unsafe { &mut *slot.as_ptr() }))
}

/// Ticks left on the current process' timeout
#[inline]
pub(crate) fn cur_timeout(cs: &CriticalSection) -> OsTick {
    let prio = prio_cur(cs);
    with_process(cs, prio, |p| p.timeout).unwrap_or(0)
}

/// Set the timeout counter of the current process
#[inline]
pub(crate) fn set_cur_timeout(cs: &CriticalSection, timeout: OsTick) {
    let prio = prio_cur(cs);
    with_process(cs, prio, |p| p.timeout = timeout);
}

/// Put a process into the table and, unless it starts suspended, the ready map
pub(crate) fn register(cs: &CriticalSection, process: NonNull<OsProcess>, start: OsStartState) {
    let sched = SCHED.get(cs);
    // SAFETY: the caller hands over a fully initialized 'static record.
    let prio = unsafe { process.as_ref().prio };

    sched.table[prio as usize] = Some(process);
    if start == OsStartState::Ready {
        sched.ready.insert(prio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{finish, EventLog, Scenario};

    #[test]
    fn test_start_requires_init_and_app_process() {
        let _s = Scenario::new();
        assert_eq!(os_start(), Err(OsError::OsNoAppTask));

        os_reset_globals();
        assert_eq!(os_start(), Err(OsError::OsNotInit));
    }

    #[test]
    fn test_init_registers_ready_idle() {
        let _s = Scenario::new();

        critical_section(|cs| {
            let sched = SCHED.get(cs);
            assert!(sched.table[CFG_PRIO_IDLE as usize].is_some());
            assert!(sched.table[..CFG_PRIO_IDLE as usize].iter().all(Option::is_none));
            assert_eq!(sched.ready.bits(), priority_to_tag(CFG_PRIO_IDLE));
        });
        assert_eq!(os_prio_cur(), CFG_PRIO_IDLE);
    }

    #[test]
    fn test_highest_ready_process_runs_first() {
        static LOG: EventLog = EventLog::new();

        fn low() -> ! {
            LOG.record(format!("low at {}", os_prio_cur()));
            finish()
        }

        fn high() -> ! {
            LOG.record(format!("high at {}", os_prio_cur()));
            finish()
        }

        let s = Scenario::new();
        s.spawn("low", 5, low).spawn("high", 2, high);
        s.run();

        assert_eq!(LOG.take(), ["high at 2", "low at 5"]);
        assert!(KERNEL.is_running());
        assert_eq!(os_init(), Err(OsError::OsRunning));
        assert_eq!(os_prio_cur(), CFG_PRIO_IDLE);
    }
}

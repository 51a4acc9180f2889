//! Scenario harness for kernel tests on the hosted port
//!
//! The kernel is a global singleton, so scenarios are serialized. A scenario
//! initializes the kernel, registers processes, starts the kernel on a helper
//! thread and waits until the idle process runs: from then on nothing can
//! change without an outside event, and the test thread inspects what the
//! processes recorded.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::CFG_STK_SIZE_MIN;
use crate::process::{os_process_create, OsProcess, OsProcessFn};
use crate::types::{OsPrio, OsStartState, OsStkElement};

static SERIAL: Mutex<()> = Mutex::new(());

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// One kernel run
pub(crate) struct Scenario {
    _serial: MutexGuard<'static, ()>,
}

impl Scenario {
    pub(crate) fn new() -> Self {
        let serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop whatever the previous scenario left running
        crate::kernel::os_reset_globals();
        crate::os_init().expect("kernel init");
        Scenario { _serial: serial }
    }

    pub(crate) fn spawn(&self, name: &'static str, prio: OsPrio, entry: OsProcessFn) -> &Self {
        self.register(name, prio, entry, OsStartState::Ready)
    }

    pub(crate) fn spawn_suspended(&self, name: &'static str, prio: OsPrio, entry: OsProcessFn) -> &Self {
        self.register(name, prio, entry, OsStartState::Suspended)
    }

    fn register(&self, name: &'static str, prio: OsPrio, entry: OsProcessFn, start: OsStartState) -> &Self {
        let process: &'static mut OsProcess = Box::leak(Box::new(OsProcess::new()));
        let stack: &'static mut [OsStkElement] =
            Box::leak(vec![0; CFG_STK_SIZE_MIN].into_boxed_slice());

        os_process_create(process, stack, name, entry, prio, start).expect("process registration");
        self
    }

    /// Start the kernel and block until every process has blocked
    pub(crate) fn run(&self) {
        thread::spawn(|| {
            let _ = crate::os_start();
        });

        let deadline = Instant::now() + SETTLE_TIMEOUT;
        while crate::port::idle_polls() == 0 {
            assert!(Instant::now() < deadline, "scenario did not settle");
            thread::sleep(Duration::from_millis(1));
        }
    }
}

/// Ordered record of what processes observed
pub(crate) struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    pub(crate) const fn new() -> Self {
        EventLog { events: Mutex::new(Vec::new()) }
    }

    pub(crate) fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event.into());
    }

    pub(crate) fn take(&self) -> Vec<String> {
        core::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// End of a process body: sleep until explicitly woken, forever
pub(crate) fn finish() -> ! {
    loop {
        crate::time::os_sleep(0);
    }
}

/// Deliver `n` simulated timer interrupts from the calling process
pub(crate) fn tick(n: usize) {
    for _ in 0..n {
        crate::time::system_timer_isr();
    }
}

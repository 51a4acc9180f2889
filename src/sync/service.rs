//! Synchronization base protocol
//!
//! Blocking a process means putting its tag into a wait map, taking it out of
//! the ready map and running the scheduler. Waking means the reverse. The
//! timer and forced wakes ready a process without touching any wait map, so a
//! tag still present after [`WaitMap::suspend`] returns marks a timeout.

use crate::critical::CriticalSection;
use crate::kernel;
use crate::os::cs_cell::CsCell;
use crate::prio::highest_priority_tag;
use crate::sched;
use crate::types::{OsProcessMap, OsTick};

/// Tag of the running process
#[inline(always)]
pub(crate) fn cur_proc_prio_tag(cs: &CriticalSection) -> OsProcessMap {
    kernel::cur_proc_tag(cs)
}

/// Set of processes blocked on one object
pub struct WaitMap {
    map: CsCell<OsProcessMap>,
}

impl WaitMap {
    pub const fn new() -> Self {
        WaitMap { map: CsCell::new(0) }
    }

    /// Block the running process on this map
    ///
    /// Returns once some other path has made the process ready again.
    pub(crate) fn suspend(&self, cs: &CriticalSection) {
        let tag = cur_proc_prio_tag(cs);
        *self.map.get(cs) |= tag;
        kernel::clear_ready(cs, tag);
        sched::os_sched(cs);
    }

    /// Consume the reason the running process was readied
    ///
    /// True when its tag is still recorded, i.e. the timer or a forced wake
    /// readied it. The tag is removed either way.
    pub(crate) fn is_timed_out(&self, cs: &CriticalSection) -> bool {
        let tag = cur_proc_prio_tag(cs);
        let map = self.map.get(cs);
        if *map & tag != 0 {
            *map &= !tag;
            true
        } else {
            false
        }
    }

    /// Block with a timeout (0 = forever) and report whether the wake was a
    /// normal resume
    pub(crate) fn wait_for(&self, cs: &CriticalSection, timeout: OsTick) -> bool {
        kernel::set_cur_timeout(cs, timeout);
        self.suspend(cs);

        if self.is_timed_out(cs) {
            return false;
        }

        kernel::set_cur_timeout(cs, 0);
        true
    }

    /// Wake every recorded process that is not already ready
    pub(crate) fn resume_all(&self, cs: &CriticalSection) -> bool {
        if !self.resume_all_isr(cs) {
            return false;
        }
        sched::os_sched(cs);
        true
    }

    /// Wake the highest-priority recorded process that is not already ready
    pub(crate) fn resume_next_ready(&self, cs: &CriticalSection) -> bool {
        if !self.resume_next_ready_isr(cs) {
            return false;
        }
        sched::os_sched(cs);
        true
    }

    /// [`resume_all`](Self::resume_all) without a scheduling point
    pub(crate) fn resume_all_isr(&self, cs: &CriticalSection) -> bool {
        let pending = self.pending(cs);
        if pending == 0 {
            return false;
        }

        self.resume(cs, pending);
        true
    }

    /// [`resume_next_ready`](Self::resume_next_ready) without a scheduling point
    pub(crate) fn resume_next_ready_isr(&self, cs: &CriticalSection) -> bool {
        let next = highest_priority_tag(self.pending(cs));
        if next == 0 {
            return false;
        }

        self.resume(cs, next);
        true
    }

    /// Recorded processes still waiting; timed-out ones are already ready
    #[inline]
    fn pending(&self, cs: &CriticalSection) -> OsProcessMap {
        self.map.read(cs) & !kernel::ready_map(cs)
    }

    #[inline]
    fn resume(&self, cs: &CriticalSection, tags: OsProcessMap) {
        *self.map.get(cs) &= !tags;
        kernel::set_ready(cs, tags);
    }
}

impl Default for WaitMap {
    fn default() -> Self {
        Self::new()
    }
}

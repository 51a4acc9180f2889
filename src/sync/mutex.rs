//! Mutex implementation
//!
//! Exclusive ownership by one process. Unlocking wakes only the
//! highest-priority waiter, which re-checks ownership when it runs. There is
//! no priority inheritance.

use crate::critical::critical_section;
use crate::kernel;
use crate::os::cs_cell::CsCell;
use crate::prio::highest_priority;
use crate::sync::service::{cur_proc_prio_tag, WaitMap};
use crate::types::{OsPrio, OsProcessMap, OsTick};

/// Mutual exclusion lock
pub struct OsMutex {
    waiters: WaitMap,
    /// Tag of the owning process; 0 = free
    owner: CsCell<OsProcessMap>,
}

impl OsMutex {
    /// Create an unlocked mutex
    pub const fn new() -> Self {
        OsMutex {
            waiters: WaitMap::new(),
            owner: CsCell::new(0),
        }
    }

    /// Acquire the mutex, blocking for as long as it takes
    pub fn lock(&self) {
        critical_section(|cs| {
            while self.owner.read(cs) != 0 {
                self.waiters.wait_for(cs, 0);
            }
            self.owner.write(cs, cur_proc_prio_tag(cs));
        });
    }

    /// Release the mutex
    ///
    /// Only the owner can unlock; a call from any other process is ignored.
    pub fn unlock(&self) {
        critical_section(|cs| {
            if self.owner.read(cs) != cur_proc_prio_tag(cs) {
                return;
            }

            self.owner.write(cs, 0);
            self.waiters.resume_next_ready(cs);
        });
    }

    /// Release the mutex from an interrupt handler, regardless of owner
    pub fn unlock_isr(&self) {
        critical_section(|cs| {
            self.owner.write(cs, 0);
            self.waiters.resume_next_ready_isr(cs);
        });
    }

    /// Acquire the mutex only if it is free
    pub fn try_lock(&self) -> bool {
        critical_section(|cs| {
            if self.owner.read(cs) != 0 {
                return false;
            }
            self.owner.write(cs, cur_proc_prio_tag(cs));
            true
        })
    }

    /// Acquire the mutex, waiting at most `timeout` ticks (0 = forever)
    ///
    /// # Returns
    /// `true` if the mutex is now owned by the caller
    pub fn try_lock_for(&self, timeout: OsTick) -> bool {
        critical_section(|cs| {
            if self.owner.read(cs) == 0 {
                self.owner.write(cs, cur_proc_prio_tag(cs));
                return true;
            }

            // The timeout spans every retry, not each one
            kernel::set_cur_timeout(cs, timeout);
            loop {
                self.waiters.suspend(cs);
                if self.waiters.is_timed_out(cs) {
                    return false;
                }

                if self.owner.read(cs) == 0 {
                    kernel::set_cur_timeout(cs, 0);
                    self.owner.write(cs, cur_proc_prio_tag(cs));
                    return true;
                }

                // Resumed, but another process got there first and the timeout ran out meanwhile
                if timeout != 0 && kernel::cur_timeout(cs) == 0 {
                    return false;
                }
            }
        })
    }

    pub fn is_locked(&self) -> bool {
        critical_section(|cs| self.owner.read(cs) != 0)
    }

    /// Priority of the owning process
    pub fn owner_prio(&self) -> Option<OsPrio> {
        critical_section(|cs| match self.owner.read(cs) {
            0 => None,
            tag => Some(highest_priority(tag)),
        })
    }
}

impl Default for OsMutex {
    fn default() -> Self {
        Self::new()
    }
}

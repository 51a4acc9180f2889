//! Event flag
//!
//! A binary latch with broadcast wake-up. Signaling wakes every waiting
//! process; with no waiters the flag stays set until one `wait` consumes it.

use crate::critical::critical_section;
use crate::os::cs_cell::CsCell;
use crate::sync::service::WaitMap;
use crate::types::OsTick;

/// Event flag
pub struct EventFlag {
    waiters: WaitMap,
    value: CsCell<bool>,
}

impl EventFlag {
    /// Create a cleared event flag
    pub const fn new() -> Self {
        EventFlag {
            waiters: WaitMap::new(),
            value: CsCell::new(false),
        }
    }

    /// Wait for the flag
    ///
    /// Consumes a pending signal without blocking. Otherwise blocks for up to
    /// `timeout` ticks (0 = forever).
    ///
    /// # Returns
    /// `true` if signaled, `false` on timeout
    pub fn wait(&self, timeout: OsTick) -> bool {
        critical_section(|cs| {
            if self.value.read(cs) {
                self.value.write(cs, false);
                return true;
            }

            self.waiters.wait_for(cs, timeout)
        })
    }

    /// Wake every waiting process, or latch the flag if there are none
    pub fn signal(&self) {
        critical_section(|cs| {
            if !self.waiters.resume_all(cs) {
                self.value.write(cs, true);
            }
        });
    }

    /// [`signal`](Self::signal) for interrupt handlers
    ///
    /// The switch to a woken process happens when the handler's
    /// [`IsrGuard`](crate::IsrGuard) is dropped.
    pub fn signal_isr(&self) {
        critical_section(|cs| {
            if !self.waiters.resume_all_isr(cs) {
                self.value.write(cs, true);
            }
        });
    }

    /// Reset the latch; waiting processes are not affected
    pub fn clear(&self) {
        critical_section(|cs| self.value.write(cs, false));
    }

    /// Check the latch without consuming it
    pub fn is_signaled(&self) -> bool {
        critical_section(|cs| self.value.read(cs))
    }
}

impl Default for EventFlag {
    fn default() -> Self {
        Self::new()
    }
}

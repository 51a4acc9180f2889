//! Message
//!
//! A single-slot mailbox. Sending stores the payload and wakes every waiting
//! process; with no waiters the message stays pending for the next `wait`.

use crate::critical::critical_section;
use crate::os::cs_cell::CsCell;
use crate::sync::service::WaitMap;
use crate::types::OsTick;

struct Slot<T> {
    non_empty: bool,
    msg: T,
}

/// Single-slot message of a `Copy` payload
pub struct Message<T: Copy> {
    waiters: WaitMap,
    slot: CsCell<Slot<T>>,
}

impl<T: Copy> Message<T> {
    /// Create an empty message holding `init` as its payload
    pub const fn new(init: T) -> Self {
        Message {
            waiters: WaitMap::new(),
            slot: CsCell::new(Slot { non_empty: false, msg: init }),
        }
    }

    /// Store `msg` and wake every waiting process
    pub fn send(&self, msg: T) {
        critical_section(|cs| {
            self.slot.get(cs).msg = msg;
            if !self.waiters.resume_all(cs) {
                self.slot.get(cs).non_empty = true;
            }
        });
    }

    /// [`send`](Self::send) for interrupt handlers
    pub fn send_isr(&self, msg: T) {
        critical_section(|cs| {
            self.slot.get(cs).msg = msg;
            if !self.waiters.resume_all_isr(cs) {
                self.slot.get(cs).non_empty = true;
            }
        });
    }

    /// Wait for a message for up to `timeout` ticks (0 = forever)
    ///
    /// # Returns
    /// The payload, or `None` on timeout
    pub fn wait(&self, timeout: OsTick) -> Option<T> {
        critical_section(|cs| {
            let slot = self.slot.get(cs);
            if slot.non_empty {
                slot.non_empty = false;
                return Some(slot.msg);
            }

            if self.waiters.wait_for(cs, timeout) {
                Some(self.slot.get(cs).msg)
            } else {
                None
            }
        })
    }

    /// True if a message is pending
    pub fn is_non_empty(&self) -> bool {
        critical_section(|cs| self.slot.get(cs).non_empty)
    }

    /// Drop a pending message
    pub fn reset(&self) {
        critical_section(|cs| self.slot.get(cs).non_empty = false);
    }
}

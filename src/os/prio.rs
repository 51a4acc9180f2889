//! Priority bitmap management for O(1) highest-ready lookup
//!
//! A process map holds one bit per priority. The tag of a priority is the map
//! with only that bit set. Which end of the word is "highest" depends on
//! `CFG_PRIORITY_ORDER_ASCENDING`; either way the lookup is a single
//! count-zeros instruction on cores that have one.

use crate::config::{CFG_PRIO_COUNT, CFG_PRIO_IDLE, CFG_PRIORITY_ORDER_ASCENDING};
use crate::types::{OsPrio, OsProcessMap};

/// Bit position of a priority inside a process map
#[inline(always)]
const fn bit_of(prio: OsPrio) -> u32 {
    if CFG_PRIORITY_ORDER_ASCENDING {
        prio as u32
    } else {
        (CFG_PRIO_COUNT - 1 - prio as usize) as u32
    }
}

/// Convert a priority to its one-bit tag
///
/// `prio` must be below `CFG_PRIO_COUNT`.
#[inline(always)]
pub const fn priority_to_tag(prio: OsPrio) -> OsProcessMap {
    1 << bit_of(prio)
}

/// Priority of the highest-priority tag present in `map`.
///
/// An empty map yields the idle priority.
#[inline]
pub fn highest_priority(map: OsProcessMap) -> OsPrio {
    if map == 0 {
        return CFG_PRIO_IDLE;
    }

    if CFG_PRIORITY_ORDER_ASCENDING {
        map.trailing_zeros() as OsPrio
    } else {
        let bit = OsProcessMap::BITS - 1 - map.leading_zeros();
        (CFG_PRIO_COUNT as u32 - 1 - bit) as OsPrio
    }
}

/// Tag of the highest-priority process in `map` (0 for an empty map)
#[inline]
pub fn highest_priority_tag(map: OsProcessMap) -> OsProcessMap {
    if map == 0 {
        return 0;
    }

    if CFG_PRIORITY_ORDER_ASCENDING {
        map & map.wrapping_neg()
    } else {
        1 << (OsProcessMap::BITS - 1 - map.leading_zeros())
    }
}

/// Ready map
///
/// A set bit means the process at that priority is ready to run. Priorities
/// are unique, so one bit per level is the whole ready structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioTable {
    map: OsProcessMap,
}

impl PrioTable {
    pub const fn new() -> Self {
        PrioTable { map: 0 }
    }

    pub fn init(&mut self) {
        self.map = 0;
    }

    /// Insert a priority into the bitmap
    #[inline]
    pub fn insert(&mut self, prio: OsPrio) {
        debug_assert!((prio as usize) < CFG_PRIO_COUNT);
        self.map |= priority_to_tag(prio);
    }

    /// Remove a priority from the bitmap
    #[inline]
    pub fn remove(&mut self, prio: OsPrio) {
        debug_assert!((prio as usize) < CFG_PRIO_COUNT);
        self.map &= !priority_to_tag(prio);
    }

    /// Insert every tag of `tags`
    #[inline]
    pub fn insert_tags(&mut self, tags: OsProcessMap) {
        self.map |= tags;
    }

    /// Remove every tag of `tags`
    #[inline]
    pub fn remove_tags(&mut self, tags: OsProcessMap) {
        self.map &= !tags;
    }

    /// Get the highest ready priority
    #[inline]
    pub fn get_highest(&self) -> OsPrio {
        highest_priority(self.map)
    }

    /// Check if a specific priority is ready
    #[inline]
    pub fn is_set(&self, prio: OsPrio) -> bool {
        self.map & priority_to_tag(prio) != 0
    }

    /// Check if the priority table is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map == 0
    }

    /// Raw process map
    #[inline]
    pub fn bits(&self) -> OsProcessMap {
        self.map
    }
}

impl Default for PrioTable {
    fn default() -> Self {
        Self::new()
    }
}

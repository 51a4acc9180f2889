//! Unit tests for core kernel modules
//!
//! These tests run on the host (not embedded target) to verify
//! the core algorithms work correctly.

#[cfg(test)]
mod prio_tests {
    use bitmap_rtos::config::{CFG_PRIO_COUNT, CFG_PRIO_IDLE};
    use bitmap_rtos::prio::{highest_priority, highest_priority_tag, priority_to_tag, PrioTable};

    #[test]
    fn test_empty_table() {
        let table = PrioTable::new();
        assert!(table.is_empty());
        assert_eq!(table.get_highest(), CFG_PRIO_IDLE);
    }

    #[test]
    fn test_multiple_priorities() {
        let mut table = PrioTable::new();

        // Insert in random order
        table.insert(6);
        table.insert(1);
        table.insert(4);
        table.insert(0);
        table.insert(CFG_PRIO_IDLE);

        assert_eq!(table.get_highest(), 0);

        table.remove(0);
        assert_eq!(table.get_highest(), 1);

        table.remove(1);
        assert_eq!(table.get_highest(), 4);

        table.remove(4);
        assert_eq!(table.get_highest(), 6);

        table.remove(6);
        assert_eq!(table.get_highest(), CFG_PRIO_IDLE);
    }

    #[test]
    fn test_tags_cover_every_priority() {
        let all = (0..CFG_PRIO_COUNT as u8).fold(0, |map, p| map | priority_to_tag(p));
        assert_eq!(all.count_ones() as usize, CFG_PRIO_COUNT);
        assert_eq!(highest_priority(all), 0);
        assert_eq!(highest_priority_tag(all), priority_to_tag(0));
    }

    #[test]
    fn test_empty_map_selects_idle() {
        assert_eq!(highest_priority(0), CFG_PRIO_IDLE);
        assert_eq!(highest_priority_tag(0), 0);
    }
}

#[cfg(test)]
mod ring_buffer_tests {
    use bitmap_rtos::sync::ring_buffer::RingBuffer;

    #[test]
    fn test_fifo_across_wrap() {
        let mut rb: RingBuffer<u32, 3> = RingBuffer::new();

        for round in 0..5u32 {
            assert!(rb.push_back(round * 2));
            assert!(rb.push_back(round * 2 + 1));
            assert_eq!(rb.pop_front(), Some(round * 2));
            assert_eq!(rb.pop_front(), Some(round * 2 + 1));
        }
        assert!(rb.is_empty());
    }

    #[test]
    fn test_capacity_limits() {
        let mut rb: RingBuffer<u8, 2> = RingBuffer::new();
        assert_eq!(rb.capacity(), 2);
        assert!(rb.push_back(1));
        assert!(rb.push_front(0));
        assert!(!rb.push_back(2));
        assert!(!rb.push_front(3));
        assert_eq!(rb.len(), 2);
        assert_eq!(rb.free(), 0);
    }
}

#[cfg(test)]
mod config_tests {
    use bitmap_rtos::config::*;
    use bitmap_rtos::types::OsProcessMap;

    #[test]
    fn test_config_values() {
        assert_eq!(CFG_PRIO_COUNT, CFG_PROCESS_COUNT + 1);
        assert_eq!(CFG_PRIO_IDLE as usize, CFG_PRIO_COUNT - 1);
        assert!(CFG_PRIO_COUNT <= OsProcessMap::BITS as usize);
        assert!(CFG_TICK_RATE_HZ > 0);
        assert_eq!(CFG_SYSTICK_CLOCK_HZ % CFG_TICK_RATE_HZ, 0);
        assert!(CFG_IDLE_STK_SIZE >= CFG_STK_SIZE_MIN);
    }
}

#[cfg(test)]
mod error_tests {
    use bitmap_rtos::error::OsError;

    #[test]
    fn test_error_codes() {
        assert_eq!(OsError::OsRunning.code(), 24202);
        assert_eq!(OsError::OsNotInit.code(), 24203);
        assert_eq!(OsError::OsNoAppTask.code(), 24204);
        assert_eq!(OsError::PrioInvalid.code(), 25203);
        assert_eq!(OsError::StkInvalid.code(), 28207);
        assert_eq!(OsError::StkSizeInvalid.code(), 28208);
    }
}

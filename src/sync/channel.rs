//! Channel
//!
//! Bounded FIFO between processes. Producers block while the channel is full,
//! consumers while it is empty. Single-element transfers wake one process on
//! the other side; block transfers wake all of them.

use crate::critical::{critical_section, CriticalSection};
use crate::kernel;
use crate::os::cs_cell::CsCell;
use crate::sync::ring_buffer::RingBuffer;
use crate::sync::service::WaitMap;
use crate::types::OsTick;

/// Bounded channel of up to `N` elements
pub struct Channel<T: Copy, const N: usize> {
    producers: WaitMap,
    consumers: WaitMap,
    pool: CsCell<RingBuffer<T, N>>,
}

impl<T: Copy, const N: usize> Channel<T, N> {
    pub const fn new() -> Self {
        Channel {
            producers: WaitMap::new(),
            consumers: WaitMap::new(),
            pool: CsCell::new(RingBuffer::new()),
        }
    }

    /// Append `item`, blocking while the channel is full
    pub fn push(&self, item: T) {
        critical_section(|cs| {
            self.wait_free(cs, 1);
            self.pool.get(cs).push_back(item);
            self.consumers.resume_next_ready(cs);
        });
    }

    /// Insert `item` at the head, blocking while the channel is full
    pub fn push_front(&self, item: T) {
        critical_section(|cs| {
            self.wait_free(cs, 1);
            self.pool.get(cs).push_front(item);
            self.consumers.resume_next_ready(cs);
        });
    }

    /// Take the oldest element, waiting up to `timeout` ticks (0 = forever)
    pub fn pop(&self, timeout: OsTick) -> Option<T> {
        critical_section(|cs| {
            if !self.wait_count(cs, 1, timeout) {
                return None;
            }
            let item = self.pool.get(cs).pop_front();
            self.producers.resume_next_ready(cs);
            item
        })
    }

    /// Take the newest element, waiting up to `timeout` ticks (0 = forever)
    pub fn pop_back(&self, timeout: OsTick) -> Option<T> {
        critical_section(|cs| {
            if !self.wait_count(cs, 1, timeout) {
                return None;
            }
            let item = self.pool.get(cs).pop_back();
            self.producers.resume_next_ready(cs);
            item
        })
    }

    /// Append all of `items` at once, blocking until there is room for all
    ///
    /// # Returns
    /// `false` without writing anything if `items` is longer than the
    /// channel capacity
    pub fn write(&self, items: &[T]) -> bool {
        if items.len() > N {
            return false;
        }

        critical_section(|cs| {
            self.wait_free(cs, items.len());
            self.pool.get(cs).write(items);
            self.consumers.resume_all(cs);
        });
        true
    }

    /// Fill all of `out` at once, waiting up to `timeout` ticks (0 = forever)
    ///
    /// # Returns
    /// `true` if `out` was filled. On timeout, or if `out` is longer than the
    /// channel capacity, nothing is read.
    pub fn read(&self, out: &mut [T], timeout: OsTick) -> bool {
        if out.len() > N {
            return false;
        }

        critical_section(|cs| {
            if !self.wait_count(cs, out.len(), timeout) {
                return false;
            }
            self.pool.get(cs).read(out);
            self.producers.resume_all(cs);
            true
        })
    }

    /// Append as many of `items` as fit, from an interrupt handler
    ///
    /// # Returns
    /// The number of elements written
    pub fn write_isr(&self, items: &[T]) -> usize {
        critical_section(|cs| {
            let n = self.pool.get(cs).write(items);
            if n > 0 {
                self.consumers.resume_all_isr(cs);
            }
            n
        })
    }

    /// Read as many elements into `out` as are available, from an interrupt
    /// handler
    ///
    /// # Returns
    /// The number of elements read
    pub fn read_isr(&self, out: &mut [T]) -> usize {
        critical_section(|cs| {
            let n = self.pool.get(cs).read(out);
            if n > 0 {
                self.producers.resume_all_isr(cs);
            }
            n
        })
    }

    /// Number of buffered elements
    pub fn count(&self) -> usize {
        critical_section(|cs| self.pool.get(cs).len())
    }

    /// Free slots
    pub fn free_size(&self) -> usize {
        critical_section(|cs| self.pool.get(cs).free())
    }

    /// Drop every buffered element and wake blocked producers
    pub fn flush(&self) {
        critical_section(|cs| {
            self.pool.get(cs).clear();
            self.producers.resume_all(cs);
        });
    }

    /// Block on the producer side until `n` slots are free
    fn wait_free(&self, cs: &CriticalSection, n: usize) {
        while self.pool.get(cs).free() < n {
            self.producers.wait_for(cs, 0);
        }
    }

    /// Block on the consumer side until `n` elements are buffered
    ///
    /// The timeout spans every retry. Returns `false` once it expires.
    fn wait_count(&self, cs: &CriticalSection, n: usize, timeout: OsTick) -> bool {
        if self.pool.get(cs).len() >= n {
            return true;
        }

        kernel::set_cur_timeout(cs, timeout);
        loop {
            self.consumers.suspend(cs);
            if self.consumers.is_timed_out(cs) {
                return false;
            }

            if self.pool.get(cs).len() >= n {
                kernel::set_cur_timeout(cs, 0);
                return true;
            }

            // Resumed, but another process got there first and the timeout ran out meanwhile
            if timeout != 0 && kernel::cur_timeout(cs) == 0 {
                return false;
            }
        }
    }
}

impl<T: Copy, const N: usize> Default for Channel<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::os_process_start;
    use crate::testing::{finish, tick, EventLog, Scenario};
    use crate::IsrGuard;

    #[test]
    fn test_full_channel_blocks_producer_until_pop() {
        static CH: Channel<u32, 2> = Channel::new();
        static LOG: EventLog = EventLog::new();

        fn producer() -> ! {
            for v in [10, 20, 30] {
                CH.push(v);
                LOG.record(format!("pushed {v}"));
            }
            finish()
        }

        fn consumer() -> ! {
            for _ in 0..3 {
                let v = CH.pop(0);
                LOG.record(format!("popped {v:?}"));
            }
            finish()
        }

        let s = Scenario::new();
        s.spawn("producer", 1, producer).spawn("consumer", 2, consumer);
        s.run();

        assert_eq!(
            LOG.take(),
            [
                "pushed 10",
                "pushed 20",
                "pushed 30",
                "popped Some(10)",
                "popped Some(20)",
                "popped Some(30)",
            ]
        );
        assert_eq!(CH.count(), 0);
        assert_eq!(CH.free_size(), 2);
    }

    #[test]
    fn test_pop_wakes_blocked_consumer_in_fifo_order() {
        static CH: Channel<u8, 4> = Channel::new();
        static LOG: EventLog = EventLog::new();

        fn consumer() -> ! {
            loop {
                match CH.pop(0) {
                    Some(v) => LOG.record(format!("popped {v}")),
                    None => LOG.record("woken empty"),
                }
            }
        }

        fn producer() -> ! {
            for v in 1..=3 {
                LOG.record(format!("push {v}"));
                CH.push(v);
            }
            finish()
        }

        let s = Scenario::new();
        s.spawn("consumer", 1, consumer).spawn("producer", 2, producer);
        s.run();

        assert_eq!(
            LOG.take(),
            ["push 1", "popped 1", "push 2", "popped 2", "push 3", "popped 3"]
        );
    }

    #[test]
    fn test_double_ended_access() {
        static CH: Channel<char, 4> = Channel::new();
        static LOG: EventLog = EventLog::new();

        fn worker() -> ! {
            CH.push('b');
            CH.push('c');
            CH.push_front('a');
            LOG.record(format!("{:?}", CH.pop_back(0)));
            LOG.record(format!("{:?}", CH.pop(0)));
            LOG.record(format!("{:?}", CH.pop(0)));
            LOG.record(format!("{:?}", CH.pop_back(1)));
            finish()
        }

        fn ticker() -> ! {
            tick(1);
            finish()
        }

        let s = Scenario::new();
        s.spawn("worker", 1, worker).spawn("ticker", 2, ticker);
        s.run();

        assert_eq!(LOG.take(), ["Some('c')", "Some('a')", "Some('b')", "None"]);
    }

    #[test]
    fn test_block_transfers_are_all_or_nothing() {
        static CH: Channel<u16, 5> = Channel::new();
        static LOG: EventLog = EventLog::new();

        fn reader() -> ! {
            let mut block = [0u16; 3];
            let ok = CH.read(&mut block, 0);
            LOG.record(format!("read {ok} {block:?}"));

            let mut block = [0u16; 4];
            let ok = CH.read(&mut block, 2);
            LOG.record(format!("short read {ok} {block:?} left {}", CH.count()));
            finish()
        }

        fn writer() -> ! {
            CH.write(&[1, 2]);
            LOG.record("wrote 2");
            CH.write(&[3, 4, 5]);
            LOG.record("wrote 3");
            tick(2);
            finish()
        }

        let s = Scenario::new();
        s.spawn("reader", 1, reader).spawn("writer", 2, writer);
        s.run();

        assert_eq!(
            LOG.take(),
            [
                "wrote 2",
                "read true [1, 2, 3]",
                "wrote 3",
                "short read false [0, 0, 0, 0] left 2",
            ]
        );
    }

    #[test]
    fn test_write_blocks_until_whole_block_fits() {
        static CH: Channel<u8, 3> = Channel::new();
        static LOG: EventLog = EventLog::new();

        fn writer() -> ! {
            CH.write(&[1, 2]);
            LOG.record("first block");
            CH.write(&[3, 4]);
            LOG.record("second block");
            finish()
        }

        fn reader() -> ! {
            LOG.record("popping");
            LOG.record(format!("pop {:?}", CH.pop(0)));
            finish()
        }

        let s = Scenario::new();
        s.spawn("writer", 1, writer).spawn("reader", 2, reader);
        s.run();

        assert_eq!(LOG.take(), ["first block", "popping", "second block", "pop Some(1)"]);
        assert_eq!(CH.count(), 3);
    }

    #[test]
    fn test_isr_transfers_are_partial_and_defer_the_switch() {
        static CH: Channel<u8, 3> = Channel::new();
        static LOG: EventLog = EventLog::new();

        fn consumer() -> ! {
            loop {
                let v = CH.pop(0);
                LOG.record(format!("consumer {v:?}"));
            }
        }

        fn interrupted() -> ! {
            {
                let _isr = IsrGuard::enter();
                let n = CH.write_isr(&[7, 8, 9, 10, 11]);
                LOG.record(format!("handler wrote {n}"));
            }

            {
                let _isr = IsrGuard::enter();
                let mut out = [0u8; 4];
                let n = CH.read_isr(&mut out);
                LOG.record(format!("handler read {n} {out:?}"));
            }
            finish()
        }

        let s = Scenario::new();
        s.spawn("consumer", 1, consumer).spawn("interrupted", 3, interrupted);
        s.run();

        assert_eq!(
            LOG.take(),
            [
                "handler wrote 3",
                "consumer Some(7)",
                "consumer Some(8)",
                "consumer Some(9)",
                "handler read 0 [0, 0, 0, 0]",
            ]
        );
    }

    #[test]
    fn test_flush_releases_producers() {
        static CH: Channel<u8, 1> = Channel::new();
        static LOG: EventLog = EventLog::new();

        fn producer() -> ! {
            CH.push(1);
            CH.push(2);
            LOG.record(format!("second push done, count {}", CH.count()));
            finish()
        }

        fn flusher() -> ! {
            LOG.record(format!("flushing {}", CH.count()));
            CH.flush();
            LOG.record(format!("flushed, count {}", CH.count()));
            finish()
        }

        let s = Scenario::new();
        s.spawn("producer", 1, producer).spawn("flusher", 2, flusher);
        s.run();

        assert_eq!(
            LOG.take(),
            ["flushing 1", "second push done, count 1", "flushed, count 1"]
        );
    }

    #[test]
    fn test_pop_timeout_survives_losing_the_race() {
        static CH: Channel<u8, 2> = Channel::new();
        static LOG: EventLog = EventLog::new();

        fn producer() -> ! {
            tick(1);
            CH.push(5);
            tick(1);
            os_process_start(2);
            tick(10);
            LOG.record("producer done");
            finish()
        }

        fn thief() -> ! {
            LOG.record(format!("thief got {:?}", CH.pop(0)));
            finish()
        }

        fn slow() -> ! {
            LOG.record(format!("slow got {:?}", CH.pop(2)));
            finish()
        }

        fn driver() -> ! {
            os_process_start(1);
            finish()
        }

        let s = Scenario::new();
        s.spawn_suspended("producer", 1, producer)
            .spawn_suspended("thief", 2, thief)
            .spawn("slow", 3, slow)
            .spawn("driver", 4, driver);
        s.run();

        assert_eq!(LOG.take(), ["producer done", "thief got Some(5)", "slow got None"]);
    }

    #[test]
    fn test_oversized_blocks_are_rejected() {
        static CH: Channel<u8, 2> = Channel::new();
        static LOG: EventLog = EventLog::new();

        fn worker() -> ! {
            LOG.record(format!("write {}", CH.write(&[1, 2, 3])));
            LOG.record(format!("count {}", CH.count()));
            LOG.record(format!("write {}", CH.write(&[1, 2])));

            let mut out = [0u8; 3];
            LOG.record(format!("read {} {out:?}", CH.read(&mut out, 0)));
            LOG.record(format!("count {}", CH.count()));
            finish()
        }

        let s = Scenario::new();
        s.spawn("worker", 1, worker);
        s.run();

        assert_eq!(
            LOG.take(),
            ["write false", "count 0", "write true", "read false [0, 0, 0]", "count 2"]
        );
    }
}

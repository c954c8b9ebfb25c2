//! Lock-Free Telemetry Queue
//!
//! ## Overview
//!
//! Bounded single-producer multi-consumer ring carrying
//! [`TelemetryEvent`]s from the decision loop to display and forensic
//! consumers on other threads (or interrupt contexts on embedded
//! targets). The loop is the sole producer; any number of consumers may
//! pop concurrently.
//!
//! Telemetry is best-effort by contract, and the queue enforces it
//! structurally:
//!
//! - `push` never blocks: when the ring is full the incoming event is
//!   dropped and counted, and the loop moves on;
//! - `pop` never blocks: contended consumers retry a compare-exchange;
//! - no allocation, no locks, just two atomic indices over a fixed
//!   buffer.
//!
//! Capacity must be a power of two so index wrap-around compiles to a
//! bit mask. One slot is sacrificed to distinguish full from empty, so a
//! queue of `N` holds `N - 1` events.
#![allow(unsafe_code)] // Lock-free ring: atomic indices over uninitialized slots

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::ptr;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::telemetry::TelemetryEvent;

/// Counters describing queue traffic since construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TelemetryStats {
    /// Events accepted by `push`
    pub published: u32,
    /// Events handed out by `pop`
    pub consumed: u32,
    /// Events dropped because the ring was full
    pub dropped: u32,
    /// High-water mark of queue depth
    pub max_depth: u32,
}

/// Bounded lock-free SPMC ring of telemetry events
///
/// `N` must be a power of two.
pub struct TelemetryQueue<const N: usize> {
    buffer: UnsafeCell<[MaybeUninit<TelemetryEvent>; N]>,
    /// Next write slot, owned by the single producer
    head: AtomicUsize,
    /// Next read slot, contended by consumers
    tail: AtomicUsize,
    published: AtomicU32,
    consumed: AtomicU32,
    dropped: AtomicU32,
    max_depth: AtomicU32,
}

// One producer, many consumers; slot handoff is ordered by the
// acquire/release pair on head and tail.
unsafe impl<const N: usize> Send for TelemetryQueue<N> {}
unsafe impl<const N: usize> Sync for TelemetryQueue<N> {}

impl<const N: usize> TelemetryQueue<N> {
    /// Creates an empty queue; const, usable in statics
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "queue capacity must be a power of two");
        Self {
            // Uninitialized slots are fine: head/tail discipline means a
            // slot is only read after it was written
            buffer: UnsafeCell::new(unsafe { MaybeUninit::uninit().assume_init() }),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            published: AtomicU32::new(0),
            consumed: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_depth: AtomicU32::new(0),
        }
    }

    /// Appends an event; returns false (and counts a drop) when full
    ///
    /// Single producer only: the decision loop.
    pub fn push(&self, event: TelemetryEvent) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        let next_head = (head + 1) & (N - 1);

        if next_head == tail {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        unsafe {
            (*self.buffer.get())[head].write(event);
        }
        self.head.store(next_head, Ordering::Release);

        self.published.fetch_add(1, Ordering::Relaxed);
        self.update_max_depth(((next_head + N - tail) & (N - 1)) as u32);
        true
    }

    /// Removes the oldest event; `None` when empty
    ///
    /// Safe from any number of consumer threads.
    pub fn pop(&self) -> Option<TelemetryEvent> {
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let head = self.head.load(Ordering::Acquire);

            if tail == head {
                return None;
            }

            let next_tail = (tail + 1) & (N - 1);
            match self
                .tail
                .compare_exchange_weak(tail, next_tail, Ordering::Release, Ordering::Acquire)
            {
                Ok(_) => {
                    // This consumer won the slot; the producer cannot
                    // reuse it until tail has advanced past it again
                    let event = unsafe { ptr::read((*self.buffer.get())[tail].as_ptr()) };
                    self.consumed.fetch_add(1, Ordering::Relaxed);
                    return Some(event);
                }
                Err(_) => core::hint::spin_loop(),
            }
        }
    }

    /// Events currently queued
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + N - tail) & (N - 1)
    }

    /// True when no events are queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the next push would drop
    pub fn is_full(&self) -> bool {
        self.len() == N - 1
    }

    /// Usable capacity (one slot is reserved)
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Traffic counters snapshot
    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            published: self.published.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            max_depth: self.max_depth.load(Ordering::Relaxed),
        }
    }

    /// Consuming iterator over currently queued events
    pub fn drain(&self) -> TelemetryDrain<'_, N> {
        TelemetryDrain { queue: self }
    }

    /// Discards all queued events
    ///
    /// # Safety
    ///
    /// Callers must guarantee no concurrent producer or consumer while
    /// clearing; the indices are rewritten without slot handoff.
    pub unsafe fn clear(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }

    fn update_max_depth(&self, depth: u32) {
        let mut current = self.max_depth.load(Ordering::Relaxed);
        while depth > current {
            match self.max_depth.compare_exchange_weak(
                current,
                depth,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }
}

impl<const N: usize> Default for TelemetryQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared queue reference serves directly as the pipeline's sink;
/// drop-on-full keeps `record` infallible
impl<const N: usize> crate::telemetry::TelemetrySink for &TelemetryQueue<N> {
    fn record(&mut self, event: &TelemetryEvent) {
        self.push(event.clone());
    }
}

/// Iterator driving [`TelemetryQueue::pop`] until empty
pub struct TelemetryDrain<'a, const N: usize> {
    queue: &'a TelemetryQueue<N>,
}

impl<const N: usize> Iterator for TelemetryDrain<'_, N> {
    type Item = TelemetryEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FallbackState;

    fn epoch_event(timestamp: u64) -> TelemetryEvent {
        TelemetryEvent::Epoch {
            timestamp,
            state: FallbackState::Normal,
            trusted: true,
        }
    }

    #[test]
    fn fifo_order() {
        let queue: TelemetryQueue<8> = TelemetryQueue::new();
        assert!(queue.is_empty());

        for ts in 0..3u64 {
            assert!(queue.push(epoch_event(ts)));
        }
        assert_eq!(queue.len(), 3);

        for ts in 0..3u64 {
            assert_eq!(queue.pop().unwrap().timestamp(), ts);
        }
        assert!(queue.pop().is_none());
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let queue: TelemetryQueue<4> = TelemetryQueue::new();

        // Usable capacity is 3
        assert!(queue.push(epoch_event(0)));
        assert!(queue.push(epoch_event(1)));
        assert!(queue.push(epoch_event(2)));
        assert!(queue.is_full());
        assert!(!queue.push(epoch_event(3)));

        let stats = queue.stats();
        assert_eq!(stats.published, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.max_depth, 3);

        // Oldest events survive a drop
        assert_eq!(queue.pop().unwrap().timestamp(), 0);
    }

    #[test]
    fn drain_empties_the_queue() {
        let queue: TelemetryQueue<8> = TelemetryQueue::new();
        for ts in 0..5u64 {
            queue.push(epoch_event(ts));
        }

        let drained: usize = queue.drain().count();
        assert_eq!(drained, 5);
        assert!(queue.is_empty());
        assert_eq!(queue.stats().consumed, 5);
    }

    #[test]
    fn wraparound_keeps_order() {
        let queue: TelemetryQueue<4> = TelemetryQueue::new();
        for round in 0..10u64 {
            assert!(queue.push(epoch_event(round)));
            assert_eq!(queue.pop().unwrap().timestamp(), round);
        }
        assert_eq!(queue.stats().published, 10);
        assert_eq!(queue.stats().consumed, 10);
    }

    #[test]
    fn queue_reference_acts_as_a_sink() {
        use crate::telemetry::TelemetrySink;

        static QUEUE: TelemetryQueue<8> = TelemetryQueue::new();
        let mut sink = &QUEUE;
        sink.record(&epoch_event(1_000));
        sink.record(&epoch_event(2_000));

        assert_eq!(QUEUE.pop().unwrap().timestamp(), 1_000);
        assert_eq!(QUEUE.pop().unwrap().timestamp(), 2_000);
    }

    #[test]
    fn concurrent_consumers_split_the_events() {
        use std::sync::Arc;

        let queue = Arc::new(TelemetryQueue::<64>::new());
        for ts in 0..50u64 {
            queue.push(epoch_event(ts));
        }

        let mut handles = std::vec::Vec::new();
        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                let mut seen = 0u32;
                while queue.pop().is_some() {
                    seen += 1;
                }
                seen
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
        assert!(queue.is_empty());
    }
}

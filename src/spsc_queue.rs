use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A bounded lock-free ring buffer for exactly one producer and one consumer.
///
/// Capacity is rounded up to the next power of two so index wrapping can use
/// a bitmask instead of a modulo. `push`/`pop` never block: they report
/// failure immediately if the queue is full or empty.
///
/// Safety contract: exactly one thread may call `push`, and exactly one
/// thread (possibly a different one) may call `pop`. Calling either method
/// from more than one thread concurrently is undefined behavior even though
/// the type is `Send`.
pub struct SpscQueue<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
}

unsafe impl<T: Send> Send for SpscQueue<T> {}
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    /// Creates a queue that can hold at least `capacity` elements. `capacity`
    /// is rounded up to the next power of two (minimum 2).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two().max(2);
        let mut buffer = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            buffer.push(UnsafeCell::new(MaybeUninit::uninit()));
        }
        Self {
            buffer: buffer.into_boxed_slice(),
            mask: capacity - 1,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Attempts to push `value` onto the queue. Returns `false` without
    /// touching `value`'s ownership semantics (it is dropped on failure,
    /// matching `Vec::push`-style move semantics) if the queue is full.
    pub fn push(&self, value: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail.wrapping_sub(head) >= self.capacity() {
            return false;
        }

        let slot = &self.buffer[tail & self.mask];
        unsafe {
            (*slot.get()).write(value);
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Attempts to pop the oldest value. Returns `None` if the queue is
    /// empty.
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let slot = &self.buffer[head & self.mask];
        let value = unsafe { (*slot.get()).assume_init_read() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Approximate occupancy. May be stale by one slot under concurrent
    /// access; intended for monitoring, not synchronization.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for SpscQueue<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn rounds_capacity_up_to_power_of_two() {
        let q: SpscQueue<u32> = SpscQueue::new(5);
        assert_eq!(q.capacity(), 8);
    }

    #[test]
    fn push_pop_roundtrip() {
        let q = SpscQueue::new(4);
        assert!(q.push(1));
        assert!(q.push(2));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn push_fails_at_capacity_then_succeeds_after_pop() {
        let q = SpscQueue::new(2);
        assert!(q.push(1));
        assert!(q.push(2));
        assert!(!q.push(3));
        assert_eq!(q.pop(), Some(1));
        assert!(q.push(3));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
    }

    #[test]
    fn len_tracks_occupancy() {
        let q = SpscQueue::new(4);
        assert_eq!(q.len(), 0);
        q.push(1);
        q.push(2);
        assert_eq!(q.len(), 2);
        q.pop();
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn concurrent_producer_consumer_delivers_all_values() {
        let q = Arc::new(SpscQueue::new(16));
        let producer_q = q.clone();
        let producer = thread::spawn(move || {
            for i in 0..10_000u64 {
                while !producer_q.push(i) {
                    thread::yield_now();
                }
            }
        });

        let mut received = Vec::with_capacity(10_000);
        while received.len() < 10_000 {
            if let Some(v) = q.pop() {
                received.push(v);
            } else {
                thread::yield_now();
            }
        }
        producer.join().unwrap();

        for (i, v) in received.iter().enumerate() {
            assert_eq!(*v, i as u64);
        }
    }

    #[test]
    fn drop_releases_unpopped_values() {
        use std::sync::atomic::AtomicUsize as Counter;
        static DROPPED: Counter = Counter::new(0);
        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPPED.fetch_add(1, Ordering::SeqCst);
            }
        }

        let q = SpscQueue::new(4);
        q.push(Tracked);
        q.push(Tracked);
        drop(q);
        assert_eq!(DROPPED.load(Ordering::SeqCst), 2);
    }
}

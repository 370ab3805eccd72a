//! Process-wide pool of growable byte buffers
//!
//! Buffers are bucketed by power-of-two capacity and recycled through
//! lock-free per-bucket free lists. The pool calibrates itself from its own
//! traffic: every [`CALIBRATION_INTERVAL`] acquisitions it recomputes the
//! default capacity (the most-acquired bucket) and the maximum retained
//! capacity (the 95th percentile of the cumulative acquire distribution).
//! Buffers larger than the retained maximum are dropped on release instead
//! of being pooled.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

use bytes::BytesMut;
use crossbeam_queue::ArrayQueue;

/// Smallest bucket capacity in bytes
const MIN_CAPACITY: usize = 64;

/// Number of power-of-two buckets, 64 B through 64 KiB
const BUCKET_COUNT: usize = 11;

/// Free-list depth per bucket; overflow is dropped
const FREE_LIST_DEPTH: usize = 32;

/// Acquisitions between recalibrations
const CALIBRATION_INTERVAL: u64 = 1024;

/// Cumulative percentile that bounds the retained capacity
const RETAIN_PERCENTILE: u64 = 95;

/// Smallest bucket whose capacity holds `capacity` bytes
fn bucket_index(capacity: usize) -> usize {
    let c = capacity.max(MIN_CAPACITY);
    let idx = (usize::BITS - (c - 1).leading_zeros()) as usize - MIN_CAPACITY.trailing_zeros() as usize;
    idx.min(BUCKET_COUNT - 1)
}

/// Largest bucket whose capacity fits inside `capacity` bytes
fn floor_index(capacity: usize) -> usize {
    debug_assert!(capacity >= MIN_CAPACITY);
    let idx = (usize::BITS - 1 - capacity.leading_zeros()) as usize
        - MIN_CAPACITY.trailing_zeros() as usize;
    idx.min(BUCKET_COUNT - 1)
}

/// Capacity of the bucket at `index`
fn bucket_capacity(index: usize) -> usize {
    MIN_CAPACITY << index
}

#[derive(Debug)]
struct Bucket {
    free: ArrayQueue<BytesMut>,
    acquires: AtomicU64,
}

impl Bucket {
    fn new() -> Self {
        Self {
            free: ArrayQueue::new(FREE_LIST_DEPTH),
            acquires: AtomicU64::new(0),
        }
    }
}

/// A size-bucketed pool of growable byte buffers with an adaptive
/// calibration policy.
///
/// Statistics use atomic counters and storage uses lock-free queues, so the
/// pool may be shared freely between threads. Most callers want the
/// process-wide instance behind [`acquire`].
#[derive(Debug)]
pub struct BufferPool {
    buckets: Vec<Bucket>,
    default_capacity: AtomicUsize,
    max_retained: AtomicUsize,
    acquires: AtomicU64,
}

impl BufferPool {
    /// Creates an empty pool.
    ///
    /// Until the first calibration the default capacity is the smallest
    /// bucket and every bucket size is retained.
    pub fn new() -> Self {
        Self {
            buckets: (0..BUCKET_COUNT).map(|_| Bucket::new()).collect(),
            default_capacity: AtomicUsize::new(MIN_CAPACITY),
            max_retained: AtomicUsize::new(bucket_capacity(BUCKET_COUNT - 1)),
            acquires: AtomicU64::new(0),
        }
    }

    /// The process-wide pool
    pub fn global() -> &'static BufferPool {
        static POOL: OnceLock<BufferPool> = OnceLock::new();
        POOL.get_or_init(BufferPool::new)
    }

    /// Takes an empty buffer with at least `min_capacity` bytes of capacity
    pub fn acquire(&'static self, min_capacity: usize) -> PooledBuffer {
        let want = min_capacity.max(self.default_capacity.load(Ordering::Relaxed));
        let index = bucket_index(want);
        self.buckets[index].acquires.fetch_add(1, Ordering::Relaxed);

        let total = self.acquires.fetch_add(1, Ordering::Relaxed) + 1;
        if total % CALIBRATION_INTERVAL == 0 {
            self.recalibrate();
        }

        let mut buf = match self.buckets[index].free.pop() {
            Some(buf) => buf,
            None => BytesMut::with_capacity(bucket_capacity(index)),
        };
        if buf.capacity() < min_capacity {
            buf.reserve(min_capacity - buf.capacity());
        }
        PooledBuffer {
            buf: Some(buf),
            pool: self,
        }
    }

    /// Returns a buffer to the pool, or drops it when it exceeds the
    /// retained maximum
    fn release(&self, mut buf: BytesMut) {
        if buf.capacity() < MIN_CAPACITY || buf.capacity() > self.max_retained.load(Ordering::Relaxed)
        {
            return;
        }
        buf.clear();
        // Park in the largest bucket whose capacity the buffer satisfies,
        // so an acquire from that bucket never gets a short buffer.
        let index = floor_index(buf.capacity());
        let _ = self.buckets[index].free.push(buf);
    }

    /// Recomputes the default and retained capacities from the acquire
    /// distribution observed so far
    fn recalibrate(&self) {
        let counts: Vec<u64> = self
            .buckets
            .iter()
            .map(|b| b.acquires.load(Ordering::Relaxed))
            .collect();
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return;
        }

        let busiest = counts
            .iter()
            .enumerate()
            .max_by_key(|(_, c)| **c)
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.default_capacity
            .store(bucket_capacity(busiest), Ordering::Relaxed);

        let threshold = (total * RETAIN_PERCENTILE).div_ceil(100).max(1);
        let mut cumulative = 0u64;
        let mut retain = BUCKET_COUNT - 1;
        for (i, count) in counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= threshold {
                retain = i;
                break;
            }
        }
        self.max_retained
            .store(bucket_capacity(retain), Ordering::Relaxed);

        tracing::debug!(
            default_capacity = bucket_capacity(busiest),
            max_retained = bucket_capacity(retain),
            acquires = total,
            "recalibrated buffer pool"
        );
    }

    /// The capacity handed out when the caller does not ask for more
    pub fn default_capacity(&self) -> usize {
        self.default_capacity.load(Ordering::Relaxed)
    }

    /// The largest buffer capacity the pool will keep on release
    pub fn max_retained(&self) -> usize {
        self.max_retained.load(Ordering::Relaxed)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Takes an empty buffer from the process-wide pool
pub fn acquire(min_capacity: usize) -> PooledBuffer {
    BufferPool::global().acquire(min_capacity)
}

/// A buffer on loan from a [`BufferPool`]; returned on drop
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<BytesMut>,
    pool: &'static BufferPool,
}

impl PooledBuffer {
    /// Detaches the buffer from the pool; it will not be recycled
    pub fn detach(mut self) -> BytesMut {
        self.buf.take().expect("buffer already detached")
    }
}

impl Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &Self::Target {
        self.buf.as_ref().expect("buffer already detached")
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf.as_mut().expect("buffer already detached")
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        bucket_capacity, bucket_index, floor_index, BufferPool, BUCKET_COUNT, CALIBRATION_INTERVAL,
        MIN_CAPACITY,
    };

    fn leaked() -> &'static BufferPool {
        Box::leak(Box::new(BufferPool::new()))
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(1), 0);
        assert_eq!(bucket_index(64), 0);
        assert_eq!(bucket_index(65), 1);
        assert_eq!(bucket_index(128), 1);
        assert_eq!(bucket_index(64 * 1024), BUCKET_COUNT - 1);
        assert_eq!(bucket_index(usize::MAX / 2), BUCKET_COUNT - 1);
    }

    #[test]
    fn test_floor_index() {
        assert_eq!(floor_index(64), 0);
        assert_eq!(floor_index(96), 0);
        assert_eq!(floor_index(128), 1);
        assert_eq!(floor_index(1 << 30), BUCKET_COUNT - 1);
    }

    #[test]
    fn test_acquire_capacity() {
        let pool = leaked();
        let buf = pool.acquire(100);
        assert!(buf.capacity() >= 100);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_release_and_reuse() {
        let pool = leaked();
        let mut buf = pool.acquire(MIN_CAPACITY);
        buf.extend_from_slice(b"scratch");
        drop(buf);

        let buf = pool.acquire(MIN_CAPACITY);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_calibration_follows_traffic() {
        let pool = leaked();
        // Hammer the 4 KiB bucket until a calibration happens.
        for _ in 0..CALIBRATION_INTERVAL {
            let _ = pool.acquire(4000);
        }
        assert_eq!(pool.default_capacity(), bucket_capacity(bucket_index(4000)));
        // 100% of traffic hit one bucket, so nothing larger is retained.
        assert_eq!(pool.max_retained(), bucket_capacity(bucket_index(4000)));
    }

    #[test]
    fn test_oversized_release_is_dropped() {
        let pool = leaked();
        for _ in 0..CALIBRATION_INTERVAL {
            let _ = pool.acquire(MIN_CAPACITY);
        }
        assert_eq!(pool.max_retained(), MIN_CAPACITY);

        // A large buffer must not be parked in any free list now.
        let big = pool.acquire(32 * 1024);
        drop(big);
        for bucket in &pool.buckets {
            assert!(bucket.free.pop().map_or(true, |b| b.capacity() <= MIN_CAPACITY));
        }
    }
}

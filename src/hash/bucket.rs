//! Logical buckets during seed hashing (§3 "Bucket", §5 "Shared state").
//!
//! Each bucket starts as 8 physical slots but grows ("virtual buckets",
//! §9 design note) while hits accumulate; growth is resolved back down to
//! physical slots by the Chain/Probe Resolver and Slot Packer. Concurrent
//! appends from the Seed Hasher's worker threads are serialized by a
//! one-byte CAS spin-lock per bucket rather than a `Mutex`, matching the
//! resource model's explicit "CAS 0→1 acquire, release by
//! clear-with-memory-fence" contract — a real mutex would be needlessly
//! heavyweight for a critical section that is only a `Vec::push`.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};

use super::record::HashRecord;

const UNLOCKED: u8 = 0;
const LOCKED: u8 = 1;

/// One growable logical bucket, safe to share behind `&BucketSlot` across
/// threads: all mutation goes through `with_locked`.
pub struct BucketSlot {
    lock: AtomicU8,
    records: UnsafeCell<Vec<HashRecord>>,
}

// SAFETY: all access to `records` is gated by the CAS spin-lock in `lock`;
// no two threads ever observe the `UnsafeCell` contents simultaneously.
unsafe impl Sync for BucketSlot {}

impl BucketSlot {
    pub fn new() -> Self {
        BucketSlot {
            lock: AtomicU8::new(UNLOCKED),
            records: UnsafeCell::new(Vec::new()),
        }
    }

    fn acquire(&self) {
        while self
            .lock
            .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    fn release(&self) {
        self.lock.store(UNLOCKED, Ordering::Release);
    }

    /// Run `f` with exclusive access to this bucket's record vector.
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut Vec<HashRecord>) -> R) -> R {
        self.acquire();
        // SAFETY: protected by the spin-lock acquired above.
        let result = f(unsafe { &mut *self.records.get() });
        self.release();
        result
    }

    /// Non-locking snapshot read, valid once all hashing workers have
    /// finished (used by every phase after the Seed Hasher).
    pub fn records(&self) -> &[HashRecord] {
        unsafe { &*self.records.get() }
    }

    pub fn into_records(self) -> Vec<HashRecord> {
        self.records.into_inner()
    }
}

impl Default for BucketSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// A chunk's worth of buckets, addressed by bucket index.
pub struct BucketTable {
    buckets: Vec<BucketSlot>,
}

impl BucketTable {
    pub fn new(num_buckets: usize) -> Self {
        let mut buckets = Vec::with_capacity(num_buckets);
        buckets.resize_with(num_buckets, BucketSlot::new);
        BucketTable { buckets }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, index: usize) -> &BucketSlot {
        &self.buckets[index]
    }

    pub fn into_vecs(self) -> Vec<Vec<HashRecord>> {
        self.buckets.into_iter().map(BucketSlot::into_records).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::record::Hit;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_appends_are_not_lost() {
        let table = Arc::new(BucketTable::new(1));
        let mut handles = Vec::new();
        for t in 0..8u8 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                for i in 0..100u32 {
                    table.get(0).with_locked(|records| {
                        records.push(HashRecord::Hit(Hit {
                            seed_index: i,
                            rc: false,
                            last_of_thread: false,
                            extended: false,
                            hash_bits: 0,
                            thread_id: t,
                        }));
                    });
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(table.get(0).records().len(), 800);
    }

    #[test]
    fn new_bucket_is_empty() {
        let table = BucketTable::new(4);
        assert_eq!(table.len(), 4);
        assert!(table.get(0).records().is_empty());
    }
}

//! Blocking concurrency primitives for the media engine.
//!
//! - [`Limiter`]: counting limiter capping concurrent transcodes. When every
//!   slot is taken, `acquire()` blocks the calling worker until a [`Permit`]
//!   is dropped; no transcode ever starts beyond the cap.
//! - [`ClaimTable`]: per-key in-flight claims. The first caller for a content
//!   hash processes it; concurrent callers for the same hash block until the
//!   claim is released and then re-check the finished manifest, so each hash
//!   is processed exactly once per process.
//!
//! Both use `Mutex` + `Condvar` and RAII guards that release on every exit
//! path, including unwinding. Locks are poison-tolerant because guards
//! release from `Drop`.
//!
//! | Operation | Cost |
//! |---|---|
//! | `acquire()` / `claim()` | lock + condvar wait |
//! | guard drop | lock + notify |

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Fixed-capacity blocking limiter.
#[derive(Debug)]
pub struct Limiter {
    slots: usize,
    available: Mutex<usize>,
    cv: Condvar,
}

impl Limiter {
    /// Create a limiter with `slots` permits (at least one).
    pub fn new(slots: usize) -> Self {
        let slots = slots.max(1);
        Self {
            slots,
            available: Mutex::new(slots),
            cv: Condvar::new(),
        }
    }

    /// Take a permit, blocking until one is free.
    pub fn acquire(&self) -> Permit<'_> {
        let mut avail = lock_or_recover(&self.available);
        while *avail == 0 {
            avail = self
                .cv
                .wait(avail)
                .unwrap_or_else(|poison| poison.into_inner());
        }
        *avail -= 1;
        Permit { limiter: self }
    }

    fn release(&self) {
        let mut avail = lock_or_recover(&self.available);
        debug_assert!(*avail < self.slots, "limiter over-release");
        *avail += 1;
        drop(avail);
        self.cv.notify_one();
    }
}

/// RAII slot in a [`Limiter`]; released on drop.
#[derive(Debug)]
#[must_use = "dropping a permit releases its slot immediately"]
pub struct Permit<'a> {
    limiter: &'a Limiter,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

/// Set of keys currently being processed.
#[derive(Debug, Default)]
pub struct ClaimTable {
    active: Mutex<HashSet<String>>,
    cv: Condvar,
}

impl ClaimTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, blocking while another caller holds it.
    ///
    /// Returning does not mean the caller is first: it may have waited for a
    /// previous holder to finish, so callers re-check their output after
    /// claiming.
    pub fn claim(&self, key: &str) -> Claim<'_> {
        let mut active = lock_or_recover(&self.active);
        while active.contains(key) {
            active = self
                .cv
                .wait(active)
                .unwrap_or_else(|poison| poison.into_inner());
        }
        active.insert(key.to_string());
        Claim {
            table: self,
            key: key.to_string(),
        }
    }

    fn release(&self, key: &str) {
        lock_or_recover(&self.active).remove(key);
        // Waiters for different keys share the condvar.
        self.cv.notify_all();
    }
}

/// RAII claim on one key of a [`ClaimTable`]; released on drop.
#[derive(Debug)]
#[must_use = "dropping a claim releases it immediately"]
pub struct Claim<'a> {
    table: &'a ClaimTable,
    key: String,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.table.release(&self.key);
    }
}

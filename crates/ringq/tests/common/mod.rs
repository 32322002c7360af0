//! Shared helpers for the integration tests.
#![allow(dead_code)] // each test binary uses a subset

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

static LIVE: AtomicI64 = AtomicI64::new(0);
static DTOR_LOCK: Mutex<()> = Mutex::new(());

/// Serialises tests that assert on the process-wide live count.
///
/// The test harness runs tests on parallel threads; two accounting tests
/// interleaving would see each other's instances.
pub fn dtor_lock() -> MutexGuard<'static, ()> {
    DTOR_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts live instances process-wide. Construction (including clone and
/// default) increments; drop decrements.
#[derive(Debug)]
pub struct DtorCounter(());

impl DtorCounter {
    pub fn new() -> Self {
        LIVE.fetch_add(1, Ordering::SeqCst);
        Self(())
    }

    pub fn live() -> i64 {
        LIVE.load(Ordering::SeqCst)
    }
}

impl Default for DtorCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DtorCounter {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl Drop for DtorCounter {
    fn drop(&mut self) {
        LIVE.fetch_sub(1, Ordering::SeqCst);
    }
}

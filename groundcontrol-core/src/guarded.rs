//! The guarded-datum primitive: a mutable structure wrapped in a lock, with
//! the convention that callers hold the lock for the duration of any
//! read-modify-write or any iteration that must observe a stable snapshot.
//!
//! Each guarded structure (`SatelliteSet`, `SubscriptionIndex`, the event
//! queue) is its own distinct type built on top of this primitive, rather
//! than a single generic locked container with runtime type checks on its
//! contents.

use std::sync::{Mutex, MutexGuard};

/// A mutex-guarded value. Poisoning is treated as unrecoverable: a panic
/// while holding the lock indicates a broken invariant elsewhere in the
/// Core, so callers propagate the poison rather than silently continue
/// with a possibly-corrupt structure.
#[derive(Debug, Default)]
pub struct Guarded<T> {
    inner: Mutex<T>,
}

impl<T> Guarded<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Acquire the lock for the duration of the returned guard.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned (a prior holder panicked while
    /// mutating the guarded value).
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().expect("guarded datum lock poisoned")
    }
}

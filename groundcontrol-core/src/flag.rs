//! The shutdown flag: a settable/unsettable boolean readable without
//! locking. The supervisor is its only writer; every worker loop reads it
//! once per tick to decide whether to keep running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable, atomic boolean signal.
///
/// Every worker loop in this workspace is written `while !flag.is_set()`:
/// the loop keeps running while the flag is clear, and exits once it is set.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    value: Arc<AtomicBool>,
}

impl ShutdownFlag {
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set(&self) {
        self.value.store(true, Ordering::SeqCst);
    }

    pub fn unset(&self) {
        self.value.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.load(Ordering::SeqCst)
    }
}

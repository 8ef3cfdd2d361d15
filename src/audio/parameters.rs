// Atomic parameters - Lock-free control → audio thread values
// Uses atomic operations to share parameters between threads without locks

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Thread-safe f32 parameter using atomic operations
/// Converts f32 to u32 bits for atomic storage
#[derive(Clone)]
pub struct AtomicF32 {
    inner: Arc<AtomicU32>,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            inner: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    /// Set the value (called from the control thread)
    pub fn set(&self, value: f32) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Get the value (called from the audio thread)
    pub fn get(&self) -> f32 {
        f32::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl fmt::Debug for AtomicF32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicF32").field(&self.get()).finish()
    }
}

/// Master output volume, clamped to [0, 1]
#[derive(Clone, Debug, Default)]
pub struct Volume(AtomicF32);

impl Volume {
    pub fn new(value: f32) -> Self {
        Self(AtomicF32::new(value.clamp(0.0, 1.0)))
    }

    pub fn set(&self, value: f32) {
        self.0.set(value.clamp(0.0, 1.0));
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.0.get()
    }
}

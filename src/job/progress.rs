// src/job/progress.rs

//! Lock-free fractional progress shared between a job and its observers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Progress value in `[0, 1]` that only ever moves forward.
///
/// The value is stored as the bit pattern of an `f64`. For non-negative
/// floats the IEEE-754 ordering matches the unsigned integer ordering of the
/// bits, so `fetch_max` on the raw bits keeps the value monotone without a
/// lock. Any thread may read it at any time.
#[derive(Debug, Default)]
pub struct JobProgress {
    bits: AtomicU64,
}

impl JobProgress {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(0.0f64.to_bits()),
        }
    }

    /// Current progress.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Raise progress to `value` (clamped to `[0, 1]`).
    ///
    /// Lower values than the current one are ignored, as are NaN and
    /// non-positive values (`-0.0` would otherwise win the bitwise max).
    pub fn set(&self, value: f64) {
        if value.is_nan() || value <= 0.0 {
            return;
        }
        let clamped = value.min(1.0);
        self.bits.fetch_max(clamped.to_bits(), Ordering::AcqRel);
    }

    pub fn finish(&self) {
        self.set(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(JobProgress::new().get(), 0.0);
        assert_eq!(JobProgress::default().get(), 0.0);
    }

    #[test]
    fn never_moves_backwards() {
        let p = JobProgress::new();
        p.set(0.4);
        p.set(0.2);
        assert_eq!(p.get(), 0.4);
        p.set(0.75);
        assert_eq!(p.get(), 0.75);
    }

    #[test]
    fn clamps_and_ignores_nan() {
        let p = JobProgress::new();
        p.set(-3.0);
        assert_eq!(p.get(), 0.0);
        p.set(f64::NAN);
        assert_eq!(p.get(), 0.0);
        p.set(-0.0);
        p.set(0.5);
        assert_eq!(p.get(), 0.5);
        p.set(7.0);
        assert_eq!(p.get(), 1.0);
    }

    #[test]
    fn finish_sets_one() {
        let p = JobProgress::new();
        p.set(0.3);
        p.finish();
        assert_eq!(p.get(), 1.0);
    }
}

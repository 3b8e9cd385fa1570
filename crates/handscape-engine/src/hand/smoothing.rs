use std::ops::{Add, Mul};

/// Cubic ease, `x` clamped to `[0, 1]`.
#[inline]
pub fn smoothstep(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

/// Quintic ease with zero first and second derivatives at both ends.
#[inline]
pub fn smootherstep(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    x * x * x * (x * (6.0 * x - 15.0) + 10.0)
}

/// Exponential smoothing that behaves the same at any frame rate.
///
/// `strength` is the fraction of the old value kept per 1/60 s step; 0
/// follows the target immediately, values near 1 barely move.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Smoothed<T> {
    value: T,
    strength: f32,
}

impl<T> Smoothed<T>
where
    T: Copy + Add<Output = T> + Mul<f32, Output = T>,
{
    /// Reference step the strength is expressed for.
    pub const REFERENCE_FPS: f32 = 60.0;

    pub fn new(value: T, strength: f32) -> Self {
        Self { value, strength: strength.clamp(0.0, 1.0) }
    }

    #[inline]
    pub fn value(&self) -> T {
        self.value
    }

    #[inline]
    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = strength.clamp(0.0, 1.0);
    }

    /// Jumps straight to `value`.
    pub fn reset(&mut self, value: T) {
        self.value = value;
    }

    /// Moves toward `target` by the amount `dt` seconds of smoothing allow.
    pub fn update(&mut self, target: T, dt: f32) -> T {
        let keep = self.strength.powf(dt.max(0.0) * Self::REFERENCE_FPS);
        self.value = self.value * keep + target * (1.0 - keep);
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn easing_curves_hit_their_endpoints() {
        for f in [smoothstep, smootherstep] {
            assert_eq!(f(-1.0), 0.0);
            assert_eq!(f(0.0), 0.0);
            assert_eq!(f(0.5), 0.5);
            assert_eq!(f(1.0), 1.0);
            assert_eq!(f(3.0), 1.0);
        }
        assert!(smootherstep(0.1) < smoothstep(0.1));
    }

    #[test]
    fn smoothing_is_frame_rate_independent() {
        let mut coarse = Smoothed::new(0.0f32, 0.5);
        coarse.update(1.0, 1.0 / 30.0);

        let mut fine = Smoothed::new(0.0f32, 0.5);
        fine.update(1.0, 1.0 / 60.0);
        fine.update(1.0, 1.0 / 60.0);

        assert!((coarse.value() - 0.75).abs() < 1e-6);
        assert!((coarse.value() - fine.value()).abs() < 1e-6);
    }

    #[test]
    fn zero_strength_follows_immediately() {
        let mut s = Smoothed::new(Vec3::ZERO, 0.0);
        assert_eq!(s.update(Vec3::ONE, 0.016), Vec3::ONE);
    }

    #[test]
    fn zero_dt_keeps_the_value() {
        let mut s = Smoothed::new(2.0f32, 0.8);
        assert_eq!(s.update(10.0, 0.0), 2.0);
    }
}

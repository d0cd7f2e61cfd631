//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Clamp a value into `[min, max]`.
///
/// NaN values are returned unchanged, callers that need a finite output must
/// check for them first.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range (-pi, pi].
///
/// Angles already inside the range are returned untouched, so the function is
/// idempotent.
pub fn wrap_angle<T>(theta: T) -> T
where
    T: Float + FloatConst
{
    let pi = T::PI();

    if theta > -pi && theta <= pi {
        return theta;
    }

    let wrapped = rem_euclid(theta + pi, pi + pi) - pi;

    if wrapped <= -pi || wrapped > pi {
        pi
    }
    else {
        wrapped
    }
}

/// Get the unsigned angular distance between two angles on the circle.
///
/// The result is always in [0, pi] regardless of how the inputs are wrapped.
pub fn angle_difference<T>(a: T, b: T) -> T
where
    T: Float + FloatConst
{
    let pi = T::PI();
    let diff = (wrap_angle(a) - wrap_angle(b)).abs();

    if diff > pi {
        pi + pi - diff
    }
    else {
        diff
    }
}

/// Step `current` towards `target` along the shorter arc by at most
/// `max_step` radians.
///
/// If the two angles are exactly opposite the step is taken clockwise
/// (negative direction). The result is wrapped into (-pi, pi].
pub fn step_towards_circular<T>(current: T, target: T, max_step: T) -> T
where
    T: Float + FloatConst
{
    let current = wrap_angle(current);
    let target = wrap_angle(target);
    let step = max_step.max(T::zero());

    // Signed shortest distance, in (-pi, pi]
    let diff = wrap_angle(target - current);

    if diff.abs() <= step {
        return target;
    }

    let dir = if diff == T::PI() { -T::one() } else { diff.signum() };

    wrap_angle(current + dir * step)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 10f64), (-1f64, 1f64), 5f64), 0f64);
        assert_eq!(lin_map((0f64, 10f64), (-1f64, 1f64), 10f64), 1f64);
    }

    #[test]
    fn test_wrap_angle() {
        assert_eq!(wrap_angle(PI), PI);
        assert_eq!(wrap_angle(-PI), PI);
        assert_eq!(wrap_angle(0.5f64), 0.5);
        assert!((wrap_angle(3.0 * PI) - PI).abs() < EPS);
        assert!((wrap_angle(2.0 * PI + 0.25) - 0.25).abs() < EPS);
        assert!((wrap_angle(-2.0 * PI - 0.25) + 0.25).abs() < EPS);

        for i in -200..200 {
            let x = i as f64 * 0.173;
            let w = wrap_angle(x);
            assert!(w > -PI && w <= PI, "wrap({}) = {} out of range", x, w);
            assert_eq!(wrap_angle(w), w);
        }
    }

    #[test]
    fn test_angle_difference() {
        assert!((angle_difference(0.1f64, -0.1) - 0.2).abs() < EPS);
        assert!((angle_difference(PI - 0.1, -PI + 0.1) - 0.2).abs() < EPS);
        assert!((angle_difference(0f64, PI) - PI).abs() < EPS);
        assert!((angle_difference(0f64, 4.0 * PI)).abs() < EPS);
    }

    #[test]
    fn test_step_towards_circular() {
        // Within one step snaps to target
        assert_eq!(step_towards_circular(0.0f64, 0.05, 0.1), 0.05);

        // Equal input returns unchanged
        assert_eq!(step_towards_circular(1.0f64, 1.0, 0.1), 1.0);

        // Takes the short way over the wrap
        let stepped = step_towards_circular(PI - 0.05, -PI + 0.05, 0.01);
        assert!((stepped - (PI - 0.04)).abs() < EPS);

        let stepped = step_towards_circular(-PI + 0.05, PI - 0.05, 0.01);
        assert!((stepped - (-PI + 0.04)).abs() < EPS);

        // Exact reversal goes clockwise
        let stepped = step_towards_circular(0.0f64, PI, 0.1);
        assert!((stepped + 0.1).abs() < EPS);

        // Negative step is treated as no step
        assert_eq!(step_towards_circular(0.0f64, 1.0, -1.0), 0.0);
    }
}

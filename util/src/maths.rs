//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;
use std::cmp::Ordering;

/// Compare two floating point numbers, treating any difference within the
/// type's machine epsilon as equality.
pub fn float_cmp<T>(x: T, y: T) -> Ordering
where
    T: Float
{
    let diff = x - y;

    if diff > T::epsilon() {
        Ordering::Greater
    }
    else if diff < -T::epsilon() {
        Ordering::Less
    }
    else {
        Ordering::Equal
    }
}

/// Returns true if the value is zero within the type's machine epsilon.
pub fn is_zero<T>(value: T) -> bool
where
    T: Float
{
    float_cmp(value, T::zero()) == Ordering::Equal
}

/// Limit a value to the symmetric range `[-abs_max, abs_max]`.
pub fn abs_limit<T>(value: T, abs_max: T) -> T
where
    T: Float
{
    clamp(&value, &-abs_max, &abs_max)
}

/// Clamp a value to `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Wrap an angle in degrees into the range `[-180, 180)`.
pub fn wrap_deg_180<T>(angle_deg: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap_or_else(T::zero);
    let full_turn = half_turn + half_turn;

    rem_euclid(angle_deg + half_turn, full_turn) - half_turn
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

//! Parameter range conversion
//!
//! Hardware synthesizers express speech parameters in their own units
//! (DECtalk rate is words per minute, LiteTalk rate is a 0-9 dial). The
//! speech service wants everything in -100..100, so every setter passes its
//! value through [`map_range`] first.

/// Lower bound of the speech service's parameter scale
pub const TARGET_MIN: i32 = -100;

/// Upper bound of the speech service's parameter scale
pub const TARGET_MAX: i32 = 100;

/// Rescale `value` from `[device_min, device_max]` into the speech service's
/// default `[-100, 100]` scale.
pub fn map_range(value: i32, device_min: i32, device_max: i32) -> i32 {
    map_range_to(value, device_min, device_max, TARGET_MIN, TARGET_MAX)
}

/// Rescale `value` from `[device_min, device_max]` into
/// `[target_min, target_max]`, then clamp into the target range.
///
/// The scaling is anchored on the midpoints of both ranges and the result
/// is truncated toward zero before clamping. The arithmetic is done on an
/// exact rational so range endpoints always land on the target endpoints.
pub fn map_range_to(
    value: i32,
    device_min: i32,
    device_max: i32,
    target_min: i32,
    target_max: i32,
) -> i32 {
    let (value, dmin, dmax) = (value as i64, device_min as i64, device_max as i64);
    let (tmin, tmax) = (target_min as i64, target_max as i64);

    let span = dmax - dmin;
    if span == 0 {
        return clamp((tmin + tmax) / 2, target_min, target_max);
    }

    // (v - span/2 - dmin) * (tmax - tmin) / span + (tmax + tmin) / 2
    // over the common denominator 2 * span
    let numerator = (2 * (value - dmin) - span) * (tmax - tmin) + (tmax + tmin) * span;
    let scaled = numerator / (2 * span);

    clamp(scaled, target_min, target_max)
}

fn clamp(value: i64, min: i32, max: i32) -> i32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    value.clamp(lo as i64, hi as i64) as i32
}

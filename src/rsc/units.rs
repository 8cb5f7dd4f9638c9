//! Unit conversions between engineering and wire representations

use crate::config::units::{CM_PER_DM, CM_PER_METER, SECONDS_PER_MINUTE};

/// Instantaneous speed in 1/256 m/s from cadence and stride length.
///
/// A stride covers two steps, so distance per minute is
/// `2 * cadence * stride_len_cm` centimetres. The result truncates, matching
/// the wire resolution.
pub fn speed_fixed_point(cadence: u8, stride_len_cm: u16) -> u16 {
    let cm_per_minute = 2 * cadence as u32 * stride_len_cm as u32;
    ((cm_per_minute << 8) / (SECONDS_PER_MINUTE * CM_PER_METER)) as u16
}

/// Centimetres to decimetres, truncating.
pub fn cm_to_decimeters(cm: u64) -> u64 {
    cm / CM_PER_DM as u64
}

//! Simulation and characteristic constants for the RSC sensor

/// Walking gait bounds
pub mod walking {
    /// Cadence in strides per minute
    pub const CADENCE_MIN: u8 = 80;
    pub const CADENCE_MAX: u8 = 95;

    /// Stride length in centimetres
    pub const STRIDE_LEN_MIN: u16 = 65;
    pub const STRIDE_LEN_MAX: u16 = 85;
}

/// Running gait bounds
pub mod running {
    pub const CADENCE_MIN: u8 = 120;
    pub const CADENCE_MAX: u8 = 155;

    pub const STRIDE_LEN_MIN: u16 = 100;
    pub const STRIDE_LEN_MAX: u16 = 115;
}

/// Scheduler timing on the external tick grid
///
/// The tick source fires once per connection interval. All timer periods are
/// expressed in ticks of that grid.
pub mod timing {
    /// External tick period driven by the connection interval
    pub const TICK_INTERVAL_MS: u64 = 30;

    /// Simulate one walking stride per second
    pub const WALKING_PROFILE_TICKS: u16 = 33;
    /// Simulate one running stride per half second
    pub const RUNNING_PROFILE_TICKS: u16 = 17;
    /// Advance cadence/stride length once per 10 seconds
    pub const PACE_TICKS: u16 = 333;
    /// Notify the measurement once per 3 seconds
    pub const NOTIFICATION_TICKS: u16 = 100;
}

/// Unit conversion factors
pub mod units {
    pub const CM_PER_METER: u32 = 100;
    pub const CM_PER_DM: u32 = 10;
    pub const SECONDS_PER_MINUTE: u32 = 60;
}

/// Characteristic wire constants
pub mod characteristic {
    /// RSC Measurement characteristic size in bytes
    pub const MEASUREMENT_SIZE: usize = 10;
    /// RSC Feature characteristic size in bytes
    pub const FEATURE_SIZE: usize = 2;
    /// SC Control Point response without parameters: marker, op code, status
    pub const RESPONSE_HEADER_SIZE: usize = 3;
    /// First byte of every SC Control Point indication
    pub const RESPONSE_OP_CODE: u8 = 0x10;

    /// Feature bits advertised by this sensor: instantaneous stride length,
    /// total distance, walking/running status, multiple sensor locations
    pub const DEFAULT_FEATURE_BITS: u16 = 0x0017;
}

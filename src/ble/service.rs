//! Running Speed and Cadence service definition
//!
//! Standard RSC service (0x1814) with its four characteristics:
//! - RSC Measurement 0x2A53 (notify)
//! - RSC Feature 0x2A54 (read)
//! - Sensor Location 0x2A5D (read)
//! - SC Control Point 0x2A55 (write, indicate)

use trouble_host::prelude::*;

use crate::config::characteristic::{FEATURE_SIZE, MEASUREMENT_SIZE};
use crate::rsc::types::MAX_RESPONSE_SIZE;

/// Running Speed and Cadence service
///
/// The measurement stream and the control point response channel are driven
/// by the session scheduler; Feature and Sensor Location are value stores
/// the peer reads on demand.
#[gatt_service(uuid = "1814")]
pub struct RunningSpeedCadenceService {
    /// RSC Measurement - notified on the simulation grid
    #[characteristic(uuid = "2a53", notify, value = [0u8; 10])]
    pub measurement: [u8; MEASUREMENT_SIZE],

    /// RSC Feature - capability bitmask, fixed after boot
    #[characteristic(uuid = "2a54", read, value = [0x17, 0x00])]
    pub feature: [u8; FEATURE_SIZE],

    /// Sensor Location - updated through the control point
    #[characteristic(uuid = "2a5d", read, value = 2)]
    pub sensor_location: u8,

    /// SC Control Point - peer writes requests, responses are indicated
    #[characteristic(uuid = "2a55", write, indicate, value = [0u8; 5])]
    pub control_point: [u8; MAX_RESPONSE_SIZE],
}

//! Request and response types for the SC Control Point protocol
//!
//! # Protocol Format
//!
//! The peer writes a control point record to the SC Control Point
//! characteristic:
//! ```text
//! [op_code: u8][parameters: [u8; 0..4]]
//! ```
//!
//! The sensor answers every record with exactly one indication:
//! ```text
//! [0x10][request_op_code: u8][status: u8][parameters: [u8; 0..2]]
//! ```
//!
//! Response parameters are only present for a successful supported-locations
//! query, where they carry the registry codes in registration order.

use crate::config::characteristic::{RESPONSE_HEADER_SIZE, RESPONSE_OP_CODE};
use crate::rsc::locations::SUPPORTED_LOCATION_COUNT;
use heapless::Vec;

/// Largest response frame: header plus the supported-locations list
pub const MAX_RESPONSE_SIZE: usize = RESPONSE_HEADER_SIZE + SUPPORTED_LOCATION_COUNT;

/// Op codes defined for the SC Control Point
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Overwrite the total distance odometer (0x01)
    ///
    /// - Parameters: new distance in decimetres (u32 LE)
    /// - Record length: 5 bytes
    SetCumulativeValue = 0x01,

    /// Start the sensor calibration procedure (0x02)
    ///
    /// This sensor has nothing to calibrate; the op code is always answered
    /// with [`ResponseStatus::OpCodeNotSupported`].
    StartSensorCalibration = 0x02,

    /// Move the reported sensor location (0x03)
    ///
    /// - Parameters: requested location code (u8)
    /// - Record length: 2 bytes
    UpdateSensorLocation = 0x03,

    /// Query the supported sensor locations (0x04)
    ///
    /// - Parameters: none
    /// - Record length: 1 byte
    RequestSupportedLocations = 0x04,
}

impl OpCode {
    /// Try to convert a byte to an OpCode
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::SetCumulativeValue),
            0x02 => Some(Self::StartSensorCalibration),
            0x03 => Some(Self::UpdateSensorLocation),
            0x04 => Some(Self::RequestSupportedLocations),
            _ => None,
        }
    }
}

/// Parsed control point request with associated data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPointRequest {
    /// Overwrite the odometer with a peer-supplied value
    SetCumulativeValue {
        /// New total distance in decimetres, as carried on the wire
        distance_dm: u32,
    },

    /// Calibration request, never serviced by this sensor
    StartSensorCalibration,

    /// Move the reported sensor location
    UpdateSensorLocation {
        /// Requested location code, not yet checked against the registry
        location: u8,
    },

    /// Query the supported sensor locations
    RequestSupportedLocations,

    /// Any op code outside the table above
    Unsupported { op_code: u8 },
}

/// Response status codes indicated back to the peer
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Request executed (0x01)
    Success = 0x01,

    /// Op code unknown, or the gating feature bit is absent (0x02)
    OpCodeNotSupported = 0x02,

    /// Parameter value rejected, e.g. an unsupported location code (0x03)
    InvalidParameter = 0x03,

    /// Record length did not match the op code (0x04)
    OperationFailed = 0x04,
}

/// Response to a control point request
///
/// At most one response is ever outstanding; the scheduler owns the latch
/// and delivers it over the indication channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPointResponse {
    /// Op code byte echoed from the request, valid or not
    pub request_op: u8,
    /// Outcome of the request
    pub status: ResponseStatus,
    /// Optional parameter list (supported-locations query only)
    pub params: Vec<u8, SUPPORTED_LOCATION_COUNT>,
}

impl ControlPointResponse {
    /// Build a parameterless response
    pub fn new(request_op: u8, status: ResponseStatus) -> Self {
        Self {
            request_op,
            status,
            params: Vec::new(),
        }
    }

    /// Build a response carrying a parameter list
    pub fn with_params(request_op: u8, status: ResponseStatus, params: &[u8]) -> Self {
        let mut vec = Vec::new();
        // The caller never passes more than the registry size
        let _ = vec.extend_from_slice(params);
        Self {
            request_op,
            status,
            params: vec,
        }
    }

    /// Encode the indication frame: marker, echoed op code, status, params
    pub fn encode(&self) -> Vec<u8, MAX_RESPONSE_SIZE> {
        let mut frame = Vec::new();
        let _ = frame.push(RESPONSE_OP_CODE);
        let _ = frame.push(self.request_op);
        let _ = frame.push(self.status as u8);
        let _ = frame.extend_from_slice(&self.params);
        frame
    }
}

/// Sensor location codes from the assigned numbers registry
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLocation {
    Other = 0,
    TopOfShoe = 1,
    InShoe = 2,
    Hip = 3,
    FrontWheel = 4,
    LeftCrank = 5,
    RightCrank = 6,
    LeftPedal = 7,
    RightPedal = 8,
    FrontHub = 9,
    RearDropout = 10,
    Chainstay = 11,
    RearWheel = 12,
    RearHub = 13,
    Chest = 14,
}

impl SensorLocation {
    /// Try to convert an assigned code to a SensorLocation
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Other),
            1 => Some(Self::TopOfShoe),
            2 => Some(Self::InShoe),
            3 => Some(Self::Hip),
            4 => Some(Self::FrontWheel),
            5 => Some(Self::LeftCrank),
            6 => Some(Self::RightCrank),
            7 => Some(Self::LeftPedal),
            8 => Some(Self::RightPedal),
            9 => Some(Self::FrontHub),
            10 => Some(Self::RearDropout),
            11 => Some(Self::Chainstay),
            12 => Some(Self::RearWheel),
            13 => Some(Self::RearHub),
            14 => Some(Self::Chest),
            _ => None,
        }
    }

    /// Assigned code for this location
    pub fn code(self) -> u8 {
        self as u8
    }
}

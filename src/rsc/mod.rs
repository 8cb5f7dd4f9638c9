//! Running Speed and Cadence service protocol
//!
//! Characteristic codecs, the SC Control Point vocabulary and the sensor
//! location registry. Everything in here is pure protocol logic with no
//! transport or scheduling concerns.

pub mod control_point;
pub mod locations;
pub mod measurement;
pub mod types;
pub mod units;

pub use control_point::parse_request;
pub use locations::SensorLocationRegistry;
pub use measurement::{MeasurementFlags, RscFeature, RscMeasurement};
pub use types::{ControlPointRequest, ControlPointResponse, OpCode, ResponseStatus, SensorLocation};

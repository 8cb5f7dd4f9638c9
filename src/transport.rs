//! Transport seam between the session core and the BLE stack
//!
//! The core never talks to a GATT server directly; it hands finished wire
//! buffers to this trait and observes acceptance only. Deliveries are
//! fire-and-forget: a failure is logged by the caller and the data is
//! rebuilt fresh on the next scheduled occasion.

use crate::config::characteristic::MEASUREMENT_SIZE;
use crate::rsc::types::SensorLocation;

/// Errors a transport can report when accepting an outbound item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No peer connection to deliver on
    NotConnected,
    /// The peer has not subscribed to the channel
    NotSubscribed,
    /// The transport refused the buffer (queue full, stack busy)
    Rejected,
}

/// Outbound interface of the RSC session
pub trait RscTransport {
    /// Queue an RSC Measurement notification
    fn send_measurement(&mut self, payload: &[u8; MEASUREMENT_SIZE]) -> Result<(), TransportError>;

    /// Queue an SC Control Point response indication (3 to 5 bytes)
    fn send_control_point_response(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Publish a new value for the Sensor Location characteristic
    fn write_sensor_location(&mut self, location: SensorLocation) -> Result<(), TransportError>;
}

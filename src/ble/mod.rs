//! Bluetooth Low Energy integration
//!
//! GATT definition of the Running Speed and Cadence service and the
//! peripheral task that feeds it from the session core.

pub mod peripheral;
pub mod service;

pub use peripheral::{LinkState, LINK_STATE, PROFILE_EVENTS};
pub use service::RunningSpeedCadenceService;

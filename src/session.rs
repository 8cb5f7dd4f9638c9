//! RSC session: shared state, control point engine and tick scheduler
//!
//! One [`RscSession`] owns everything the protocol mutates (simulator,
//! feature set, subscription states, timers and the pending-response latch)
//! and is driven through two serialized entry points: the periodic tick and
//! the control point write. Nothing in here blocks; outbound data goes to an
//! [`RscTransport`] and failures are logged and dropped.

use crate::config::timing;
use crate::rsc::control_point::parse_request;
use crate::rsc::locations::SensorLocationRegistry;
use crate::rsc::measurement::RscFeature;
use crate::rsc::types::{ControlPointRequest, ControlPointResponse, ResponseStatus};
use crate::simulator::{ProfileKind, ProfileSimulator};
use crate::transport::RscTransport;

/// Subscription state of a characteristic channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Enabled,
    Disabled,
}

impl SubscriptionState {
    pub fn is_enabled(self) -> bool {
        self == SubscriptionState::Enabled
    }

    fn from_bool(enabled: bool) -> Self {
        if enabled {
            SubscriptionState::Enabled
        } else {
            SubscriptionState::Disabled
        }
    }
}

/// Session parameters, fixed at construction
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Profile timer period while walking, in ticks
    pub walking_profile_ticks: u16,
    /// Profile timer period while running, in ticks
    pub running_profile_ticks: u16,
    /// Pace timer period, profile independent
    pub pace_ticks: u16,
    /// Notification timer period
    pub notification_ticks: u16,
    /// Advertised RSC Feature bits
    pub feature: RscFeature,
}

impl SessionConfig {
    fn profile_ticks(&self, kind: ProfileKind) -> u16 {
        match kind {
            ProfileKind::Walking => self.walking_profile_ticks,
            ProfileKind::Running => self.running_profile_ticks,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            walking_profile_ticks: timing::WALKING_PROFILE_TICKS,
            running_profile_ticks: timing::RUNNING_PROFILE_TICKS,
            pace_ticks: timing::PACE_TICKS,
            notification_ticks: timing::NOTIFICATION_TICKS,
            feature: RscFeature::default(),
        }
    }
}

/// Independent countdowns on the external tick grid
#[derive(Debug, Clone, Copy)]
struct Timers {
    profile: u16,
    pace: u16,
    notification: u16,
}

impl Timers {
    fn initial(config: &SessionConfig, kind: ProfileKind) -> Self {
        Self {
            profile: config.profile_ticks(kind),
            pace: config.pace_ticks,
            notification: config.notification_ticks,
        }
    }
}

/// The one owner of all mutable RSC state
pub struct RscSession {
    config: SessionConfig,
    simulator: ProfileSimulator,
    feature: RscFeature,
    locations: SensorLocationRegistry,
    timers: Timers,
    notifications: SubscriptionState,
    indications: SubscriptionState,
    pending: Option<ControlPointResponse>,
    connected: bool,
    just_resumed: bool,
}

impl RscSession {
    pub fn new(config: SessionConfig) -> Self {
        let simulator = ProfileSimulator::new();
        let feature = config.feature;
        let timers = Timers::initial(&config, simulator.kind());
        Self {
            config,
            simulator,
            feature,
            locations: SensorLocationRegistry::new(),
            timers,
            notifications: SubscriptionState::Disabled,
            indications: SubscriptionState::Disabled,
            pending: None,
            connected: false,
            just_resumed: false,
        }
    }

    pub fn simulator(&self) -> &ProfileSimulator {
        &self.simulator
    }

    pub fn feature(&self) -> RscFeature {
        self.feature
    }

    pub fn locations(&self) -> &SensorLocationRegistry {
        &self.locations
    }

    pub fn pending_response(&self) -> Option<&ControlPointResponse> {
        self.pending.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// A peer connected: restart the timing grid from the configured
    /// initial values, with one quiet cycle so the first tick after the
    /// resume never fires several timers at once.
    pub fn on_connect(&mut self) {
        self.connected = true;
        self.just_resumed = true;
        self.timers = Timers::initial(&self.config, self.simulator.kind());
        log::info!("peer connected, timers restarted");
    }

    /// The peer went away: suspend the grid. Subscription state is owned by
    /// the transport events and is not touched here.
    pub fn on_disconnect(&mut self) {
        self.connected = false;
        log::info!("peer disconnected, timers suspended");
    }

    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.notifications = SubscriptionState::from_bool(enabled);
        log::info!(
            "measurement notifications {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn set_indications_enabled(&mut self, enabled: bool) {
        self.indications = SubscriptionState::from_bool(enabled);
        log::info!(
            "control point indications {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Gait change from the external selector. Only honoured while a peer is
    /// connected; the simulator itself has no such guard.
    pub fn set_profile(&mut self, kind: ProfileKind) {
        if !self.connected {
            log::debug!("profile change ignored while disconnected");
            return;
        }
        self.simulator.set_profile(kind);
    }

    /// One cycle of the external timing grid.
    pub fn on_tick<T: RscTransport>(&mut self, transport: &mut T) {
        if !self.connected {
            return;
        }

        if self.just_resumed {
            self.just_resumed = false;
        } else {
            self.advance_timers(transport);
        }

        self.dispatch_pending_response(transport);
    }

    /// Inbound SC Control Point write.
    ///
    /// `params` is the record minus its op code byte. Exactly one response is
    /// latched whatever the outcome; an undelivered earlier response is
    /// overwritten.
    pub fn on_control_point_write<T: RscTransport>(
        &mut self,
        transport: &mut T,
        op_code: u8,
        params: &[u8],
    ) {
        log::debug!(
            "control point write: op {:#04x}, {} parameter bytes",
            op_code,
            params.len()
        );

        let response = match parse_request(op_code, params, self.feature) {
            Ok(ControlPointRequest::SetCumulativeValue { distance_dm }) => {
                self.simulator.set_total_distance_dm(distance_dm);
                log::info!("cumulative value set to {} dm", distance_dm);
                ControlPointResponse::new(op_code, ResponseStatus::Success)
            }
            Ok(ControlPointRequest::StartSensorCalibration) => {
                log::debug!("calibration requested, procedure not supported");
                ControlPointResponse::new(op_code, ResponseStatus::OpCodeNotSupported)
            }
            Ok(ControlPointRequest::UpdateSensorLocation { location }) => {
                match self.locations.lookup(location) {
                    Some(location) => {
                        // The characteristic store is best effort, the
                        // status already committed to the peer
                        if let Err(error) = transport.write_sensor_location(location) {
                            log::warn!("sensor location not stored: {:?}", error);
                        }
                        log::info!("sensor location set to {:?}", location);
                        ControlPointResponse::new(op_code, ResponseStatus::Success)
                    }
                    None => {
                        log::debug!("requested sensor location {} not supported", location);
                        ControlPointResponse::new(op_code, ResponseStatus::InvalidParameter)
                    }
                }
            }
            Ok(ControlPointRequest::RequestSupportedLocations) => {
                ControlPointResponse::with_params(
                    op_code,
                    ResponseStatus::Success,
                    &self.locations.codes(),
                )
            }
            Ok(ControlPointRequest::Unsupported { op_code }) => {
                log::debug!("unsupported control point op {:#04x}", op_code);
                ControlPointResponse::new(op_code, ResponseStatus::OpCodeNotSupported)
            }
            Err(status) => ControlPointResponse::new(op_code, status),
        };

        // Last write wins; no queueing of responses
        self.pending = Some(response);
    }

    fn advance_timers<T: RscTransport>(&mut self, transport: &mut T) {
        self.timers.profile = self.timers.profile.saturating_sub(1);
        if self.timers.profile == 0 {
            self.simulator.on_profile_tick();
            // Period follows the profile active after the stride
            self.timers.profile = self.config.profile_ticks(self.simulator.kind());
        }

        self.timers.pace = self.timers.pace.saturating_sub(1);
        if self.timers.pace == 0 {
            self.simulator.on_pace_tick();
            self.timers.pace = self.config.pace_ticks;
        }

        self.timers.notification = self.timers.notification.saturating_sub(1);
        if self.timers.notification == 0 {
            if self.notifications.is_enabled() {
                self.notify_measurement(transport);
            }
            self.timers.notification = self.config.notification_ticks;
        }
    }

    fn notify_measurement<T: RscTransport>(&mut self, transport: &mut T) {
        let measurement = self.simulator.measurement();
        match transport.send_measurement(&measurement.encode()) {
            Ok(()) => log::debug!(
                "notified: cadence {}, speed {}, stride {} cm, distance {} dm, {:?}",
                measurement.inst_cadence,
                measurement.inst_speed,
                measurement.inst_stride_len,
                measurement.total_distance_dm,
                self.simulator.kind()
            ),
            Err(error) => log::warn!("measurement notification dropped: {:?}", error),
        }
    }

    fn dispatch_pending_response<T: RscTransport>(&mut self, transport: &mut T) {
        if !self.indications.is_enabled() {
            return;
        }
        let Some(response) = self.pending.take() else {
            return;
        };

        // The latch clears on dispatch either way; the peer re-issues the
        // procedure if the indication is lost
        match transport.send_control_point_response(&response.encode()) {
            Ok(()) => log::debug!(
                "indicated response: op {:#04x}, status {:?}",
                response.request_op,
                response.status
            ),
            Err(error) => log::warn!("control point indication dropped: {:?}", error),
        }
    }
}

impl Default for RscSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{running, walking};
    use crate::rsc::measurement::{MeasurementFlags, RscMeasurement};
    use crate::rsc::types::SensorLocation;
    use crate::transport::mock::MockTransport;
    use crate::transport::TransportError;

    /// Small periods so scenarios stay readable: profile fires every 2nd
    /// tick, pace every 3rd, notification every 5th.
    fn test_config() -> SessionConfig {
        SessionConfig {
            walking_profile_ticks: 2,
            running_profile_ticks: 3,
            pace_ticks: 3,
            notification_ticks: 5,
            feature: RscFeature::default(),
        }
    }

    fn connected_session(config: SessionConfig) -> (RscSession, MockTransport) {
        let mut session = RscSession::new(config);
        let mut transport = MockTransport::new();
        session.on_connect();
        // Burn the post-resume skip cycle
        session.on_tick(&mut transport);
        (session, transport)
    }

    #[test]
    fn set_cumulative_value_updates_odometer() {
        let (mut session, mut transport) = connected_session(test_config());

        // 12345 dm, little-endian
        session.on_control_point_write(&mut transport, 0x01, &[0x39, 0x30, 0x00, 0x00]);

        let response = session.pending_response().expect("response latched");
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.request_op, 0x01);
        assert_eq!(session.simulator().total_distance_cm(), 123_450);
    }

    #[test]
    fn set_cumulative_value_rejects_bad_length() {
        let (mut session, mut transport) = connected_session(test_config());

        session.on_control_point_write(&mut transport, 0x01, &[0x39, 0x30]);

        let response = session.pending_response().expect("response latched");
        assert_eq!(response.status, ResponseStatus::OperationFailed);
        assert_eq!(session.simulator().total_distance_cm(), 0);
    }

    #[test]
    fn set_cumulative_value_needs_some_feature() {
        let config = SessionConfig {
            feature: RscFeature::from_bits(0),
            ..test_config()
        };
        let (mut session, mut transport) = connected_session(config);

        session.on_control_point_write(&mut transport, 0x01, &[1, 0, 0, 0]);

        let response = session.pending_response().expect("response latched");
        assert_eq!(response.status, ResponseStatus::OpCodeNotSupported);
    }

    #[test]
    fn calibration_is_always_unsupported() {
        let (mut session, mut transport) = connected_session(test_config());

        session.on_control_point_write(&mut transport, 0x02, &[]);

        let response = session.pending_response().expect("response latched");
        assert_eq!(response.request_op, 0x02);
        assert_eq!(response.status, ResponseStatus::OpCodeNotSupported);
    }

    #[test]
    fn update_sensor_location_happy_path() {
        let (mut session, mut transport) = connected_session(test_config());

        session.on_control_point_write(&mut transport, 0x03, &[2]);

        let response = session.pending_response().expect("response latched");
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(transport.sensor_location(), Some(SensorLocation::InShoe));
    }

    #[test]
    fn update_sensor_location_rejects_unknown_code() {
        let (mut session, mut transport) = connected_session(test_config());

        session.on_control_point_write(&mut transport, 0x03, &[99]);

        let response = session.pending_response().expect("response latched");
        assert_eq!(response.status, ResponseStatus::InvalidParameter);
        assert_eq!(transport.sensor_location(), None);
    }

    #[test]
    fn supported_locations_lists_registry_in_order() {
        let (mut session, mut transport) = connected_session(test_config());

        session.on_control_point_write(&mut transport, 0x04, &[]);

        let response = session.pending_response().expect("response latched");
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.params.as_slice(), &[2, 3]);
    }

    #[test]
    fn unknown_op_is_answered_not_ignored() {
        let (mut session, mut transport) = connected_session(test_config());

        session.on_control_point_write(&mut transport, 0x42, &[1, 2, 3]);

        let response = session.pending_response().expect("response latched");
        assert_eq!(response.request_op, 0x42);
        assert_eq!(response.status, ResponseStatus::OpCodeNotSupported);
    }

    #[test]
    fn pending_latch_is_last_write_wins() {
        let (mut session, mut transport) = connected_session(test_config());

        session.on_control_point_write(&mut transport, 0x02, &[]);
        session.on_control_point_write(&mut transport, 0x04, &[]);

        let response = session.pending_response().expect("response latched");
        assert_eq!(response.request_op, 0x04);

        session.set_indications_enabled(true);
        session.on_tick(&mut transport);

        // Only the second response went out
        assert_eq!(transport.responses().len(), 1);
        assert_eq!(transport.responses()[0][1], 0x04);
        assert!(session.pending_response().is_none());
    }

    #[test]
    fn response_waits_for_indications() {
        let (mut session, mut transport) = connected_session(test_config());

        session.on_control_point_write(&mut transport, 0x02, &[]);
        for _ in 0..4 {
            session.on_tick(&mut transport);
        }
        assert!(transport.responses().is_empty());
        assert!(session.pending_response().is_some());

        session.set_indications_enabled(true);
        session.on_tick(&mut transport);
        assert_eq!(transport.responses().len(), 1);
        assert_eq!(transport.responses()[0].as_slice(), &[0x10, 0x02, 0x02]);
    }

    #[test]
    fn failed_indication_still_clears_the_latch() {
        let (mut session, mut transport) = connected_session(test_config());
        session.set_indications_enabled(true);

        session.on_control_point_write(&mut transport, 0x02, &[]);
        transport.set_next_response_error(TransportError::Rejected);
        session.on_tick(&mut transport);

        assert!(session.pending_response().is_none());
        assert!(transport.responses().is_empty());
    }

    #[test]
    fn notifications_follow_subscription_and_timer() {
        let (mut session, mut transport) = connected_session(test_config());

        // Unsubscribed: the timer keeps reloading but nothing is sent
        for _ in 0..12 {
            session.on_tick(&mut transport);
        }
        assert!(transport.measurements().is_empty());

        session.set_notifications_enabled(true);
        for _ in 0..5 {
            session.on_tick(&mut transport);
        }
        assert_eq!(transport.measurements().len(), 1);

        let decoded = RscMeasurement::decode(&transport.measurements()[0]);
        assert_eq!(decoded.inst_cadence, session.simulator().inst_cadence());
        assert_eq!(
            decoded.inst_stride_len,
            session.simulator().inst_stride_len()
        );
    }

    #[test]
    fn dropped_notification_is_not_retried_until_next_period() {
        let (mut session, mut transport) = connected_session(test_config());
        session.set_notifications_enabled(true);

        transport.set_next_measurement_error(TransportError::NotSubscribed);
        for _ in 0..5 {
            session.on_tick(&mut transport);
        }
        assert!(transport.measurements().is_empty());

        for _ in 0..5 {
            session.on_tick(&mut transport);
        }
        assert_eq!(transport.measurements().len(), 1);
    }

    #[test]
    fn profile_timer_tracks_the_active_profile_period() {
        // Pace kept quiet so the stride lengths stay at the profile minimums
        let config = SessionConfig {
            pace_ticks: 1000,
            ..test_config()
        };
        let (mut session, mut transport) = connected_session(config);

        // Walking period 2: strides on ticks 2 and 4
        for _ in 0..4 {
            session.on_tick(&mut transport);
        }
        assert_eq!(session.simulator().total_distance_cm(), 2 * 65);

        // Switching mid-countdown changes the *next* period only
        session.set_profile(ProfileKind::Running);
        for _ in 0..2 {
            session.on_tick(&mut transport);
        }
        let after_switch = session.simulator().total_distance_cm();
        assert_eq!(after_switch, 2 * 65 + running::STRIDE_LEN_MIN as u64);

        // From here strides need the running period of 3
        for _ in 0..2 {
            session.on_tick(&mut transport);
        }
        assert_eq!(session.simulator().total_distance_cm(), after_switch);
        session.on_tick(&mut transport);
        assert_eq!(
            session.simulator().total_distance_cm(),
            after_switch + running::STRIDE_LEN_MIN as u64
        );
    }

    #[test]
    fn odometer_accumulates_live_stride_lengths() {
        // Pace and profile interleave; the odometer must equal the sum of
        // the stride length current at each stride, wraparounds included
        let config = SessionConfig {
            walking_profile_ticks: 1,
            pace_ticks: 2,
            ..test_config()
        };
        let (mut session, mut transport) = connected_session(config);

        let mut expected = 0u64;
        for _ in 0..60 {
            expected += session.simulator().inst_stride_len() as u64;
            session.on_tick(&mut transport);
        }
        assert_eq!(session.simulator().total_distance_cm(), expected);
    }

    #[test]
    fn profile_switch_resets_pace_and_flags_keeps_odometer() {
        let (mut session, mut transport) = connected_session(test_config());
        for _ in 0..20 {
            session.on_tick(&mut transport);
        }
        let distance = session.simulator().total_distance_cm();
        assert!(distance > 0);

        session.set_profile(ProfileKind::Running);
        assert_eq!(session.simulator().inst_cadence(), running::CADENCE_MIN);
        assert_eq!(
            session.simulator().inst_stride_len(),
            running::STRIDE_LEN_MIN
        );
        assert!(session
            .simulator()
            .flags()
            .contains(MeasurementFlags::WALKING_RUNNING_STATUS));
        assert_eq!(session.simulator().total_distance_cm(), distance);
    }

    #[test]
    fn profile_change_requires_connection() {
        let mut session = RscSession::new(test_config());
        session.set_profile(ProfileKind::Running);
        assert_eq!(session.simulator().kind(), ProfileKind::Walking);
    }

    #[test]
    fn disconnect_suspends_the_grid() {
        let (mut session, mut transport) = connected_session(test_config());
        session.set_notifications_enabled(true);

        session.on_disconnect();
        for _ in 0..50 {
            session.on_tick(&mut transport);
        }
        assert_eq!(session.simulator().total_distance_cm(), 0);
        assert!(transport.measurements().is_empty());
    }

    #[test]
    fn reconnect_restarts_timers_staggered() {
        let config = test_config();
        let (mut session, mut transport) = connected_session(config.clone());
        session.set_notifications_enabled(true);

        // Leave the timers mid-flight
        for _ in 0..7 {
            session.on_tick(&mut transport);
        }
        session.on_disconnect();
        session.on_connect();

        // Skip cycle: nothing may fire on the first tick back
        let distance = session.simulator().total_distance_cm();
        let stride = session.simulator().inst_stride_len();
        let sent = transport.measurements().len();
        session.on_tick(&mut transport);
        assert_eq!(session.simulator().total_distance_cm(), distance);
        assert_eq!(session.simulator().inst_stride_len(), stride);
        assert_eq!(transport.measurements().len(), sent);

        // Periods are pairwise distinct, so each later tick fires at most
        // one timer; the first stride lands a full period after the resume
        for _ in 0..config.walking_profile_ticks {
            session.on_tick(&mut transport);
        }
        assert_eq!(
            session.simulator().total_distance_cm(),
            distance + stride as u64
        );
    }

    #[test]
    fn first_tick_after_resume_fires_at_most_one_timer() {
        let config = test_config();
        let (mut session, mut transport) = connected_session(config);
        session.set_notifications_enabled(true);

        session.on_disconnect();
        session.on_connect();
        session.on_tick(&mut transport); // skip cycle

        // Tick 1 of the restarted grid: profile (period 2) has not fired,
        // pace (3) has not, notification (5) has not
        session.on_tick(&mut transport);
        assert_eq!(session.simulator().total_distance_cm(), 0);
        assert_eq!(session.simulator().inst_cadence(), walking::CADENCE_MIN);
        assert!(transport.measurements().is_empty());
    }

    #[test]
    fn control_point_response_survives_reconnect_until_indicated() {
        let (mut session, mut transport) = connected_session(test_config());

        session.on_control_point_write(&mut transport, 0x04, &[]);
        session.on_disconnect();
        session.on_connect();
        session.set_indications_enabled(true);

        session.on_tick(&mut transport);
        assert_eq!(transport.responses().len(), 1);
        assert_eq!(transport.responses()[0][1], 0x04);
    }
}

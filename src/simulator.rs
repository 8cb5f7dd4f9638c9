//! Synthetic athlete simulation
//!
//! Produces the walking/running motion data the sensor reports. A profile
//! tick completes one simulated stride (distance and speed update); a pace
//! tick nudges cadence and stride length along a sawtooth inside the active
//! profile's bounds.

use crate::config::{running, walking};
use crate::rsc::measurement::{MeasurementFlags, RscMeasurement};
use crate::rsc::units::{cm_to_decimeters, speed_fixed_point};

/// Active gait profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Walking,
    Running,
}

impl ProfileKind {
    /// Cadence bounds in strides per minute
    pub fn cadence_bounds(self) -> (u8, u8) {
        match self {
            ProfileKind::Walking => (walking::CADENCE_MIN, walking::CADENCE_MAX),
            ProfileKind::Running => (running::CADENCE_MIN, running::CADENCE_MAX),
        }
    }

    /// Stride length bounds in centimetres
    pub fn stride_bounds(self) -> (u16, u16) {
        match self {
            ProfileKind::Walking => (walking::STRIDE_LEN_MIN, walking::STRIDE_LEN_MAX),
            ProfileKind::Running => (running::STRIDE_LEN_MIN, running::STRIDE_LEN_MAX),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ProfileKind::Walking => ProfileKind::Running,
            ProfileKind::Running => ProfileKind::Walking,
        }
    }
}

/// Simulated motion state
///
/// Cadence and stride length stay inside the active profile's bounds; the
/// odometer only ever grows, surviving profile switches.
#[derive(Debug, Clone)]
pub struct ProfileSimulator {
    kind: ProfileKind,
    inst_cadence: u8,
    inst_stride_len: u16,
    total_distance_cm: u64,
    inst_speed: u16,
    flags: MeasurementFlags,
}

impl ProfileSimulator {
    /// Start out walking at the profile minimums with a zeroed odometer
    pub fn new() -> Self {
        let kind = ProfileKind::Walking;
        let (cadence_min, _) = kind.cadence_bounds();
        let (stride_min, _) = kind.stride_bounds();
        Self {
            kind,
            inst_cadence: cadence_min,
            inst_stride_len: stride_min,
            total_distance_cm: 0,
            inst_speed: 0,
            flags: MeasurementFlags::new(),
        }
    }

    pub fn kind(&self) -> ProfileKind {
        self.kind
    }

    pub fn inst_cadence(&self) -> u8 {
        self.inst_cadence
    }

    pub fn inst_stride_len(&self) -> u16 {
        self.inst_stride_len
    }

    pub fn total_distance_cm(&self) -> u64 {
        self.total_distance_cm
    }

    pub fn flags(&self) -> MeasurementFlags {
        self.flags
    }

    /// One stride completed: extend the odometer and refresh the speed
    pub fn on_profile_tick(&mut self) {
        self.total_distance_cm += self.inst_stride_len as u64;
        self.inst_speed = speed_fixed_point(self.inst_cadence, self.inst_stride_len);
    }

    /// Advance the gait sawtooth.
    ///
    /// Stride length and cadence move independently: each climbs by one per
    /// tick and wraps to its profile minimum once its maximum is reached, so
    /// the two fields wrap on different ticks.
    pub fn on_pace_tick(&mut self) {
        let (stride_min, stride_max) = self.kind.stride_bounds();
        self.inst_stride_len = if self.inst_stride_len >= stride_max {
            stride_min
        } else {
            self.inst_stride_len + 1
        };

        let (cadence_min, cadence_max) = self.kind.cadence_bounds();
        self.inst_cadence = if self.inst_cadence >= cadence_max {
            cadence_min
        } else {
            self.inst_cadence + 1
        };
    }

    /// Switch gait. Cadence and stride length restart at the new profile's
    /// minimums and the walking/running status flag follows; the odometer is
    /// untouched.
    pub fn set_profile(&mut self, kind: ProfileKind) {
        let (cadence_min, _) = kind.cadence_bounds();
        let (stride_min, _) = kind.stride_bounds();

        self.kind = kind;
        self.inst_cadence = cadence_min;
        self.inst_stride_len = stride_min;
        self.flags.set_running(kind == ProfileKind::Running);

        log::info!("profile switched to {:?}", kind);
    }

    /// Odometer override from the set-cumulative-value procedure; the wire
    /// carries decimetres, the accumulator counts centimetres.
    pub fn set_total_distance_dm(&mut self, distance_dm: u32) {
        self.total_distance_cm = distance_dm as u64 * crate::config::units::CM_PER_DM as u64;
    }

    /// Snapshot for the measurement characteristic
    pub fn measurement(&self) -> RscMeasurement {
        RscMeasurement {
            flags: self.flags,
            inst_speed: self.inst_speed,
            inst_cadence: self.inst_cadence,
            inst_stride_len: self.inst_stride_len,
            total_distance_dm: cm_to_decimeters(self.total_distance_cm) as u32,
        }
    }
}

impl Default for ProfileSimulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{running, walking};

    #[test]
    fn starts_walking_at_minimums() {
        let sim = ProfileSimulator::new();
        assert_eq!(sim.kind(), ProfileKind::Walking);
        assert_eq!(sim.inst_cadence(), walking::CADENCE_MIN);
        assert_eq!(sim.inst_stride_len(), walking::STRIDE_LEN_MIN);
        assert_eq!(sim.total_distance_cm(), 0);
        assert_eq!(sim.measurement().inst_speed, 0);
    }

    #[test]
    fn profile_tick_accumulates_and_refreshes_speed() {
        let mut sim = ProfileSimulator::new();
        sim.on_profile_tick();
        assert_eq!(sim.total_distance_cm(), walking::STRIDE_LEN_MIN as u64);
        assert_eq!(sim.measurement().inst_speed, 443);

        sim.on_profile_tick();
        assert_eq!(sim.total_distance_cm(), 2 * walking::STRIDE_LEN_MIN as u64);
    }

    #[test]
    fn cadence_sawtooth_wraps_at_maximum() {
        for kind in [ProfileKind::Walking, ProfileKind::Running] {
            let mut sim = ProfileSimulator::new();
            sim.set_profile(kind);
            let (min, max) = kind.cadence_bounds();

            for expected in min + 1..=max {
                sim.on_pace_tick();
                assert_eq!(sim.inst_cadence(), expected);
            }

            // The tick that would exceed the maximum wraps to the minimum
            sim.on_pace_tick();
            assert_eq!(sim.inst_cadence(), min);
        }
    }

    #[test]
    fn stride_sawtooth_wraps_at_maximum() {
        for kind in [ProfileKind::Walking, ProfileKind::Running] {
            let mut sim = ProfileSimulator::new();
            sim.set_profile(kind);
            let (min, max) = kind.stride_bounds();

            for _ in min..max {
                sim.on_pace_tick();
            }
            assert_eq!(sim.inst_stride_len(), max);

            sim.on_pace_tick();
            assert_eq!(sim.inst_stride_len(), min);
        }
    }

    #[test]
    fn pace_fields_wrap_independently() {
        // Walking spans differ: 16 cadence values vs 21 stride values
        let mut sim = ProfileSimulator::new();
        let cadence_span = (walking::CADENCE_MAX - walking::CADENCE_MIN) as u16;

        for _ in 0..=cadence_span {
            sim.on_pace_tick();
        }
        assert_eq!(sim.inst_cadence(), walking::CADENCE_MIN);
        assert_eq!(
            sim.inst_stride_len(),
            walking::STRIDE_LEN_MIN + cadence_span + 1
        );
    }

    #[test]
    fn pace_never_leaves_profile_bounds() {
        let mut sim = ProfileSimulator::new();
        sim.set_profile(ProfileKind::Running);

        for _ in 0..200 {
            sim.on_pace_tick();
            assert!(sim.inst_cadence() >= running::CADENCE_MIN);
            assert!(sim.inst_cadence() <= running::CADENCE_MAX);
            assert!(sim.inst_stride_len() >= running::STRIDE_LEN_MIN);
            assert!(sim.inst_stride_len() <= running::STRIDE_LEN_MAX);
        }
    }

    #[test]
    fn switching_profile_keeps_odometer() {
        let mut sim = ProfileSimulator::new();
        for _ in 0..5 {
            sim.on_pace_tick();
            sim.on_profile_tick();
        }
        let distance = sim.total_distance_cm();
        assert!(distance > 0);

        sim.set_profile(ProfileKind::Running);
        assert_eq!(sim.total_distance_cm(), distance);
        assert_eq!(sim.inst_cadence(), running::CADENCE_MIN);
        assert_eq!(sim.inst_stride_len(), running::STRIDE_LEN_MIN);
    }

    #[test]
    fn status_flag_follows_profile() {
        let mut sim = ProfileSimulator::new();
        assert!(!sim
            .flags()
            .contains(MeasurementFlags::WALKING_RUNNING_STATUS));

        sim.set_profile(ProfileKind::Running);
        assert!(sim
            .flags()
            .contains(MeasurementFlags::WALKING_RUNNING_STATUS));

        sim.set_profile(ProfileKind::Walking);
        assert!(!sim
            .flags()
            .contains(MeasurementFlags::WALKING_RUNNING_STATUS));
    }

    #[test]
    fn odometer_override_scales_decimeters_up() {
        let mut sim = ProfileSimulator::new();
        sim.set_total_distance_dm(12345);
        assert_eq!(sim.total_distance_cm(), 123_450);
        assert_eq!(sim.measurement().total_distance_dm, 12345);
    }

    #[test]
    fn measurement_reports_decimeters_truncated() {
        let mut sim = ProfileSimulator::new();
        // 65 cm strides: 3 strides = 195 cm = 19.5 dm
        sim.on_profile_tick();
        sim.on_profile_tick();
        sim.on_profile_tick();
        assert_eq!(sim.measurement().total_distance_dm, 19);
    }
}

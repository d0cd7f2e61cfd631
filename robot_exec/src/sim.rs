//! # Simulation
//!
//! Software stand-ins for the drivetrain hardware and the robot's other mechanisms. The simulator
//! is used by the executable when no hardware is attached, and by the tests to run DriveCtrl and
//! BalanceCtrl in closed loop. It provides:
//!
//! - `SimDriveIo` - integrates the demanded module states into module positions, a gyro heading
//!   and a ground truth pose, and derives the pitch from a charge station model.
//! - `SimMechanism` - elevator altitude, arm extension and the autonomous flag, set directly.
//!
//! Module demands are followed perfectly, there is no motor or traction model.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::Deserialize;

use crate::drive_ctrl::{
    DriveIo, MechanismStatus, ModuleGeometry, ModulePosition, ModuleState, Pose2D,
    SwerveKinematics, NUM_MODULES,
};
use util::maths::clamp;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// See-saw model of the charge station along the field X axis.
///
/// While the robot is on the station the platform tilts about the pivot, nose up before the pivot
/// and nose down after it.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ChargeStation {
    /// Field X of the near edge of the station.
    ///
    /// Units: meters
    pub start_x_m: f64,

    /// Field X of the pivot.
    ///
    /// Units: meters
    pub pivot_x_m: f64,

    /// Field X of the far edge of the station.
    ///
    /// Units: meters
    pub end_x_m: f64,

    /// Change in pitch per meter of travel away from the pivot.
    ///
    /// Units: degrees/meter
    pub tilt_gain_deg_per_m: f64,

    /// Maximum tilt of the platform in either direction.
    ///
    /// Units: degrees
    pub max_tilt_deg: f64,
}

/// Simulated drivetrain.
#[derive(Clone, Debug)]
pub struct SimDriveIo {
    kinematics: SwerveKinematics,

    time_s: f64,

    /// Gyro yaw, unwrapped like a real gyro.
    heading_deg: f64,
    turn_rate_dps: f64,

    /// Set to override the charge station model.
    fixed_pitch_deg: Option<f64>,
    station: Option<ChargeStation>,

    /// Module frame demands, as last applied.
    applied: [ModuleState; NUM_MODULES],

    /// Module frame positions.
    positions: [ModulePosition; NUM_MODULES],

    true_pose: Pose2D,
}

/// Simulated mechanism positions.
#[derive(Clone, Copy, Debug)]
pub struct SimMechanism {
    pub autonomous: bool,
    pub altitude: f64,
    pub extension: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl ChargeStation {
    /// Pitch of a robot whose centre is at the given field X.
    ///
    /// Units: degrees
    pub fn pitch_at(&self, x_m: f64) -> f64 {
        if x_m < self.start_x_m || x_m > self.end_x_m {
            return 0.0;
        }

        clamp(
            self.tilt_gain_deg_per_m * (self.pivot_x_m - x_m),
            -self.max_tilt_deg,
            self.max_tilt_deg,
        )
    }
}

impl Default for ChargeStation {
    fn default() -> Self {
        Self {
            start_x_m: 1.0,
            pivot_x_m: 2.2,
            end_x_m: 3.4,
            tilt_gain_deg_per_m: 12.5,
            max_tilt_deg: 15.0,
        }
    }
}

impl SimDriveIo {
    /// Create a simulator on flat ground, with the robot at the origin and the modules pointing
    /// forward.
    pub fn new(geometry: [ModuleGeometry; NUM_MODULES]) -> Self {
        let mut applied = [ModuleState::default(); NUM_MODULES];
        let mut positions = [ModulePosition::default(); NUM_MODULES];
        for i in 0..NUM_MODULES {
            applied[i] = ModuleState::new(0.0, geometry[i].angular_offset_rad);
            positions[i] = ModulePosition::new(0.0, applied[i].angle_rad);
        }

        Self {
            kinematics: SwerveKinematics::new(geometry),
            time_s: 0.0,
            heading_deg: 0.0,
            turn_rate_dps: 0.0,
            fixed_pitch_deg: None,
            station: None,
            applied,
            positions,
            true_pose: Pose2D::default(),
        }
    }

    /// Add a charge station to the field.
    pub fn with_charge_station(mut self, station: ChargeStation) -> Self {
        self.station = Some(station);
        self
    }

    /// Advance the simulation, moving the robot with the last applied demands.
    pub fn step(&mut self, dt_s: f64) {
        if !dt_s.is_finite() || dt_s <= 0.0 {
            return;
        }

        // Chassis frame states for the forward kinematics
        let geometry = self.kinematics.geometry();
        let mut chassis = [ModuleState::default(); NUM_MODULES];
        for i in 0..NUM_MODULES {
            chassis[i] = ModuleState::new(
                self.applied[i].speed_ms,
                self.applied[i].angle_rad - geometry[i].angular_offset_rad,
            );
        }
        let vel = self.kinematics.to_chassis_velocity(&chassis);

        // Integrate in the field frame about the mid-step heading
        let mid_heading_rad = self.true_pose.heading_rad + 0.5 * vel.angular_rads * dt_s;
        let delta = Rotation2::new(mid_heading_rad) * Vector2::new(vel.forward_ms, vel.sideways_ms);

        self.true_pose = Pose2D::new(
            self.true_pose.x_m + delta.x * dt_s,
            self.true_pose.y_m + delta.y * dt_s,
            self.true_pose.heading_rad + vel.angular_rads * dt_s,
        );

        self.turn_rate_dps = vel.angular_rads.to_degrees();
        self.heading_deg += self.turn_rate_dps * dt_s;

        for (position, state) in self.positions.iter_mut().zip(self.applied.iter()) {
            position.distance_m += state.speed_ms * dt_s;
            position.angle_rad = state.angle_rad;
        }

        self.time_s += dt_s;
    }

    /// Override the gyro heading, as if the gyro had drifted.
    pub fn set_heading_deg(&mut self, heading_deg: f64) {
        self.heading_deg = heading_deg;
    }

    /// Fix the pitch to a value, or return to the charge station model with `None`.
    pub fn set_pitch_deg(&mut self, pitch_deg: Option<f64>) {
        self.fixed_pitch_deg = pitch_deg;
    }

    /// Move the robot without driving, the module encoders are not changed.
    pub fn set_position(&mut self, x_m: f64, y_m: f64) {
        self.true_pose = Pose2D::new(x_m, y_m, self.true_pose.heading_rad);
    }

    /// Module frame demands last applied.
    pub fn applied_states(&self) -> [ModuleState; NUM_MODULES] {
        self.applied
    }

    pub fn true_pose(&self) -> Pose2D {
        self.true_pose
    }
}

impl DriveIo for SimDriveIo {
    fn now_s(&self) -> f64 {
        self.time_s
    }

    fn read_heading_deg(&self) -> f64 {
        self.heading_deg
    }

    fn read_pitch_deg(&self) -> f64 {
        match (self.fixed_pitch_deg, self.station) {
            (Some(p), _) => p,
            (None, Some(s)) => s.pitch_at(self.true_pose.x_m),
            (None, None) => 0.0,
        }
    }

    fn read_turn_rate_dps(&self) -> f64 {
        self.turn_rate_dps
    }

    fn read_module_positions(&self) -> [ModulePosition; NUM_MODULES] {
        self.positions
    }

    fn apply_module_state(&mut self, index: usize, state: ModuleState) {
        match self.applied.get_mut(index) {
            Some(s) => *s = ModuleState::new(state.speed_ms, state.angle_rad),
            None => log::warn!("SimDriveIo ignoring demand for unknown module {}", index),
        }
    }

    fn reset_heading(&mut self) {
        self.heading_deg = 0.0;
    }

    fn reset_module_encoders(&mut self) {
        for position in self.positions.iter_mut() {
            position.distance_m = 0.0;
        }
    }
}

impl Default for SimMechanism {
    /// Teleop, elevator raised and arm retracted.
    fn default() -> Self {
        Self {
            autonomous: false,
            altitude: 10.0,
            extension: 0.0,
        }
    }
}

impl MechanismStatus for SimMechanism {
    fn is_autonomous(&self) -> bool {
        self.autonomous
    }

    fn altitude(&self) -> f64 {
        self.altitude
    }

    fn extension(&self) -> f64 {
        self.extension
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn geometry() -> [ModuleGeometry; NUM_MODULES] {
        crate::drive_ctrl::Params::default().validate().unwrap()
    }

    #[test]
    fn test_charge_station_profile() {
        let station = ChargeStation::default();

        assert_eq!(station.pitch_at(0.5), 0.0);
        assert_eq!(station.pitch_at(2.2), 0.0);
        assert_eq!(station.pitch_at(1.0), 15.0);
        assert!((station.pitch_at(2.6) + 5.0).abs() < 1e-9);
        assert_eq!(station.pitch_at(3.4), -15.0);
        assert_eq!(station.pitch_at(3.5), 0.0);
    }

    #[test]
    fn test_step_follows_demands() {
        let geometry = geometry();
        let mut sim = SimDriveIo::new(geometry);

        // Every module pointing chassis left at 1 m/s
        for i in 0..NUM_MODULES {
            sim.apply_module_state(
                i,
                ModuleState::new(1.0, std::f64::consts::FRAC_PI_2 + geometry[i].angular_offset_rad),
            );
        }
        for _ in 0..10 {
            sim.step(0.1);
        }

        let pose = sim.true_pose();
        assert!(pose.x_m.abs() < 1e-9);
        assert!((pose.y_m - 1.0).abs() < 1e-9);
        assert!((sim.now_s() - 1.0).abs() < 1e-9);
        assert!((sim.read_module_positions()[0].distance_m - 1.0).abs() < 1e-9);

        sim.reset_module_encoders();
        assert_eq!(sim.read_module_positions()[3].distance_m, 0.0);
    }

    #[test]
    fn test_pitch_sources() {
        let mut sim = SimDriveIo::new(geometry()).with_charge_station(ChargeStation::default());
        sim.set_position(3.0, 0.0);
        assert!((sim.read_pitch_deg() + 10.0).abs() < 1e-9);

        sim.set_pitch_deg(Some(-3.0));
        assert_eq!(sim.read_pitch_deg(), -3.0);

        sim.set_pitch_deg(None);
        sim.set_position(0.0, 0.0);
        assert_eq!(sim.read_pitch_deg(), 0.0);
    }
}

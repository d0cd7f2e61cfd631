//! Hardware capability interfaces for DriveCtrl
//!
//! DriveCtrl never owns device drivers directly. The sensors and actuators it
//! needs are injected through these traits, so the same controller runs
//! against real hardware, the simulator or a test double.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{ModulePosition, ModuleState, NUM_MODULES};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Sensors and actuators of the drivetrain.
///
/// All reads are expected to be non-blocking and return the last known value.
pub trait DriveIo {
    /// Monotonic control clock.
    ///
    /// Units: seconds
    fn now_s(&self) -> f64;

    /// Gyro yaw, counter-clockwise positive, not necessarily wrapped.
    ///
    /// Units: degrees
    fn read_heading_deg(&self) -> f64;

    /// Gyro pitch.
    ///
    /// Units: degrees
    fn read_pitch_deg(&self) -> f64;

    /// Gyro yaw rate.
    ///
    /// Units: degrees/second
    fn read_turn_rate_dps(&self) -> f64;

    /// Cumulative drive distance and steer angle of each module, angles in
    /// the module's own frame.
    fn read_module_positions(&self) -> [ModulePosition; NUM_MODULES];

    /// Demand a state from one module, angle in the module's own frame.
    fn apply_module_state(&mut self, index: usize, state: ModuleState);

    /// Zero the gyro yaw.
    fn reset_heading(&mut self);

    /// Zero the drive encoders of all modules.
    fn reset_module_encoders(&mut self);
}

/// Read-only view of the robot's other mechanisms.
pub trait MechanismStatus {
    /// True while the robot is in the autonomous period.
    fn is_autonomous(&self) -> bool;

    /// Current elevator altitude.
    fn altitude(&self) -> f64;

    /// Current arm extension position.
    fn extension(&self) -> f64;
}

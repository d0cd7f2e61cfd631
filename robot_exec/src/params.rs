//! # Robot Executable Parameters
//!
//! This module provides parameters for the robot executable, which runs the control core against
//! the simulated drivetrain.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::sim::ChargeStation;
use crate::teleop::{JoystickInput, TeleopParams};
use util::logger::LogParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RobotExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Terminal and log file levels.
    #[serde(default)]
    pub log: LogParams,

    /// Sleep out the remainder of each cycle. When false the simulation runs as fast as possible.
    pub realtime: bool,

    /// Length of the autonomous period. The balance command is cancelled if it has not finished
    /// by then.
    ///
    /// Units: seconds
    pub auto_duration_s: f64,

    /// Field X the robot starts the autonomous period at.
    ///
    /// Units: meters
    pub start_x_m: f64,

    pub charge_station: ChargeStation,

    pub teleop: TeleopParams,

    /// Joystick inputs replayed during the teleoperated period, in order.
    #[serde(default)]
    pub teleop_script: Vec<TeleopPhase>,
}

/// A joystick input held for a fixed time.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TeleopPhase {
    /// Units: seconds
    pub duration_s: f64,

    #[serde(default)]
    pub input: JoystickInput,

    /// Elevator altitude reported during the phase.
    pub altitude: Option<f64>,

    /// Arm extension reported during the phase.
    pub extension: Option<f64>,
}

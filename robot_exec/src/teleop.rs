//! # Teleoperated driving
//!
//! Maps the driver's joysticks onto drive commands. The left stick translates the robot, the right
//! stick X axis rotates it. Stick axes follow the usual gamepad convention of +Y being down and +X
//! being right, so both are inverted to get forward and left positive.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use serde::Deserialize;

use crate::command::Command;
use crate::drive_ctrl::{DriveCmd, DriveCtrl, DriveIo, MechanismStatus};
use util::maths::lin_map;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Raw driver controller state for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct JoystickInput {
    #[serde(default)]
    pub left_x: f64,

    #[serde(default)]
    pub left_y: f64,

    #[serde(default)]
    pub right_x: f64,

    /// Speed limit button held.
    #[serde(default)]
    pub speed_limit: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct TeleopParams {
    /// Stick deflection below which the input is ignored, [0, 1).
    pub deadband: f64,

    /// Translation speed as a fraction of the profile maximum.
    pub speed: f64,

    /// Drive relative to the field rather than the robot.
    pub field_relative: bool,
}

/// Default drive command, active whenever nothing else is using the drivetrain.
#[derive(Clone, Debug)]
pub struct TeleopDrive {
    params: TeleopParams,
    input: JoystickInput,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TeleopError {
    #[error("Deadband must be in [0, 1), found {0}")]
    InvalidDeadband(f64),

    #[error("Teleop speed must be in (0, 1], found {0}")]
    InvalidSpeed(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Default for TeleopParams {
    fn default() -> Self {
        Self {
            deadband: 0.05,
            speed: 1.0,
            field_relative: true,
        }
    }
}

impl TeleopDrive {
    pub fn new(params: TeleopParams) -> Result<Self, TeleopError> {
        if !(params.deadband >= 0.0 && params.deadband < 1.0) {
            return Err(TeleopError::InvalidDeadband(params.deadband));
        }

        if !(params.speed > 0.0 && params.speed <= 1.0) {
            return Err(TeleopError::InvalidSpeed(params.speed));
        }

        Ok(Self {
            params,
            input: JoystickInput::default(),
        })
    }

    /// Latch the controller state to use on the next cycle.
    pub fn set_input(&mut self, input: JoystickInput) {
        self.input = input;
    }

    pub fn input(&self) -> JoystickInput {
        self.input
    }

    /// Convert a controller state into a rate limited drive command.
    pub fn to_drive_cmd(&self, input: &JoystickInput) -> DriveCmd {
        let deadband = self.params.deadband;

        DriveCmd {
            speed_limit: input.speed_limit,
            speed: self.params.speed,
            forward: -apply_deadband(input.left_y, deadband),
            sideways: -apply_deadband(input.left_x, deadband),
            rotation: -apply_deadband(input.right_x, deadband),
            field_relative: self.params.field_relative,
            rate_limit: true,
        }
    }
}

impl<Io, Mech> Command<DriveCtrl<Io, Mech>> for TeleopDrive
where
    Io: DriveIo,
    Mech: MechanismStatus,
{
    fn execute(&mut self, drive: &mut DriveCtrl<Io, Mech>) {
        let cmd = self.to_drive_cmd(&self.input);
        trace!("TeleopDrive command: {:?}", cmd);
        drive.drive(cmd);
    }

    fn end(&mut self, drive: &mut DriveCtrl<Io, Mech>, _interrupted: bool) {
        drive.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Zero any value within `deadband` of zero and rescale the remainder so the output still spans
/// [-1, 1].
pub fn apply_deadband(value: f64, deadband: f64) -> f64 {
    if value.abs() <= deadband {
        0.0
    }
    else {
        lin_map((deadband, 1.0), (0.0, 1.0), value.abs()).copysign(value)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_apply_deadband() {
        assert_eq!(apply_deadband(0.04, 0.05), 0.0);
        assert_eq!(apply_deadband(-0.05, 0.05), 0.0);
        assert_eq!(apply_deadband(1.0, 0.05), 1.0);
        assert_eq!(apply_deadband(-1.0, 0.05), -1.0);
        assert!((apply_deadband(0.525, 0.05) - 0.5).abs() < 1e-12);
        assert_eq!(apply_deadband(0.3, 0.0), 0.3);
    }

    #[test]
    fn test_stick_mapping() {
        let teleop = TeleopDrive::new(TeleopParams::default()).unwrap();

        // Stick pushed up and to the left, twisted right
        let cmd = teleop.to_drive_cmd(&JoystickInput {
            left_x: -1.0,
            left_y: -1.0,
            right_x: 1.0,
            speed_limit: true,
        });

        assert_eq!(cmd.forward, 1.0);
        assert_eq!(cmd.sideways, 1.0);
        assert_eq!(cmd.rotation, -1.0);
        assert!(cmd.speed_limit);
        assert!(cmd.rate_limit);
        assert!(cmd.field_relative);

        // Centred sticks with a little noise
        let cmd = teleop.to_drive_cmd(&JoystickInput {
            left_x: 0.02,
            left_y: -0.01,
            ..JoystickInput::default()
        });
        assert_eq!(cmd.forward, 0.0);
        assert_eq!(cmd.sideways, 0.0);
    }

    #[test]
    fn test_rejects_bad_params() {
        let params = TeleopParams {
            deadband: 1.0,
            ..TeleopParams::default()
        };
        assert_eq!(
            TeleopDrive::new(params).unwrap_err(),
            TeleopError::InvalidDeadband(1.0)
        );
    }
}

//! # Robot library.
//!
//! Control core of the swerve drive robot. This library allows the executable, the benches and the
//! integration tests to access items defined inside the robot crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Charge station balance control - drives onto the station and stops once it is level
pub mod balance_ctrl;

/// Command scheduling - runs a behaviour against a subsystem with a guaranteed end
pub mod command;

/// Drive control - converts drive requests into swerve module demands and tracks the pose
pub mod drive_ctrl;

/// Parameters for the robot executable
pub mod params;

/// Simulation - software stand-ins for the drivetrain and mechanisms
pub mod sim;

/// Teleoperated driving - maps the driver's joysticks onto drive commands
pub mod teleop;

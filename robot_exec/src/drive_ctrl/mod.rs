//! Drive control module
//!
//! Converts driver and autonomous drive requests into swerve module demands,
//! and tracks the robot's pose from wheel and gyro odometry.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod io;
mod kinematics;
mod odometry;
mod params;
mod slew;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use io::*;
pub use kinematics::*;
pub use odometry::*;
pub use params::*;
pub use slew::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of swerve modules on the robot.
pub const NUM_MODULES: usize = 4;

/// Index of the front left module.
pub const FRONT_LEFT: usize = 0;

/// Index of the front right module.
pub const FRONT_RIGHT: usize = 1;

/// Index of the rear left module.
pub const REAR_LEFT: usize = 2;

/// Index of the rear right module.
pub const REAR_RIGHT: usize = 3;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while creating a DriveCtrl.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Invalid drive parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Invalid slew limiter: {0}")]
    InvalidSlewLimiter(#[from] SlewLimiterError),
}

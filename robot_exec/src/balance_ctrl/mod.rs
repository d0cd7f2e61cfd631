//! Charge station balance control module
//!
//! Drives the robot up the charge station, detects the platform tipping over
//! and eases the robot back until it settles near level.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while creating a BalanceCtrl.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BalanceCtrlError {
    #[error("On station speed must be in (0, 1], found {0}")]
    InvalidSpeed(f64),

    #[error("Damping factor must be in (0, 1), found {0}")]
    InvalidDamping(f64),

    #[error("Balanced band [{0}, {1}] deg is empty or not finite")]
    InvalidBand(f64, f64),

    #[error("Tip threshold must be finite, found {0}")]
    InvalidTipThreshold(f64),

    #[error("Travel direction `{0}` must be +1 or -1, found {1}")]
    InvalidTravelDir(&'static str, f64),
}

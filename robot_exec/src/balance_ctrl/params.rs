//! Parameters structure for BalanceCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::BalanceCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for charge station balancing.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Params {
    /// Speed while approaching the tipping point, as a fraction of the full
    /// drive speed.
    pub on_station_speed: f64,

    /// Applied to `on_station_speed` once the station has tipped.
    pub damping_factor: f64,

    /// The station counts as tipped when the pitch is strictly below this.
    ///
    /// Units: degrees
    pub tip_threshold_deg: f64,

    /// Inclusive pitch band in which the robot counts as balanced, lower
    /// bound first.
    ///
    /// Units: degrees
    pub balanced_band_deg: [f64; 2],

    /// Forward component commanded while the pitch is above the tip
    /// threshold.
    pub level_travel_dir: f64,

    /// Forward component commanded while the pitch is below the tip
    /// threshold.
    pub tipped_travel_dir: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), BalanceCtrlError> {
        if !(self.on_station_speed > 0.0 && self.on_station_speed <= 1.0) {
            return Err(BalanceCtrlError::InvalidSpeed(self.on_station_speed));
        }

        if !(self.damping_factor > 0.0 && self.damping_factor < 1.0) {
            return Err(BalanceCtrlError::InvalidDamping(self.damping_factor));
        }

        if !self.tip_threshold_deg.is_finite() {
            return Err(BalanceCtrlError::InvalidTipThreshold(self.tip_threshold_deg));
        }

        let [low, high] = self.balanced_band_deg;
        if !(low.is_finite() && high.is_finite() && low <= high) {
            return Err(BalanceCtrlError::InvalidBand(low, high));
        }

        for &(name, dir) in [
            ("level_travel_dir", self.level_travel_dir),
            ("tipped_travel_dir", self.tipped_travel_dir),
        ]
        .iter()
        {
            if dir != 1.0 && dir != -1.0 {
                return Err(BalanceCtrlError::InvalidTravelDir(name, dir));
            }
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            on_station_speed: 0.3,
            damping_factor: 0.5,
            tip_threshold_deg: -10.0,
            balanced_band_deg: [-10.0, -0.5],
            level_travel_dir: 1.0,
            tipped_travel_dir: -1.0,
        }
    }
}

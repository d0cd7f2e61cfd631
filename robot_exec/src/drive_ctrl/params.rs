//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::f64::consts::PI;
use thiserror::Error;

use super::{ModuleGeometry, NUM_MODULES};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest allowed sum of module offsets for the layout to count as symmetric.
const SYMMETRY_TOLERANCE_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- FULL PROFILE ----

    /// Maximum chassis translation speed, also the desaturation limit.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Maximum chassis turn rate.
    ///
    /// Units: radians/second
    pub max_angular_speed_rads: f64,

    // ---- LIMITED PROFILE ----

    /// Maximum translation speed when the limited profile is selected.
    ///
    /// Units: meters/second
    pub max_limited_speed_ms: f64,

    /// Maximum turn rate when the limited profile is selected.
    ///
    /// Units: radians/second
    pub max_limited_angular_speed_rads: f64,

    // ---- SLEW RATES ----

    /// Rate at which the translation direction may change at unit magnitude.
    /// The actual rate is divided by the current magnitude.
    ///
    /// Units: radians/second
    pub direction_slew_rate_rads: f64,

    /// Rate of change of the translation magnitude.
    ///
    /// Units: fraction/second
    pub magnitude_slew_rate: f64,

    /// Rate of change of the rotation demand.
    ///
    /// Units: fraction/second
    pub rotational_slew_rate: f64,

    // ---- SAFE DRIVING ENVELOPE ----

    /// Altitude above which the elevator is safe for full speed driving.
    pub altitude_safe_min: f64,

    /// Extension below which the arm is safe for full speed driving.
    pub extension_safe_max: f64,

    // ---- GYRO ----

    /// Invert the sign of the gyro turn rate.
    #[serde(default)]
    pub gyro_reversed: bool,

    // ---- GEOMETRY ----

    /// Module geometry, in the order front left, front right, rear left, rear
    /// right.
    pub modules: Vec<ModuleGeometry>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons the drive parameters can be rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("Expected 4 module geometries, found {0}")]
    WrongModuleCount(usize),

    #[error("Module layout is not symmetric about the robot centre (offset sum [{0:.4}, {1:.4}] m)")]
    AsymmetricGeometry(f64, f64),

    #[error("Parameter `{0}` must be finite and greater than zero, found {1}")]
    NotPositive(&'static str, f64),

    #[error("Safe driving envelope bound `{0}` must be finite, found {1}")]
    NotFinite(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters and return the module geometry as a fixed array.
    ///
    /// The magnitude and rotational slew rates are checked by the
    /// [`SlewLimiter`](super::SlewLimiter)s built from them in `DriveCtrl::new`.
    pub fn validate(&self) -> Result<[ModuleGeometry; NUM_MODULES], ParamsError> {
        let positive = [
            ("max_speed_ms", self.max_speed_ms),
            ("max_angular_speed_rads", self.max_angular_speed_rads),
            ("max_limited_speed_ms", self.max_limited_speed_ms),
            ("max_limited_angular_speed_rads", self.max_limited_angular_speed_rads),
            ("direction_slew_rate_rads", self.direction_slew_rate_rads),
        ];

        for &(name, value) in positive.iter() {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParamsError::NotPositive(name, value));
            }
        }

        for &(name, value) in [
            ("altitude_safe_min", self.altitude_safe_min),
            ("extension_safe_max", self.extension_safe_max),
        ]
        .iter()
        {
            if !value.is_finite() {
                return Err(ParamsError::NotFinite(name, value));
            }
        }

        if self.modules.len() != NUM_MODULES {
            return Err(ParamsError::WrongModuleCount(self.modules.len()));
        }

        let mut geometry = [ModuleGeometry::default(); NUM_MODULES];
        geometry.copy_from_slice(&self.modules);

        let sum_x: f64 = geometry.iter().map(|g| g.pos_m_rb[0]).sum();
        let sum_y: f64 = geometry.iter().map(|g| g.pos_m_rb[1]).sum();
        if sum_x.abs() > SYMMETRY_TOLERANCE_M || sum_y.abs() > SYMMETRY_TOLERANCE_M {
            return Err(ParamsError::AsymmetricGeometry(sum_x, sum_y));
        }

        Ok(geometry)
    }
}

impl Default for Params {
    /// Competition robot values, 26.5 inch square wheelbase.
    fn default() -> Self {
        let half_base_m = 0.3366;

        Self {
            max_speed_ms: 4.8,
            max_angular_speed_rads: 2.0 * PI,
            max_limited_speed_ms: 1.5,
            max_limited_angular_speed_rads: PI,
            direction_slew_rate_rads: 1.2,
            magnitude_slew_rate: 1.8,
            rotational_slew_rate: 2.0,
            altitude_safe_min: 5.0,
            extension_safe_max: 20.0,
            gyro_reversed: false,
            modules: vec![
                ModuleGeometry::new(half_base_m, half_base_m, -PI / 2.0),
                ModuleGeometry::new(half_base_m, -half_base_m, 0.0),
                ModuleGeometry::new(-half_base_m, half_base_m, PI),
                ModuleGeometry::new(-half_base_m, -half_base_m, PI / 2.0),
            ],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_wrong_module_count() {
        let mut params = Params::default();
        params.modules.pop();

        assert_eq!(params.validate(), Err(ParamsError::WrongModuleCount(3)));

        params.modules.push(ModuleGeometry::new(0.3, 0.3, 0.0));
        params.modules.push(ModuleGeometry::new(-0.3, -0.3, 0.0));
        assert_eq!(params.validate(), Err(ParamsError::WrongModuleCount(5)));
    }

    #[test]
    fn test_rejects_asymmetric_geometry() {
        let mut params = Params::default();
        params.modules[0].pos_m_rb = [0.5, 0.3366];

        assert!(matches!(
            params.validate(),
            Err(ParamsError::AsymmetricGeometry(_, _))
        ));
    }

    #[test]
    fn test_rejects_non_positive_speeds_and_rates() {
        let mut params = Params::default();
        params.max_speed_ms = 0.0;
        assert_eq!(
            params.validate(),
            Err(ParamsError::NotPositive("max_speed_ms", 0.0))
        );

        let mut params = Params::default();
        params.direction_slew_rate_rads = -1.2;
        assert_eq!(
            params.validate(),
            Err(ParamsError::NotPositive("direction_slew_rate_rads", -1.2))
        );
    }

    #[test]
    fn test_parse_from_toml() {
        let params: Params = util::params::parse(
            r#"
            max_speed_ms = 4.8
            max_angular_speed_rads = 6.28
            max_limited_speed_ms = 1.5
            max_limited_angular_speed_rads = 3.14
            direction_slew_rate_rads = 1.2
            magnitude_slew_rate = 1.8
            rotational_slew_rate = 2.0
            altitude_safe_min = 5.0
            extension_safe_max = 20.0

            [[modules]]
            pos_m_rb = [0.3, 0.3]
            angular_offset_rad = -1.5708

            [[modules]]
            pos_m_rb = [0.3, -0.3]
            angular_offset_rad = 0.0

            [[modules]]
            pos_m_rb = [-0.3, 0.3]
            angular_offset_rad = 3.1416

            [[modules]]
            pos_m_rb = [-0.3, -0.3]
            angular_offset_rad = 1.5708
            "#,
        )
        .unwrap();

        assert!(!params.gyro_reversed);
        let geometry = params.validate().unwrap();
        assert_eq!(geometry[1].pos_m_rb, [0.3, -0.3]);
    }
}

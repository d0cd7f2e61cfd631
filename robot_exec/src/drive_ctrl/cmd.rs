//! Commands passed into DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A request to drive the robot, expressed as fractions of the available
/// speed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveCmd {
    /// Force the limited speed profile.
    pub speed_limit: bool,

    /// Translation speed as a fraction of the profile's maximum, [-1, 1].
    pub speed: f64,

    /// Forward component of the translation direction, [-1, 1].
    pub forward: f64,

    /// Sideways (left positive) component of the translation direction,
    /// [-1, 1].
    pub sideways: f64,

    /// Rotation as a fraction of the profile's maximum turn rate,
    /// counter-clockwise positive, [-1, 1].
    pub rotation: f64,

    /// Interpret the translation in the field frame rather than the robot
    /// frame.
    pub field_relative: bool,

    /// Slew rate limit the translation and rotation.
    pub rate_limit: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCmd {
    /// A robot-relative zero velocity command with no rate limiting.
    pub fn stop() -> Self {
        Self::default()
    }

    /// Rotate on the spot at the given fraction of the maximum turn rate.
    pub fn turn(rotation: f64) -> Self {
        Self {
            rotation,
            field_relative: true,
            ..Self::default()
        }
    }

    /// Clamp every fraction into [-1, 1], replacing NaN with zero.
    ///
    /// Returns the sanitised command and whether anything had to change.
    pub fn sanitised(&self) -> (Self, bool) {
        let cmd = Self {
            speed: sanitise_fraction(self.speed),
            forward: sanitise_fraction(self.forward),
            sideways: sanitise_fraction(self.sideways),
            rotation: sanitise_fraction(self.rotation),
            ..*self
        };

        // NaN != NaN, so a NaN input always shows up as modified
        let modified = cmd != *self;

        (cmd, modified)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn sanitise_fraction(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    }
    else {
        clamp(value, -1.0, 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sanitised() {
        let cmd = DriveCmd {
            speed: 1.5,
            forward: -3.0,
            sideways: f64::NAN,
            rotation: 0.25,
            ..DriveCmd::default()
        };

        let (clean, modified) = cmd.sanitised();

        assert!(modified);
        assert_eq!(clean.speed, 1.0);
        assert_eq!(clean.forward, -1.0);
        assert_eq!(clean.sideways, 0.0);
        assert_eq!(clean.rotation, 0.25);
    }

    #[test]
    fn test_sanitised_in_range_unmodified() {
        let cmd = DriveCmd {
            speed: 0.5,
            forward: 1.0,
            rotation: -1.0,
            rate_limit: true,
            ..DriveCmd::default()
        };

        assert_eq!(cmd.sanitised(), (cmd, false));
    }
}

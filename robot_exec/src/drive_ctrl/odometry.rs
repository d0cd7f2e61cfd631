//! Wheel and gyro odometry
//!
//! The pose is integrated from the change in each module's drive distance
//! since the previous update. Heading comes from the gyro, corrected by an
//! offset captured whenever the pose is reset.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};

// Internal
use super::NUM_MODULES;
use util::maths::wrap_angle;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cumulative position of a swerve module.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModulePosition {
    /// Total distance driven by the wheel since the encoders were reset.
    ///
    /// Units: meters
    pub distance_m: f64,

    /// Steer angle of the module.
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// Position and heading of the robot on the field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose2D {
    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Counter-clockwise positive, wrapped into (-pi, pi].
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// Pose estimator for the swerve drive.
#[derive(Clone, Debug)]
pub struct SwerveOdometry {
    pose: Pose2D,

    /// Added to the gyro heading to get the pose heading.
    heading_offset_rad: f64,

    last_positions: [ModulePosition; NUM_MODULES],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModulePosition {
    pub fn new(distance_m: f64, angle_rad: f64) -> Self {
        Self {
            distance_m,
            angle_rad,
        }
    }
}

impl Pose2D {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            x_m,
            y_m,
            heading_rad: wrap_angle(heading_rad),
        }
    }
}

impl SwerveOdometry {
    /// Create a new odometry starting from the given pose.
    pub fn new(
        gyro_heading_rad: f64,
        positions: [ModulePosition; NUM_MODULES],
        initial_pose: Pose2D,
    ) -> Self {
        let mut odom = Self {
            pose: Pose2D::default(),
            heading_offset_rad: 0.0,
            last_positions: positions,
        };
        odom.reset(gyro_heading_rad, positions, initial_pose);

        odom
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Reset the pose, capturing the current gyro heading and module
    /// positions as the new reference.
    pub fn reset(
        &mut self,
        gyro_heading_rad: f64,
        positions: [ModulePosition; NUM_MODULES],
        pose: Pose2D,
    ) {
        self.pose = Pose2D::new(pose.x_m, pose.y_m, pose.heading_rad);
        self.heading_offset_rad = wrap_angle(self.pose.heading_rad - gyro_heading_rad);
        self.last_positions = positions;
    }

    /// Keep the pose heading continuous when the gyro reference is moved from
    /// `old_gyro_rad` to `new_gyro_rad` without the robot turning.
    pub fn rebase_heading(&mut self, old_gyro_rad: f64, new_gyro_rad: f64) {
        self.heading_offset_rad = wrap_angle(self.heading_offset_rad + old_gyro_rad - new_gyro_rad);
    }

    /// Use new module positions as the reference without moving the pose, for
    /// example after the drive encoders have been zeroed.
    pub fn rebase_positions(&mut self, positions: [ModulePosition; NUM_MODULES]) {
        self.last_positions = positions;
    }

    /// Integrate the change in module positions into the pose.
    ///
    /// Module angles must be in the robot body frame.
    pub fn update(
        &mut self,
        gyro_heading_rad: f64,
        positions: [ModulePosition; NUM_MODULES],
    ) -> Pose2D {
        let heading_rad = wrap_angle(gyro_heading_rad + self.heading_offset_rad);

        // Average displacement of the modules in the robot frame. For a
        // symmetric layout the rotational components cancel out.
        let mut sum = Vector2::<f64>::zeros();
        for (current, last) in positions.iter().zip(self.last_positions.iter()) {
            let delta_m = current.distance_m - last.distance_m;
            sum += Rotation2::new(current.angle_rad) * Vector2::new(delta_m, 0.0);
        }
        let delta_rb = sum / NUM_MODULES as f64;

        // Rotate into the field frame using the mid-cycle heading
        let half_turn = wrap_angle(heading_rad - self.pose.heading_rad) / 2.0;
        let delta_field = Rotation2::new(self.pose.heading_rad + half_turn) * delta_rb;

        self.pose = Pose2D::new(
            self.pose.x_m + delta_field.x,
            self.pose.y_m + delta_field.y,
            heading_rad,
        );
        self.last_positions = positions;

        self.pose
    }
}

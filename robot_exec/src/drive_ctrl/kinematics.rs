//! Swerve module kinematics
//!
//! Converts a chassis velocity into the speed and angle of each of the four
//! swerve modules, and back again.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Matrix3, Rotation2, Vector2, Vector3};
use serde::Deserialize;

// Internal
use super::NUM_MODULES;
use util::maths::{clamp, wrap_angle};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Velocity of the robot chassis.
///
/// Frame: Robot body unless stated otherwise, +X forward, +Y left, +Z up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChassisVelocity {
    /// Units: meters/second
    pub forward_ms: f64,

    /// Units: meters/second
    pub sideways_ms: f64,

    /// Counter-clockwise positive.
    ///
    /// Units: radians/second
    pub angular_rads: f64,
}

/// Demanded state of a single swerve module.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModuleState {
    /// Signed wheel speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Steer angle, always wrapped into (-pi, pi].
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// Fixed geometry of a swerve module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct ModuleGeometry {
    /// Position of the steer axis in the robot body frame.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub pos_m_rb: [f64; 2],

    /// Angle between the module's own zero and the chassis forward direction.
    ///
    /// Units: radians
    pub angular_offset_rad: f64,
}

/// Kinematics model for a four module swerve drive.
#[derive(Clone, Debug)]
pub struct SwerveKinematics {
    geometry: [ModuleGeometry; NUM_MODULES],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ChassisVelocity {
    pub fn new(forward_ms: f64, sideways_ms: f64, angular_rads: f64) -> Self {
        Self {
            forward_ms,
            sideways_ms,
            angular_rads,
        }
    }

    /// Build a robot frame velocity from a field frame translation.
    ///
    /// The translation is rotated by the negative of the robot's heading
    /// (counter-clockwise positive, radians).
    pub fn from_field_relative(
        forward_ms: f64,
        sideways_ms: f64,
        angular_rads: f64,
        heading_rad: f64,
    ) -> Self {
        let robot = Rotation2::new(-wrap_angle(heading_rad)) * Vector2::new(forward_ms, sideways_ms);

        Self::new(robot.x, robot.y, angular_rads)
    }

    /// True if every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.forward_ms == 0.0 && self.sideways_ms == 0.0 && self.angular_rads == 0.0
    }
}

impl ModuleState {
    /// Create a new state, wrapping the angle into (-pi, pi].
    pub fn new(speed_ms: f64, angle_rad: f64) -> Self {
        Self {
            speed_ms,
            angle_rad: wrap_angle(angle_rad),
        }
    }

    /// Velocity vector of the module in the frame its angle is measured in.
    pub fn velocity(&self) -> Vector2<f64> {
        Rotation2::new(self.angle_rad) * Vector2::new(self.speed_ms, 0.0)
    }
}

impl ModuleGeometry {
    pub fn new(x_m: f64, y_m: f64, angular_offset_rad: f64) -> Self {
        Self {
            pos_m_rb: [x_m, y_m],
            angular_offset_rad,
        }
    }
}

impl SwerveKinematics {
    pub fn new(geometry: [ModuleGeometry; NUM_MODULES]) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &[ModuleGeometry; NUM_MODULES] {
        &self.geometry
    }

    /// Inverse kinematics, chassis velocity to raw (not desaturated) module
    /// states.
    ///
    /// Each module's velocity is the chassis translation plus the tangential
    /// velocity of the rotation at the module's offset from the centre.
    pub fn to_module_states(&self, velocity: ChassisVelocity) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];

        for (state, geom) in states.iter_mut().zip(self.geometry.iter()) {
            let [x_m, y_m] = geom.pos_m_rb;

            let vx = velocity.forward_ms - velocity.angular_rads * y_m;
            let vy = velocity.sideways_ms + velocity.angular_rads * x_m;

            *state = ModuleState::new(vx.hypot(vy), vy.atan2(vx));
        }

        states
    }

    /// Forward kinematics, module states to the least-squares chassis
    /// velocity.
    pub fn to_chassis_velocity(&self, states: &[ModuleState; NUM_MODULES]) -> ChassisVelocity {
        let mut ata = Matrix3::<f64>::zeros();
        let mut atb = Vector3::<f64>::zeros();

        for (state, geom) in states.iter().zip(self.geometry.iter()) {
            let [x_m, y_m] = geom.pos_m_rb;
            let v = state.velocity();

            let row_x = Vector3::new(1.0, 0.0, -y_m);
            let row_y = Vector3::new(0.0, 1.0, x_m);

            ata += row_x * row_x.transpose() + row_y * row_y.transpose();
            atb += row_x * v.x + row_y * v.y;
        }

        match ata.try_inverse() {
            Some(inv) => {
                let sol = inv * atb;
                ChassisVelocity::new(sol[0], sol[1], sol[2])
            }
            None => ChassisVelocity::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale all module speeds down uniformly so that none exceeds `max_speed_ms`.
///
/// Angles are unchanged. Returns `true` if the states were scaled.
pub fn desaturate(states: &mut [ModuleState; NUM_MODULES], max_speed_ms: f64) -> bool {
    let max_observed = states
        .iter()
        .map(|s| s.speed_ms.abs())
        .fold(0.0f64, f64::max);

    if max_observed == 0.0 || max_observed <= max_speed_ms {
        return false;
    }

    // Clamped as well, the scaled fastest module can round to just above the
    // limit
    let scale = max_speed_ms / max_observed;
    for state in states.iter_mut() {
        state.speed_ms = clamp(state.speed_ms * scale, -max_speed_ms, max_speed_ms);
    }

    true
}

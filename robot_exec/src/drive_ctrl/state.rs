//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;
use std::f64::consts::PI;

// Internal
use super::{
    desaturate,
    ChassisVelocity, DriveCmd, DriveCtrlError, DriveIo, MechanismStatus,
    ModuleGeometry, ModulePosition, ModuleState, Params, Pose2D, SlewLimiter,
    SwerveKinematics, SwerveOdometry,
    FRONT_LEFT, FRONT_RIGHT, NUM_MODULES, REAR_LEFT, REAR_RIGHT};
use util::maths::{angle_difference, step_towards_circular, wrap_angle};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Requested direction changes smaller than this are steered towards while the
/// magnitude ramps to the new request.
const DIR_SMALL_CHANGE_RAD: f64 = 0.45 * PI;

/// Requested direction changes larger than this are treated as a reversal: the
/// magnitude decays to zero before the direction flips.
const DIR_REVERSAL_RAD: f64 = 0.85 * PI;

/// Magnitude below which the translation counts as stopped for a reversal.
const MAG_EPSILON: f64 = 1e-4;

/// Direction slew rate used when the translation magnitude is zero, high
/// enough to be effectively instantaneous.
///
/// Units: radians/second
const INSTANT_DIR_SLEW_RATE_RADS: f64 = 500.0;

/// Module angles that form the X (locked) formation, in module order.
const LOCK_ANGLES_RAD: [f64; NUM_MODULES] = [PI / 4.0, -PI / 4.0, -PI / 4.0, PI / 4.0];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Swerve drive controller.
///
/// Owns the slew state, odometry and the injected hardware capabilities. All
/// methods are expected to be called from the single control loop thread.
pub struct DriveCtrl<Io, Mech> {
    params: Params,

    kinematics: SwerveKinematics,

    io: Io,
    mech: Mech,

    odometry: SwerveOdometry,

    mag_limiter: SlewLimiter,
    rot_limiter: SlewLimiter,

    /// Slewed translation direction.
    ///
    /// Units: radians
    current_translation_dir: f64,

    /// Slewed translation magnitude as a fraction of full speed.
    current_translation_mag: f64,

    /// Slewed rotation as a fraction of the profile turn rate.
    current_rotation: f64,

    /// Clock value of the last drive call.
    ///
    /// Units: seconds
    prev_time_s: f64,

    /// Robot frame chassis velocity sent to the kinematics last cycle.
    last_chassis_velocity: ChassisVelocity,

    /// Chassis frame module states last applied.
    last_states: [ModuleState; NUM_MODULES],

    /// True if the limited speed profile was used by the last drive call.
    limited_profile: bool,
}

/// Observation record emitted by [`DriveCtrl::periodic`] once per cycle.
///
/// Kept flat so it can be written straight to a CSV archive.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct DriveTelemetry {
    pub time_s: f64,

    pub pose_x_m: f64,
    pub pose_y_m: f64,
    pub pose_heading_rad: f64,

    pub gyro_heading_deg: f64,
    pub pitch_deg: f64,

    pub limited_profile: bool,
    pub safe_to_drive_fast: bool,

    pub translation_dir_rad: f64,
    pub translation_mag: f64,
    pub rotation: f64,

    pub cmd_forward_ms: f64,
    pub cmd_sideways_ms: f64,
    pub cmd_angular_rads: f64,

    pub fl_speed_ms: f64,
    pub fl_angle_rad: f64,
    pub fr_speed_ms: f64,
    pub fr_angle_rad: f64,
    pub rl_speed_ms: f64,
    pub rl_angle_rad: f64,
    pub rr_speed_ms: f64,
    pub rr_angle_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<Io, Mech> DriveCtrl<Io, Mech>
where
    Io: DriveIo,
    Mech: MechanismStatus,
{
    /// Create a new controller, validating the parameters.
    ///
    /// The pose starts at the origin and the slew state at rest.
    pub fn new(params: Params, io: Io, mech: Mech) -> Result<Self, DriveCtrlError> {
        let geometry = params.validate()?;

        let mag_limiter = SlewLimiter::new(params.magnitude_slew_rate)?;
        let rot_limiter = SlewLimiter::new(params.rotational_slew_rate)?;

        let odometry = SwerveOdometry::new(
            io.read_heading_deg().to_radians(),
            to_chassis_frame(&geometry, io.read_module_positions()),
            Pose2D::default(),
        );

        let prev_time_s = io.now_s();

        Ok(Self {
            params,
            kinematics: SwerveKinematics::new(geometry),
            io,
            mech,
            odometry,
            mag_limiter,
            rot_limiter,
            current_translation_dir: 0.0,
            current_translation_mag: 0.0,
            current_rotation: 0.0,
            prev_time_s,
            last_chassis_velocity: ChassisVelocity::default(),
            last_states: [ModuleState::default(); NUM_MODULES],
            limited_profile: false,
        })
    }

    // ---- DRIVING ----

    /// Drive the robot from a set of speed fractions.
    ///
    /// Returns the chassis frame module states that were applied.
    pub fn drive(&mut self, cmd: DriveCmd) -> [ModuleState; NUM_MODULES] {
        let (cmd, modified) = cmd.sanitised();
        if modified {
            warn!("DriveCtrl command out of range, clamped to {:?}", cmd);
        }

        let now_s = self.io.now_s();
        let elapsed_s = now_s - self.prev_time_s;
        self.prev_time_s = now_s;

        // Speed profile
        let limited = cmd.speed_limit || !self.is_within_safe_driving_limits();
        if limited != self.limited_profile {
            debug!(
                "DriveCtrl switching to the {} speed profile",
                if limited { "limited" } else { "full" }
            );
            self.limited_profile = limited;
        }

        let (max_speed_ms, max_angular_rads) = if limited {
            (self.params.max_limited_speed_ms, self.params.max_limited_angular_speed_rads)
        }
        else {
            (self.params.max_speed_ms, self.params.max_angular_speed_rads)
        };

        let (forward, sideways) = if cmd.rate_limit {
            self.slew_translation(cmd.forward, cmd.sideways, elapsed_s);
            self.current_rotation = self.rot_limiter.calculate(cmd.rotation, elapsed_s);

            (
                self.current_translation_mag * self.current_translation_dir.cos(),
                self.current_translation_mag * self.current_translation_dir.sin(),
            )
        }
        else {
            self.pass_through(cmd.forward, cmd.sideways, cmd.rotation);

            (cmd.forward, cmd.sideways)
        };

        let forward_ms = forward * cmd.speed * max_speed_ms;
        let sideways_ms = sideways * cmd.speed * max_speed_ms;
        let angular_rads = self.current_rotation * max_angular_rads;

        let velocity = if cmd.field_relative {
            ChassisVelocity::from_field_relative(
                forward_ms,
                sideways_ms,
                angular_rads,
                self.heading_rad(),
            )
        }
        else {
            ChassisVelocity::new(forward_ms, sideways_ms, angular_rads)
        };

        self.apply_chassis_velocity(velocity)
    }

    /// Drive the robot, taking each field of [`DriveCmd`] as an argument.
    #[allow(clippy::too_many_arguments)]
    pub fn drive_with(
        &mut self,
        speed_limit: bool,
        speed: f64,
        forward: f64,
        sideways: f64,
        rotation: f64,
        field_relative: bool,
        rate_limit: bool,
    ) -> [ModuleState; NUM_MODULES] {
        self.drive(DriveCmd {
            speed_limit,
            speed,
            forward,
            sideways,
            rotation,
            field_relative,
            rate_limit,
        })
    }

    /// Command zero velocity, holding the current module angles.
    pub fn stop(&mut self) -> [ModuleState; NUM_MODULES] {
        self.drive(DriveCmd::stop())
    }

    /// Rotate on the spot at a fraction of the profile turn rate.
    pub fn turn(&mut self, rotation: f64) -> [ModuleState; NUM_MODULES] {
        self.drive(DriveCmd::turn(rotation))
    }

    /// Point the modules into an X to resist being pushed.
    pub fn lock(&mut self) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];
        for (state, &angle_rad) in states.iter_mut().zip(LOCK_ANGLES_RAD.iter()) {
            *state = ModuleState::new(0.0, angle_rad);
        }

        self.last_chassis_velocity = ChassisVelocity::default();
        self.apply_states(states);

        states
    }

    /// Apply externally computed chassis frame module states, for example
    /// from a trajectory follower.
    ///
    /// The states are desaturated to the full profile maximum speed first.
    pub fn set_module_states(
        &mut self,
        mut states: [ModuleState; NUM_MODULES],
    ) -> [ModuleState; NUM_MODULES] {
        if desaturate(&mut states, self.params.max_speed_ms) {
            trace!("DriveCtrl desaturated external module states");
        }

        self.last_chassis_velocity = self.kinematics.to_chassis_velocity(&states);
        self.apply_states(states);

        states
    }

    // ---- ODOMETRY AND SENSORS ----

    /// Cyclic update, call once per control cycle.
    ///
    /// Integrates the odometry and returns this cycle's telemetry.
    pub fn periodic(&mut self) -> DriveTelemetry {
        let gyro_heading_deg = self.io.read_heading_deg();
        let positions = self.read_chassis_positions();
        let pose = self.odometry.update(gyro_heading_deg.to_radians(), positions);

        let s = &self.last_states;

        DriveTelemetry {
            time_s: self.io.now_s(),
            pose_x_m: pose.x_m,
            pose_y_m: pose.y_m,
            pose_heading_rad: pose.heading_rad,
            gyro_heading_deg,
            pitch_deg: self.io.read_pitch_deg(),
            limited_profile: self.limited_profile,
            safe_to_drive_fast: self.is_within_safe_driving_limits(),
            translation_dir_rad: self.current_translation_dir,
            translation_mag: self.current_translation_mag,
            rotation: self.current_rotation,
            cmd_forward_ms: self.last_chassis_velocity.forward_ms,
            cmd_sideways_ms: self.last_chassis_velocity.sideways_ms,
            cmd_angular_rads: self.last_chassis_velocity.angular_rads,
            fl_speed_ms: s[FRONT_LEFT].speed_ms,
            fl_angle_rad: s[FRONT_LEFT].angle_rad,
            fr_speed_ms: s[FRONT_RIGHT].speed_ms,
            fr_angle_rad: s[FRONT_RIGHT].angle_rad,
            rl_speed_ms: s[REAR_LEFT].speed_ms,
            rl_angle_rad: s[REAR_LEFT].angle_rad,
            rr_speed_ms: s[REAR_RIGHT].speed_ms,
            rr_angle_rad: s[REAR_RIGHT].angle_rad,
        }
    }

    /// Current estimated pose.
    pub fn pose(&self) -> Pose2D {
        self.odometry.pose()
    }

    /// Set the pose without touching the gyro.
    pub fn reset_odometry(&mut self, pose: Pose2D) {
        let gyro_heading_rad = self.io.read_heading_deg().to_radians();
        let positions = self.read_chassis_positions();

        self.odometry.reset(gyro_heading_rad, positions, pose);
    }

    /// Zero the gyro and set the pose in one step.
    pub fn reset_pose_and_heading(&mut self, pose: Pose2D) {
        self.io.reset_heading();

        let positions = self.read_chassis_positions();
        self.odometry.reset(0.0, positions, pose);
    }

    /// Zero the gyro. The pose heading is kept continuous, only the field
    /// relative reference changes.
    pub fn zero_heading(&mut self) {
        let old_gyro_rad = self.io.read_heading_deg().to_radians();
        self.io.reset_heading();
        self.odometry.rebase_heading(old_gyro_rad, 0.0);
    }

    /// Zero the drive encoders without moving the pose.
    pub fn reset_encoders(&mut self) {
        self.io.reset_module_encoders();

        let positions = self.read_chassis_positions();
        self.odometry.rebase_positions(positions);
    }

    /// Gyro heading wrapped into (-180, 180].
    ///
    /// Units: degrees
    pub fn heading_deg(&self) -> f64 {
        self.heading_rad().to_degrees()
    }

    /// Gyro turn rate, sign corrected by the `gyro_reversed` parameter.
    ///
    /// Units: degrees/second
    pub fn turn_rate_dps(&self) -> f64 {
        let rate = self.io.read_turn_rate_dps();

        if self.params.gyro_reversed {
            -rate
        }
        else {
            rate
        }
    }

    /// Units: degrees
    pub fn pitch_deg(&self) -> f64 {
        self.io.read_pitch_deg()
    }

    /// True if the full speed profile may be used.
    ///
    /// Always true in autonomous. Otherwise the elevator must be above its
    /// safe altitude and the arm inside its safe extension.
    pub fn is_within_safe_driving_limits(&self) -> bool {
        let altitude_safe = self.mech.altitude() > self.params.altitude_safe_min;
        let extension_safe = self.mech.extension() < self.params.extension_safe_max;

        self.mech.is_autonomous() || (altitude_safe && extension_safe)
    }

    // ---- ACCESSORS ----

    pub fn io(&self) -> &Io {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut Io {
        &mut self.io
    }

    pub fn mech(&self) -> &Mech {
        &self.mech
    }

    pub fn mech_mut(&mut self) -> &mut Mech {
        &mut self.mech
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn current_translation_dir(&self) -> f64 {
        self.current_translation_dir
    }

    pub fn current_translation_mag(&self) -> f64 {
        self.current_translation_mag
    }

    pub fn current_rotation(&self) -> f64 {
        self.current_rotation
    }

    /// Chassis frame module states applied by the last command.
    pub fn last_module_states(&self) -> [ModuleState; NUM_MODULES] {
        self.last_states
    }

    pub fn last_chassis_velocity(&self) -> ChassisVelocity {
        self.last_chassis_velocity
    }

    // ---- PRIVATE ----

    fn heading_rad(&self) -> f64 {
        wrap_angle(self.io.read_heading_deg().to_radians())
    }

    /// Step the polar translation state towards the requested direction and
    /// magnitude.
    fn slew_translation(&mut self, forward: f64, sideways: f64, elapsed_s: f64) {
        let input_dir = sideways.atan2(forward);
        let input_mag = forward.hypot(sideways);

        // Turning is slower the faster the robot is moving
        let dir_slew_rate = if self.current_translation_mag != 0.0 {
            (self.params.direction_slew_rate_rads / self.current_translation_mag)
                .abs()
                .min(INSTANT_DIR_SLEW_RATE_RADS)
        }
        else {
            INSTANT_DIR_SLEW_RATE_RADS
        };

        let max_dir_step = if elapsed_s.is_finite() && elapsed_s > 0.0 {
            dir_slew_rate * elapsed_s
        }
        else {
            0.0
        };

        let angle_dif = angle_difference(input_dir, self.current_translation_dir);

        if angle_dif < DIR_SMALL_CHANGE_RAD {
            self.current_translation_dir =
                step_towards_circular(self.current_translation_dir, input_dir, max_dir_step);
            self.current_translation_mag = self.mag_limiter.calculate(input_mag, elapsed_s);
        }
        else if angle_dif > DIR_REVERSAL_RAD {
            if self.current_translation_mag > MAG_EPSILON {
                // Hold the direction until stopped
                self.current_translation_mag = self.mag_limiter.calculate(0.0, elapsed_s);
            }
            else {
                self.current_translation_dir = wrap_angle(self.current_translation_dir + PI);
                self.current_translation_mag = self.mag_limiter.calculate(input_mag, elapsed_s);
            }
        }
        else {
            self.current_translation_dir =
                step_towards_circular(self.current_translation_dir, input_dir, max_dir_step);
            self.current_translation_mag = self.mag_limiter.calculate(0.0, elapsed_s);
        }

        trace!(
            "DriveCtrl slewed translation: dir {:.3} rad, mag {:.3}",
            self.current_translation_dir,
            self.current_translation_mag
        );
    }

    /// Load the unlimited request into the slew state so that a following
    /// rate limited command starts from what was actually commanded.
    fn pass_through(&mut self, forward: f64, sideways: f64, rotation: f64) {
        let mag = forward.hypot(sideways);

        // A zero vector has no direction, keep the last one
        if mag != 0.0 {
            self.current_translation_dir = sideways.atan2(forward);
        }
        self.current_translation_mag = mag;
        self.mag_limiter.reset(mag);

        self.current_rotation = rotation;
        self.rot_limiter.reset(rotation);
    }

    fn apply_chassis_velocity(&mut self, velocity: ChassisVelocity) -> [ModuleState; NUM_MODULES] {
        let mut states = if velocity.is_zero() {
            // Hold the module angles rather than snapping them back to zero
            let mut held = self.last_states;
            for state in held.iter_mut() {
                state.speed_ms = 0.0;
            }
            held
        }
        else {
            self.kinematics.to_module_states(velocity)
        };

        if desaturate(&mut states, self.params.max_speed_ms) {
            trace!("DriveCtrl desaturated module states");
        }

        self.last_chassis_velocity = velocity;
        self.apply_states(states);

        trace!(
            "DriveCtrl output:\n    vel: {:?}\n    states: {:?}",
            velocity,
            states
        );

        states
    }

    /// Rotate chassis frame states into each module's frame and send them to
    /// the hardware.
    fn apply_states(&mut self, states: [ModuleState; NUM_MODULES]) {
        for (i, (state, geometry)) in states
            .iter()
            .zip(self.kinematics.geometry().iter())
            .enumerate()
        {
            self.io.apply_module_state(
                i,
                ModuleState::new(state.speed_ms, state.angle_rad + geometry.angular_offset_rad),
            );
        }

        self.last_states = states;
    }

    fn read_chassis_positions(&self) -> [ModulePosition; NUM_MODULES] {
        to_chassis_frame(self.kinematics.geometry(), self.io.read_module_positions())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Remove each module's angular offset from positions read in module frames.
fn to_chassis_frame(
    geometry: &[ModuleGeometry; NUM_MODULES],
    mut positions: [ModulePosition; NUM_MODULES],
) -> [ModulePosition; NUM_MODULES] {
    for (position, geometry) in positions.iter_mut().zip(geometry.iter()) {
        position.angle_rad = wrap_angle(position.angle_rad - geometry.angular_offset_rad);
    }

    positions
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_ctrl::SlewLimiterError;
    use crate::sim::{SimDriveIo, SimMechanism};

    const EPS: f64 = 1e-9;
    const DT_S: f64 = 0.02;

    type SimDriveCtrl = DriveCtrl<SimDriveIo, SimMechanism>;

    fn drive_ctrl() -> SimDriveCtrl {
        let params = Params::default();
        let io = SimDriveIo::new(params.validate().unwrap());

        DriveCtrl::new(params, io, SimMechanism::default()).unwrap()
    }

    /// Advance the simulation by one cycle and run the given command.
    fn cycle(ctrl: &mut SimDriveCtrl, cmd: DriveCmd) -> [ModuleState; NUM_MODULES] {
        ctrl.io_mut().step(DT_S);
        let states = ctrl.drive(cmd);
        ctrl.periodic();
        states
    }

    fn forward_cmd(forward: f64) -> DriveCmd {
        DriveCmd {
            speed: 1.0,
            forward,
            rate_limit: true,
            ..DriveCmd::default()
        }
    }

    #[test]
    fn test_new_rejects_bad_params() {
        let mut params = Params::default();
        params.modules.truncate(2);
        let io = SimDriveIo::new(Params::default().validate().unwrap());

        assert!(matches!(
            DriveCtrl::new(params, io, SimMechanism::default()),
            Err(DriveCtrlError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_direction_reversal_decelerates_first() {
        let mut ctrl = drive_ctrl();

        // Build up some forward speed
        for _ in 0..20 {
            cycle(&mut ctrl, forward_cmd(1.0));
        }
        let dir = ctrl.current_translation_dir();
        let mag = ctrl.current_translation_mag();
        assert!(dir.abs() < EPS);
        assert!(mag > MAG_EPSILON);

        // Request full reverse, a single cycle must hold the direction and
        // reduce the magnitude
        cycle(&mut ctrl, forward_cmd(-1.0));
        assert_eq!(ctrl.current_translation_dir(), dir);
        assert!(ctrl.current_translation_mag() < mag);

        // Keep requesting reverse until the direction flips
        let mut flipped = false;
        for _ in 0..200 {
            let prev_mag = ctrl.current_translation_mag();
            cycle(&mut ctrl, forward_cmd(-1.0));
            if ctrl.current_translation_dir() != dir {
                flipped = true;
                assert!(prev_mag <= MAG_EPSILON);
                break;
            }
            assert!(ctrl.current_translation_mag() <= prev_mag);
        }
        assert!(flipped);
        assert!((ctrl.current_translation_dir().abs() - PI).abs() < EPS);
    }

    #[test]
    fn test_new_rejects_bad_slew_rate() {
        let params = Params {
            rotational_slew_rate: 0.0,
            ..Params::default()
        };
        let io = SimDriveIo::new(params.validate().unwrap());

        assert!(matches!(
            DriveCtrl::new(params, io, SimMechanism::default()),
            Err(DriveCtrlError::InvalidSlewLimiter(SlewLimiterError::InvalidRate(r))) if r == 0.0
        ));
    }

    #[test]
    fn test_large_direction_change_steers_while_slowing() {
        let mut ctrl = drive_ctrl();

        for _ in 0..50 {
            cycle(&mut ctrl, forward_cmd(1.0));
        }
        assert_eq!(ctrl.current_translation_mag(), 1.0);

        // 90 degrees to the left, between the small change and reversal bands
        let left = DriveCmd {
            forward: 0.0,
            sideways: 1.0,
            ..forward_cmd(0.0)
        };
        let rate = Params::default().direction_slew_rate_rads;

        for i in 0..5 {
            let prev_dir = ctrl.current_translation_dir();
            let prev_mag = ctrl.current_translation_mag();
            cycle(&mut ctrl, left);

            let dir = ctrl.current_translation_dir();
            let mag = ctrl.current_translation_mag();
            assert!(dir > prev_dir, "cycle {}", i);
            assert!(dir - prev_dir <= rate / prev_mag * DT_S + EPS, "cycle {}", i);
            assert!(mag < prev_mag, "cycle {}", i);
            assert!(prev_mag - mag <= Params::default().magnitude_slew_rate * DT_S + EPS);
        }
    }

    #[test]
    fn test_rotation_is_slewed_linearly() {
        let mut ctrl = drive_ctrl();
        let cmd = DriveCmd {
            rotation: 1.0,
            rate_limit: true,
            ..DriveCmd::default()
        };
        let max_step = Params::default().rotational_slew_rate * DT_S;

        let mut prev = ctrl.current_rotation();
        for _ in 0..40 {
            cycle(&mut ctrl, cmd);
            let rotation = ctrl.current_rotation();
            assert!(rotation >= prev);
            assert!(rotation - prev <= max_step + 1e-12);
            prev = rotation;
        }

        assert_eq!(ctrl.current_rotation(), 1.0);
        assert!((ctrl.last_chassis_velocity().angular_rads - 2.0 * PI).abs() < EPS);
    }

    #[test]
    fn test_small_direction_change_is_slewed() {
        let mut ctrl = drive_ctrl();

        for _ in 0..50 {
            cycle(&mut ctrl, forward_cmd(1.0));
        }
        let mag = ctrl.current_translation_mag();

        // 45 degrees to the left
        cycle(&mut ctrl, DriveCmd {
            sideways: 1.0,
            ..forward_cmd(1.0)
        });

        let max_step = Params::default().direction_slew_rate_rads / mag * DT_S;
        let dir = ctrl.current_translation_dir();
        assert!(dir > 0.0);
        assert!(dir <= max_step + EPS);
    }

    #[test]
    fn test_pass_through_without_rate_limit() {
        let mut ctrl = drive_ctrl();

        ctrl.io_mut().step(DT_S);
        let states = ctrl.drive_with(false, 0.5, 1.0, 0.0, 0.0, false, false);

        for state in states.iter() {
            assert!((state.speed_ms - 0.5 * 4.8).abs() < EPS);
            assert!(state.angle_rad.abs() < EPS);
        }
        assert_eq!(ctrl.current_translation_mag(), 1.0);
    }

    #[test]
    fn test_field_relative_rotates_translation() {
        let mut ctrl = drive_ctrl();
        let cmd = DriveCmd {
            speed: 0.5,
            forward: 1.0,
            field_relative: true,
            ..DriveCmd::default()
        };

        ctrl.drive(cmd);
        let robot = ctrl.last_chassis_velocity();

        ctrl.io_mut().set_heading_deg(90.0);
        ctrl.drive(cmd);
        let field = ctrl.last_chassis_velocity();

        // Field forward is robot right when facing +90 degrees
        assert!((field.forward_ms - 0.0).abs() < EPS);
        assert!((field.sideways_ms + robot.forward_ms).abs() < EPS);
    }

    #[test]
    fn test_safety_gating() {
        let mut ctrl = drive_ctrl();
        assert!(ctrl.is_within_safe_driving_limits());

        // Elevator low and arm extended
        ctrl.mech_mut().altitude = 0.0;
        ctrl.mech_mut().extension = 50.0;
        assert!(!ctrl.is_within_safe_driving_limits());

        ctrl.mech_mut().autonomous = true;
        assert!(ctrl.is_within_safe_driving_limits());
    }

    #[test]
    fn test_unsafe_mechanism_selects_limited_profile() {
        let mut ctrl = drive_ctrl();
        ctrl.mech_mut().extension = 50.0;

        let states = ctrl.drive_with(false, 1.0, 1.0, 0.0, 0.0, false, false);
        for state in states.iter() {
            assert!((state.speed_ms - 1.5).abs() < EPS);
        }
        assert!(ctrl.periodic().limited_profile);

        // Speed limit request does the same with a safe mechanism
        ctrl.mech_mut().extension = 0.0;
        let states = ctrl.drive_with(true, 1.0, 1.0, 0.0, 0.0, false, false);
        assert!((states[0].speed_ms - 1.5).abs() < EPS);
    }

    #[test]
    fn test_lock_forms_x() {
        let mut ctrl = drive_ctrl();
        let states = ctrl.lock();

        let expected = [PI / 4.0, -PI / 4.0, -PI / 4.0, PI / 4.0];
        for (state, angle) in states.iter().zip(expected.iter()) {
            assert_eq!(state.speed_ms, 0.0);
            assert!((state.angle_rad - angle).abs() < EPS);
        }

        // Module frame includes the angular offset
        let applied = ctrl.io().applied_states();
        let geometry = Params::default().validate().unwrap();
        for i in 0..NUM_MODULES {
            let expected = wrap_angle(states[i].angle_rad + geometry[i].angular_offset_rad);
            assert!(angle_difference(applied[i].angle_rad, expected) < EPS);
        }
    }

    #[test]
    fn test_stop_holds_module_angles() {
        let mut ctrl = drive_ctrl();

        ctrl.drive_with(false, 1.0, 0.0, 1.0, 0.0, false, false);
        let states = ctrl.stop();

        for state in states.iter() {
            assert_eq!(state.speed_ms, 0.0);
            assert!((state.angle_rad - PI / 2.0).abs() < EPS);
        }
    }

    #[test]
    fn test_set_module_states_desaturates() {
        let mut ctrl = drive_ctrl();
        let states = ctrl.set_module_states([ModuleState::new(9.6, 0.0); NUM_MODULES]);

        for state in states.iter() {
            assert!((state.speed_ms - 4.8).abs() < EPS);
        }
        assert!((ctrl.last_chassis_velocity().forward_ms - 4.8).abs() < 1e-6);
    }

    #[test]
    fn test_odometry_tracks_sim() {
        let mut ctrl = drive_ctrl();

        for _ in 0..50 {
            cycle(&mut ctrl, DriveCmd {
                speed: 0.25,
                forward: 1.0,
                ..DriveCmd::default()
            });
        }

        let pose = ctrl.pose();
        let truth = ctrl.io().true_pose();
        assert!(pose.x_m > 0.0);
        assert!((pose.x_m - truth.x_m).abs() < 0.05);
        assert!(pose.y_m.abs() < 1e-6);
    }

    #[test]
    fn test_reset_pose_and_heading() {
        let mut ctrl = drive_ctrl();
        ctrl.io_mut().set_heading_deg(37.0);

        ctrl.reset_pose_and_heading(Pose2D::new(2.0, -1.0, PI / 2.0));
        assert_eq!(ctrl.heading_deg(), 0.0);

        ctrl.periodic();
        let pose = ctrl.pose();
        assert!((pose.x_m - 2.0).abs() < EPS);
        assert!((pose.y_m + 1.0).abs() < EPS);
        assert!((pose.heading_rad - PI / 2.0).abs() < EPS);
    }

    #[test]
    fn test_zero_heading_keeps_pose_heading() {
        let mut ctrl = drive_ctrl();
        ctrl.io_mut().set_heading_deg(30.0);
        ctrl.periodic();
        let before = ctrl.pose().heading_rad;

        ctrl.zero_heading();
        ctrl.periodic();

        assert_eq!(ctrl.heading_deg(), 0.0);
        assert!((ctrl.pose().heading_rad - before).abs() < EPS);
    }

    #[test]
    fn test_heading_and_turn_rate() {
        let params = Params {
            gyro_reversed: true,
            ..Params::default()
        };
        let io = SimDriveIo::new(params.validate().unwrap());
        let mut ctrl = DriveCtrl::new(params, io, SimMechanism::default()).unwrap();

        ctrl.io_mut().set_heading_deg(270.0);
        assert!((ctrl.heading_deg() + 90.0).abs() < 1e-9);

        ctrl.drive_with(false, 0.0, 0.0, 0.0, 0.5, false, false);
        ctrl.io_mut().step(DT_S);
        let expected = -(0.5 * 2.0 * PI).to_degrees();
        assert!((ctrl.turn_rate_dps() - expected).abs() < 1e-6);
    }
}

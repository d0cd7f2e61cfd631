//! Main robot-side executable entry point.
//!
//! # Architecture
//!
//! The executable runs one simulated match against the control core:
//!
//!     - Initialise the session, logging and parameters
//!     - Autonomous period:
//!         - Reset the pose and gyro at the starting position
//!         - Run the charge station balance command until balanced or out of time
//!     - Teleoperated period:
//!         - Replay the scripted joystick inputs through the teleop drive command
//!
//! Each cycle the simulation is advanced, the active command is stepped, the drive odometry is
//! updated and the telemetry of the cycle is archived.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use robot_lib::{
    balance_ctrl::{self, BalanceCtrl},
    command::{CommandRunner, RunnerState},
    drive_ctrl::{self, DriveCtrl, Pose2D},
    params::RobotExecParams,
    sim::{SimDriveIo, SimMechanism},
    teleop::TeleopDrive,
};
use util::{
    archive::Archiver,
    logger::logger_init,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const EXEC_PARAMS_FILE: &str = "robot_exec.toml";
const DRIVE_PARAMS_FILE: &str = "drive_ctrl.toml";
const BALANCE_PARAMS_FILE: &str = "balance_ctrl.toml";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

type SimDriveCtrl = DriveCtrl<SimDriveIo, SimMechanism>;

/// Fixed period cycle management.
struct CycleClock {
    period: Duration,
    realtime: bool,
    cycle_start: Instant,
    num_cycles: u64,
    num_consec_overruns: u64,
}

/// Telemetry archives of the session.
struct Archives {
    drive: Archiver,
    balance: Archiver,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("robot_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    // The executable parameters carry the log levels, so are loaded before
    // the logger
    let exec_params: RobotExecParams = util::params::load(EXEC_PARAMS_FILE)
        .wrap_err("Could not load robot_exec params")?;

    // Initialise logger
    logger_init(&exec_params.log, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Swerve Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let drive_params: drive_ctrl::Params = util::params::load(DRIVE_PARAMS_FILE)
        .wrap_err("Could not load drive_ctrl params")?;
    let balance_params: balance_ctrl::Params = util::params::load(BALANCE_PARAMS_FILE)
        .wrap_err("Could not load balance_ctrl params")?;

    if !(exec_params.cycle_period_s.is_finite() && exec_params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "Cycle period must be greater than zero, found {}", exec_params.cycle_period_s
        ));
    }

    session
        .snapshot_params(&[EXEC_PARAMS_FILE, DRIVE_PARAMS_FILE, BALANCE_PARAMS_FILE])
        .wrap_err("Failed to copy the parameters into the session")?;

    info!("Parameters loaded");

    // ---- INITIALISE MODULES ----

    let geometry = drive_params
        .validate()
        .wrap_err("Invalid drive_ctrl params")?;

    let mut io = SimDriveIo::new(geometry).with_charge_station(exec_params.charge_station);
    io.set_position(exec_params.start_x_m, 0.0);

    let mut drive = DriveCtrl::new(drive_params, io, SimMechanism::default())
        .wrap_err("Failed to initialise DriveCtrl")?;
    info!("DriveCtrl init complete");

    let balance = BalanceCtrl::new(balance_params)
        .wrap_err("Failed to initialise BalanceCtrl")?;
    let teleop = TeleopDrive::new(exec_params.teleop)
        .wrap_err("Failed to initialise TeleopDrive")?;

    let mut archives = Archives {
        drive: Archiver::from_path(&session, "drive_ctrl/telemetry.csv")
            .wrap_err("Failed to create the drive_ctrl archive")?,
        balance: Archiver::from_path(&session, "balance_ctrl/telemetry.csv")
            .wrap_err("Failed to create the balance_ctrl archive")?,
    };

    info!("Module initialisation complete\n");

    let mut clock = CycleClock::new(exec_params.cycle_period_s, exec_params.realtime);

    // ---- AUTONOMOUS ----

    info!("Beginning autonomous period\n");

    drive.mech_mut().autonomous = true;
    drive.reset_pose_and_heading(Pose2D::new(exec_params.start_x_m, 0.0, 0.0));

    let auto_cycles = clock.cycles_in(exec_params.auto_duration_s);
    let mut runner = CommandRunner::new("balance", balance);

    for _ in 0..auto_cycles {
        clock.start_cycle(&mut drive);

        let state = runner.step(&mut drive);

        archive_cycle(&mut archives.drive, drive.periodic());
        archive_cycle(&mut archives.balance, runner.command().telemetry());

        clock.end_cycle();

        if state.is_done() {
            break;
        }
    }

    if runner.state() == RunnerState::Running {
        warn!("Autonomous period ended before the robot balanced");
        runner.cancel(&mut drive);
    }

    let pose = drive.pose();
    info!(
        "Autonomous complete in state {:?}, pose ({:.3}, {:.3}, {:.3})\n",
        runner.command().state(),
        pose.x_m,
        pose.y_m,
        pose.heading_rad
    );

    // ---- TELEOPERATED ----

    info!("Beginning teleoperated period\n");

    drive.mech_mut().autonomous = false;

    let mut runner = CommandRunner::new("teleop", teleop);

    for (i, phase) in exec_params.teleop_script.iter().enumerate() {
        info!("Teleop phase {}: {:?}", i, phase.input);

        runner.command_mut().set_input(phase.input);
        if let Some(altitude) = phase.altitude {
            drive.mech_mut().altitude = altitude;
        }
        if let Some(extension) = phase.extension {
            drive.mech_mut().extension = extension;
        }

        for _ in 0..clock.cycles_in(phase.duration_s) {
            clock.start_cycle(&mut drive);

            runner.step(&mut drive);
            archive_cycle(&mut archives.drive, drive.periodic());

            clock.end_cycle();
        }
    }

    runner.cancel(&mut drive);

    // ---- SHUTDOWN ----

    let pose = drive.pose();
    let truth = drive.io().true_pose();
    info!(
        "Final pose ({:.3}, {:.3}, {:.3}), true pose ({:.3}, {:.3}, {:.3})",
        pose.x_m, pose.y_m, pose.heading_rad, truth.x_m, truth.y_m, truth.heading_rad
    );
    info!("Ran {} cycles", clock.num_cycles);
    info!("End of execution");

    Ok(())
}

/// Write a record to an archive, warning on failure.
fn archive_cycle<T: serde::Serialize>(archiver: &mut Archiver, record: T) {
    if let Err(e) = archiver.serialise(record) {
        warn!("Could not archive telemetry: {}", e);
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CycleClock {
    fn new(period_s: f64, realtime: bool) -> Self {
        Self {
            period: Duration::from_secs_f64(period_s),
            realtime,
            cycle_start: Instant::now(),
            num_cycles: 0,
            num_consec_overruns: 0,
        }
    }

    /// Number of whole cycles that fit into the given time.
    fn cycles_in(&self, duration_s: f64) -> u64 {
        (duration_s / self.period.as_secs_f64()).round().max(0.0) as u64
    }

    /// Mark the start of a cycle and advance the simulation by one period.
    fn start_cycle(&mut self, drive: &mut SimDriveCtrl) {
        self.cycle_start = Instant::now();
        drive.io_mut().step(self.period.as_secs_f64());
    }

    /// Sleep out the remainder of the cycle when running in real time.
    fn end_cycle(&mut self) {
        self.num_cycles += 1;

        if !self.realtime {
            return;
        }

        let cycle_dur = Instant::now() - self.cycle_start;

        match self.period.checked_sub(cycle_dur) {
            Some(d) => {
                self.num_consec_overruns = 0;
                thread::sleep(d);
            }
            None => {
                self.num_consec_overruns += 1;
                warn!(
                    "Cycle overran by {:.06} s ({} consecutive)",
                    cycle_dur.as_secs_f64() - self.period.as_secs_f64(),
                    self.num_consec_overruns
                );
            }
        }
    }
}

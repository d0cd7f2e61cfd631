//! Implementations for the BalanceCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::Serialize;

// Internal
use super::{BalanceCtrlError, Params};
use crate::command::Command;
use crate::drive_ctrl::{DriveCmd, DriveCtrl, DriveIo, MechanismStatus};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Progress of the robot across the charge station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BalanceState {
    /// Climbing the station at the on station speed, waiting for it to tip.
    Approaching,

    /// The station has tipped, moving at the damped speed until level.
    Descending,

    /// Settled near level. Terminal.
    Balanced,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Charge station balance controller.
///
/// Runs as a command against [`DriveCtrl`], or standalone through
/// [`BalanceCtrl::step`] which maps a pitch sample to a drive command.
#[derive(Clone, Debug)]
pub struct BalanceCtrl {
    params: Params,

    state: BalanceState,

    report: BalanceTelemetry,
}

/// Observation record of one balance cycle.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct BalanceTelemetry {
    pub num_cycles: u64,
    pub pitch_deg: f64,
    pub state: BalanceState,
    pub tipped: bool,
    pub speed: f64,
    pub travel_dir: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BalanceState {
    /// Transition table, evaluated once per cycle with that cycle's pitch.
    ///
    /// At most one transition happens per cycle and the state never moves
    /// backwards.
    pub fn next(self, pitch_deg: f64, params: &Params) -> Self {
        let [band_low, band_high] = params.balanced_band_deg;

        match self {
            BalanceState::Approaching if pitch_deg < params.tip_threshold_deg => {
                BalanceState::Descending
            }
            BalanceState::Descending if pitch_deg >= band_low && pitch_deg <= band_high => {
                BalanceState::Balanced
            }
            s => s,
        }
    }
}

impl Default for BalanceTelemetry {
    fn default() -> Self {
        Self {
            num_cycles: 0,
            pitch_deg: 0.0,
            state: BalanceState::Approaching,
            tipped: false,
            speed: 0.0,
            travel_dir: 0.0,
        }
    }
}

impl BalanceCtrl {
    pub fn new(params: Params) -> Result<Self, BalanceCtrlError> {
        params.validate()?;

        Ok(Self {
            params,
            state: BalanceState::Approaching,
            report: BalanceTelemetry::default(),
        })
    }

    /// Create a controller with the given on station speed and damping
    /// factor, using the default thresholds and travel directions.
    pub fn with_speed(on_station_speed: f64, damping_factor: f64) -> Result<Self, BalanceCtrlError> {
        Self::new(Params {
            on_station_speed,
            damping_factor,
            ..Params::default()
        })
    }

    /// Return to the start of the sequence.
    pub fn reset(&mut self) {
        self.state = BalanceState::Approaching;
        self.report = BalanceTelemetry::default();
    }

    /// Process one pitch sample and return the drive command for this cycle.
    ///
    /// Once balanced the command is always a stop.
    pub fn step(&mut self, pitch_deg: f64) -> DriveCmd {
        let prev_state = self.state;
        self.state = self.state.next(pitch_deg, &self.params);

        if self.state != prev_state {
            info!(
                "BalanceCtrl {:?} -> {:?} at pitch {:.2} deg",
                prev_state, self.state, pitch_deg
            );
        }

        let tipped = pitch_deg < self.params.tip_threshold_deg;
        let travel_dir = if tipped {
            self.params.tipped_travel_dir
        }
        else {
            self.params.level_travel_dir
        };

        let cmd = match self.state {
            BalanceState::Approaching => self.travel_cmd(self.params.on_station_speed, travel_dir),
            BalanceState::Descending => self.travel_cmd(
                self.params.on_station_speed * self.params.damping_factor,
                travel_dir,
            ),
            BalanceState::Balanced => DriveCmd::stop(),
        };

        self.report = BalanceTelemetry {
            num_cycles: self.report.num_cycles + 1,
            pitch_deg,
            state: self.state,
            tipped,
            speed: cmd.speed,
            travel_dir: cmd.forward,
        };

        trace!("BalanceCtrl output: {:?}", cmd);

        cmd
    }

    pub fn state(&self) -> BalanceState {
        self.state
    }

    pub fn is_balanced(&self) -> bool {
        self.state == BalanceState::Balanced
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Telemetry of the last processed cycle.
    pub fn telemetry(&self) -> BalanceTelemetry {
        self.report
    }

    fn travel_cmd(&self, speed: f64, travel_dir: f64) -> DriveCmd {
        DriveCmd {
            speed_limit: false,
            speed,
            forward: travel_dir,
            sideways: 0.0,
            rotation: 0.0,
            field_relative: true,
            rate_limit: false,
        }
    }
}

impl<Io, Mech> Command<DriveCtrl<Io, Mech>> for BalanceCtrl
where
    Io: DriveIo,
    Mech: MechanismStatus,
{
    fn initialize(&mut self, _drive: &mut DriveCtrl<Io, Mech>) {
        self.reset();
        info!("BalanceCtrl started");
    }

    fn execute(&mut self, drive: &mut DriveCtrl<Io, Mech>) {
        // Stops the drive once balanced
        let cmd = self.step(drive.pitch_deg());
        drive.drive(cmd);
    }

    fn is_finished(&self) -> bool {
        self.is_balanced()
    }

    fn end(&mut self, drive: &mut DriveCtrl<Io, Mech>, interrupted: bool) {
        drive.stop();

        if interrupted {
            warn!("BalanceCtrl interrupted in state {:?}, drive stopped", self.state);
        }
        else {
            info!("BalanceCtrl balanced after {} cycles", self.report.num_cycles);
        }
    }
}

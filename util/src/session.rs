//! Session management
//!
//! A session is one execution of an executable. Each session owns a directory
//! containing its log file and the archives written during the run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
#[derive(Clone, Debug)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (SWERVE_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the\
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,

    #[error("Cannot copy parameter file {0:?} into the session: {1}")]
    CannotSnapshotParams(PathBuf, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory of the software root.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        Self::new_in(root.join(sessions_dir), exec_name)
    }

    /// Start a new session inside an explicit parent directory.
    pub fn new_in(sessions_path: PathBuf, exec_name: &str) -> Result<Self, SessionError> {
        // Set the session epoch
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        // Format the session epoch as a timestamp
        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        // Create the session path
        let mut path = sessions_path;
        path.push(format!("{}_{}", exec_name, timestamp));

        fs::create_dir_all(&path).map_err(SessionError::CannotCreateDir)?;

        // Create the archive dir
        let arch_path = path.join("arch");
        fs::create_dir_all(&arch_path).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = path.join(format!("{}.log", exec_name));

        Ok(Session {
            session_root: path,
            arch_root: arch_path,
            log_file_path,
        })
    }

    /// Copy the named parameter files from `$SWERVE_SW_ROOT/params` into the
    /// session, so the run can be reproduced later.
    pub fn snapshot_params(&self, files: &[&str]) -> Result<(), SessionError> {
        let root = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        self.snapshot_params_from(&root.join("params"), files)
    }

    /// Copy the named files from `params_dir` into the session's `params`
    /// directory.
    pub fn snapshot_params_from(&self, params_dir: &Path, files: &[&str]) -> Result<(), SessionError> {
        let dest_dir = self.session_root.join("params");
        fs::create_dir_all(&dest_dir).map_err(SessionError::CannotCreateDir)?;

        for file in files {
            let src = params_dir.join(file);
            fs::copy(&src, dest_dir.join(file))
                .map_err(|e| SessionError::CannotSnapshotParams(src.clone(), e))?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// Returns `NAN` if no session has been started yet.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => {
            let elapsed = Utc::now() - *e;
            time::duration_to_seconds(elapsed).unwrap_or(std::f64::NAN)
        }
        None => std::f64::NAN,
    }
}

/// Return a reference to the session's epoch.
pub fn get_epoch() -> Result<&'static DateTime<Utc>, SessionError> {
    SESSION_EPOCH.get().ok_or(SessionError::CannotGetEpoch)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_snapshot_params() {
        let base = std::env::temp_dir().join(format!("util_session_test_{}", std::process::id()));
        let params_dir = base.join("params_src");
        fs::create_dir_all(&params_dir).unwrap();
        fs::write(params_dir.join("drive_ctrl.toml"), "max_speed_ms = 4.8\n").unwrap();

        let session = Session {
            session_root: base.join("session"),
            arch_root: base.join("session").join("arch"),
            log_file_path: base.join("session").join("test.log"),
        };

        session
            .snapshot_params_from(&params_dir, &["drive_ctrl.toml"])
            .unwrap();
        let copied = fs::read_to_string(session.session_root.join("params/drive_ctrl.toml")).unwrap();
        assert_eq!(copied, "max_speed_ms = 4.8\n");

        assert!(matches!(
            session.snapshot_params_from(&params_dir, &["missing.toml"]),
            Err(SessionError::CannotSnapshotParams(_, _))
        ));

        fs::remove_dir_all(&base).ok();
    }
}

//! # Execution sessions
//!
//! Each run of an executable gets its own session directory under the software root,
//! `sessions/{exec_name}_{timestamp}`, holding the run's log and a copy of the parameter file it
//! was started with, so a chassis run can be replayed with the same route and gains.
//!
//! The session epoch is set once per process when the session starts. Log timestamps and the
//! supervisor's status lines are seconds since that epoch.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use log::info;
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

/// Timestamp part of a session directory name, see `chrono::format::strftime`.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the parameter file copy kept in the session directory.
pub const PARAMS_RECORD_NAME: &str = "params.toml";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Where this run's records go.
#[derive(Clone, Debug)]
pub struct Session {
    /// Name of the executable which started the session
    pub exec_name: String,

    /// The session directory
    pub session_root: PathBuf,

    /// The run's log file, inside `session_root`
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (CHASSIS_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("A session has already been started in this process")]
    AlreadyStarted,

    #[error("Cannot create the session directory {0:?}: {1}")]
    CannotCreateDir(PathBuf, std::io::Error),

    #[error("Cannot record the parameter file {0:?}: {1}")]
    CannotRecordParams(PathBuf, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start the process's session in `sessions_dir` under the software root.
    ///
    /// Sets the session epoch, so only one session may be started per process.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(|_| SessionError::AlreadyStarted)?;
        let epoch = SESSION_EPOCH.get().ok_or(SessionError::AlreadyStarted)?;

        let mut sessions_root = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;
        sessions_root.push(sessions_dir);

        Self::create_in(&sessions_root, exec_name, epoch)
    }

    /// Create the session directory for a session started at `epoch`.
    fn create_in(
        sessions_root: &Path,
        exec_name: &str,
        epoch: &DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let session_root = sessions_root.join(dir_name(exec_name, epoch));

        fs::create_dir_all(&session_root)
            .map_err(|e| SessionError::CannotCreateDir(session_root.clone(), e))?;

        Ok(Session {
            exec_name: exec_name.to_string(),
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
        })
    }

    /// Keep a copy of the parameter file this run was started with.
    pub fn record_params<P: AsRef<Path>>(&self, params_path: P) -> Result<PathBuf, SessionError> {
        let dest = self.session_root.join(PARAMS_RECORD_NAME);

        fs::copy(params_path.as_ref(), &dest)
            .map_err(|e| SessionError::CannotRecordParams(params_path.as_ref().to_path_buf(), e))?;

        Ok(dest)
    }

    /// End the session.
    pub fn exit(self) {
        info!(
            "{} session ended after {:.03} s, records in {:?}",
            self.exec_name,
            get_elapsed_seconds(),
            self.session_root
        );
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds since the session started, `NAN` before it has.
pub fn get_elapsed_seconds() -> f64 {
    elapsed_seconds(get_epoch(), Utc::now())
}

/// The session epoch, if a session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn dir_name(exec_name: &str, epoch: &DateTime<Utc>) -> String {
    format!("{}_{}", exec_name, epoch.format(TIMESTAMP_FORMAT))
}

fn elapsed_seconds(epoch: Option<&DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    epoch
        .and_then(|e| time::duration_to_seconds(now - *e))
        .unwrap_or(std::f64::NAN)
}

#[cfg(test)]
mod test {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("chassis_session_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_dir_name() {
        let epoch = at("2024-03-01T12:05:09Z");
        assert_eq!(dir_name("chassis_exec", &epoch), "chassis_exec_20240301_120509");
    }

    #[test]
    fn test_elapsed_seconds() {
        let epoch = at("2024-03-01T12:05:09Z");
        assert_eq!(elapsed_seconds(Some(&epoch), at("2024-03-01T12:05:10.5Z")), 1.5);
        assert!(elapsed_seconds(None, epoch).is_nan());
    }

    #[test]
    fn test_create_and_record() {
        let root = scratch_dir("create");
        let epoch = at("2024-03-01T12:05:09Z");

        let session = Session::create_in(&root, "chassis_exec", &epoch).unwrap();
        assert!(session.session_root.is_dir());
        assert_eq!(
            session.log_file_path,
            root.join("chassis_exec_20240301_120509").join("chassis_exec.log")
        );

        // The parameter file is kept alongside the log
        let params = root.join("chassis_exec.toml");
        fs::write(&params, "[chassis]\ninitial_mode = \"Auto\"\n").unwrap();
        let record = session.record_params(&params).unwrap();
        assert_eq!(record, session.session_root.join(PARAMS_RECORD_NAME));
        assert_eq!(
            fs::read_to_string(&record).unwrap(),
            "[chassis]\ninitial_mode = \"Auto\"\n"
        );

        assert!(matches!(
            session.record_params(root.join("missing.toml")),
            Err(SessionError::CannotRecordParams(_, _))
        ));

        fs::remove_dir_all(&root).unwrap();
    }
}

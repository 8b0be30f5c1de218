//! Host platform (linux for example) utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable holding the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "CHASSIS_SW_ROOT";

/// Get the root directory of the software, which contains the `params` and
/// `sessions` directories.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Name of the host machine, or `"unknown"` if it cannot be determined.
pub fn get_hostname() -> String {
    match std::fs::read_to_string("/etc/hostname") {
        Ok(s) => s.trim().to_string(),
        Err(_) => env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown"))
    }
}

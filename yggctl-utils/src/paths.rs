//! Where yggctl keeps its files
//!
//! Only two files exist: the optional config file and, when file logging
//! is enabled, the log file. Both follow the XDG base directories.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

const APP_NAME: &str = "yggctl";
const CONFIG_FILE: &str = "config.toml";
const LOG_FILE: &str = "yggctl.log";

#[derive(Debug, Clone, Copy)]
enum Base {
    Config,
    State,
}

/// `$XDG_CONFIG_HOME/yggctl/config.toml`
pub fn config_file() -> PathBuf {
    base_dir(Base::Config).join(CONFIG_FILE)
}

/// `$XDG_STATE_HOME/yggctl/yggctl.log`
pub fn log_file() -> PathBuf {
    base_dir(Base::State).join(LOG_FILE)
}

fn base_dir(base: Base) -> PathBuf {
    let dirs = ProjectDirs::from("", "", APP_NAME);
    let found = match base {
        Base::Config => dirs.as_ref().map(|d| d.config_dir().to_path_buf()),
        Base::State => dirs.as_ref().and_then(|d| d.state_dir()).map(Path::to_path_buf),
    };
    found.unwrap_or_else(|| home_relative(base))
}

// No project dirs (no home directory known, or no state dir on this platform)
fn home_relative(base: Base) -> PathBuf {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    let relative = match base {
        Base::Config => Path::new(".config"),
        Base::State => Path::new(".local/state"),
    };
    home.join(relative).join(APP_NAME)
}

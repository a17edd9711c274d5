//! Configuration loading and root folder resolution

use std::path::{Path, PathBuf};
use tracing::warn;

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `root_folder` key of the TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_root: Option<&Path>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_root {
        return path.to_path_buf();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Default location of the TOML bootstrap file, if one exists
///
/// Checks `<config dir>/karaoke/config.toml`, then `/etc/karaoke/config.toml`
/// on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("karaoke").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/karaoke/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/karaoke (or /var/lib/karaoke for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("karaoke"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/karaoke"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("karaoke"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/karaoke"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("karaoke"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\karaoke"))
    } else {
        warn!("Unknown platform, using ./karaoke_data as root folder");
        PathBuf::from("./karaoke_data")
    }
}

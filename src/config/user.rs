//! User configuration location.
//!
//! $XDG_CONFIG_HOME/enc-remap/enc-remap.toml

use std::path::PathBuf;

/// Returns the path to the user configuration file, if XDG_CONFIG_HOME is set.
pub fn user_config_path() -> Option<PathBuf> {
    let xdg_config = std::env::var_os("XDG_CONFIG_HOME")?;
    Some(PathBuf::from(xdg_config).join("enc-remap").join("enc-remap.toml"))
}

//! Centralized path resolution for opnsync
//!
//! # Environment Variables
//!
//! - `OPNSYNC_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/opnsync`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `OPNSYNC_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/opnsync` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\opnsync`
//!    - macOS/Linux: `~/.config/opnsync`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "OPNSYNC_CONFIG_DIR";

/// Default manifest file name inside the config directory
pub const MANIFEST_FILE: &str = "manifest.toml";

/// Directory name under the platform config root
const APP_DIR: &str = "opnsync";

/// Get the opnsync config directory path
pub fn config_dir() -> Result<PathBuf> {
    let (source, path) = if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        (ENV_CONFIG_DIR, expand(&dir))
    } else if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        ("XDG_CONFIG_HOME", PathBuf::from(xdg).join(APP_DIR))
    } else {
        ("platform default", platform_config_root()?.join(APP_DIR))
    };

    log::debug!("Config dir from {source}: {}", path.display());
    Ok(path)
}

fn platform_config_root() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config"))
}

/// Path of the manifest used when none is given on the command line
pub fn default_manifest() -> Result<PathBuf> {
    Ok(config_dir()?.join(MANIFEST_FILE))
}

/// Resolve an explicit manifest path or fall back to the default one
pub fn manifest_path(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand(path)),
        None => default_manifest(),
    }
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Run `f` with `key` set, restoring the previous value afterwards
    ///
    /// Mutates the process environment; no other test reads `key`.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: no concurrent reader of this variable
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: as above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/opnsync", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/opnsync"));
            assert_eq!(
                default_manifest().unwrap(),
                PathBuf::from("/custom/opnsync/manifest.toml")
            );
        });
    }

    #[test]
    fn test_explicit_manifest_wins() {
        let path = manifest_path(Some("/etc/opnsync/site.json")).unwrap();
        assert_eq!(path, PathBuf::from("/etc/opnsync/site.json"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/opnsync/manifest.toml");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("opnsync").join("manifest.toml"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_OPNSYNC_VAR/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_OPNSYNC_VAR/file"));
    }
}

//! Configuration file discovery
//!
//! # Environment Variables
//!
//! - `APPDEPLOYER_CONFIG` - Path of the configuration file to use
//!
//! # Resolution Priority
//!
//! For config_file():
//! 1. `--config` command line argument
//! 2. `APPDEPLOYER_CONFIG` environment variable
//! 3. `./appdeployer.toml` in the working directory
//! 4. Platform config dir: `<config dir>/appdeployer/appdeployer.toml`
//! 5. `./appdeployer.toml` even though it does not exist (defaults apply)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config file override
pub const ENV_CONFIG: &str = "APPDEPLOYER_CONFIG";

/// File name looked up in the working directory and the platform config dir
pub const CONFIG_FILE_NAME: &str = "appdeployer.toml";

/// Locate the configuration file
pub fn config_file(cli_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_override {
        let path = expand(&path.to_string_lossy());
        log::debug!("Using config file from --config: {}", path.display());
        return Ok(path);
    }

    if let Ok(file) = std::env::var(ENV_CONFIG) {
        let path = expand(&file);
        log::debug!("Using config file from {}: {}", ENV_CONFIG, path.display());
        return Ok(path);
    }

    let cwd = std::env::current_dir().context("Could not determine working directory")?;
    let local = cwd.join(CONFIG_FILE_NAME);
    if local.exists() {
        log::debug!("Using config file in working directory: {}", local.display());
        return Ok(local);
    }

    if let Some(dir) = dirs::config_dir() {
        let path = dir.join("appdeployer").join(CONFIG_FILE_NAME);
        if path.exists() {
            log::debug!("Using platform config file: {}", path.display());
            return Ok(path);
        }
    }

    log::debug!("No config file found, defaults apply");
    Ok(local)
}

/// Directory relative paths in the configuration are resolved against
pub fn base_dir(config_file: &Path) -> Result<PathBuf> {
    match config_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => std::env::current_dir().context("Could not determine working directory"),
    }
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_env_override_and_cli_precedence() {
        with_env_var(ENV_CONFIG, "/custom/appdeployer.toml", || {
            let result = config_file(None).unwrap();
            assert_eq!(result, PathBuf::from("/custom/appdeployer.toml"));

            let result = config_file(Some(Path::new("/from/cli.toml"))).unwrap();
            assert_eq!(result, PathBuf::from("/from/cli.toml"));
        });
    }

    #[test]
    fn test_cli_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let result = config_file(Some(Path::new("~/apps/orders.toml"))).unwrap();
        assert_eq!(result, home.join("apps").join("orders.toml"));
    }

    #[test]
    fn test_base_dir() {
        assert_eq!(
            base_dir(Path::new("/apps/orders/appdeployer.toml")).unwrap(),
            PathBuf::from("/apps/orders")
        );
        assert_eq!(
            base_dir(Path::new("appdeployer.toml")).unwrap(),
            env::current_dir().unwrap()
        );
    }

    #[test]
    fn test_expand_absolute() {
        let result = expand("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("APPDEPLOYER_TEST_VAR", "test_value", || {
            let result = expand("/path/$APPDEPLOYER_TEST_VAR/file");
            assert_eq!(result, PathBuf::from("/path/test_value/file"));
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}

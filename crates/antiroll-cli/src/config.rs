//! Controller configuration file – reads/writes `~/.antiroll/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use antiroll_runtime::{ControlLoopConfig, ControllerConfig};
use antiroll_types::AntirollError;
use serde::{Deserialize, Serialize};

/// Persisted configuration: one table per runtime component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerConfig,
    pub control_loop: ControlLoopConfig,
}

impl Config {
    /// Validate every table.
    pub fn validate(&self) -> Result<(), AntirollError> {
        self.controller.validate()?;
        self.control_loop.validate()
    }
}

/// Return the path to `~/.antiroll/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".antiroll").join("config.toml")
}

/// Load the config from disk with env overrides applied.  `None` if the file
/// does not exist.
pub fn load() -> Result<Option<Config>, AntirollError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, AntirollError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        AntirollError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| AntirollError::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Apply `ANTIROLL_*` environment variable overrides to `cfg`.  Values that
/// do not parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `ANTIROLL_CONTROL_INTERVAL_MS` | `controller.control_interval_ms` |
/// | `ANTIROLL_SENSOR_TIMEOUT_MS` | `control_loop.sensor_timeout_ms` |
/// | `ANTIROLL_ROLLOVER_ANGLE_DEG` | `controller.risk.rollover_angle_deg` |
/// | `ANTIROLL_WINDOW_SIZE` | `controller.window_size` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(ms) = env_parse::<u64>("ANTIROLL_CONTROL_INTERVAL_MS") {
        cfg.controller.control_interval_ms = ms;
    }
    if let Some(ms) = env_parse::<u64>("ANTIROLL_SENSOR_TIMEOUT_MS") {
        cfg.control_loop.sensor_timeout_ms = ms;
    }
    if let Some(deg) = env_parse::<f64>("ANTIROLL_ROLLOVER_ANGLE_DEG") {
        cfg.controller.risk.rollover_angle_deg = deg;
    }
    if let Some(n) = env_parse::<usize>("ANTIROLL_WINDOW_SIZE") {
        cfg.controller.window_size = n;
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Save the config, creating `~/.antiroll/` if necessary.
pub fn save(cfg: &Config) -> Result<(), AntirollError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), AntirollError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AntirollError::Config(format!("failed to create {}: {e}", parent.display()))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                AntirollError::Config(format!("failed to restrict {}: {e}", parent.display()))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| AntirollError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| AntirollError::Config(format!("failed to write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_points_to_antiroll_dir() {
        let p = config_path_for_home("/home/operator");
        assert_eq!(p, PathBuf::from("/home/operator/.antiroll/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");

        assert_eq!(loaded.controller.window_size, 10);
        assert_eq!(loaded.controller.control_interval_ms, 100);
        assert_eq!(loaded.control_loop.sensor_timeout_ms, 50);
        assert_eq!(loaded.controller.risk.rollover_angle_deg, 15.0);
    }

    #[cfg(unix)]
    #[test]
    fn config_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let parent = path.parent().expect("parent");
        let mode = fs::metadata(parent).expect("dir metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[controller]\nmax_wheel_diff = 0.2\n\n[controller.risk]\nrollover_angle_deg = 20.0\n",
        )
        .expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.controller.max_wheel_diff, 0.2);
        assert_eq!(cfg.controller.risk.rollover_angle_deg, 20.0);
        assert_eq!(cfg.controller.base_speed, 1.0);
        assert_eq!(cfg.control_loop, ControlLoopConfig::default());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[controller\nwindow_size = ").expect("write");
        assert!(matches!(load_from(&path), Err(AntirollError::Config(_))));
    }

    #[test]
    fn validate_rejects_zero_window() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_ok());
        cfg.controller.window_size = 0;
        assert!(cfg.validate().is_err());
    }

    // One test for all overrides so parallel tests never race on them.
    #[test]
    fn apply_env_overrides_sets_fields_and_ignores_garbage() {
        // SAFETY: no other test in this crate reads these variables.
        unsafe {
            std::env::set_var("ANTIROLL_CONTROL_INTERVAL_MS", "50");
            std::env::set_var("ANTIROLL_SENSOR_TIMEOUT_MS", "20");
            std::env::set_var("ANTIROLL_ROLLOVER_ANGLE_DEG", "12.5");
            std::env::set_var("ANTIROLL_WINDOW_SIZE", "not-a-number");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.controller.control_interval_ms, 50);
        assert_eq!(cfg.control_loop.sensor_timeout_ms, 20);
        assert_eq!(cfg.controller.risk.rollover_angle_deg, 12.5);
        assert_eq!(cfg.controller.window_size, 10);

        unsafe {
            std::env::remove_var("ANTIROLL_CONTROL_INTERVAL_MS");
            std::env::remove_var("ANTIROLL_SENSOR_TIMEOUT_MS");
            std::env::remove_var("ANTIROLL_ROLLOVER_ANGLE_DEG");
            std::env::remove_var("ANTIROLL_WINDOW_SIZE");
        }
    }
}

//! Configuration vault – reads/writes `~/.biomd/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use biomd_types::{BiomError, Modality, SensorId, SensorProperties, SensorStrength};

/// Persisted daemon configuration stored in `~/.biomd/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identifier of the sensor instance this process drives.
    #[serde(default)]
    pub sensor_id: SensorId,

    /// Modality of the attached sensor.
    #[serde(default = "default_modality")]
    pub modality: Modality,

    /// Security strength class of the attached sensor.
    #[serde(default = "default_strength")]
    pub strength: SensorStrength,

    /// Upper bound on enrollments per user.
    #[serde(default = "default_max_enrollments")]
    pub max_enrollments_per_user: u32,
}

fn default_modality() -> Modality {
    Modality::Fingerprint
}
fn default_strength() -> SensorStrength {
    SensorStrength::Strong
}
fn default_max_enrollments() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor_id: 0,
            modality: default_modality(),
            strength: default_strength(),
            max_enrollments_per_user: default_max_enrollments(),
        }
    }
}

impl Config {
    /// The [`SensorProperties`] this configuration describes.
    pub fn sensor_properties(&self) -> SensorProperties {
        SensorProperties {
            sensor_id: self.sensor_id,
            modality: self.modality,
            strength: self.strength,
            max_enrollments_per_user: self.max_enrollments_per_user,
        }
    }
}

/// Return the path to `~/.biomd/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".biomd").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, BiomError> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, BiomError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        BiomError::Config(format!("failed to read config at {}: {}", path.display(), e))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| BiomError::Config(format!("failed to parse config: {e}")))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `BIOMD_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `BIOMD_SENSOR_ID` | `sensor_id` |
/// | `BIOMD_MAX_ENROLLMENTS` | `max_enrollments_per_user` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("BIOMD_SENSOR_ID")
        && let Ok(sensor_id) = v.parse::<SensorId>()
    {
        cfg.sensor_id = sensor_id;
    }
    if let Ok(v) = std::env::var("BIOMD_MAX_ENROLLMENTS")
        && let Ok(max) = v.parse::<u32>()
    {
        cfg.max_enrollments_per_user = max;
    }
}

/// Save the config to disk, creating `~/.biomd/` if necessary.
pub fn save(cfg: &Config) -> Result<(), BiomError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), BiomError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BiomError::Config(format!("failed to create config directory: {e}")))?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                BiomError::Config(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| BiomError::Config(format!("failed to serialize config: {e}")))?;
    // Write the file with owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| {
                BiomError::Config(format!("failed to write config at {}: {}", path.display(), e))
            })?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| {
        BiomError::Config(format!("failed to write config at {}: {}", path.display(), e))
    })?;
    Ok(())
}

//! Configuration file management for rtcm-codec.
//!
//! Reads/writes `~/.rtcm-codec/config.yaml` with the reference station
//! description and the fan-out server address.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::station::StationPosition;
use crate::types::RtcmError;

/// Registered port for RTCM over TCP.
pub const DEFAULT_PORT: u16 = 2101;

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub station: StationConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    pub id: u16,
    pub ecef_x: Option<f64>,
    pub ecef_y: Option<f64>,
    pub ecef_z: Option<f64>,
    pub antenna_height: Option<f64>,
    pub antenna: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig {
                id: 0,
                ecef_x: None,
                ecef_y: None,
                ecef_z: None,
                antenna_height: None,
                antenna: None,
            },
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: DEFAULT_PORT,
            },
        }
    }
}

impl StationConfig {
    /// Station position, when all three ECEF coordinates are configured.
    pub fn position(&self) -> Option<StationPosition> {
        let mut pos = StationPosition::new(self.id, self.ecef_x?, self.ecef_y?, self.ecef_z?);
        pos.gps = true;
        pos.antenna_height = self.antenna_height;
        Some(pos)
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `~/.rtcm-codec/`, or `./.rtcm-codec/` when no home directory is set.
pub fn config_dir() -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    home.map_or_else(|| PathBuf::from("."), PathBuf::from).join(".rtcm-codec")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

/// Load config from `~/.rtcm-codec/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

/// Load config from `path`, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(e) => {
            warn!(path = %path.display(), "cannot read config: {e}");
            Config::default()
        }
    }
}

/// Save config to `~/.rtcm-codec/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, RtcmError> {
    let path = config_file();
    save_config_to(&path, config)?;
    Ok(path)
}

/// Save config to `path`, creating parent directories.
pub fn save_config_to(path: &Path, config: &Config) -> Result<(), RtcmError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| RtcmError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config)).map_err(|e| RtcmError::Config(e.to_string()))
}

/// Parse simple YAML-like config text. Unknown keys are ignored.
fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        let station = &mut config.station;
        let server = &mut config.server;
        match (current_section.as_deref(), key) {
            (Some("station"), "id") => station.id = parsed(val).unwrap_or(station.id),
            (Some("station"), "ecef_x") => station.ecef_x = parsed(val),
            (Some("station"), "ecef_y") => station.ecef_y = parsed(val),
            (Some("station"), "ecef_z") => station.ecef_z = parsed(val),
            (Some("station"), "antenna_height") => station.antenna_height = parsed(val),
            (Some("station"), "antenna") => station.antenna = scalar(val).map(str::to_string),
            (Some("server"), "host") => {
                if let Some(host) = scalar(val) {
                    server.host = host.to_string();
                }
            }
            (Some("server"), "port") => server.port = parsed(val).unwrap_or(server.port),
            _ => {}
        }
    }

    config
}

/// A value with YAML null markers mapped to `None` and one layer of
/// matching quotes removed.
fn scalar(val: &str) -> Option<&str> {
    if matches!(val, "" | "null" | "~") {
        return None;
    }
    ['"', '\'']
        .iter()
        .find_map(|&q| val.strip_prefix(q)?.strip_suffix(q))
        .or(Some(val))
}

fn parsed<T: std::str::FromStr>(val: &str) -> Option<T> {
    scalar(val)?.parse().ok()
}

fn float_line(key: &str, val: Option<f64>) -> String {
    match val {
        Some(v) => format!("  {key}: {v}"),
        None => format!("  {key}: null"),
    }
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# rtcm-codec configuration".to_string(), String::new()];

    lines.push("station:".into());
    lines.push(format!("  id: {}", config.station.id));
    lines.push(float_line("ecef_x", config.station.ecef_x));
    lines.push(float_line("ecef_y", config.station.ecef_y));
    lines.push(float_line("ecef_z", config.station.ecef_z));
    lines.push(float_line("antenna_height", config.station.antenna_height));
    match &config.station.antenna {
        Some(name) => lines.push(format!("  antenna: \"{name}\"")),
        None => lines.push("  antenna: null".into()),
    }
    lines.push(String::new());

    lines.push("server:".into());
    lines.push(format!("  host: \"{}\"", config.server.host));
    lines.push(format!("  port: {}", config.server.port));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// config.rs - Layered player configuration: defaults, JSON file, environment

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::animation::{SurfaceKind, TimingConfig};
use crate::error_handling::ConfigError;

/// Timing and trail parameters of one surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub timing: TimingConfig,
    /// Minimum distance between consecutive trail points
    pub trail_spacing_m: f64,
}

impl SurfaceConfig {
    pub fn flat() -> Self {
        Self { timing: TimingConfig::flat(), trail_spacing_m: 25.0 }
    }

    pub fn globe() -> Self {
        Self { timing: TimingConfig::globe(), trail_spacing_m: 4.0 }
    }

    pub fn for_surface(kind: SurfaceKind) -> Self {
        match kind {
            SurfaceKind::Flat => Self::flat(),
            SurfaceKind::Globe => Self::globe(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub flat: SurfaceConfig,
    pub globe: SurfaceConfig,
    /// How long a reached waypoint's marker stays highlighted
    pub flash_duration_ms: f64,
    pub frame_interval_ms: u64,
    /// Record snapshot refresh period (server mode)
    pub refresh_interval_secs: u64,
    pub default_speed_multiplier: f64,
    pub port: u16,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            flat: SurfaceConfig::flat(),
            globe: SurfaceConfig::globe(),
            flash_duration_ms: 600.0,
            frame_interval_ms: 16,
            refresh_interval_secs: 150,
            default_speed_multiplier: 1.0,
            port: 3030,
        }
    }
}

impl PlayerConfig {
    /// Defaults overlaid with a (possibly partial) JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let overlay: Value = serde_json::from_str(json)?;
        let mut merged = serde_json::to_value(Self::default())?;
        merge_json(&mut merged, overlay);
        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded player config from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`; unparsable values are logged and skipped
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(enabled) = parse_env::<bool, _>(&lookup, "PLAYER_TIME_BASED") {
            self.set_time_based(enabled);
        }
        if let Some(speed) = parse_env::<f64, _>(&lookup, "PLAYER_SPEED_2D_MPS") {
            self.flat.timing.speed_mps = speed;
        }
        if let Some(speed) = parse_env::<f64, _>(&lookup, "PLAYER_SPEED_3D_MPS") {
            self.globe.timing.speed_mps = speed;
        }
        if let Some(ms) = parse_env(&lookup, "PLAYER_FRAME_INTERVAL_MS") {
            self.frame_interval_ms = ms;
        }
        if let Some(secs) = parse_env(&lookup, "PLAYER_REFRESH_SECS") {
            self.refresh_interval_secs = secs;
        }
        if let Some(port) = parse_env(&lookup, "PORT") {
            self.port = port;
        }
    }

    pub fn set_time_based(&mut self, enabled: bool) {
        self.flat.timing.time_based = enabled;
        self.globe.timing.time_based = enabled;
    }

    pub fn surface(&self, kind: SurfaceKind) -> &SurfaceConfig {
        match kind {
            SurfaceKind::Flat => &self.flat,
            SurfaceKind::Globe => &self.globe,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (kind, surface) in [(SurfaceKind::Flat, &self.flat), (SurfaceKind::Globe, &self.globe)] {
            let t = &surface.timing;
            if !(t.speed_mps.is_finite() && t.speed_mps > 0.0) {
                return Err(ConfigError::Invalid(format!("{kind} speed_mps must be positive")));
            }
            if !(t.min_segment_ms >= 0.0 && t.min_segment_ms <= t.max_segment_ms) {
                return Err(ConfigError::Invalid(format!(
                    "{kind} segment bounds {}..{} are inverted",
                    t.min_segment_ms, t.max_segment_ms
                )));
            }
            if !(surface.trail_spacing_m >= 0.0) {
                return Err(ConfigError::Invalid(format!("{kind} trail_spacing_m is negative")));
            }
        }
        if !(self.default_speed_multiplier.is_finite() && self.default_speed_multiplier > 0.0) {
            return Err(ConfigError::Invalid("default_speed_multiplier must be positive".into()));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("frame_interval_ms must be non-zero".into()));
        }
        Ok(())
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

/// Recursively overlay `overlay` onto `base`; objects merge, everything else replaces
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

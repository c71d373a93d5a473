//! Key/value option form of a motion profile
//!
//! Presentation layers exchange profiles as flat `key=value` options. Every
//! field has exactly one key, so a profile written out and read back is
//! identical field for field.

use super::profile::MotionProfile;
use super::ConfigError;

/// All option keys in the order `to_options` emits them
pub const OPTION_KEYS: [&str; 17] = [
    "radius",
    "pace",
    "noise_amplitude",
    "bias_drift_rate",
    "margin",
    "countdown",
    "walkabout",
    "walkabout_interval_min",
    "walkabout_interval_max",
    "walkabout_tap_min",
    "walkabout_tap_max",
    "jitter",
    "jitter_interval_min",
    "jitter_interval_max",
    "stance",
    "stance_interval",
    "stance_hold",
];

impl MotionProfile {
    /// Flatten the profile into ordered key/value pairs
    pub fn to_options(&self) -> Vec<(&'static str, String)> {
        OPTION_KEYS
            .iter()
            .map(|&key| (key, self.option_value(key)))
            .collect()
    }

    /// Build a profile by applying options over the defaults
    ///
    /// The result is validated, so inverted windows are rejected here.
    pub fn from_options<I, K, V>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut profile = Self::default();
        for (key, value) in options {
            profile.apply_option(key.as_ref(), value.as_ref())?;
        }
        profile.validate()?;
        Ok(profile)
    }

    /// Set one field from its option form
    ///
    /// Only parses; ordering between paired bounds is checked by `validate`
    /// so a min and max can be edited one after the other.
    pub fn apply_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let key = key.trim();
        let value = value.trim();

        match key {
            "radius" => self.radius = parse_number(key, value)?,
            "pace" => self.pace = parse_number(key, value)?,
            "noise_amplitude" => self.noise_amplitude = parse_number(key, value)?,
            "bias_drift_rate" => self.bias_drift_rate = parse_number(key, value)?,
            "margin" => self.margin = parse_number(key, value)?,
            "countdown" => self.countdown = parse_number(key, value)?,
            "walkabout" => self.walkabout.enabled = parse_flag(key, value)?,
            "walkabout_interval_min" => self.walkabout.interval.min = parse_number(key, value)?,
            "walkabout_interval_max" => self.walkabout.interval.max = parse_number(key, value)?,
            "walkabout_tap_min" => self.walkabout.tap.min = parse_number(key, value)?,
            "walkabout_tap_max" => self.walkabout.tap.max = parse_number(key, value)?,
            "jitter" => self.jitter.enabled = parse_flag(key, value)?,
            "jitter_interval_min" => self.jitter.interval.min = parse_number(key, value)?,
            "jitter_interval_max" => self.jitter.interval.max = parse_number(key, value)?,
            "stance" => self.stance.enabled = parse_flag(key, value)?,
            "stance_interval" => self.stance.interval = parse_number(key, value)?,
            "stance_hold" => self.stance.hold = parse_number(key, value)?,
            _ => return Err(ConfigError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    fn option_value(&self, key: &str) -> String {
        match key {
            "radius" => self.radius.to_string(),
            "pace" => self.pace.to_string(),
            "noise_amplitude" => self.noise_amplitude.to_string(),
            "bias_drift_rate" => self.bias_drift_rate.to_string(),
            "margin" => self.margin.to_string(),
            "countdown" => self.countdown.to_string(),
            "walkabout" => format_flag(self.walkabout.enabled),
            "walkabout_interval_min" => self.walkabout.interval.min.to_string(),
            "walkabout_interval_max" => self.walkabout.interval.max.to_string(),
            "walkabout_tap_min" => self.walkabout.tap.min.to_string(),
            "walkabout_tap_max" => self.walkabout.tap.max.to_string(),
            "jitter" => format_flag(self.jitter.enabled),
            "jitter_interval_min" => self.jitter.interval.min.to_string(),
            "jitter_interval_max" => self.jitter.interval.max.to_string(),
            "stance" => format_flag(self.stance.enabled),
            "stance_interval" => self.stance.interval.to_string(),
            "stance_hold" => self.stance.hold.to_string(),
            _ => String::new(),
        }
    }
}

/// Split a `key=value` assignment
pub fn parse_assignment(text: &str) -> Result<(&str, &str), ConfigError> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ConfigError::MalformedAssignment(text.to_string())),
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(key, value))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn format_flag(enabled: bool) -> String {
    let text = if enabled { "on" } else { "off" };
    text.to_string()
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

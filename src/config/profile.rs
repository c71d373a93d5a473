//! Motion profile and its validation
//!
//! Defines every tunable parameter of a session. A profile is edited freely
//! while idle and frozen once a session is engaged.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Inclusive range of seconds an interval or duration is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalWindow {
    /// Lower bound (seconds)
    pub min: f64,
    /// Upper bound (seconds)
    pub max: f64,
}

impl IntervalWindow {
    /// Create a window from its bounds
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Create a window that always yields the same value
    pub const fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Whether the window collapsed to a single value (periodic cadence)
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    /// Whether `value` lies inside the window
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check bounds are finite, non-negative and ordered
    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        check_non_negative(name, self.min)?;
        check_non_negative(name, self.max)?;
        if self.min > self.max {
            return Err(ConfigError::InvalidWindow {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Complete set of parameters for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionProfile {
    /// Base orbit radius (px)
    pub radius: f64,
    /// Angular pace (radians per second)
    pub pace: f64,
    /// Noise amplitude (px); scales every organic perturbation
    pub noise_amplitude: f64,
    /// Slow phase drift of the orbit (radians per second)
    pub bias_drift_rate: f64,
    /// Margin kept clear on every screen edge (px)
    pub margin: f64,
    /// Delay between engaging and the first movement (seconds)
    pub countdown: f64,
    /// Directional key taps
    pub walkabout: WalkaboutSettings,
    /// Micro-saccade pointer jitter
    pub jitter: JitterSettings,
    /// Periodic long key hold
    pub stance: StanceSettings,
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            radius: 220.0,
            pace: 1.25,
            noise_amplitude: 6.0,
            bias_drift_rate: 0.02,
            margin: 2.0,
            countdown: 5.0,
            walkabout: WalkaboutSettings::default(),
            jitter: JitterSettings::default(),
            stance: StanceSettings::default(),
        }
    }
}

impl MotionProfile {
    /// Slow, wide orbit with sparse footwork
    pub fn calm() -> Self {
        Self {
            radius: 320.0,
            pace: 0.6,
            noise_amplitude: 4.0,
            bias_drift_rate: 0.01,
            walkabout: WalkaboutSettings {
                interval: IntervalWindow::new(30.0, 60.0),
                ..Default::default()
            },
            jitter: JitterSettings {
                interval: IntervalWindow::new(8.0, 16.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Tight, restless orbit with frequent footwork and jitter
    pub fn lively() -> Self {
        Self {
            radius: 140.0,
            pace: 2.0,
            noise_amplitude: 10.0,
            bias_drift_rate: 0.05,
            walkabout: WalkaboutSettings {
                interval: IntervalWindow::new(4.0, 10.0),
                tap: IntervalWindow::new(0.06, 0.2),
                ..Default::default()
            },
            jitter: JitterSettings {
                interval: IntervalWindow::new(2.0, 5.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Duration of one undisturbed revolution, if the orbit moves at all
    pub fn revolution_period(&self) -> Option<f64> {
        (self.pace.abs() > f64::EPSILON).then(|| std::f64::consts::TAU / self.pace.abs())
    }

    /// Validate the profile on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("pace", self.pace)?;
        check_finite("bias_drift_rate", self.bias_drift_rate)?;
        check_non_negative("radius", self.radius)?;
        check_non_negative("noise_amplitude", self.noise_amplitude)?;
        check_non_negative("margin", self.margin)?;
        check_non_negative("countdown", self.countdown)?;

        self.walkabout.interval.validate("walkabout_interval")?;
        self.walkabout.tap.validate("walkabout_tap")?;
        self.jitter.interval.validate("jitter_interval")?;
        check_non_negative("stance_interval", self.stance.interval)?;
        check_non_negative("stance_hold", self.stance.hold)?;

        Ok(())
    }

    /// Validate the profile against the display it will run on
    ///
    /// Radius plus margin must fit in half of the smaller screen dimension,
    /// otherwise the clamped orbit degenerates to a point.
    pub fn validate_for_display(&self, width: f64, height: f64) -> Result<(), ConfigError> {
        self.validate()?;

        let limit = width.min(height) * 0.5;
        if self.radius + self.margin > limit {
            return Err(ConfigError::RadiusExceedsScreen {
                radius: self.radius,
                margin: self.margin,
                limit,
            });
        }
        Ok(())
    }

    /// Load a profile from a JSON file; missing fields fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let profile: Self = serde_json::from_str(&text)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Save the profile as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Human-readable summary of the session this profile produces
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Orbit radius: {:.0} px", self.radius),
            format!("Pace: {:.2} rad/s", self.pace),
            format!("Noise amplitude: {:.1} px", self.noise_amplitude),
            format!("Bias drift: {:.3} rad/s", self.bias_drift_rate),
            format!("Countdown: {:.1} s", self.countdown),
            format!("Screen margin: {:.0} px", self.margin),
        ];

        if self.walkabout.enabled {
            lines.push("Walkabout: enabled".to_string());
            lines.push(format!(
                "    cadence window: {:.1}s - {:.1}s",
                self.walkabout.interval.min, self.walkabout.interval.max
            ));
            lines.push(format!(
                "    tap length window: {:.2}s - {:.2}s",
                self.walkabout.tap.min, self.walkabout.tap.max
            ));
        } else {
            lines.push("Walkabout: disabled".to_string());
        }

        if self.jitter.enabled {
            lines.push("Micro-saccades: enabled".to_string());
            lines.push(format!(
                "    interval window: {:.1}s - {:.1}s",
                self.jitter.interval.min, self.jitter.interval.max
            ));
        } else {
            lines.push("Micro-saccades: disabled".to_string());
        }

        if self.stance.enabled {
            lines.push("Utility stance: enabled".to_string());
            lines.push(format!(
                "    hold {:.1}s every {:.0}s",
                self.stance.hold, self.stance.interval
            ));
        } else {
            lines.push("Utility stance: disabled".to_string());
        }

        lines
    }
}

/// Walkabout footwork settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkaboutSettings {
    /// Whether directional taps are injected
    pub enabled: bool,
    /// Seconds between taps
    pub interval: IntervalWindow,
    /// How long each key stays down (seconds)
    pub tap: IntervalWindow,
}

impl Default for WalkaboutSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: IntervalWindow::new(9.0, 20.0),
            tap: IntervalWindow::new(0.045, 0.12),
        }
    }
}

/// Micro-saccade settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterSettings {
    /// Whether jitter nudges are injected
    pub enabled: bool,
    /// Seconds between nudges
    pub interval: IntervalWindow,
}

impl Default for JitterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: IntervalWindow::new(4.5, 9.5),
        }
    }
}

/// Utility stance: hold one key for a while on a fixed cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StanceSettings {
    /// Whether the stance key is held periodically
    pub enabled: bool,
    /// Seconds between holds
    pub interval: f64,
    /// Hold duration (seconds)
    pub hold: f64,
}

impl Default for StanceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: 180.0,
            hold: 4.0,
        }
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = MotionProfile::default();
        assert!(profile.validate().is_ok());
        assert!(profile.validate_for_display(1920.0, 1080.0).is_ok());
        assert!(profile.walkabout.enabled);
        assert!(!profile.stance.enabled);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(MotionProfile::calm().validate().is_ok());
        assert!(MotionProfile::lively().validate().is_ok());
        assert!(MotionProfile::calm().pace < MotionProfile::lively().pace);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut profile = MotionProfile::default();
        profile.jitter.interval = IntervalWindow::new(10.0, 2.0);

        match profile.validate() {
            Err(ConfigError::InvalidWindow { name, .. }) => assert_eq!(name, "jitter_interval"),
            other => panic!("Expected InvalidWindow, got {:?}", other),
        }
    }

    #[test]
    fn test_fixed_window_is_allowed() {
        let mut profile = MotionProfile::default();
        profile.walkabout.interval = IntervalWindow::fixed(12.0);
        assert!(profile.walkabout.interval.is_fixed());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_negative_and_nan_rejected() {
        let mut profile = MotionProfile::default();
        profile.noise_amplitude = -1.0;
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::Negative { field: "noise_amplitude", .. })
        ));

        let mut profile = MotionProfile::default();
        profile.pace = f64::NAN;
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::NotFinite { field: "pace", .. })
        ));
    }

    #[test]
    fn test_radius_must_fit_display() {
        let mut profile = MotionProfile::default();
        profile.radius = 530.0;
        profile.margin = 20.0;

        assert!(matches!(
            profile.validate_for_display(1920.0, 1080.0),
            Err(ConfigError::RadiusExceedsScreen { .. })
        ));
        assert!(profile.validate_for_display(2560.0, 1440.0).is_ok());
    }

    #[test]
    fn test_revolution_period() {
        let profile = MotionProfile {
            pace: 0.5,
            ..Default::default()
        };
        let period = profile.revolution_period().unwrap();
        assert!((period - 12.566).abs() < 1e-3);

        let still = MotionProfile {
            pace: 0.0,
            ..Default::default()
        };
        assert!(still.revolution_period().is_none());
    }

    #[test]
    fn test_load_validates_and_save_restores() {
        let dir = std::env::temp_dir();
        let good = dir.join(format!("idle-orbit-good-{}.json", std::process::id()));
        let bad = dir.join(format!("idle-orbit-bad-{}.json", std::process::id()));

        MotionProfile::calm().save(&good).unwrap();
        assert_eq!(MotionProfile::load(&good).unwrap(), MotionProfile::calm());

        std::fs::write(&bad, r#"{"jitter": {"enabled": true, "interval": {"min": 9.0, "max": 1.0}}}"#)
            .unwrap();
        assert!(matches!(
            MotionProfile::load(&bad),
            Err(ConfigError::InvalidWindow { .. })
        ));

        let _ = std::fs::remove_file(good);
        let _ = std::fs::remove_file(bad);
    }

    #[test]
    fn test_json_round_trip() {
        let profile = MotionProfile::lively();
        let json = serde_json::to_string(&profile).unwrap();
        let restored: MotionProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(profile, restored);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let restored: MotionProfile =
            serde_json::from_str(r#"{"radius": 150.0, "jitter": {"enabled": false}}"#).unwrap();
        assert_eq!(restored.radius, 150.0);
        assert!(!restored.jitter.enabled);
        assert_eq!(restored.jitter.interval, JitterSettings::default().interval);
        assert_eq!(restored.pace, MotionProfile::default().pace);
    }

    #[test]
    fn test_summary_mentions_disabled_features() {
        let profile = MotionProfile {
            walkabout: WalkaboutSettings {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let summary = profile.summary();
        assert!(summary.iter().any(|l| l == "Walkabout: disabled"));
        assert!(summary.iter().any(|l| l == "Micro-saccades: enabled"));
    }
}

//! Feature Specification Table

use serde::Serialize;
use std::fmt;

/// Number of features the remote classifier expects
pub const FEATURE_COUNT: usize = 20;

/// Semantic type of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Whole number, fractional text rejected
    Integer,
    /// Decimal number
    Float,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Integer => f.write_str("integer"),
            FeatureKind::Float => f.write_str("float"),
        }
    }
}

/// Declaration of a single input field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    /// Stable form key
    pub name: &'static str,
    /// Human-readable label for the form
    pub label: &'static str,
    /// Declared type
    pub kind: FeatureKind,
    /// Inclusive lower bound
    pub min: f64,
    /// Inclusive upper bound
    pub max: f64,
    /// Index in the predictor vector
    pub position: usize,
}

impl FeatureSpec {
    const fn int(name: &'static str, label: &'static str, max: f64, position: usize) -> Self {
        Self {
            name,
            label,
            kind: FeatureKind::Integer,
            min: 0.0,
            max,
            position,
        }
    }

    const fn float(name: &'static str, label: &'static str, max: f64, position: usize) -> Self {
        Self {
            name,
            label,
            kind: FeatureKind::Float,
            min: 0.0,
            max,
            position,
        }
    }

    const fn flag(name: &'static str, label: &'static str, position: usize) -> Self {
        Self::int(name, label, 1.0, position)
    }

    /// Whether the field only accepts 0 or 1
    pub fn is_flag(&self) -> bool {
        self.kind == FeatureKind::Integer && self.min == 0.0 && self.max == 1.0
    }

    /// Check a parsed value against the inclusive range
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Field table in model training order. Positions are load-bearing:
/// swapping two entries silently corrupts predictions.
pub static FEATURE_SPECS: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec::int("battery_power", "Battery power (mAh)", 10_000.0, 0),
    FeatureSpec::flag("blue", "Bluetooth", 1),
    FeatureSpec::float("clock_speed", "Clock speed (GHz)", 10.0, 2),
    FeatureSpec::flag("dual_sim", "Dual SIM", 3),
    FeatureSpec::int("fc", "Front camera (MP)", 200.0, 4),
    FeatureSpec::flag("four_g", "4G", 5),
    FeatureSpec::int("int_memory", "Internal memory (GB)", 4096.0, 6),
    FeatureSpec::float("m_dep", "Mobile depth (cm)", 10.0, 7),
    FeatureSpec::int("mobile_wt", "Weight (g)", 2000.0, 8),
    FeatureSpec::int("n_cores", "Processor cores", 64.0, 9),
    FeatureSpec::int("pc", "Primary camera (MP)", 200.0, 10),
    FeatureSpec::int("px_height", "Pixel resolution height", 10_000.0, 11),
    FeatureSpec::int("px_width", "Pixel resolution width", 10_000.0, 12),
    FeatureSpec::int("ram", "RAM (MB)", 100_000.0, 13),
    FeatureSpec::int("sc_h", "Screen height (cm)", 100.0, 14),
    FeatureSpec::int("sc_w", "Screen width (cm)", 100.0, 15),
    FeatureSpec::int("talk_time", "Talk time (hours)", 1000.0, 16),
    FeatureSpec::flag("three_g", "3G", 17),
    FeatureSpec::flag("touch_screen", "Touch screen", 18),
    FeatureSpec::flag("wifi", "WiFi", 19),
];

/// Look up a field declaration by name
pub fn feature_spec(name: &str) -> Option<&'static FeatureSpec> {
    FEATURE_SPECS.iter().find(|spec| spec.name == name)
}

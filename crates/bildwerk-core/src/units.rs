// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Physical units and point conversion.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// PDF points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// PDF points per centimetre (≈ 28.3465).
pub const POINTS_PER_CM: f64 = POINTS_PER_INCH / 2.54;

/// Scale percentage applied when a rule does not specify one.
pub const DEFAULT_SCALE_PERCENT: f64 = 100.0;

/// Unit in which rule positions and sizes are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    /// PDF points (1/72 inch).
    Pt,
    /// Inches.
    Inch,
    /// Centimetres.
    #[default]
    Cm,
}

impl Unit {
    /// Parse a unit name. Anything that is not `pt` or `inch` is treated as
    /// centimetres, which is how existing rule files have always been read.
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim() {
            "pt" => Self::Pt,
            "inch" => Self::Inch,
            _ => Self::Cm,
        }
    }

    /// Name used in rule files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pt => "pt",
            Self::Inch => "inch",
            Self::Cm => "cm",
        }
    }

    /// Number of points in one of this unit.
    pub fn points_per_unit(&self) -> f64 {
        match self {
            Self::Pt => 1.0,
            Self::Inch => POINTS_PER_INCH,
            Self::Cm => POINTS_PER_CM,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(name) => Self::parse_lenient(&name),
            _ => Self::Cm,
        })
    }
}

/// Convert `value` expressed in `unit` to points.
pub fn to_points(value: f64, unit: Unit) -> f64 {
    value * unit.points_per_unit()
}

/// Convert `points` to `unit`.
pub fn from_points(points: f64, unit: Unit) -> f64 {
    points / unit.points_per_unit()
}

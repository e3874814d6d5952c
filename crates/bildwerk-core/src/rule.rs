// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Placement rules and their validation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::BildwerkError;
use crate::types::PageToken;
use crate::units::{DEFAULT_SCALE_PERCENT, Unit};

/// One image placement: which image, where, how large, on which page.
///
/// Positions and sizes are in the run's unit. `scale_x` / `scale_y` are
/// percentages applied to the nominal `width` / `height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRule {
    #[serde(default)]
    pub image: PathBuf,
    #[serde(default, deserialize_with = "lenient::number")]
    pub x: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub y: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub width: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: f64,
    #[serde(default = "default_scale", deserialize_with = "lenient::scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale", deserialize_with = "lenient::scale")]
    pub scale_y: f64,
    #[serde(default)]
    pub page: PageToken,
    /// Missing means `true`. Strings are read by meaning: `"true"`, `"1"`
    /// and `"yes"` (any case) are true, every other string, including
    /// `"false"` and `"0"`, is false.
    #[serde(default = "default_keep_aspect", deserialize_with = "lenient::flag")]
    pub keep_aspect: bool,
    /// Unit the rule was written in. Informational: the run-level unit is
    /// what geometry uses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

fn default_scale() -> f64 {
    DEFAULT_SCALE_PERCENT
}

fn default_keep_aspect() -> bool {
    true
}

impl PlacementRule {
    /// A rule at `(x, y)` with the given nominal size, 100% scale, last page.
    pub fn new(image: impl Into<PathBuf>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            image: image.into(),
            x,
            y,
            width,
            height,
            scale_x: DEFAULT_SCALE_PERCENT,
            scale_y: DEFAULT_SCALE_PERCENT,
            page: PageToken::Last,
            keep_aspect: true,
            unit: None,
        }
    }

    pub fn on_page(mut self, page: PageToken) -> Self {
        self.page = page;
        self
    }

    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    pub fn with_keep_aspect(mut self, keep_aspect: bool) -> Self {
        self.keep_aspect = keep_aspect;
        self
    }

    /// Check the rule invariants: an image is named, width/height/scales are
    /// finite and strictly positive, positions are finite.
    pub fn validate(&self) -> Result<(), String> {
        if self.image.as_os_str().is_empty() {
            return Err("image path is empty".to_string());
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(format!("position ({}, {}) is not finite", self.x, self.y));
        }
        if !(self.width > 0.0 && self.height > 0.0) || !self.width.is_finite() || !self.height.is_finite() {
            return Err(format!(
                "width and height must be > 0 (got {} x {})",
                self.width, self.height
            ));
        }
        if !(self.scale_x > 0.0 && self.scale_y > 0.0)
            || !self.scale_x.is_finite()
            || !self.scale_y.is_finite()
        {
            return Err(format!(
                "scale percentages must be > 0 (got {}% x {}%)",
                self.scale_x, self.scale_y
            ));
        }
        Ok(())
    }
}

/// A rule dropped before execution and the reason it was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRule {
    /// 0-based position in the submitted rule list.
    pub index: usize,
    pub reason: String,
}

impl From<RejectedRule> for BildwerkError {
    fn from(rejected: RejectedRule) -> Self {
        BildwerkError::InvalidRule {
            index: rejected.index,
            reason: rejected.reason,
        }
    }
}

/// Split `rules` into the ones that may run and the ones that are rejected.
/// Order of accepted rules is preserved. Nothing is clamped.
pub fn validate_rules(rules: &[PlacementRule]) -> (Vec<PlacementRule>, Vec<RejectedRule>) {
    let mut accepted = Vec::with_capacity(rules.len());
    let mut rejected = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        match rule.validate() {
            Ok(()) => accepted.push(rule.clone()),
            Err(reason) => {
                warn!(index, %reason, image = %rule.image.display(), "dropping placement rule");
                rejected.push(RejectedRule { index, reason });
            }
        }
    }

    (accepted, rejected)
}

/// Forgiving field parsers for hand-edited rule files.
///
/// Numbers may be JSON numbers or strings; `%` signs are stripped before
/// parsing; anything unparsable becomes the field's fallback.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use crate::units::DEFAULT_SCALE_PERCENT;

    pub(crate) fn parse_number(value: &Value, fallback: f64) -> f64 {
        match value {
            Value::Number(number) => number.as_f64().unwrap_or(fallback),
            Value::String(text) => text.replace('%', "").trim().parse().unwrap_or(fallback),
            _ => fallback,
        }
    }

    pub(crate) fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(parse_number(&Value::deserialize(deserializer)?, 0.0))
    }

    pub(crate) fn scale<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(parse_number(&Value::deserialize(deserializer)?, DEFAULT_SCALE_PERCENT))
    }

    pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(flag) => flag,
            Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            Value::String(text) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ),
            _ => false,
        })
    }
}

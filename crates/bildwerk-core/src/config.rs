// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rule file (JSON) shared by the extractor and the batch inserter.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BildwerkError, Result};
use crate::rule::PlacementRule;
use crate::types::YOrigin;
use crate::units::Unit;

/// Format version written to new rule files.
pub const RULE_FILE_VERSION: &str = "1.2";

/// A complete run configuration: unit, y convention, output options and the
/// ordered placement rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default = "default_version")]
    pub version: String,
    /// Unit used to interpret every rule's position and size.
    #[serde(default)]
    pub unit: Unit,
    /// Append `_signed` to output file names.
    #[serde(default)]
    pub add_suffix: bool,
    /// Output root; empty means `<input root>/output`.
    #[serde(default)]
    pub output_dir: String,
    #[serde(default)]
    pub y_origin: YOrigin,
    #[serde(default)]
    pub rules: Vec<PlacementRule>,
}

fn default_version() -> String {
    RULE_FILE_VERSION.to_string()
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            version: default_version(),
            unit: Unit::Cm,
            add_suffix: false,
            output_dir: String::new(),
            y_origin: YOrigin::BottomUp,
            rules: Vec::new(),
        }
    }
}

impl RuleSet {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| BildwerkError::Config(format!("invalid rule file: {}", err)))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a rule file. Relative image paths are resolved against the
    /// directory containing the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            BildwerkError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        let mut rule_set = Self::from_json(&text)?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        rule_set.resolve_images_against(base_dir);

        info!(
            path = %path.display(),
            rules = rule_set.rules.len(),
            unit = %rule_set.unit,
            "loaded rule file"
        );
        Ok(rule_set)
    }

    /// Write the rule set as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        debug!(path = %path.display(), rules = self.rules.len(), "rule file written");
        Ok(())
    }

    /// Output root for a batch over `input_root`.
    pub fn output_root(&self, input_root: &Path) -> PathBuf {
        if self.output_dir.trim().is_empty() {
            input_root.join("output")
        } else {
            PathBuf::from(self.output_dir.trim())
        }
    }

    fn resolve_images_against(&mut self, base_dir: &Path) {
        for rule in &mut self.rules {
            if !rule.image.as_os_str().is_empty() && rule.image.is_relative() {
                rule.image = base_dir.join(&rule.image);
            }
        }
    }
}

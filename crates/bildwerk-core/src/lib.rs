// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bildwerk — Core types, units, geometry and errors shared across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod pages;
pub mod rule;
pub mod types;
pub mod units;

pub use config::RuleSet;
pub use error::BildwerkError;
pub use geometry::{Placement, effective_size, placement_from_rect, resolve_rect};
pub use pages::parse_page_selection;
pub use rule::{PlacementRule, RejectedRule, validate_rules};
pub use types::*;
pub use units::{Unit, from_points, to_points};

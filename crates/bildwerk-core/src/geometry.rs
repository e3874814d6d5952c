// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rule <-> page rectangle conversion.

use crate::rule::PlacementRule;
use crate::types::{PageRect, YOrigin};
use crate::units::{DEFAULT_SCALE_PERCENT, Unit, from_points, to_points};

/// Final drawn size of a rule, still in the rule's unit.
///
/// With `keep_aspect` both axes use `min(scale_x, scale_y)`; otherwise each
/// axis uses its own percentage.
pub fn effective_size(rule: &PlacementRule) -> (f64, f64) {
    if rule.keep_aspect {
        let scale = rule.scale_x.min(rule.scale_y) / 100.0;
        (rule.width * scale, rule.height * scale)
    } else {
        (
            rule.width * rule.scale_x / 100.0,
            rule.height * rule.scale_y / 100.0,
        )
    }
}

/// Resolve a rule to an absolute rectangle in points.
///
/// `page_height` is the height of the target page box in points. Only
/// [`YOrigin::BottomUp`] subtracts the image height; [`YOrigin::TopDown`]
/// uses `y` as the lower edge directly. Rule files in circulation depend on
/// this, so keep the two branches as they are.
pub fn resolve_rect(rule: &PlacementRule, unit: Unit, y_origin: YOrigin, page_height: f64) -> PageRect {
    let (width, height) = effective_size(rule);
    let w = to_points(width, unit);
    let h = to_points(height, unit);
    let x = to_points(rule.x, unit);
    let y = to_points(rule.y, unit);

    let y0 = match y_origin {
        YOrigin::BottomUp => page_height - (y + h),
        YOrigin::TopDown => y,
    };

    PageRect::new(x, y0, x + w, y0 + h)
}

/// Placement values in `unit` that reproduce `rect`, as written by the
/// extractor. Scale is always 100% and the aspect ratio locked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Inverse of [`resolve_rect`] for a rule at 100% scale.
pub fn placement_from_rect(rect: &PageRect, unit: Unit, y_origin: YOrigin, page_height: f64) -> Placement {
    let y = match y_origin {
        YOrigin::BottomUp => page_height - rect.y1,
        YOrigin::TopDown => rect.y0,
    };
    Placement {
        x: from_points(rect.x0, unit),
        y: from_points(y, unit),
        width: from_points(rect.width(), unit),
        height: from_points(rect.height(), unit),
    }
}

impl Placement {
    /// Build a full rule for `image` from this placement.
    pub fn into_rule(self, image: impl Into<std::path::PathBuf>) -> PlacementRule {
        let mut rule = PlacementRule::new(image, self.x, self.y, self.width, self.height);
        rule.scale_x = DEFAULT_SCALE_PERCENT;
        rule.scale_y = DEFAULT_SCALE_PERCENT;
        rule.keep_aspect = true;
        rule
    }

    /// Round every field to `decimals` places.
    pub fn rounded(self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        let round = |v: f64| (v * factor).round() / factor;
        Self {
            x: round(self.x),
            y: round(self.y),
            width: round(self.width),
            height: round(self.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageToken;

    const LETTER_HEIGHT: f64 = 792.0;

    #[test]
    fn inch_rule_bottom_up() {
        let rule = PlacementRule::new("sig.png", 1.0, 1.0, 2.0, 1.0);
        let rect = resolve_rect(&rule, Unit::Inch, YOrigin::BottomUp, LETTER_HEIGHT);
        assert!(rect.approx_eq(&PageRect::new(72.0, 648.0, 216.0, 720.0), 1e-9));
    }

    #[test]
    fn inch_rule_top_down() {
        let rule = PlacementRule::new("sig.png", 1.0, 1.0, 2.0, 1.0);
        let rect = resolve_rect(&rule, Unit::Inch, YOrigin::TopDown, LETTER_HEIGHT);
        assert!(rect.approx_eq(&PageRect::new(72.0, 72.0, 216.0, 144.0), 1e-9));
    }

    #[test]
    fn aspect_lock_uses_smaller_scale() {
        let locked = PlacementRule::new("a.png", 0.0, 0.0, 4.0, 2.0).with_scale(50.0, 100.0);
        assert_eq!(effective_size(&locked), (2.0, 1.0));

        let free = locked.clone().with_keep_aspect(false);
        assert_eq!(effective_size(&free), (2.0, 2.0));
    }

    #[test]
    fn extracted_placement_reproduces_rect() {
        let rect = PageRect::new(40.5, 100.25, 300.0, 512.75);
        for unit in [Unit::Pt, Unit::Inch, Unit::Cm] {
            for origin in [YOrigin::BottomUp, YOrigin::TopDown] {
                let placement = placement_from_rect(&rect, unit, origin, LETTER_HEIGHT).rounded(6);
                let rule = placement.into_rule("img.png").on_page(PageToken::Number(1));
                let back = resolve_rect(&rule, unit, origin, LETTER_HEIGHT);
                assert!(back.approx_eq(&rect, 1e-3), "{unit} {origin:?}: {back:?}");
            }
        }
    }
}

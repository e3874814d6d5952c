// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Bildwerk.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Target page of a placement rule: a 1-based page number or the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageToken {
    /// 1-based page number as written in the rule. Values outside the
    /// document are clamped when resolved, never rejected.
    Number(i64),
    /// The last page of the document.
    #[default]
    Last,
}

impl PageToken {
    /// Parse a page token. `last` (any case) and anything that is not an
    /// integer select the last page.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if token.eq_ignore_ascii_case("last") {
            return Self::Last;
        }
        token.parse::<i64>().map(Self::Number).unwrap_or(Self::Last)
    }

    /// Resolve to a 0-based page index: `clamp(n - 1, 0, page_count - 1)`,
    /// `Last` maps to `page_count - 1`. Returns `None` for an empty document.
    pub fn resolve(&self, page_count: usize) -> Option<usize> {
        let last = page_count.checked_sub(1)?;
        Some(match self {
            Self::Last => last,
            Self::Number(number) => {
                let index = number.saturating_sub(1).max(0);
                usize::try_from(index).map_or(last, |index| index.min(last))
            }
        })
    }
}

impl std::fmt::Display for PageToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Last => f.write_str("last"),
        }
    }
}

impl Serialize for PageToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PageToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(token) => Self::parse(&token),
            serde_json::Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|n| n as i64))
                .map_or(Self::Last, Self::Number),
            _ => Self::Last,
        })
    }
}

/// How vertical input coordinates are measured. A run-level setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum YOrigin {
    /// Native PDF page space, origin at the bottom-left.
    #[default]
    BottomUp,
    /// Screen space, origin at the top-left, y grows downward.
    TopDown,
}

impl YOrigin {
    /// Label written to rule files for [`YOrigin::BottomUp`].
    pub const BOTTOM_UP_LABEL: &'static str = "从下往上（PDF 标准）";
    /// Label written to rule files for [`YOrigin::TopDown`].
    pub const TOP_DOWN_LABEL: &'static str = "从上往下（屏幕/GUI）";

    /// Parse a rule-file label. The English aliases `bottom-up` / `top-down`
    /// are accepted too; anything else is `BottomUp`.
    pub fn parse_label(label: &str) -> Self {
        match label.trim() {
            Self::TOP_DOWN_LABEL | "top-down" | "topdown" | "TopDown" => Self::TopDown,
            _ => Self::BottomUp,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::BottomUp => Self::BOTTOM_UP_LABEL,
            Self::TopDown => Self::TOP_DOWN_LABEL,
        }
    }
}

impl Serialize for YOrigin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for YOrigin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map_or(Self::BottomUp, Self::parse_label))
    }
}

/// Absolute rectangle in PDF points, bottom-left origin, relative to the
/// lower-left corner of the page box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageRect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest rectangle containing all `points`.
    pub fn bounding(points: &[(f64, f64)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut rect = Self::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Whether every edge is within `tolerance` points of `other`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.x0 - other.x0).abs() <= tolerance
            && (self.y0 - other.y0).abs() <= tolerance
            && (self.x1 - other.x1).abs() <= tolerance
            && (self.y1 - other.y1).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_token_resolution_clamps() {
        assert_eq!(PageToken::parse("last").resolve(5), Some(4));
        assert_eq!(PageToken::parse("7").resolve(5), Some(4));
        assert_eq!(PageToken::parse("0").resolve(5), Some(0));
        assert_eq!(PageToken::parse("-3").resolve(5), Some(0));
        assert_eq!(PageToken::parse("2").resolve(5), Some(1));
        assert_eq!(PageToken::Last.resolve(0), None);
    }

    #[test]
    fn page_token_parse_is_forgiving() {
        assert_eq!(PageToken::parse(" LAST "), PageToken::Last);
        assert_eq!(PageToken::parse("abc"), PageToken::Last);
        assert_eq!(PageToken::parse(" 3 "), PageToken::Number(3));
    }

    #[test]
    fn page_token_serde() {
        assert_eq!(serde_json::to_string(&PageToken::Number(3)).unwrap(), "\"3\"");
        assert_eq!(serde_json::to_string(&PageToken::Last).unwrap(), "\"last\"");
        let from_number: PageToken = serde_json::from_str("4").unwrap();
        assert_eq!(from_number, PageToken::Number(4));
    }

    #[test]
    fn y_origin_labels() {
        assert_eq!(YOrigin::parse_label(YOrigin::TOP_DOWN_LABEL), YOrigin::TopDown);
        assert_eq!(YOrigin::parse_label("top-down"), YOrigin::TopDown);
        assert_eq!(YOrigin::parse_label("sideways"), YOrigin::BottomUp);
        let json = serde_json::to_string(&YOrigin::BottomUp).unwrap();
        assert_eq!(json, format!("\"{}\"", YOrigin::BOTTOM_UP_LABEL));
    }

    #[test]
    fn bounding_rect() {
        let rect = PageRect::bounding(&[(10.0, 5.0), (2.0, 8.0), (4.0, -1.0)]).unwrap();
        assert_eq!(rect, PageRect::new(2.0, -1.0, 10.0, 8.0));
        assert!(PageRect::bounding(&[]).is_none());
    }
}

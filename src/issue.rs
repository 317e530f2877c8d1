use std::fmt::{Display, Formatter};

use derive_more::with_trait::IsVariant;

/// How bad a diagnostic is. An `Error` means some runtime query over the map
/// would be undefined; a `Warning` is survivable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(IsVariant)]
pub enum Severity {
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Diagnostic taxonomy, one variant per defect family.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MapIssueKind {
    /// Malformed statement or stray content outside a section.
    Syntax,
    /// A block is missing a mandatory key or carries an unusable one.
    Section,
    /// Duplicate id within a kind, or an unresolved reference.
    Id,
    /// Non-positive width/length/radius, degenerate polygon or polyline.
    Geometry,
    /// Exit pointing at a missing neighbor, or a neighbor without the
    /// opposing exit.
    Topology,
    /// Cells unreachable from the start cell.
    Connectivity,
    /// Advisory map policies (safe zones, intersections, beacon shapes).
    Policy,
}

impl Display for MapIssueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MapIssueKind::Syntax => "syntax",
            MapIssueKind::Section => "section",
            MapIssueKind::Id => "id",
            MapIssueKind::Geometry => "geometry",
            MapIssueKind::Topology => "topology",
            MapIssueKind::Connectivity => "connectivity",
            MapIssueKind::Policy => "policy",
        };
        write!(f, "{s}")
    }
}

/// A single diagnostic. Errors are data here; the parser and validator
/// accumulate these instead of failing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MapIssue {
    pub severity: Severity,
    pub kind: MapIssueKind,
    pub message: String,
    /// 1-based line in the source file; `None` for issues without a textual
    /// anchor (validator findings on the assembled model).
    pub line: Option<u32>,
}

impl MapIssue {
    pub fn error(kind: MapIssueKind, line: impl Into<Option<u32>>, message: impl Into<String>) -> Self {
        MapIssue { severity: Severity::Error, kind, message: message.into(), line: line.into() }
    }

    pub fn warning(
        kind: MapIssueKind,
        line: impl Into<Option<u32>>,
        message: impl Into<String>,
    ) -> Self {
        MapIssue { severity: Severity::Warning, kind, message: message.into(), line: line.into() }
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

impl Display for MapIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {} ({}): {}", self.severity, self.kind, self.message),
            None => write!(f, "{} ({}): {}", self.severity, self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_error_above_warning() {
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn display_with_and_without_line() {
        let with = MapIssue::error(MapIssueKind::Topology, 12, "exit into the void");
        assert_eq!(with.to_string(), "line 12: error (topology): exit into the void");

        let without = MapIssue::warning(MapIssueKind::Policy, None, "no safe zones");
        assert_eq!(without.to_string(), "warning (policy): no safe zones");
    }
}

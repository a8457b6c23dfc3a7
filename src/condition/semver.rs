//! Version-constraint parsing and comparison for `generatorVersion` leaves.
//!
//! The comparison tie-break ("numeric-if-parseable, else lexicographic per
//! segment") is an explicit decision point flagged as under-specified in the
//! upstream design notes; see `DESIGN.md` for the writeup.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Ge,
    Gt,
    Le,
    Lt,
    Pessimistic, // ~>
    Caret,       // ^
}

#[derive(Debug, Clone)]
pub struct VersionConstraint {
    operator: Operator,
    version: String,
}

#[derive(Debug)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version constraint: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

impl VersionConstraint {
    /// Parses `^\s*(>=|>|<=|<|~>|\^)\s*\d+\.\d+(\.\d+)?([-+][\w.-]+)*$`.
    pub fn parse(spec: &str) -> Result<Self, ParseError> {
        let trimmed = spec.trim();
        let (operator, rest) = if let Some(r) = trimmed.strip_prefix(">=") {
            (Operator::Ge, r)
        } else if let Some(r) = trimmed.strip_prefix('>') {
            (Operator::Gt, r)
        } else if let Some(r) = trimmed.strip_prefix("<=") {
            (Operator::Le, r)
        } else if let Some(r) = trimmed.strip_prefix('<') {
            (Operator::Lt, r)
        } else if let Some(r) = trimmed.strip_prefix("~>") {
            (Operator::Pessimistic, r)
        } else if let Some(r) = trimmed.strip_prefix('^') {
            (Operator::Caret, r)
        } else {
            return Err(ParseError(spec.to_string()));
        };

        let version = rest.trim();
        if !is_well_formed_version(version) {
            return Err(ParseError(spec.to_string()));
        }

        Ok(Self {
            operator,
            version: version.to_string(),
        })
    }

    pub fn matches(&self, detected: &str) -> bool {
        match self.operator {
            Operator::Ge => compare_versions(detected, &self.version) != Ordering::Less,
            Operator::Gt => compare_versions(detected, &self.version) == Ordering::Greater,
            Operator::Le => compare_versions(detected, &self.version) != Ordering::Greater,
            Operator::Lt => compare_versions(detected, &self.version) == Ordering::Less,
            Operator::Pessimistic => self.matches_pessimistic(detected),
            Operator::Caret => self.matches_caret(detected),
        }
    }

    /// `~> a.b.c` means `>= a.b.c, < a.(b+1).0`; `~> a.b` means
    /// `>= a.b, < (a+1).0` (Ruby "pessimistic" / "twiddle-wakka" semantics).
    fn matches_pessimistic(&self, detected: &str) -> bool {
        let segments = numeric_prefix_segments(&self.version);
        if segments.len() < 2 {
            return compare_versions(detected, &self.version) != Ordering::Less;
        }
        let bump_index = segments.len() - 2;
        let upper = bump_segment(&segments, bump_index);
        compare_versions(detected, &self.version) != Ordering::Less
            && compare_versions(detected, &upper) == Ordering::Less
    }

    /// `^a.b.c` freezes the leftmost non-zero segment (npm caret semantics):
    /// `^1.2.3` := `>=1.2.3, <2.0.0`; `^0.2.3` := `>=0.2.3, <0.3.0`;
    /// `^0.0.3` := `>=0.0.3, <0.0.4`.
    fn matches_caret(&self, detected: &str) -> bool {
        let segments = numeric_prefix_segments(&self.version);
        let bump_index = segments
            .iter()
            .position(|s| s.parse::<u64>().map(|n| n != 0).unwrap_or(true))
            .unwrap_or(segments.len().saturating_sub(1));
        let upper = bump_segment(&segments, bump_index);
        compare_versions(detected, &self.version) != Ordering::Less
            && compare_versions(detected, &upper) == Ordering::Less
    }
}

fn numeric_prefix_segments(version: &str) -> Vec<String> {
    let core = version.split(['-', '+']).next().unwrap_or(version);
    core.split('.').map(|s| s.to_string()).collect()
}

fn bump_segment(segments: &[String], index: usize) -> String {
    let mut bumped: Vec<String> = segments.to_vec();
    for seg in bumped.iter_mut().skip(index + 1) {
        *seg = "0".to_string();
    }
    if let Some(seg) = bumped.get_mut(index) {
        let n: u64 = seg.parse().unwrap_or(0);
        *seg = (n + 1).to_string();
    }
    bumped.join(".")
}

fn is_well_formed_version(version: &str) -> bool {
    let core = version.split(['-', '+']).next().unwrap_or(version);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return false;
    }
    parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Compares two version strings segment by segment, splitting on `.` and
/// `-`. Each segment pair compares numerically when both sides parse as
/// integers, and lexicographically otherwise. Shorter version strings are
/// padded with implicit zero segments.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let segs_a = split_segments(a);
    let segs_b = split_segments(b);
    let len = segs_a.len().max(segs_b.len());

    for i in 0..len {
        let sa = segs_a.get(i).map(String::as_str).unwrap_or("0");
        let sb = segs_b.get(i).map(String::as_str).unwrap_or("0");

        let ordering = match (sa.parse::<u64>(), sb.parse::<u64>()) {
            (Ok(na), Ok(nb)) => na.cmp(&nb),
            _ => sa.cmp(sb),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn split_segments(version: &str) -> Vec<String> {
    version
        .split(['.', '-'])
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_segments_compare_numerically() {
        assert_eq!(compare_versions("7.9.0", "7.10.0"), Ordering::Less);
    }

    #[test]
    fn non_numeric_segments_compare_lexicographically() {
        assert_eq!(compare_versions("1.0.0-alpha", "1.0.0-beta"), Ordering::Less);
    }

    #[test]
    fn ge_constraint() {
        let c = VersionConstraint::parse(">=8.0.0").unwrap();
        assert!(c.matches("8.0.0"));
        assert!(c.matches("8.1.0"));
        assert!(!c.matches("7.14.0"));
    }

    #[test]
    fn pessimistic_constraint_bounds_minor() {
        let c = VersionConstraint::parse("~>2.3.0").unwrap();
        assert!(c.matches("2.3.5"));
        assert!(!c.matches("2.4.0"));
        assert!(!c.matches("2.2.9"));
    }

    #[test]
    fn caret_constraint_freezes_leftmost_nonzero() {
        let c = VersionConstraint::parse("^0.2.3").unwrap();
        assert!(c.matches("0.2.9"));
        assert!(!c.matches("0.3.0"));
    }

    #[test]
    fn rejects_malformed_constraint() {
        assert!(VersionConstraint::parse("banana").is_err());
        assert!(VersionConstraint::parse(">=not-a-version").is_err());
    }
}

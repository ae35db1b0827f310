//! Version constraint algebra.
//!
//! Constraints are converted to PubGrub ranges so that two requesters'
//! constraints can be intersected: an empty intersection means no version
//! could ever satisfy both, which is a conflict regardless of what the index
//! currently publishes.

use pubgrub::Range;
use semver::{Comparator, Op, Version, VersionReq};

/// Convert a semver VersionReq to a PubGrub Range.
pub fn version_req_to_range(req: &VersionReq) -> Range<Version> {
    let mut range = Range::full();

    for comp in &req.comparators {
        range = range.intersection(&comparator_to_range(comp));
    }

    range
}

/// Whether some version could satisfy both constraints.
pub fn constraints_compatible(a: &VersionReq, b: &VersionReq) -> bool {
    version_req_to_range(a).intersection(&version_req_to_range(b)) != Range::empty()
}

/// The first version above everything the partial version `comp` names.
///
/// `1.2.3` -> `1.2.4`, `1.2` -> `1.3.0`, `1` -> `2.0.0`.
fn next_after(comp: &Comparator) -> Version {
    match (comp.minor, comp.patch) {
        (Some(minor), Some(patch)) => Version::new(comp.major, minor, patch + 1),
        (Some(minor), None) => Version::new(comp.major, minor + 1, 0),
        _ => Version::new(comp.major + 1, 0, 0),
    }
}

/// Convert a single semver Comparator to a PubGrub Range.
fn comparator_to_range(comp: &Comparator) -> Range<Version> {
    let major = comp.major;
    let minor = comp.minor.unwrap_or(0);
    let patch = comp.patch.unwrap_or(0);

    let version = Version::new(major, minor, patch);

    match comp.op {
        // =1.2 means >=1.2.0 <1.3.0
        Op::Exact if comp.patch.is_some() => Range::singleton(version),
        Op::Exact | Op::Wildcard => Range::between(version, next_after(comp)),

        // >1.2 means >=1.3.0
        Op::Greater => Range::higher_than(next_after(comp)),

        Op::GreaterEq => Range::higher_than(version),

        Op::Less => Range::strictly_lower_than(version),

        // <=1.2 means <1.3.0
        Op::LessEq => Range::strictly_lower_than(next_after(comp)),

        Op::Tilde => {
            // ~1.2.3 means >=1.2.3 <1.3.0, ~1 means >=1.0.0 <2.0.0
            let upper = if comp.minor.is_some() {
                Version::new(major, minor + 1, 0)
            } else {
                Version::new(major + 1, 0, 0)
            };

            Range::between(version, upper)
        }

        Op::Caret => {
            // ^1.2.3 means >=1.2.3 <2.0.0
            // ^0.2.3 means >=0.2.3 <0.3.0
            // ^0.0.3 means >=0.0.3 <0.0.4
            let upper = if major > 0 || comp.minor.is_none() {
                Version::new(major + 1, 0, 0)
            } else if minor > 0 || comp.patch.is_none() {
                Version::new(0, minor + 1, 0)
            } else {
                Version::new(0, 0, patch + 1)
            };

            Range::between(version, upper)
        }

        _ => Range::full(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(req: &str) -> Range<Version> {
        version_req_to_range(&req.parse().unwrap())
    }

    fn compatible(a: &str, b: &str) -> bool {
        constraints_compatible(&a.parse().unwrap(), &b.parse().unwrap())
    }

    #[test]
    fn test_caret_range() {
        let range = range("^1.2.3");

        assert!(range.contains(&Version::new(1, 2, 3)));
        assert!(range.contains(&Version::new(1, 2, 4)));
        assert!(range.contains(&Version::new(1, 9, 0)));
        assert!(!range.contains(&Version::new(2, 0, 0)));
        assert!(!range.contains(&Version::new(1, 2, 2)));
    }

    #[test]
    fn test_caret_range_zero_major() {
        let range = range("^0.2.3");

        assert!(range.contains(&Version::new(0, 2, 3)));
        assert!(range.contains(&Version::new(0, 2, 9)));
        assert!(!range.contains(&Version::new(0, 3, 0)));
    }

    #[test]
    fn test_tilde_range() {
        let range = range("~1.2.3");

        assert!(range.contains(&Version::new(1, 2, 3)));
        assert!(range.contains(&Version::new(1, 2, 9)));
        assert!(!range.contains(&Version::new(1, 3, 0)));
    }

    #[test]
    fn test_exact_range() {
        let exact = range("=1.2.3");
        assert!(exact.contains(&Version::new(1, 2, 3)));
        assert!(!exact.contains(&Version::new(1, 2, 4)));

        let partial = range("=1.2");
        assert!(partial.contains(&Version::new(1, 2, 7)));
        assert!(!partial.contains(&Version::new(1, 3, 0)));
    }

    #[test]
    fn test_partial_comparisons() {
        let le = range("<=1.17");
        assert!(le.contains(&Version::new(1, 17, 9)));
        assert!(!le.contains(&Version::new(1, 18, 0)));

        let gt = range(">1.17");
        assert!(!gt.contains(&Version::new(1, 17, 9)));
        assert!(gt.contains(&Version::new(1, 18, 0)));
    }

    #[test]
    fn test_comparison_range() {
        let range = range(">=1.0, <2.0");

        assert!(range.contains(&Version::new(1, 0, 0)));
        assert!(range.contains(&Version::new(1, 9, 9)));
        assert!(!range.contains(&Version::new(2, 0, 0)));
        assert!(!range.contains(&Version::new(0, 9, 9)));
    }

    #[test]
    fn test_compatibility() {
        assert!(compatible(">=1.0", "<2.0"));
        assert!(compatible("*", "=3.1.0"));
        assert!(compatible("^1.2", "~1.4"));
        assert!(!compatible(">=2.0", "<2.0"));
        assert!(!compatible("^1", "^2"));
        assert!(!compatible("=1.2.3", "=1.2.4"));
    }
}

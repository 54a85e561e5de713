//! Dotted numeric versions as published by the mod registry.
//!
//! Registry versions are plain dot-separated integers (`2.0.60`, `1.1`), not
//! full semver, so they get their own tuple type. Components are kept as
//! decimal digits and have no upper bound. Comparison pads both sides with
//! trailing zeros to at least three components.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Minimum arity used when comparing two versions.
const CANONICAL_ARITY: usize = 3;

/// Errors that can occur when parsing or bumping a version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version '{0}': expected dot-separated non-negative integers")]
    Invalid(String),

    #[error("version '{0}' has a component too large to bump")]
    Overflow(String),
}

/// An ordered tuple of non-negative integers, e.g. `2.0.60`.
#[derive(Debug, Clone)]
pub struct VersionTuple {
    /// Decimal digits without leading zeros (`"0"` for zero).
    parts: Vec<String>,
}

impl VersionTuple {
    /// Parse a dotted numeric version.
    ///
    /// # Errors
    ///
    /// Returns an error if any component is empty or not a non-negative integer.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        if s.is_empty() {
            return Err(VersionError::Invalid(s.to_string()));
        }

        let parts = s
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersionError::Invalid(s.to_string()));
                }
                let digits = part.trim_start_matches('0');
                Ok(if digits.is_empty() { "0" } else { digits }.to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { parts })
    }

    /// The first three components (zero padded) as a semver version.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Overflow`] if one of them does not fit in a `u64`.
    pub fn canonical(&self) -> Result<semver::Version, VersionError> {
        let component = |index: usize| {
            self.padded(index)
                .parse::<u64>()
                .map_err(|_| VersionError::Overflow(self.to_string()))
        };
        Ok(semver::Version::new(component(0)?, component(1)?, component(2)?))
    }

    fn padded(&self, index: usize) -> &str {
        self.parts.get(index).map_or("0", String::as_str)
    }
}

/// Numeric order of two normalized digit strings.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Ord for VersionTuple {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.parts.len().max(other.parts.len()).max(CANONICAL_ARITY);
        (0..width)
            .map(|i| cmp_digits(self.padded(i), other.padded(i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for VersionTuple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionTuple {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionTuple {}

impl fmt::Display for VersionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionTuple {
        VersionTuple::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(v("2.0.60").to_string(), "2.0.60");
        assert_eq!(v("7").to_string(), "7");
        assert_eq!(v("01.00.3").to_string(), "1.0.3");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "1..2", "1.", ".1", "1.a", "-1", "1.2-beta", " 1"] {
            assert!(VersionTuple::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_comparison_pads_to_three() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert!(v("1.2") < v("1.2.1"));
        assert!(v("1.10.0") > v("1.9.9"));
        assert!(v("2") > v("1.99.99"));
        assert_eq!(v("1.02"), v("1.2"));
    }

    #[test]
    fn test_comparison_beyond_three_components() {
        assert!(v("1.2.3.1") > v("1.2.3"));
        assert_eq!(v("1.2.3.0"), v("1.2.3"));
    }

    #[test]
    fn test_components_beyond_u64() {
        let huge = v("99999999999999999999999");
        assert!(huge > v("18446744073709551615.9.9"));
        assert_eq!(huge.to_string(), "99999999999999999999999");
        assert_eq!(
            huge.canonical(),
            Err(VersionError::Overflow("99999999999999999999999".to_string()))
        );
    }

    #[test]
    fn test_canonical_takes_three_components() {
        assert_eq!(v("1.2").canonical().unwrap(), semver::Version::new(1, 2, 0));
        assert_eq!(v("1.2.3.4").canonical().unwrap(), semver::Version::new(1, 2, 3));
    }
}

//! Engine revision strings and their version ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Revision string of the container format (e.g. "5.3.0f1").
///
/// Equality and `Ord` are plain string comparisons, which is what keys and the
/// on-disk revision table need. Version-aware comparison is available through
/// [`Revision::version_cmp`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Wraps a revision string.
    pub fn new(revision: impl Into<String>) -> Self {
        Self(revision.into())
    }

    /// Returns the revision string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsed version, if the string follows `MAJOR.MINOR.PATCH[TYPE][BUILD]`.
    pub fn version(&self) -> Option<RevisionVersion> {
        RevisionVersion::parse(&self.0)
    }

    /// Orders revisions as versions.
    ///
    /// Parsed versions compare numerically; unparsable revisions sort after all
    /// parsed ones and compare lexically among themselves.
    pub fn version_cmp(&self, other: &Revision) -> Ordering {
        match (self.version(), other.version()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Revision {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Revision {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Numeric components of a revision string.
///
/// Field order gives the derived ordering: numbers first, then release type
/// (`a` alpha < `b` beta < `f` final < `p` patch), then build number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RevisionVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub release: Option<char>,
    pub build: u32,
}

impl RevisionVersion {
    /// Parses `MAJOR.MINOR.PATCH[TYPE][BUILD]`; the suffix is optional.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, '.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let tail = parts.next()?;

        let digits_end = tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len());
        let patch = tail[..digits_end].parse().ok()?;

        let suffix = &tail[digits_end..];
        let mut chars = suffix.chars();
        let (release, build) = match chars.next() {
            None => (None, 0),
            Some(c) if c.is_ascii_alphabetic() => {
                let rest = chars.as_str();
                let build = if rest.is_empty() { 0 } else { rest.parse().ok()? };
                (Some(c.to_ascii_lowercase()), build)
            }
            Some(_) => return None,
        };

        Some(Self {
            major,
            minor,
            patch,
            release,
            build,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let v = RevisionVersion::parse("5.3.0f1").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (5, 3, 0));
        assert_eq!(v.release, Some('f'));
        assert_eq!(v.build, 1);

        let v = RevisionVersion::parse("2017.1.2p13").unwrap();
        assert_eq!((v.major, v.minor, v.patch, v.build), (2017, 1, 2, 13));

        let v = RevisionVersion::parse("3.5.7").unwrap();
        assert_eq!(v.release, None);

        assert!(RevisionVersion::parse("custom").is_none());
        assert!(RevisionVersion::parse("5.x.0").is_none());
        assert!(RevisionVersion::parse("5.3.0f1x").is_none());
    }

    #[test]
    fn test_version_ordering() {
        let ordered = [
            "2.6.1f3", "3.5.7f6", "4.7.2f1", "5.3.0a1", "5.3.0b4", "5.3.0f1", "5.3.0f4",
            "5.3.0p1", "5.10.0f1", "2017.1.0f3", "legacy",
        ];
        for pair in ordered.windows(2) {
            let a = Revision::from(pair[0]);
            let b = Revision::from(pair[1]);
            assert_eq!(a.version_cmp(&b), Ordering::Less, "{} < {}", a, b);
            assert_eq!(b.version_cmp(&a), Ordering::Greater, "{} > {}", b, a);
        }
    }

    #[test]
    fn test_string_order_differs_from_version_order() {
        let a = Revision::from("5.10.0f1");
        let b = Revision::from("5.9.0f1");
        assert!(a < b);
        assert_eq!(a.version_cmp(&b), Ordering::Greater);
    }
}

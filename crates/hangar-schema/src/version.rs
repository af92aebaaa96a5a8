//! Comparison of loosely structured mod version strings.
//!
//! Mod authors publish versions such as `1:v2.0-3`, `1.2b` or `0.0772`.
//! Before comparing, a version is normalized:
//!
//! 1. an `epoch:` prefix is dropped,
//! 2. every `v`/`V` is removed,
//! 3. the first `-` becomes a `.`,
//! 4. a trailing run of letters becomes extra numeric parts (`a` = 0, `b` = 1, ...).
//!
//! The result is split on `.` and compared part by part. Versions that cannot
//! be normalized or contain invalid parts are [`VersionOrdering::Incomparable`].

use std::cmp::Ordering;

/// Knobs for [`compare`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Pad the shorter version with `0` parts before comparing.
    pub zero_extend: bool,
    /// Compare parts as strings and accept letter suffixes (`1a`).
    pub lexicographical: bool,
}

impl CompareOptions {
    /// Numeric comparison with zero extension.
    pub const ZERO_EXTEND: Self = Self {
        zero_extend: true,
        lexicographical: false,
    };
}

/// Result of [`compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrdering {
    /// The first version is lower.
    Less,
    /// Both versions are equal after normalization.
    Equal,
    /// The first version is higher.
    Greater,
    /// At least one version has a part that is not valid for the chosen mode.
    Incomparable,
}

impl VersionOrdering {
    /// The ordering, or `None` when incomparable.
    pub fn as_ordering(self) -> Option<Ordering> {
        match self {
            Self::Less => Some(Ordering::Less),
            Self::Equal => Some(Ordering::Equal),
            Self::Greater => Some(Ordering::Greater),
            Self::Incomparable => None,
        }
    }

    /// `compare(..) >= 0`. Never true for incomparable versions.
    pub fn is_at_least(self) -> bool {
        matches!(self, Self::Greater | Self::Equal)
    }

    /// `compare(..) <= 0`. Never true for incomparable versions.
    pub fn is_at_most(self) -> bool {
        matches!(self, Self::Less | Self::Equal)
    }
}

impl From<Ordering> for VersionOrdering {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::Less,
            Ordering::Equal => Self::Equal,
            Ordering::Greater => Self::Greater,
        }
    }
}

/// Compare two version strings.
///
/// An empty string on either side compares as [`VersionOrdering::Equal`].
/// Without `zero_extend`, a version that is a strict prefix of the other is
/// lower (`1.2` < `1.2.0`).
pub fn compare(v1: &str, v2: &str, options: CompareOptions) -> VersionOrdering {
    if v1.is_empty() || v2.is_empty() {
        return VersionOrdering::Equal;
    }

    let (Some(mut left), Some(mut right)) = (normalize(v1), normalize(v2)) else {
        return VersionOrdering::Incomparable;
    };

    let valid = |part: &String| {
        if options.lexicographical {
            is_lexicographic_part(part)
        } else {
            is_numeric_part(part)
        }
    };
    if !left.iter().all(valid) || !right.iter().all(valid) {
        return VersionOrdering::Incomparable;
    }

    if options.zero_extend {
        let len = left.len().max(right.len());
        left.resize(len, "0".to_string());
        right.resize(len, "0".to_string());
    }

    for (i, part) in left.iter().enumerate() {
        let Some(other) = right.get(i) else {
            return VersionOrdering::Greater;
        };
        let ordering = if options.lexicographical {
            part.as_str().cmp(other.as_str())
        } else {
            compare_numeric(part, other)
        };
        if ordering != Ordering::Equal {
            return ordering.into();
        }
    }

    if left.len() == right.len() {
        VersionOrdering::Equal
    } else {
        VersionOrdering::Less
    }
}

/// Whether `candidate` is strictly newer than `current`.
pub fn is_newer(current: &str, candidate: &str) -> bool {
    compare(candidate, current, CompareOptions::default()) == VersionOrdering::Greater
}

/// Split a version into dotted parts after normalization.
///
/// Returns `None` when the trailing non-digit run contains anything other
/// than lowercase ASCII letters.
pub fn normalize(version: &str) -> Option<Vec<String>> {
    let without_epoch = match version.find(':') {
        Some(idx) if idx > 0 => &version[idx + 1..],
        _ => version,
    };
    let stripped: String = without_epoch
        .chars()
        .filter(|c| !matches!(c, 'v' | 'V'))
        .collect();
    let dotted = stripped.replacen('-', ".", 1);

    let cut = dotted
        .rfind(|c: char| c.is_ascii_digit())
        .map_or(0, |idx| idx + 1);
    let (body, postfix) = dotted.split_at(cut);

    let mut parts: Vec<String> = body.split('.').map(str::to_string).collect();
    for c in postfix.chars() {
        if !c.is_ascii_lowercase() {
            return None;
        }
        parts.push((u32::from(c) - u32::from('a')).to_string());
    }
    Some(parts)
}

fn is_numeric_part(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

fn is_lexicographic_part(part: &str) -> bool {
    let digits = part.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && part.bytes().skip(digits).all(|b| b.is_ascii_alphabetic())
}

/// Compare two digit strings by value without parsing, so long parts cannot overflow.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

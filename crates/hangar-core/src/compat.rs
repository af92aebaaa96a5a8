//! Game-version compatibility of catalog entries.

use hangar_schema::{ANY_VERSION, CompareOptions, ModRecord, compare};

/// Whether `record` can be installed into a game running `target`.
///
/// An exact `ksp_version` wins over a range: it matches the target itself,
/// the `any` wildcard, or any version sharing the target's `major.minor`. Without it, a declared
/// `ksp_version_min`/`ksp_version_max` range must contain the target (a
/// missing bound is open). Records declaring nothing are compatible.
pub fn is_compatible(record: &ModRecord, target: &str) -> bool {
    if let Some(exact) = record.ksp_version.as_deref() {
        return exact == target || exact == ANY_VERSION || major_minor(exact) == major_minor(target);
    }

    if record.ksp_version_min.is_some() || record.ksp_version_max.is_some() {
        return within_range(
            target,
            record.ksp_version_min.as_deref(),
            record.ksp_version_max.as_deref(),
        );
    }

    true
}

/// Keep every record compatible with `target`, preserving order.
pub fn compatible_only(records: Vec<ModRecord>, target: &str) -> Vec<ModRecord> {
    records
        .into_iter()
        .filter(|record| is_compatible(record, target))
        .collect()
}

fn within_range(target: &str, min: Option<&str>, max: Option<&str>) -> bool {
    let above_min = match min {
        None | Some(ANY_VERSION) => true,
        Some(min) => compare(target, min, CompareOptions::default()).is_at_least(),
    };
    let below_max = match max {
        None | Some(ANY_VERSION) => true,
        Some(max) => compare(target, max, CompareOptions::default()).is_at_most(),
    };
    above_min && below_max
}

/// `1.4.1` -> `1.4`; shorter versions come back unchanged.
fn major_minor(version: &str) -> &str {
    match version.match_indices('.').nth(1) {
        Some((idx, _)) => &version[..idx],
        None => version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(exact: Option<&str>, min: Option<&str>, max: Option<&str>) -> ModRecord {
        let mut json = serde_json::json!({
            "identifier": "A",
            "version": "1.0",
            "download": "https://example.org/a.zip",
        });
        let object = json.as_object_mut().unwrap();
        for (key, value) in [
            ("ksp_version", exact),
            ("ksp_version_min", min),
            ("ksp_version_max", max),
        ] {
            if let Some(value) = value {
                object.insert(key.to_string(), value.into());
            }
        }
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_exact_version() {
        assert!(is_compatible(&record(Some("1.4.1"), None, None), "1.4.1"));
        assert!(!is_compatible(&record(Some("1.3.1"), None, None), "1.4.1"));
    }

    #[test]
    fn test_exact_patch_level_is_ignored() {
        assert!(is_compatible(&record(Some("1.4.3"), None, None), "1.4.1"));
        assert!(is_compatible(&record(Some("1.4.1"), None, None), "1.4.2"));
        assert!(is_compatible(&record(Some("1.4.1"), None, None), "1.4"));
        assert!(!is_compatible(&record(Some("1.4.1"), None, None), "1.5.1"));
        assert!(!is_compatible(&record(Some("1.12.5"), None, None), "1.1.2"));
    }

    #[test]
    fn test_exact_any() {
        assert!(is_compatible(&record(Some("any"), None, None), "1.12.5"));
    }

    #[test]
    fn test_exact_minor_match() {
        assert!(is_compatible(&record(Some("1.4"), None, None), "1.4.1"));
        assert!(!is_compatible(&record(Some("1.3"), None, None), "1.4.1"));
    }

    #[test]
    fn test_range() {
        let ranged = record(None, Some("1.3"), Some("1.5"));
        assert!(is_compatible(&ranged, "1.4.1"));
        assert!(is_compatible(&ranged, "1.3"));
        assert!(!is_compatible(&ranged, "1.6"));
        assert!(!is_compatible(&ranged, "1.2.9"));
    }

    #[test]
    fn test_range_without_zero_extension() {
        // 1.5.1 is above 1.5 since the longer version wins.
        assert!(!is_compatible(&record(None, Some("1.3"), Some("1.5")), "1.5.1"));
    }

    #[test]
    fn test_range_wildcards_and_open_bounds() {
        assert!(is_compatible(&record(None, Some("any"), Some("1.5")), "0.90"));
        assert!(is_compatible(&record(None, Some("1.3"), Some("any")), "1.12"));
        assert!(is_compatible(&record(None, Some("1.3"), None), "1.12"));
        assert!(!is_compatible(&record(None, None, Some("1.3")), "1.12"));
    }

    #[test]
    fn test_incomparable_bound_fails() {
        assert!(!is_compatible(&record(None, Some("1.x"), Some("any")), "1.4.1"));
        assert!(!is_compatible(&record(None, Some("any"), Some("1.4")), "1.4-pre"));
    }

    #[test]
    fn test_unconstrained_is_compatible() {
        assert!(is_compatible(&record(None, None, None), "1.4.1"));
    }

    #[test]
    fn test_exact_wins_over_range() {
        assert!(!is_compatible(&record(Some("1.2"), Some("1.0"), Some("1.9")), "1.4.1"));
    }

    #[test]
    fn test_compatible_only_keeps_order() {
        let mut a = record(Some("1.4.1"), None, None);
        a.identifier = "A".into();
        let mut b = record(Some("1.0"), None, None);
        b.identifier = "B".into();
        let mut c = record(None, None, None);
        c.identifier = "C".into();
        let kept: Vec<_> = compatible_only(vec![a, b, c], "1.4.1")
            .into_iter()
            .map(|r| r.identifier)
            .collect();
        assert_eq!(kept, vec!["A", "C"]);
    }

    #[test]
    fn test_major_minor() {
        assert_eq!(major_minor("1.4.1"), "1.4");
        assert_eq!(major_minor("1.4"), "1.4");
        assert_eq!(major_minor("1"), "1");
    }
}

//! Choosing the release to pin from a catalog response.

use crate::catalog::ReleaseCandidate;

/// Returns true if `candidate` is in the preferred tier for `want_tag`.
///
/// A candidate is preferred when it carries no tag, when no tag is wanted,
/// or when its tag equals the wanted one.
fn is_preferred(candidate: &ReleaseCandidate, want_tag: Option<&str>) -> bool {
    match (want_tag, candidate.compatibility_tag.as_deref()) {
        (None, _) | (_, None) => true,
        (Some(want), Some(tag)) => want == tag,
    }
}

/// Pick the best release.
///
/// The highest version among preferred candidates wins; only when there is no
/// preferred candidate does the highest mismatching-tag release get chosen.
/// Returns `None` for an empty slice.
#[must_use]
pub fn select_best<'a>(
    candidates: &'a [ReleaseCandidate],
    want_tag: Option<&str>,
) -> Option<&'a ReleaseCandidate> {
    let (preferred, fallback): (Vec<_>, Vec<_>) = candidates
        .iter()
        .partition(|c| is_preferred(c, want_tag));

    preferred
        .into_iter()
        .max_by(|a, b| a.version.cmp(&b.version))
        .or_else(|| fallback.into_iter().max_by(|a, b| a.version.cmp(&b.version)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(version: &str, tag: Option<&str>) -> ReleaseCandidate {
        ReleaseCandidate::new(version, tag).unwrap()
    }

    #[test]
    fn test_empty_yields_none() {
        assert!(select_best(&[], Some("2.0")).is_none());
        assert!(select_best(&[], None).is_none());
    }

    #[test]
    fn test_matching_tag_beats_higher_version() {
        let candidates = [release("1.2.0", Some("A")), release("9.9.9", Some("B"))];
        let best = select_best(&candidates, Some("A")).unwrap();
        assert_eq!(best.raw_version, "1.2.0");
    }

    #[test]
    fn test_untagged_release_is_preferred() {
        let candidates = [release("3.0.0", None), release("4.0.0", Some("1.1"))];
        let best = select_best(&candidates, Some("2.0")).unwrap();
        assert_eq!(best.raw_version, "3.0.0");
    }

    #[test]
    fn test_falls_back_to_highest_mismatch() {
        let candidates = [
            release("0.9.0", Some("1.0")),
            release("1.4.2", Some("1.1")),
            release("1.3.0", Some("1.1")),
        ];
        let best = select_best(&candidates, Some("2.0")).unwrap();
        assert_eq!(best.raw_version, "1.4.2");
    }

    #[test]
    fn test_no_wanted_tag_takes_global_max() {
        let candidates = [release("1.2.0", Some("A")), release("9.9.9", Some("B"))];
        assert_eq!(select_best(&candidates, None).unwrap().raw_version, "9.9.9");
    }

    #[test]
    fn test_compares_numerically_not_lexically() {
        let candidates = [
            release("0.9.10", Some("2.0")),
            release("0.9.9", Some("2.0")),
            release("0.10", Some("2.0")),
        ];
        assert_eq!(
            select_best(&candidates, Some("2.0")).unwrap().raw_version,
            "0.10"
        );
    }
}

//! String similarity used by the employee matcher and the fuzzy rate lookup.

use rapidfuzz::distance::indel;

/// Default minimum similarity for a fuzzy match to be accepted.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Returns the indel-normalized similarity in `[0, 1]`.
///
/// The score is `(len_a + len_b - indel) / (len_a + len_b)`, where `indel` is
/// the number of insertions and deletions turning one string into the other.
/// `1.0` means identical. The comparison works on Unicode scalar values, so
/// Cyrillic labels are compared letter by letter.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::similarity;
///
/// assert_eq!(similarity("МАССАЖ", "МАССАЖ"), 1.0);
/// assert!(similarity("МАНИКЮР", "МАНИКЮР-ПЕДИКЮР") < 0.8);
/// assert!(similarity("ИВАНОВА", "ИВАНОВАЯ") > 0.8);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    indel::normalized_similarity(a.chars(), b.chars())
}

/// Returns `true` when both strings are non-empty and their similarity
/// strictly exceeds `threshold`.
pub fn is_similar(a: &str, b: &str, threshold: f64) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    similarity(a, b) > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical_strings_score_one() {
        assert_eq!(similarity("ПЕТРОВА", "ПЕТРОВА"), 1.0);
    }

    #[test]
    fn test_disjoint_strings_score_zero() {
        assert_eq!(similarity("АБВ", "ГДЕ"), 0.0);
    }

    #[test]
    fn test_single_typo_in_long_name_is_similar() {
        assert!(is_similar("КОНСТАНТИНОВА", "КОНСТАНТИНОВО", 0.8));
    }

    #[test]
    fn test_empty_never_similar() {
        assert!(!is_similar("", "", 0.0));
        assert!(!is_similar("А", "", 0.0));
    }

    #[test]
    fn test_missing_letter_scores_indel_ratio() {
        assert!((similarity("ЮЛЯ", "ЮЛИЯ") - 6.0 / 7.0).abs() < 1e-12);
        assert!((similarity("ВОСК", "ВОСКА") - 8.0 / 9.0).abs() < 1e-12);
        assert!(is_similar("ЮЛЯ", "ЮЛИЯ", 0.8));
    }

    #[test]
    fn test_substitution_counts_twice() {
        // one substitution is a deletion plus an insertion
        assert!((similarity("КОСА", "КОЗА") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_is_strict() {
        // 4 of 5 letters kept on each side: exactly 0.8
        assert!(!is_similar("АБВГД", "АБВГЕ", 0.8));
        assert!(is_similar("АБВГД", "АБВГЕ", 0.79));
    }

    proptest! {
        #[test]
        fn prop_similarity_in_unit_interval(a in "\\PC{0,12}", b in "\\PC{0,12}") {
            let score = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_similarity_is_symmetric(a in "[А-Я]{0,10}", b in "[А-Я]{0,10}") {
            prop_assert!((similarity(&a, &b) - similarity(&b, &a)).abs() < 1e-12);
        }

        #[test]
        fn prop_self_similarity_is_one(a in "[А-Яа-я ]{1,16}") {
            prop_assert_eq!(similarity(&a, &a), 1.0);
        }
    }
}

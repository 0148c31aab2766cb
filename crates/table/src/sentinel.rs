//! Sentinel conventions shared across the pipeline.
//!
//! Decoder tables carry three flavors of "nothing": a truly empty cell, a
//! bare `-`, and the literal text `NaN` left behind by upstream exports.
//! All three are normalized to the `&` sentinel before concatenation so that
//! a blank tag still occupies its slot in a combined column header.

/// Canonical placeholder written in place of blank/dash/NaN cells.
pub const SENTINEL: &str = "&";

/// Delimiter joining tag values into a combined column header.
pub const TAG_DELIMITER: &str = "---";

/// True for cells that count as "no value": empty, `-`, or textual NaN.
pub fn is_blankish(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("nan")
}

/// True for cells that are blankish or already the sentinel.
pub fn is_empty_or_sentinel(cell: &str) -> bool {
    is_blankish(cell) || cell.trim() == SENTINEL
}

/// Sort key that strips one trailing `_<integer>` suffix.
///
/// Columns like `TOKEN_0`, `TOKEN_1`, `TOKEN_10` sort by prefix first and
/// numeric suffix second, so `TOKEN_10` lands after `TOKEN_2`. Names without
/// a numeric suffix sort after all suffixed siblings of the same prefix.
pub fn suffix_sort_key(name: &str) -> (String, Option<u64>) {
    match name.rsplit_once('_') {
        Some((prefix, tail)) => match tail.parse::<u64>() {
            Ok(n) => (prefix.to_string(), Some(n)),
            Err(_) => (name.to_string(), None),
        },
        None => (name.to_string(), None),
    }
}

/// Ordering adapter for [`suffix_sort_key`]: `None` (no numeric suffix)
/// sorts last within its prefix group.
pub fn suffix_sort_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    let (pa, na) = suffix_sort_key(a);
    let (pb, nb) = suffix_sort_key(b);
    pa.cmp(&pb).then_with(|| match (na, nb) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blankish_covers_dash_and_nan() {
        assert!(is_blankish(""));
        assert!(is_blankish("  "));
        assert!(is_blankish("-"));
        assert!(is_blankish("NaN"));
        assert!(is_blankish("nan"));
        assert!(!is_blankish("&"));
        assert!(!is_blankish("0"));
    }

    #[test]
    fn suffix_key_splits_trailing_integer() {
        assert_eq!(suffix_sort_key("TOKEN_10"), ("TOKEN".to_string(), Some(10)));
        assert_eq!(suffix_sort_key("TOKEN_A"), ("TOKEN_A".to_string(), None));
        assert_eq!(suffix_sort_key("PLAIN"), ("PLAIN".to_string(), None));
    }

    #[test]
    fn numeric_suffixes_sort_numerically() {
        let mut cols = vec!["T_10", "T_2", "T_1", "OTHER"];
        cols.sort_by(|a, b| suffix_sort_cmp(a, b));
        assert_eq!(cols, vec!["OTHER", "T_1", "T_2", "T_10"]);
    }
}

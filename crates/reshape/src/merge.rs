//! PASS/FAIL pipe-field merging.

/// Merge two pipe-delimited strings field by field, preferring the pass
/// side. The shorter side is padded with empty fields.
pub fn combine_pipe_fields(pass: &str, fail: &str) -> String {
    let pass_fields: Vec<&str> = pass.split('|').collect();
    let fail_fields: Vec<&str> = fail.split('|').collect();
    let len = pass_fields.len().max(fail_fields.len());

    let mut combined = Vec::with_capacity(len);
    for i in 0..len {
        let p = pass_fields.get(i).copied().unwrap_or("");
        if p.is_empty() {
            combined.push(fail_fields.get(i).copied().unwrap_or(""));
        } else {
            combined.push(p);
        }
    }
    combined.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pass_side_wins_per_field() {
        assert_eq!(combine_pipe_fields("1||3", "a|b|c"), "1|b|3");
    }

    #[test]
    fn shorter_side_is_padded() {
        assert_eq!(combine_pipe_fields("1", "a|b|c"), "1|b|c");
        assert_eq!(combine_pipe_fields("1|2|3", "a"), "1|2|3");
    }

    #[test]
    fn both_empty_yields_single_empty_field() {
        assert_eq!(combine_pipe_fields("", ""), "");
    }
}

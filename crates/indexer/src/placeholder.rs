//! Cross-column placeholder substitution.

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(.*?)>").unwrap());

/// Replace every `<Column>` placeholder in `template` with the value of the
/// named column in the same row. Placeholders naming no known column are
/// left verbatim.
pub fn resolve_placeholders(template: &str, headers: &[String], row: &[String]) -> String {
    let mut resolved = template.to_string();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if let Some(idx) = headers.iter().position(|h| h == name) {
            resolved = resolved.replace(&format!("<{name}>"), &row[idx]);
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn substitutes_same_row_values() {
        let headers = vec!["Pin".to_string(), "ItuffToken".to_string()];
        let row = vec!["CLK0".to_string(), "<Pin>_RESULT".to_string()];
        assert_eq!(resolve_placeholders("<Pin>_RESULT", &headers, &row), "CLK0_RESULT");
    }

    #[test]
    fn unknown_placeholders_stay_verbatim() {
        let headers = vec!["Pin".to_string()];
        let row = vec!["CLK0".to_string()];
        assert_eq!(
            resolve_placeholders("<Missing>_X_<Pin>", &headers, &row),
            "<Missing>_X_CLK0"
        );
    }
}

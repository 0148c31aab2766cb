//! Test-name token preparation: PASS/FAIL suffix derivation and byte-budget
//! chunking for the SQL IN clause.

use crate::error::{QueryError, Result};

/// Byte budget for one IN-clause token chunk.
pub const MAX_CHUNK_BYTES: usize = 31000;

/// How indexed names map onto the test names stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStyle {
    /// Names are stored verbatim.
    Literal,
    /// SmartCtvDc: `PASS`/`FAIL` sits before the last `_` segment.
    InsertSuffix,
    /// `_PASS`/`_FAIL` is appended.
    AppendSuffix,
}

impl TokenStyle {
    pub fn derive(test_type: &str, needed_suffix: bool) -> Result<TokenStyle> {
        match (needed_suffix, test_type) {
            (true, "SmartCtvDc") => Ok(TokenStyle::InsertSuffix),
            (true, t) if !t.is_empty() => Ok(TokenStyle::Literal),
            (true, _) => Err(QueryError::UnknownTestType(String::new())),
            (false, _) => Ok(TokenStyle::AppendSuffix),
        }
    }
}

fn has_status_suffix(name: &str) -> bool {
    let upper = name.to_uppercase();
    upper.ends_with("_PASS") || upper.ends_with("_FAIL")
}

/// Insert `status` before the last `_` segment: `A_B_C` -> `A_B_PASS_C`.
fn insert_status(name: &str, status: &str) -> String {
    let mut parts: Vec<&str> = name.split('_').collect();
    let pos = parts.len().saturating_sub(1);
    parts.insert(pos, status);
    parts.join("_")
}

/// Expand indexed names into the database-side token list.
///
/// Already-suffixed names pass through verbatim in every style; the FAIL
/// variants come first, matching the order results land in the pull.
pub fn token_name_list(names: &[String], style: TokenStyle) -> Vec<String> {
    match style {
        TokenStyle::Literal => names.to_vec(),
        TokenStyle::InsertSuffix => {
            let unsuffixed: Vec<&String> =
                names.iter().filter(|n| !has_status_suffix(n)).collect();
            let mut out: Vec<String> =
                unsuffixed.iter().map(|n| insert_status(n, "FAIL")).collect();
            out.extend(unsuffixed.iter().map(|n| insert_status(n, "PASS")));
            out.extend(names.iter().filter(|n| has_status_suffix(n)).cloned());
            out
        }
        TokenStyle::AppendSuffix => {
            let unsuffixed: Vec<&String> =
                names.iter().filter(|n| !has_status_suffix(n)).collect();
            let mut out: Vec<String> =
                unsuffixed.iter().map(|n| format!("{n}_FAIL")).collect();
            out.extend(unsuffixed.iter().map(|n| format!("{n}_PASS")));
            out.extend(names.iter().filter(|n| has_status_suffix(n)).cloned());
            out
        }
    }
}

/// Chunk tokens so each rendered IN-list stays under `max_bytes`; each token
/// costs its quoted-comma-newline rendering. A chunk is the pre-joined
/// `'a',\n'b'` interior (without the outer quotes the SQL template adds).
pub fn split_by_byte_size(tokens: &[String], max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0usize;

    for token in tokens {
        let token_size = format!("'{token}',\n").len();
        if !current.is_empty() && current_size + token_size > max_bytes {
            chunks.push(current.join("',\n'"));
            current = vec![token];
            current_size = token_size;
        } else {
            current.push(token);
            current_size += token_size;
        }
    }
    if !current.is_empty() {
        chunks.push(current.join("',\n'"));
    }
    chunks
}

//! Iterator-space expansion of decoder templates.
//!
//! The combination space of list-valued iterators is walked with an explicit
//! odometer (leftmost declared key varies slowest), matching the depth-first
//! left-to-right order of the recursive formulation while keeping the
//! queue-parameter position counter an ordinary local.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Map;

use crate::config::{value_to_string, MapParameter};

static ITERATOR_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Iterator(.*?)>").unwrap());
static QUEUE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"<QueueParameter(.*?)>").unwrap());

/// An iterator binding: scalar, or a list to branch on.
#[derive(Debug, Clone)]
pub enum IterValue {
    Scalar(String),
    List(Vec<String>),
}

impl IterValue {
    pub fn from_json(value: &serde_json::Value) -> IterValue {
        match value {
            serde_json::Value::Array(items) => {
                IterValue::List(items.iter().map(value_to_string).collect())
            }
            other => IterValue::Scalar(value_to_string(other)),
        }
    }
}

/// Split template rows into break-delimited chunks.
///
/// A row with `break` in any cell (case-insensitive) ends the current chunk
/// and is itself dropped. Chunk boundaries scope queue-parameter indexing.
pub fn split_break_chunks(rows: &[Vec<String>]) -> Vec<Vec<Vec<String>>> {
    let mut chunks = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();
    for row in rows {
        if row.iter().any(|cell| cell.to_lowercase().contains("break")) {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(row.clone());
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Keys of `params` actually referenced by `pattern`-style placeholders
/// within the chunk, in declaration order.
fn referenced_keys<'a>(
    params: &'a Map<String, serde_json::Value>,
    chunk: &[Vec<String>],
    pattern: &Regex,
) -> Vec<&'a str> {
    let mut referenced: Vec<&str> = Vec::new();
    for row in chunk {
        for cell in row {
            for caps in pattern.captures_iter(cell) {
                if let Some(found) = params.keys().map(String::as_str).find(|k| *k == &caps[1]) {
                    if !referenced.contains(&found) {
                        referenced.push(found);
                    }
                }
            }
        }
    }
    // keep declaration order, not reference order
    params
        .keys()
        .map(String::as_str)
        .filter(|k| referenced.contains(k))
        .collect()
}

/// Expand one break-chunk against its iterator domains.
///
/// With only scalar iterators the output row count equals the chunk size;
/// with list-valued iterators of sizes n1..nk it is chunk-size × ∏ni.
pub fn expand_chunk(
    chunk: &[Vec<String>],
    header: &[String],
    iterators: &Map<String, serde_json::Value>,
    map_params: &Map<String, serde_json::Value>,
    custom_params: &Map<String, serde_json::Value>,
    queue_params: &Map<String, serde_json::Value>,
) -> Vec<Vec<String>> {
    let local_iter_keys = referenced_keys(iterators, chunk, &ITERATOR_REF);
    let local_queue_keys = referenced_keys(queue_params, chunk, &QUEUE_REF);

    let mut scalars: Vec<(&str, String)> = Vec::new();
    let mut lists: Vec<(&str, Vec<String>)> = Vec::new();
    for &key in &local_iter_keys {
        match IterValue::from_json(&iterators[key]) {
            IterValue::Scalar(v) => scalars.push((key, v)),
            IterValue::List(vs) => lists.push((key, vs)),
        }
    }
    let queues: Vec<(&str, Vec<String>)> = local_queue_keys
        .iter()
        .map(|key| {
            let values = match &queue_params[*key] {
                serde_json::Value::Array(items) => items.iter().map(value_to_string).collect(),
                other => vec![value_to_string(other)],
            };
            (*key, values)
        })
        .collect();
    let maps: Vec<(&str, MapParameter)> = map_params
        .iter()
        .filter_map(|(name, value)| {
            serde_json::from_value::<MapParameter>(value.clone())
                .ok()
                .map(|m| (name.as_str(), m))
        })
        .collect();

    let mut completed = Vec::new();
    let mut counter = 0usize;
    let mut odometer = vec![0usize; lists.len()];
    loop {
        let mut assignment: Vec<(&str, &str)> = scalars
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        for (slot, (key, values)) in odometer.iter().zip(&lists) {
            assignment.push((*key, values[*slot].as_str()));
        }

        for row in chunk {
            let filled = fill_row(row, header, &assignment, custom_params, &queues, counter, &maps);
            completed.push(filled);
            counter += 1;
        }

        // advance: rightmost list varies fastest
        let mut pos = lists.len();
        loop {
            if pos == 0 {
                return completed;
            }
            pos -= 1;
            odometer[pos] += 1;
            if odometer[pos] < lists[pos].1.len() {
                break;
            }
            odometer[pos] = 0;
        }
    }
}

fn fill_row(
    row: &[String],
    header: &[String],
    iter_assignment: &[(&str, &str)],
    custom_params: &Map<String, serde_json::Value>,
    queues: &[(&str, Vec<String>)],
    counter: usize,
    maps: &[(&str, MapParameter)],
) -> Vec<String> {
    let mut revised: Vec<String> = row
        .iter()
        .map(|cell| {
            let mut cell = cell.clone();
            for (key, value) in iter_assignment {
                cell = cell.replace(&format!("<Iterator{key}>"), value);
            }
            for (key, value) in custom_params {
                cell = cell.replace(
                    &format!("<CustomParameter{key}>"),
                    &value_to_string(value),
                );
            }
            for (key, values) in queues {
                match values.get(counter) {
                    Some(value) => {
                        cell = cell.replace(&format!("<QueueParameter{key}>"), value);
                    }
                    None => log::warn!(
                        "QueueParameter {key} has no element for row position {counter}"
                    ),
                }
            }
            cell
        })
        .collect();

    // Map lookups run after direct substitution: the hierarchy key is built
    // from already-substituted column values.
    for (name, map_param) in maps {
        let indices: Vec<usize> = map_param
            .hierarchy_columns
            .iter()
            .filter_map(|col| header.iter().position(|h| h == col))
            .collect();
        let key: String = indices
            .iter()
            .map(|&i| revised[i].as_str())
            .collect::<Vec<_>>()
            .join(",");
        if let Some(replacement) = map_param.map.get(&key) {
            let replacement = value_to_string(replacement);
            for cell in revised.iter_mut() {
                *cell = cell.replace(&format!("<MapParameter{name}>"), &replacement);
            }
        }
        // no key match: the placeholder text stays put
    }
    revised
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn as_map(value: serde_json::Value) -> Map<String, serde_json::Value> {
        value.as_object().unwrap().clone()
    }

    fn header() -> Vec<String> {
        vec!["Pin".to_string(), "Token".to_string()]
    }

    #[test]
    fn scalar_iterators_preserve_row_count() {
        let chunk = vec![
            vec!["P0".to_string(), "<IteratorFreq>_A".to_string()],
            vec!["P1".to_string(), "<IteratorFreq>_B".to_string()],
        ];
        let iterators = as_map(json!({"Freq": "100"}));
        let empty = Map::new();
        let rows = expand_chunk(&chunk, &header(), &iterators, &empty, &empty, &empty);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], "100_A");
        assert_eq!(rows[1][1], "100_B");
    }

    #[test]
    fn list_iterators_expand_to_cartesian_product() {
        let chunk = vec![vec![
            "P0".to_string(),
            "<IteratorA>_<IteratorB>".to_string(),
        ]];
        let iterators = as_map(json!({"A": ["a1", "a2"], "B": ["b1", "b2", "b3"]}));
        let empty = Map::new();
        let rows = expand_chunk(&chunk, &header(), &iterators, &empty, &empty, &empty);
        assert_eq!(rows.len(), 6);
        // first declared key varies slowest
        let tokens: Vec<&str> = rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(
            tokens,
            vec!["a1_b1", "a1_b2", "a1_b3", "a2_b1", "a2_b2", "a2_b3"]
        );
    }

    #[test]
    fn unreferenced_list_iterators_do_not_branch() {
        let chunk = vec![vec!["P0".to_string(), "no placeholders".to_string()]];
        let iterators = as_map(json!({"Unused": ["u1", "u2", "u3"]}));
        let empty = Map::new();
        let rows = expand_chunk(&chunk, &header(), &iterators, &empty, &empty, &empty);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn queue_parameters_index_by_row_position() {
        let chunk = vec![
            vec!["P0".to_string(), "<QueueParameterQ>".to_string()],
            vec!["P1".to_string(), "<QueueParameterQ>".to_string()],
        ];
        let queues = as_map(json!({"Q": ["first", "second"]}));
        let empty = Map::new();
        let rows = expand_chunk(&chunk, &header(), &empty, &empty, &empty, &queues);
        assert_eq!(rows[0][1], "first");
        assert_eq!(rows[1][1], "second");
    }

    #[test]
    fn map_lookup_uses_substituted_hierarchy_values() {
        let chunk = vec![vec![
            "<IteratorPin>".to_string(),
            "<MapParameterM>".to_string(),
        ]];
        let iterators = as_map(json!({"Pin": "P7"}));
        let maps = as_map(json!({
            "M": {"HierarchyColumns": ["Pin"], "Map": {"P7": "mapped_value"}}
        }));
        let empty = Map::new();
        let rows = expand_chunk(&chunk, &header(), &iterators, &maps, &empty, &empty);
        assert_eq!(rows[0][1], "mapped_value");
    }

    #[test]
    fn map_miss_leaves_placeholder_text() {
        let chunk = vec![vec!["P0".to_string(), "<MapParameterM>".to_string()]];
        let maps = as_map(json!({
            "M": {"HierarchyColumns": ["Pin"], "Map": {"OTHER": "x"}}
        }));
        let empty = Map::new();
        let rows = expand_chunk(&chunk, &header(), &empty, &maps, &empty, &empty);
        assert_eq!(rows[0][1], "<MapParameterM>");
    }

    #[test]
    fn break_rows_delimit_and_are_dropped() {
        let rows = vec![
            vec!["a".to_string()],
            vec!["BREAK".to_string()],
            vec!["b".to_string()],
            vec!["c".to_string()],
        ];
        let chunks = split_break_chunks(&rows);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], vec![vec!["a".to_string()]]);
        assert_eq!(chunks[1].len(), 2);
    }
}

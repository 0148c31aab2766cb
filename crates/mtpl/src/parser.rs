//! Test-instance and flow extraction from MTPL source text.

use once_cell::sync::Lazy;
use regex::Regex;

/// One decoder test declaration from an MTPL file.
///
/// A loader-style block declaring several per-key configuration files fans
/// out into one instance per file, all sharing the block's name and mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestInstance {
    pub decoder_type: String,
    pub test_name: String,
    pub configuration_file: String,
    pub basic_test_config: Option<String>,
    pub mode: Option<String>,
    pub bypass_port: Option<String>,
}

/// One (flow item, result code) pair from a flow block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowResult {
    pub flow_item_name: String,
    pub result_number: i64,
}

static TEST_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)CSharpTest\s+(\w+)\s+(\w+)\s*\{(.*?)\}").unwrap());
static CONFIG_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ConfigurationFile\s*=\s*(.+?);").unwrap());
static CONFIG_FILE_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ConfigurationFile_\w+\s*=\s*(.+?);").unwrap());
static BASIC_CONFIG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"BasicTestConfiguration\s*=\s*(.+?);").unwrap());
static MODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sMode\s*=\s*(.+?);").unwrap());
static BYPASS_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"BypassPort\s*=\s*(.+?);").unwrap());
static FLOW_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"FlowItem\s+(\w+)").unwrap());
static RESULT_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Result\s+(-?\d+)").unwrap());

/// Extract all test-instance records from MTPL text.
///
/// Blocks without any configuration file declaration produce nothing;
/// malformed blocks simply fail to match and are skipped silently, which is
/// the parser's defined behavior.
pub fn parse_test_instances(text: &str) -> Vec<TestInstance> {
    let mut instances = Vec::new();
    for block in TEST_BLOCK.captures_iter(text) {
        let decoder_type = block[1].trim().to_string();
        let test_name = block[2].trim().to_string();
        let body = &block[3];

        let single = CONFIG_FILE
            .captures(body)
            .map(|c| clean_field(&c[1]))
            .filter(|s| !s.is_empty());
        let listed: Vec<String> = CONFIG_FILE_LIST
            .captures_iter(body)
            .map(|c| clean_field(&c[1]))
            .collect();
        let basic_test_config = BASIC_CONFIG.captures(body).map(|c| c[1].trim().to_string());
        let mode = MODE.captures(body).map(|c| c[1].trim().to_string());
        let bypass_port = BYPASS_PORT.captures(body).map(|c| c[1].trim().to_string());

        let config_files: Vec<String> = if !listed.is_empty() {
            listed
        } else if let Some(single) = single {
            vec![single]
        } else {
            continue;
        };
        for configuration_file in config_files {
            instances.push(TestInstance {
                decoder_type: decoder_type.clone(),
                test_name: test_name.clone(),
                configuration_file,
                basic_test_config: basic_test_config.clone(),
                mode: mode.clone(),
                bypass_port: bypass_port.clone(),
            });
        }
    }
    instances
}

/// Extract (flow item, result code) pairs from every `Flow` block.
///
/// An item declaring three result codes yields three rows.
pub fn parse_flow_results(text: &str) -> Vec<FlowResult> {
    let mut results = Vec::new();
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find("Flow ") {
        let start = search_from + rel;
        let Some((body, end)) = balanced_block(text, start) else {
            break;
        };
        for item in flow_items(body) {
            results.extend(item);
        }
        search_from = end;
    }
    results
}

fn flow_items(flow_body: &str) -> Vec<Vec<FlowResult>> {
    let mut items = Vec::new();
    for caps in FLOW_ITEM.captures_iter(flow_body) {
        let name = caps[1].to_string();
        let item_start = caps.get(0).unwrap().start();
        let Some((item_body, _)) = balanced_block(flow_body, item_start) else {
            continue;
        };
        let rows: Vec<FlowResult> = RESULT_CODE
            .captures_iter(item_body)
            .filter_map(|c| c[1].parse().ok())
            .map(|result_number| FlowResult {
                flow_item_name: name.clone(),
                result_number,
            })
            .collect();
        items.push(rows);
    }
    items
}

/// Body between the first `{` after `start` and its balanced `}`, plus the
/// index just past the closing brace.
fn balanced_block(text: &str, start: usize) -> Option<(&str, usize)> {
    let open = start + text[start..].find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + offset;
                    return Some((&text[open + 1..close], close + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn clean_field(raw: &str) -> String {
    raw.trim().replace('\n', " ")
}

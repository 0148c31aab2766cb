//! SmartCTV configuration schema.
//!
//! Every formerly-implicit default in the JSON shape is a declared
//! `#[serde(default)]` here, so a missing `Iterators` or `MapParameters`
//! block means "empty" explicitly rather than by a swallowed key error.
//! Maps keep JSON declaration order (`preserve_order`), which matters:
//! iterator branching order follows the order of declaration.

use crate::error::{Result, SmartCtvError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Map;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SmartCtvConfig {
    #[serde(rename = "TestConfigurations", default)]
    pub test_configurations: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TestConfiguration {
    #[serde(rename = "Decoder", default)]
    pub decoder: DecoderConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DecoderConfig {
    #[serde(rename = "ConfigurationFile", default)]
    pub configuration_file: String,

    #[serde(rename = "Iterators", default)]
    pub iterators: Map<String, serde_json::Value>,

    #[serde(rename = "MapParameters", default)]
    pub map_parameters: Map<String, serde_json::Value>,

    #[serde(rename = "CustomParameters", default)]
    pub custom_parameters: Map<String, serde_json::Value>,

    #[serde(rename = "QueueParameters", default)]
    pub queue_parameters: Map<String, serde_json::Value>,

    #[serde(rename = "ItuffTestNamePostfix", default)]
    pub ituff_test_name_postfix: Option<String>,
}

/// A named map-lookup parameter: replacement values keyed by the
/// comma-joined values of its hierarchy columns.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MapParameter {
    #[serde(rename = "HierarchyColumns", default)]
    pub hierarchy_columns: Vec<String>,

    #[serde(rename = "Map", default)]
    pub map: Map<String, serde_json::Value>,
}

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Remove trailing commas before closing brackets/braces.
pub fn fix_json_trailing_commas(json: &str) -> String {
    TRAILING_COMMA.replace_all(json, "$1").into_owned()
}

/// Load a SmartCTV configuration, retrying once with a trailing-comma fixup.
///
/// A parse failure after the retry aborts the whole call; this is the one
/// fatal condition in SmartCTV processing.
pub fn load_config(path: &Path) -> Result<SmartCtvConfig> {
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(config) => Ok(config),
        Err(first_err) => {
            log::warn!(
                "JSON decode error in {}, attempting trailing-comma fixup: {first_err}",
                path.display()
            );
            serde_json::from_str(&fix_json_trailing_commas(&content)).map_err(|source| {
                SmartCtvError::JsonError {
                    path: path.display().to_string(),
                    source,
                }
            })
        }
    }
}

/// Stringify a JSON scalar the way the templates expect: bare strings keep
/// their text, numbers render plainly.
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn trailing_comma_fixup_round_trips_valid_json() {
        let valid = r#"{"a": [1, 2], "b": {"c": "d"}}"#;
        assert_eq!(fix_json_trailing_commas(valid), valid);
    }

    #[test]
    fn trailing_commas_are_removed() {
        let broken = r#"{"a": [1, 2,], "b": {"c": "d",},}"#;
        let fixed = fix_json_trailing_commas(broken);
        assert!(serde_json::from_str::<serde_json::Value>(&fixed).is_ok());
    }

    #[test]
    fn load_config_recovers_from_trailing_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(
            &path,
            r#"{"TestConfigurations": {"0": {"Decoder": {"ConfigurationFile": "X",}},}}"#,
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.test_configurations.len(), 1);
    }

    #[test]
    fn missing_blocks_default_to_empty() {
        let raw = r#"{"Decoder": {"ConfigurationFile": "X"}}"#;
        let config: TestConfiguration = serde_json::from_str(raw).unwrap();
        assert!(config.decoder.iterators.is_empty());
        assert!(config.decoder.map_parameters.is_empty());
        assert!(config.decoder.queue_parameters.is_empty());
        assert_eq!(config.decoder.ituff_test_name_postfix, None);
    }
}

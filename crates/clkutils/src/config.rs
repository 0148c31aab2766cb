//! ClkUtils configuration schema.
//!
//! Setup groups keep JSON declaration order (`preserve_order`): cbb groups
//! are walked in the order the file declares them, and the per-group row
//! counter depends on it.

use std::path::Path;

use serde::Deserialize;
use serde_json::Map;

use crate::error::{ClkUtilsError, Result};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClkUtilsConfig {
    #[serde(default)]
    pub setups: Setups,

    #[serde(rename = "ClkUtils_test_case_config", default)]
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Setups {
    #[serde(default)]
    pub setup: SetupRegions,

    /// Setup number to DCM name.
    #[serde(default)]
    pub setup_map: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SetupRegions {
    #[serde(default)]
    pub top: Map<String, serde_json::Value>,

    #[serde(default)]
    pub cbb: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TestCase {
    /// Anchored pattern list; only the first entry is consulted.
    #[serde(default)]
    pub regular_expression: Vec<String>,

    #[serde(default)]
    pub test_config_name: String,

    /// Either the literal `"$setup"` reference or an explicit DCM list.
    #[serde(default)]
    pub setup: SetupSpec,

    /// Comma-space separated ratio numbers, e.g. `"8, 12, 16"`.
    #[serde(default)]
    pub ratios: String,

    #[serde(default)]
    pub ctv_sequence: Vec<CtvStage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SetupSpec {
    Reference(String),
    List(Vec<String>),
}

impl Default for SetupSpec {
    fn default() -> Self {
        SetupSpec::List(Vec::new())
    }
}

impl SetupSpec {
    pub fn is_setup_reference(&self) -> bool {
        matches!(self, SetupSpec::Reference(s) if s == "$setup")
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CtvStage {
    #[serde(default)]
    pub stage: String,

    /// Stages without fields contribute no rows.
    #[serde(default)]
    pub fields: Option<Vec<StageField>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StageField {
    #[serde(default)]
    pub name: String,
}

pub fn load_config(path: &Path) -> Result<ClkUtilsConfig> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ClkUtilsError::JsonError {
        path: path.display().to_string(),
        source,
    })
}

/// Group registered setups by the trailing segment of their dotted key,
/// splitting each comma-space value list. First-seen group order is kept.
pub fn extract_setups(section: &Map<String, serde_json::Value>) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in section {
        let group = key.rsplit('.').next().unwrap_or(key).to_string();
        let values = match value {
            serde_json::Value::String(s) => s
                .split(", ")
                .map(str::to_string)
                .collect::<Vec<_>>(),
            other => vec![other.to_string()],
        };
        match grouped.iter_mut().find(|(g, _)| *g == group) {
            Some((_, existing)) => existing.extend(values),
            None => grouped.push((group, values)),
        }
    }
    grouped
}

impl Setups {
    /// DCM name for a setup number.
    pub fn dcm_name(&self, setup_num: &str) -> Result<String> {
        match self.setup_map.get(setup_num) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(ClkUtilsError::UnknownSetup(setup_num.to_string())),
        }
    }
}

impl TestCase {
    pub fn ratio_names(&self) -> Vec<String> {
        self.ratios
            .split(", ")
            .filter(|s| !s.is_empty())
            .map(|n| format!("r_{n}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn setups_group_by_trailing_key_segment() {
        let section = json!({
            "clk.dcm.groupA": "1, 2",
            "clk.pll.groupA": "3",
            "clk.dcm.groupB": "4, 5"
        });
        let grouped = extract_setups(section.as_object().unwrap());
        assert_eq!(
            grouped,
            vec![
                (
                    "groupA".to_string(),
                    vec!["1".to_string(), "2".to_string(), "3".to_string()]
                ),
                ("groupB".to_string(), vec!["4".to_string(), "5".to_string()]),
            ]
        );
    }

    #[test]
    fn setup_spec_distinguishes_reference_from_list() {
        let reference: SetupSpec = serde_json::from_str(r#""$setup""#).unwrap();
        assert!(reference.is_setup_reference());
        let list: SetupSpec = serde_json::from_str(r#"["DCM0", "DCM1"]"#).unwrap();
        assert!(!list.is_setup_reference());
    }

    #[test]
    fn ratio_names_are_prefixed() {
        let case = TestCase {
            ratios: "8, 12".to_string(),
            ..Default::default()
        };
        assert_eq!(case.ratio_names(), vec!["r_8", "r_12"]);
    }
}

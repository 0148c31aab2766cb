//! SQL text construction for the XEUS string-result pull.

/// Sentinel meaning "any value": renders as an `IS NOT NULL` predicate.
pub const NOT_NULL: &str = "Not Null";

/// Material filters for one pull.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub lot: Vec<String>,
    pub wafer_id: Vec<String>,
    pub program: String,
    /// Days of history: `test_end_date_time >= TRUNC(SYSDATE) - prefetch`.
    pub prefetch: u32,
    pub databases: Vec<String>,
}

impl Default for QuerySpec {
    fn default() -> Self {
        QuerySpec {
            lot: vec![NOT_NULL.to_string()],
            wafer_id: vec![NOT_NULL.to_string()],
            program: "DAC%".to_string(),
            prefetch: 3,
            databases: vec!["D1D_PROD_XEUS".to_string(), "F24_PROD_XEUS".to_string()],
        }
    }
}

fn membership_condition(column: &str, values: &[String]) -> String {
    let wildcard = values.is_empty()
        || (values.len() == 1 && (values[0] == NOT_NULL || values[0].is_empty()));
    if wildcard {
        format!("{column} IS NOT NULL")
    } else {
        let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
        format!("{column} IN ({})", quoted.join(","))
    }
}

fn program_condition(program: &str) -> String {
    if program.contains('%') {
        format!("v0.program_name LIKE '{program}'")
    } else {
        format!("v0.program_name = '{program}'")
    }
}

/// Render the full pull statement for one token chunk. The chunk is the
/// pre-joined IN-list interior; it is uppercased here since ITUFF test
/// names are stored uppercase.
pub fn build_query(chunk: &str, spec: &QuerySpec) -> String {
    let lot_condition = membership_condition("v0.lot", &spec.lot);
    let wafer_condition = membership_condition("v0.wafer_id", &spec.wafer_id);
    let program_condition = program_condition(&spec.program);
    let prefetch = spec.prefetch;
    let chunk = chunk.to_uppercase();
    format!(
        r#"
/*BEGIN SQL*/
SELECT /*+  use_nl (dt) */
        v0.lot AS lot
        ,v0.operation AS operation
        ,v0.program_name AS program_name
        ,v0.wafer_id AS wafer_id
        ,dt.sort_x AS sort_x
        ,dt.sort_y AS sort_y
        ,dt.interface_bin AS interface_bin
        ,t0.test_name AS test_name
        ,Replace(Replace(Replace(Replace(Replace(Replace(str.string_result,',',';'),chr(9),' '),chr(10),' '),chr(13),' '),chr(34),''''),chr(7),' ') AS string_result
FROM
A_Testing_Session v0
INNER JOIN A_Test t0 ON t0.devrevstep = v0.devrevstep AND (t0.program_name = v0.program_name or t0.program_name is null or v0.program_name is null)  AND (t0.temperature = v0.temperature OR (t0.temperature IS NULL AND v0.temperature IS NULL))
INNER JOIN A_Device_Testing dt ON v0.lao_start_ww + 0 = dt.lao_start_ww AND v0.ts_id + 0 = dt.ts_id
LEFT JOIN A_String_Result str ON v0.lao_start_ww = str.lao_start_ww AND v0.ts_id = str.ts_id AND dt.dt_id = str.dt_id AND t0.t_id = str.t_id
WHERE 1=1
AND      v0.valid_flag = 'Y'
AND      {lot_condition}
AND      {wafer_condition}
AND      t0.test_name IN ('{chunk}')
AND      str.string_result IS NOT NULL
AND      v0.test_end_date_time >= TRUNC(SYSDATE) - {prefetch}
AND      {program_condition}
/*END SQL*/
"#
    )
}

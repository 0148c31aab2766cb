//! Database bridge backed by an external helper command.
//!
//! The production result store speaks a vendor protocol with no native
//! driver here, so the bridge delegates: the helper is invoked with the
//! datasource name as its one argument, receives the SQL on stdin, and
//! answers with CSV (header row first) on stdout. No configured helper
//! surfaces as `BridgeUnavailable` before any query runs.

use std::io::Write;
use std::process::{Command, Stdio};

use ctv_query::{Connection, QueryCursor, QueryError, UberBridge};

/// Environment variable naming the helper command.
pub const BRIDGE_CMD_ENV: &str = "CTV_UBER_CMD";

pub struct CommandBridge {
    program: String,
}

impl CommandBridge {
    /// Resolve the helper from an explicit flag or the environment.
    pub fn acquire(flag: Option<&str>) -> ctv_query::Result<CommandBridge> {
        let program = flag
            .map(str::to_string)
            .or_else(|| std::env::var(BRIDGE_CMD_ENV).ok())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                QueryError::BridgeUnavailable(format!(
                    "no bridge command configured (set {BRIDGE_CMD_ENV} or pass --bridge-cmd)"
                ))
            })?;
        Ok(CommandBridge { program })
    }
}

impl UberBridge for CommandBridge {
    fn connect(&self, datasource: &str) -> ctv_query::Result<Box<dyn Connection + '_>> {
        Ok(Box::new(CommandConnection {
            program: self.program.clone(),
            datasource: datasource.to_string(),
        }))
    }
}

struct CommandConnection {
    program: String,
    datasource: String,
}

impl Connection for CommandConnection {
    fn execute(&mut self, sql: &str) -> ctv_query::Result<Box<dyn QueryCursor>> {
        let mut child = Command::new(&self.program)
            .arg(&self.datasource)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| QueryError::BridgeUnavailable(format!(
                "could not launch {}: {err}",
                self.program
            )))?;

        child
            .stdin
            .take()
            .ok_or_else(|| QueryError::Database {
                datasource: self.datasource.clone(),
                message: "helper stdin unavailable".to_string(),
            })?
            .write_all(sql.as_bytes())?;

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(QueryError::Database {
                datasource: self.datasource.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(output.stdout.as_slice());
        let columns: Vec<String> = reader
            .headers()
            .map_err(QueryError::from)?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(QueryError::from)?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Box::new(CommandCursor { columns, rows }))
    }
}

struct CommandCursor {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl QueryCursor for CommandCursor {
    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn rows(&mut self) -> ctv_query::Result<Vec<Vec<String>>> {
        Ok(std::mem::take(&mut self.rows))
    }
}

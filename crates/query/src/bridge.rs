//! Database bridge capability.
//!
//! The query engine never opens connections on its own: callers acquire a
//! bridge once and pass it in, so tests can substitute canned cursors and a
//! missing driver surfaces as one early `BridgeUnavailable` instead of a
//! failure deep inside the chunk loop.

use crate::error::Result;

pub trait UberBridge {
    fn connect(&self, datasource: &str) -> Result<Box<dyn Connection + '_>>;
}

pub trait Connection {
    fn execute(&mut self, sql: &str) -> Result<Box<dyn QueryCursor>>;
}

pub trait QueryCursor {
    fn columns(&self) -> Vec<String>;

    /// Drains the cursor.
    fn rows(&mut self) -> Result<Vec<Vec<String>>>;
}

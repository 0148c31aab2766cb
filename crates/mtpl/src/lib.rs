//! MTPL parser: structured test-instance and flow records from test-program
//! markup text.

mod csv_out;
mod error;
mod parser;
mod verify;

pub use csv_out::{mtpl_ports_to_csv, mtpl_to_csv, PORT_CSV_HEADERS, TEST_CSV_HEADERS};
pub use error::{MtplError, Result};
pub use parser::{parse_flow_results, parse_test_instances, FlowResult, TestInstance};
pub use verify::{find_port_mismatches, mtpl_verification, PortMismatch};

//! Token-batched XEUS string-result pulls for indexed CTV decoders.

mod bridge;
mod error;
mod exec;
mod sql;
mod tokens;

pub use bridge::{Connection, QueryCursor, UberBridge};
pub use error::{QueryError, Result};
pub use exec::{datapulled_path, uber_request, PulledData, IDENTITY_HEADERS};
pub use sql::{build_query, QuerySpec, NOT_NULL};
pub use tokens::{split_by_byte_size, token_name_list, TokenStyle, MAX_CHUNK_BYTES};

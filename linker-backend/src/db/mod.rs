mod sqlite;
pub mod tables;

pub use sqlite::{Database, DbError, DbResult};
pub(crate) use sqlite::{
    is_unique_violation, json_column, opt_json_column, opt_timestamp_column, timestamp_column,
};
pub use tables::pairing_records::CodeClaim;

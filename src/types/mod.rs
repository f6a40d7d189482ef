//! Record and value types returned by queries.

mod record;
mod value;

pub use record::{ColumnInfo, Record};
pub use value::{ColumnKind, Value, DATETIME_FORMAT};

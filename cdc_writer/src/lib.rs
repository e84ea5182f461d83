pub mod day_file;
pub mod row;
pub mod writer;

pub use row::{day_file_schema, StoredRow};
pub use writer::{apply_effects, write_all, DayOutcome, WriteSummary};

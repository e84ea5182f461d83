/// One parsed INSERT/UPDATE/DELETE against the configured target table.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEvent {
    pub kind: EventKind,

    /// `@1`: the primary key. Always non-zero (zero/unparsable values cause
    /// the whole block to be silently dropped before a `RowEvent` exists).
    pub pk: i64,

    /// `@3`: local wall-clock timestamp `YYYY-MM-DD HH:MM:SS`, copied verbatim.
    /// Its first 10 characters are the day-partition key.
    pub dt: String,

    /// `@4`: `None` means the column is NULL. Unused (always `None`) for DELETE.
    pub val: Option<f64>,

    /// `@6`: Unix epoch seconds. Unused (always `0`) for DELETE.
    pub ts: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Insert,
    Update,
    Delete,
}

impl RowEvent {
    /// The `YYYY-MM-DD` day partition this event routes to.
    pub fn day(&self) -> &str {
        common::time_util::day_prefix(&self.dt)
    }
}

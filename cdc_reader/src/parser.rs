use std::io::{BufRead, Lines};
use std::iter::Peekable;

use common::err::{CResult, CdcError};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::event::{EventKind, RowEvent};

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(INSERT INTO|UPDATE|DELETE FROM) `([^`]+)`\.`([^`]+)`$").unwrap()
});

static ASSIGNMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@(\d+)=(.*)$").unwrap());

static DATETIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap());

/// Streams [`RowEvent`]s out of a decoded row-event text stream, one
/// statement block at a time.
///
/// Only blocks whose header names `qualified_table` (`` `db`.`table` ``,
/// matched exactly) are parsed; every other line — including the bodies of
/// other tables' blocks — is skipped without being interpreted.
pub struct EventReader<R: BufRead> {
    lines: Peekable<Lines<R>>,
    database: String,
    table: String,
    line_no: usize,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R, database: impl Into<String>, table: impl Into<String>) -> Self {
        EventReader {
            lines: reader.lines().peekable(),
            database: database.into(),
            table: table.into(),
            line_no: 0,
        }
    }

    fn next_line(&mut self) -> CResult<Option<String>> {
        match self.lines.next() {
            None => Ok(None),
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(Some(line))
            }
            Some(Err(e)) => Err(CdcError::Io(e)),
        }
    }

    fn peek_is_any_header(&mut self) -> bool {
        match self.lines.peek() {
            Some(Ok(line)) => HEADER_RE.is_match(trim_line(line)),
            _ => false,
        }
    }

    /// Consumes one statement block for our target table and turns it into a
    /// `RowEvent`, or `None` if the block is well-formed but drops silently
    /// (an invalid/zero primary key).
    fn parse_block(&mut self, kind: EventKind) -> CResult<Option<RowEvent>> {
        let mut fields = BlockFields::default();

        loop {
            if self.peek_is_any_header() {
                break;
            }
            let Some(line) = self.next_line()? else {
                break;
            };
            let line = trim_line(&line);
            if line.is_empty() {
                continue;
            }
            if line == "SET" || line == "WHERE" {
                continue;
            }
            if let Some(caps) = ASSIGNMENT_RE.captures(line) {
                let col: usize = caps[1].parse().unwrap_or(0);
                let raw = &caps[2];
                fields.assign(col, raw);
            }
            // Any other line (stray text, unrecognized column) is ignored.
        }

        fields.into_event(kind, self.line_no)
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = CResult<RowEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            let trimmed = trim_line(&line);
            if trimmed.is_empty() {
                continue;
            }

            let Some(caps) = HEADER_RE.captures(trimmed) else {
                // A line outside any block, or inside a foreign block's body.
                continue;
            };

            let db = &caps[2];
            let table = &caps[3];
            let kind = match &caps[1] {
                "INSERT INTO" => EventKind::Insert,
                "UPDATE" => EventKind::Update,
                "DELETE FROM" => EventKind::Delete,
                _ => unreachable!("HEADER_RE only matches these three literals"),
            };

            if db != self.database || table != self.table {
                // Somebody else's block: skip it wholesale without parsing.
                continue;
            }

            match self.parse_block(kind) {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn trim_line(line: &str) -> &str {
    line.trim_matches(|c| c == ' ' || c == '\t')
}

#[derive(Debug, Default)]
struct BlockFields {
    pk_seen: bool,
    pk: i64,
    pk_dropped: bool,

    dt_seen: bool,
    dt: String,
    dt_malformed: bool,

    val_seen: bool,
    val: Option<f64>,
    val_malformed: bool,

    ts_seen: bool,
    ts: u64,
    ts_malformed: bool,
}

impl BlockFields {
    fn assign(&mut self, col: usize, raw: &str) {
        match col {
            1 => self.assign_pk(raw),
            3 => self.assign_dt(raw),
            4 => self.assign_val(raw),
            6 => self.assign_ts(raw),
            _ => {}
        }
    }

    fn assign_pk(&mut self, raw: &str) {
        self.pk_seen = true;
        match parse_unsigned_decimal(raw) {
            Some(0) | None => self.pk_dropped = true,
            Some(v) => self.pk = v as i64,
        }
    }

    fn assign_dt(&mut self, raw: &str) {
        self.dt_seen = true;
        let unquoted = strip_single_quotes(raw);
        if DATETIME_RE.is_match(unquoted) {
            self.dt = unquoted.to_string();
        } else {
            self.dt_malformed = true;
        }
    }

    fn assign_val(&mut self, raw: &str) {
        self.val_seen = true;
        let unquoted = strip_single_quotes(raw);
        if unquoted == "NULL" {
            self.val = None;
        } else {
            match unquoted.parse::<f64>() {
                Ok(v) => self.val = Some(v),
                Err(_) => self.val_malformed = true,
            }
        }
    }

    fn assign_ts(&mut self, raw: &str) {
        self.ts_seen = true;
        match parse_unsigned_decimal(raw) {
            Some(v) => self.ts = v,
            None => self.ts_malformed = true,
        }
    }

    fn into_event(self, kind: EventKind, line_no: usize) -> CResult<Option<RowEvent>> {
        if self.pk_dropped {
            return Ok(None);
        }
        if !self.pk_seen {
            return Err(CdcError::InputParse {
                line: line_no,
                reason: "block is missing a primary key (@1)".to_string(),
            });
        }
        if !self.dt_seen || self.dt_malformed {
            return Err(CdcError::InputParse {
                line: line_no,
                reason: format!("block for pk={} is missing a valid dt (@3)", self.pk),
            });
        }

        let (val, ts) = match kind {
            EventKind::Delete => (None, 0),
            EventKind::Insert | EventKind::Update => {
                if !self.ts_seen || self.ts_malformed {
                    return Err(CdcError::InputParse {
                        line: line_no,
                        reason: format!("block for pk={} is missing a valid ts (@6)", self.pk),
                    });
                }
                if self.val_malformed {
                    return Err(CdcError::InputParse {
                        line: line_no,
                        reason: format!("block for pk={} has an unparseable value (@4)", self.pk),
                    });
                }
                (self.val, self.ts)
            }
        };

        Ok(Some(RowEvent {
            kind,
            pk: self.pk,
            dt: self.dt,
            val,
            ts,
        }))
    }
}

fn parse_unsigned_decimal(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>().ok()
}

fn strip_single_quotes(raw: &str) -> &str {
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use cdc_collapser::Collapser;
use cdc_reader::EventReader;
use cdc_writer::write_all;
use common::config::CdcConfig;
use common::err::{CResult, CdcError};
use common::pretty_util::to_duration_pretty;
use tracing::{error, info};

/// Exit codes per the CLI contract: `0` success, `1` an unrecoverable parse
/// or I/O error aborted the batch, `2` misuse (missing required arguments).
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_MISUSE: i32 = 2;

pub struct RunReport {
    pub events_seen: usize,
    pub days_written: usize,
    pub days_removed: usize,
    pub rows_written: usize,
    pub elapsed: std::time::Duration,
}

/// Runs one batch: reads every event from `input` (or stdin when `None`),
/// collapses them per day, and writes every touched day's partition file.
pub async fn run(config: &CdcConfig, input: Option<&PathBuf>) -> CResult<RunReport> {
    let started = Instant::now();

    let mut collapser = Collapser::new();
    let events_seen = read_into(config, input, &mut collapser)?;

    if collapser.is_empty() {
        info!("no events parsed from input, nothing to write");
        return Ok(RunReport {
            events_seen,
            days_written: 0,
            days_removed: 0,
            rows_written: 0,
            elapsed: started.elapsed(),
        });
    }

    let day_effects = collapser.into_day_effects();
    let base_config = config.clone();
    let summary = write_all(day_effects, config.workers, move |day| {
        base_config.day_file_path(day)
    })
    .await?;

    info!(
        days_written = summary.days_written,
        days_removed = summary.days_removed,
        rows_written = summary.rows_written,
        elapsed = %to_duration_pretty(&started.elapsed()),
        "batch complete"
    );

    Ok(RunReport {
        events_seen,
        days_written: summary.days_written,
        days_removed: summary.days_removed,
        rows_written: summary.rows_written,
        elapsed: started.elapsed(),
    })
}

fn read_into(
    config: &CdcConfig,
    input: Option<&PathBuf>,
    collapser: &mut Collapser,
) -> CResult<usize> {
    let mut seen = 0usize;

    match input {
        Some(path) => {
            let file = File::open(path).map_err(CdcError::Io)?;
            seen = drain(BufReader::new(file), config, collapser)?;
        }
        None => {
            let stdin = io::stdin();
            seen = drain(stdin.lock(), config, collapser)?;
        }
    }

    Ok(seen)
}

fn drain<R: BufRead>(reader: R, config: &CdcConfig, collapser: &mut Collapser) -> CResult<usize> {
    let event_reader = EventReader::new(reader, config.database.clone(), config.table.clone());
    let mut seen = 0usize;

    for event in event_reader {
        match event {
            Ok(event) => {
                collapser.apply(event);
                seen += 1;
            }
            Err(e) => {
                error!(error = %e, "aborting batch on malformed input");
                return Err(e);
            }
        }
    }

    Ok(seen)
}

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use common::err::{CResult, CdcError};
use common::file_util::{atomic_replace, remove_if_exists};
use parquet::basic::Compression;
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;

use crate::row::{day_file_schema, StoredRow};

/// Column order fixed by [`day_file_schema`]: id, date_time, value, ts.
const COL_ID: usize = 0;
const COL_DATE_TIME: usize = 1;
const COL_VALUE: usize = 2;
const COL_TS: usize = 3;

/// Loads the rows currently on disk for a day, keyed by `id`. A missing file
/// is an empty day, not an error.
pub fn load_existing(path: &Path) -> CResult<HashMap<i64, StoredRow>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let file = File::open(path).map_err(|source| CdcError::DayFileIo {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = SerializedFileReader::new(file)?;
    let mut rows = HashMap::new();

    for row in reader.get_row_iter(None)? {
        let row = row?;
        let id = row.get_long(COL_ID)?;
        let date_time = row.get_string(COL_DATE_TIME)?.clone();
        let value = row.get_double(COL_VALUE).ok();
        let ts = row.get_string(COL_TS)?.clone();
        rows.insert(
            id,
            StoredRow {
                id,
                date_time,
                value,
                ts,
            },
        );
    }

    Ok(rows)
}

/// Writes `rows` (already final, already sorted by `id`) to `path` as a
/// single row group, replacing whatever was there atomically.
pub fn write_rows(path: &Path, rows: &[StoredRow]) -> CResult<()> {
    if rows.is_empty() {
        return remove_if_exists(path);
    }

    let schema = day_file_schema();
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build(),
    );

    atomic_replace(path, |file| {
        write_row_group(file, schema.clone(), props.clone(), rows)
    })
}

fn write_row_group(
    file: &mut File,
    schema: Arc<parquet::schema::types::Type>,
    props: Arc<WriterProperties>,
    rows: &[StoredRow],
) -> CResult<()> {
    let mut writer = SerializedFileWriter::new(try_clone(file)?, schema, props)?;
    let mut row_group_writer = writer.next_row_group()?;

    let mut col_index = 0usize;
    while let Some(mut column_writer) = row_group_writer.next_column()? {
        match (col_index, &mut column_writer) {
            (COL_ID, ColumnWriter::Int64ColumnWriter(cw)) => {
                let values: Vec<i64> = rows.iter().map(|r| r.id).collect();
                cw.write_batch(&values, None, None)?;
            }
            (COL_DATE_TIME, ColumnWriter::ByteArrayColumnWriter(cw)) => {
                let values: Vec<ByteArray> = rows
                    .iter()
                    .map(|r| ByteArray::from(r.date_time.as_bytes()))
                    .collect();
                cw.write_batch(&values, None, None)?;
            }
            (COL_VALUE, ColumnWriter::DoubleColumnWriter(cw)) => {
                let mut def_levels = Vec::with_capacity(rows.len());
                let mut values = Vec::new();
                for r in rows {
                    match r.value {
                        Some(v) => {
                            def_levels.push(1);
                            values.push(v);
                        }
                        None => def_levels.push(0),
                    }
                }
                cw.write_batch(&values, Some(&def_levels), None)?;
            }
            (COL_TS, ColumnWriter::ByteArrayColumnWriter(cw)) => {
                let values: Vec<ByteArray> = rows
                    .iter()
                    .map(|r| ByteArray::from(r.ts.as_bytes()))
                    .collect();
                cw.write_batch(&values, None, None)?;
            }
            (idx, _other) => {
                return Err(CdcError::Other(format!(
                    "day file schema produced an unexpected column writer at index {idx}"
                )));
            }
        }
        row_group_writer.close_column(column_writer)?;
        col_index += 1;
    }

    writer.close_row_group(row_group_writer)?;
    writer.close()?;
    Ok(())
}

fn try_clone(file: &File) -> CResult<File> {
    file.try_clone().map_err(CdcError::Io)
}

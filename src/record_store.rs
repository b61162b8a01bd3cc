//! Tab-separated record persistence and timestamp recovery
//!
//! Snapshot records land under a deterministic layout:
//! `<outputDir>/<ns>/<kind>-<plane>/<kind>.tsv` for standard kinds and
//! `<outputDir>/<ns>/<kind>/<kind>.tsv` for custom kinds. Files are fully
//! rewritten on every collection. Reading recovers the first data row only:
//! each experiment namespace synthesizes exactly one object of interest, so
//! a single representative row is the sampling contract.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::snapshot::ObjectRecord;
use crate::work::WorkRecord;

/// Column index of the creation timestamp in both record shapes
pub const CREATED_COLUMN: usize = 1;
/// Column index of the status-update timestamp in standard records
pub const STATUS_UPDATE_COLUMN: usize = 2;

const STANDARD_HEADER: [&str; 5] = ["Name", "Created", "StatusUpdate", "Condition", "Manager"];
const WORK_HEADER: [&str; 5] = ["Name", "Created", "Updated", "Status", "TargetObject"];

/// Record-file failures, one variant per distinct condition so callers can
/// tell "never collected" apart from "collected but not yet populated".
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing header row in {}", path.display())]
    MissingHeader { path: PathBuf },

    #[error("no data rows in {}", path.display())]
    NoDataRows { path: PathBuf },

    #[error("column {column} missing in first data row of {}", path.display())]
    MissingColumn { path: PathBuf, column: usize },

    #[error("empty timestamp in column {column} of {}", path.display())]
    EmptyTimestamp { path: PathBuf, column: usize },

    #[error("invalid timestamp {value:?} in column {column} of {}: {source}", path.display())]
    BadTimestamp {
        path: PathBuf,
        column: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Record file for a standard kind collected from one plane
pub fn standard_file(ns_dir: &Path, kind: &str, plane: &str) -> PathBuf {
    ns_dir.join(format!("{kind}-{plane}")).join(format!("{kind}.tsv"))
}

/// Record file for a custom kind (plane is implied by the kind)
pub fn custom_file(ns_dir: &Path, kind: &str) -> PathBuf {
    ns_dir.join(kind).join(format!("{kind}.tsv"))
}

fn format_instant(instant: Option<DateTime<Utc>>) -> String {
    instant
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn write_rows(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or(path);
    fs::create_dir_all(dir).map_err(|source| StoreError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut content = header.join("\t");
    content.push('\n');
    for row in rows {
        content.push_str(&row.join("\t"));
        content.push('\n');
    }

    fs::write(path, content).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist standard-object records for one (kind, plane) collection.
/// Recreates the file if present.
pub fn write_objects(
    ns_dir: &Path,
    kind: &str,
    plane: &str,
    records: &[ObjectRecord],
) -> Result<PathBuf, StoreError> {
    let path = standard_file(ns_dir, kind, plane);
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                format_instant(r.created_at),
                format_instant(r.status_updated_at),
                r.condition.to_string(),
                r.managing_controller.clone().unwrap_or_default(),
            ]
        })
        .collect();
    write_rows(&path, &STANDARD_HEADER, &rows)?;
    Ok(path)
}

/// Persist custom-resource records for one kind. Recreates the file if present.
pub fn write_works(
    ns_dir: &Path,
    kind: &str,
    records: &[WorkRecord],
) -> Result<PathBuf, StoreError> {
    let path = custom_file(ns_dir, kind);
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                format_instant(r.created_at),
                format_instant(r.updated_at),
                r.status_phase.clone(),
                r.target_object.clone(),
            ]
        })
        .collect();
    write_rows(&path, &WORK_HEADER, &rows)?;
    Ok(path)
}

/// First data row of a record file, split on tabs
pub fn read_first_row(path: &Path) -> Result<Vec<String>, StoreError> {
    let file = fs::File::open(path).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut lines = BufReader::new(file).lines();

    match lines.next() {
        Some(Ok(header)) if !header.trim().is_empty() => {}
        _ => {
            return Err(StoreError::MissingHeader {
                path: path.to_path_buf(),
            })
        }
    }

    for line in lines {
        let line = line.map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if !line.trim().is_empty() {
            return Ok(line.split('\t').map(str::to_owned).collect());
        }
    }

    Err(StoreError::NoDataRows {
        path: path.to_path_buf(),
    })
}

fn parse_cell(path: &Path, row: &[String], column: usize) -> Result<DateTime<Utc>, StoreError> {
    let cell = row.get(column).ok_or_else(|| StoreError::MissingColumn {
        path: path.to_path_buf(),
        column,
    })?;
    let cell = cell.trim();
    if cell.is_empty() {
        return Err(StoreError::EmptyTimestamp {
            path: path.to_path_buf(),
            column,
        });
    }
    DateTime::parse_from_rfc3339(cell)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| StoreError::BadTimestamp {
            path: path.to_path_buf(),
            column,
            value: cell.to_owned(),
            source,
        })
}

/// Representative timestamp from one column of the first data row
pub fn read_first_timestamp(path: &Path, column: usize) -> Result<DateTime<Utc>, StoreError> {
    let row = read_first_row(path)?;
    parse_cell(path, &row, column)
}

/// Two timestamps from the same first data row (creation + status update)
pub fn read_timestamp_pair(
    path: &Path,
    first: usize,
    second: usize,
) -> Result<(DateTime<Utc>, DateTime<Utc>), StoreError> {
    let row = read_first_row(path)?;
    Ok((parse_cell(path, &row, first)?, parse_cell(path, &row, second)?))
}

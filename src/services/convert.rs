//! SQLite to CSV conversion with timestamp normalization.
//!
//! Each raw file is expected to hold exactly one user table with a
//! `Timestamp` column. The whole table is rewritten as CSV with the
//! timestamps canonicalized to `YYYY-MM-DD HH:MM:SS`.

use crate::error::{Result, TransformError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::info;

const TIMESTAMP_COLUMN: &str = "Timestamp";
const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// String layouts accepted for incoming timestamps, tried in order.
const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Convert the single-table SQLite database at `local_path` into
/// `<local_path>-converted.csv` and return the output path.
pub fn convert(local_path: &Path) -> Result<PathBuf> {
    info!("Converting {}", local_path.display());

    let db = Connection::open_with_flags(
        local_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let table = single_table_name(&db, local_path)?;

    let mut stmt = db.prepare(&format!("SELECT * FROM \"{}\"", table.replace('"', "\"\"")))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let ts_index = columns
        .iter()
        .position(|c| c == TIMESTAMP_COLUMN)
        .ok_or_else(|| TransformError::MissingTimestamp {
            path: local_path.to_path_buf(),
            table: table.clone(),
        })?;

    let out_path = converted_path(local_path);
    let mut writer = csv::Writer::from_path(&out_path)?;
    writer.write_record(&columns)?;

    let mut rows = stmt.query([])?;
    let mut row_index = 0usize;
    while let Some(row) = rows.next()? {
        let mut record = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value = row.get_ref(i)?;
            if i == ts_index {
                record.push(normalize_timestamp(value, row_index)?);
            } else {
                record.push(render_value(value));
            }
        }
        writer.write_record(&record)?;
        row_index += 1;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", row_index, out_path.display());
    Ok(out_path)
}

/// `<path>-converted.csv`, suffix appended to the full file name.
pub fn converted_path(local_path: &Path) -> PathBuf {
    let mut name = local_path.as_os_str().to_os_string();
    name.push("-converted.csv");
    PathBuf::from(name)
}

/// The one user table the file must contain. Zero or several tables are
/// typed errors rather than a silent pick of the first catalog entry.
fn single_table_name(db: &Connection, path: &Path) -> Result<String> {
    let mut stmt = db.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    match names.len() {
        0 => Err(TransformError::NoTable {
            path: path.to_path_buf(),
        }),
        1 => Ok(names.into_iter().next().unwrap()),
        _ => Err(TransformError::MultipleTables {
            path: path.to_path_buf(),
            names,
        }),
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

fn normalize_timestamp(value: ValueRef<'_>, row: usize) -> Result<String> {
    let parsed = match value {
        ValueRef::Integer(epoch) => datetime_from_epoch(epoch),
        ValueRef::Real(epoch) => DateTime::from_timestamp(epoch as i64, 0).map(|dt| dt.naive_utc()),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(parse_timestamp),
        _ => None,
    };

    parsed
        .map(|dt| dt.format(OUTPUT_FORMAT).to_string())
        .ok_or_else(|| TransformError::BadTimestamp {
            value: render_value(value),
            row,
        })
}

/// Integer timestamps may be epoch seconds or milliseconds; anything past
/// the year 5138 in seconds is treated as milliseconds.
fn datetime_from_epoch(epoch: i64) -> Option<NaiveDateTime> {
    let dt = if epoch.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    };
    dt.map(|dt| dt.naive_utc())
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in INPUT_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    // Date-only values normalize to midnight
    for fmt in &["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(s: &str) -> Option<String> {
        parse_timestamp(s).map(|dt| dt.format(OUTPUT_FORMAT).to_string())
    }

    #[test]
    fn test_parse_mixed_formats() {
        assert_eq!(
            normalized("2024-03-01 12:30:05").as_deref(),
            Some("2024-03-01 12:30:05")
        );
        assert_eq!(
            normalized("2024-03-01T12:30:05.250").as_deref(),
            Some("2024-03-01 12:30:05")
        );
        assert_eq!(
            normalized("2024/03/01 12:30:05").as_deref(),
            Some("2024-03-01 12:30:05")
        );
        assert_eq!(
            normalized("01.03.2024 12:30:05").as_deref(),
            Some("2024-03-01 12:30:05")
        );
        assert_eq!(normalized("2024-03-01").as_deref(), Some("2024-03-01 00:00:00"));
    }

    #[test]
    fn test_parse_rfc3339_drops_offset() {
        assert_eq!(
            normalized("2024-03-01T12:30:05+02:00").as_deref(),
            Some("2024-03-01 10:30:05")
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(normalized(""), None);
        assert_eq!(normalized("not a date"), None);
        assert_eq!(normalized("2024-13-01 00:00:00"), None);
    }

    #[test]
    fn test_epoch_seconds_and_millis() {
        assert_eq!(
            datetime_from_epoch(1_709_296_205)
                .unwrap()
                .format(OUTPUT_FORMAT)
                .to_string(),
            "2024-03-01 12:30:05"
        );
        assert_eq!(
            datetime_from_epoch(1_709_296_205_000)
                .unwrap()
                .format(OUTPUT_FORMAT)
                .to_string(),
            "2024-03-01 12:30:05"
        );
    }

    #[test]
    fn test_converted_path_appends_suffix() {
        assert_eq!(
            converted_path(Path::new("/tmp/Hubbox_Sensordata_001.db")),
            PathBuf::from("/tmp/Hubbox_Sensordata_001.db-converted.csv")
        );
    }
}

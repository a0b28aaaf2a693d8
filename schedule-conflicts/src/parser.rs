use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{Reader, ReaderBuilder, StringRecord};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::conflicts::{Appointment, Person};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column '{column}' not found in {table} table")]
    MissingColumn { table: &'static str, column: String },
}

/// People and the batch of appointments they are checked against
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub people: Vec<Person>,
    pub appointments: Vec<Appointment>,
}

/// Layouts accepted for timestamps without an offset, read as UTC
const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Normalizes a raw cell value to a UTC timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]` (space or `T`) and bare
/// `YYYY-MM-DD` dates, which map to midnight. Empty or unrecognized
/// values give `None`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Splits a linked-records cell into ids, dropping blanks
pub fn split_links(cell: &str, separator: &str) -> Vec<String> {
    cell.split(separator)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Finds a column by header name, ignoring surrounding whitespace and case
fn column_index(headers: &StringRecord, name: &str, table: &'static str) -> Result<usize, ParseError> {
    let wanted = name.trim();
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| ParseError::MissingColumn {
            table,
            column: wanted.to_string(),
        })
}

fn csv_reader<R: Read>(input: R) -> Reader<R> {
    ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(input)
}

fn cell<'r>(record: &'r StringRecord, col: usize) -> &'r str {
    record.get(col).unwrap_or("").trim()
}

/// Loads people from a CSV file
pub fn load_people<P: AsRef<Path>>(csv_path: P, settings: &Settings) -> Result<Vec<Person>, ParseError> {
    let file = std::fs::File::open(csv_path.as_ref()).map_err(csv::Error::from)?;
    read_people(file, settings)
}

/// Reads people from any CSV input using the configured columns
pub fn read_people<R: Read>(input: R, settings: &Settings) -> Result<Vec<Person>, ParseError> {
    let mut reader = csv_reader(input);
    let headers = reader.headers()?.clone();

    let name_col = column_index(&headers, &settings.people_name_field, "people")?;
    let link_col = column_index(&headers, &settings.people_appointments_link_field, "people")?;
    let id_col = settings
        .people_id_field
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .map(|f| column_index(&headers, f, "people"))
        .transpose()?;

    let mut people = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;

        let id = match id_col {
            Some(col) => cell(&record, col).to_string(),
            None => (row + 1).to_string(),
        };

        people.push(Person {
            id,
            display_name: cell(&record, name_col).to_string(),
            appointment_ids: split_links(cell(&record, link_col), &settings.link_separator),
        });
    }

    debug!(count = people.len(), "Read people");
    Ok(people)
}

/// Loads the appointment batch from a CSV file
pub fn load_appointments<P: AsRef<Path>>(csv_path: P, settings: &Settings) -> Result<Vec<Appointment>, ParseError> {
    let file = std::fs::File::open(csv_path.as_ref()).map_err(csv::Error::from)?;
    read_appointments(file, settings)
}

/// Reads the appointment batch from any CSV input.
///
/// Rows outside the configured view are not part of the batch. Rows with
/// no id, or whose start or end cannot be read as a timestamp, are
/// skipped with a warning.
pub fn read_appointments<R: Read>(input: R, settings: &Settings) -> Result<Vec<Appointment>, ParseError> {
    let mut reader = csv_reader(input);
    let headers = reader.headers()?.clone();

    let id_col = column_index(&headers, &settings.appointments_id_field, "appointments")?;
    let start_col = column_index(&headers, &settings.appointments_start_field, "appointments")?;
    let end_col = column_index(&headers, &settings.appointments_end_field, "appointments")?;
    let view = match &settings.view {
        Some(view) => Some((column_index(&headers, &view.field, "appointments")?, view.value.trim())),
        None => None,
    };

    let mut appointments = Vec::new();
    let mut outside_view = 0usize;

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        // header is line 1
        let line = row + 2;

        if let Some((view_col, value)) = view {
            if cell(&record, view_col) != value {
                outside_view += 1;
                continue;
            }
        }

        let id = cell(&record, id_col);
        if id.is_empty() {
            warn!(line, "Skipping appointment without id");
            continue;
        }

        let (Some(start), Some(end)) = (
            parse_timestamp(cell(&record, start_col)),
            parse_timestamp(cell(&record, end_col)),
        ) else {
            warn!(line, id, "Skipping appointment with missing or invalid start/end");
            continue;
        };

        appointments.push(Appointment::new(id, start, end));
    }

    debug!(count = appointments.len(), outside_view, "Read appointments");
    Ok(appointments)
}

/// Loads both sources named in the settings
pub fn load_snapshot(settings: &Settings) -> Result<Snapshot, ParseError> {
    let people = load_people(&settings.people_source, settings)?;
    let appointments = load_appointments(&settings.appointments_source, settings)?;
    Ok(Snapshot { people, appointments })
}

impl Snapshot {
    /// Link ids that do not resolve to any appointment in the batch
    pub fn unresolved_links(&self) -> Vec<&str> {
        let known: HashSet<&str> = self.appointments.iter().map(|a| a.id.as_str()).collect();
        let mut seen = HashSet::new();
        self.people
            .iter()
            .flat_map(|p| p.appointment_ids.iter())
            .map(String::as_str)
            .filter(|id| !known.contains(id) && seen.insert(*id))
            .collect()
    }
}

use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;

use crate::conflicts::ConflictGroup;
use crate::display::sorted_appointments;

/// One exported line: a conflicting appointment and the person it belongs to
#[derive(Debug, Serialize)]
struct ConflictRow<'a> {
    person_id: &'a str,
    person: &'a str,
    appointment_id: &'a str,
    start: String,
    end: String,
}

/// Exports a conflict report to CSV, one row per (person, appointment).
/// Timestamps are written as RFC 3339 so the file can be read back.
pub fn export_conflicts_to_csv(
    groups: &[ConflictGroup],
    csv_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(csv_path)?;

    let mut rows = 0usize;
    for group in groups {
        for appointment in sorted_appointments(group) {
            wtr.serialize(ConflictRow {
                person_id: &group.person_id,
                person: &group.person,
                appointment_id: &appointment.id,
                start: appointment.start.to_rfc3339(),
                end: appointment.end.to_rfc3339(),
            })?;
            rows += 1;
        }
    }

    // serialize() only emits headers with the first row
    if rows == 0 {
        wtr.write_record(["person_id", "person", "appointment_id", "start", "end"])?;
    }

    wtr.flush()?;
    Ok(())
}

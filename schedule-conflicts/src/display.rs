use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::conflicts::{Appointment, ConflictGroup};

pub const NO_CONFLICTS_MESSAGE: &str = "No scheduling conflicts found 🎉";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Formats a person's name for a report heading
pub fn format_person_name(name: &str) -> String {
    if name.trim().is_empty() {
        "(unnamed)".to_string()
    } else {
        name.trim().to_string()
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Formats one appointment as `id: start - end`
pub fn format_appointment(appointment: &Appointment) -> String {
    format!(
        "{}: {} - {}",
        appointment.id,
        format_time(&appointment.start),
        format_time(&appointment.end)
    )
}

/// A group's appointments in a stable order: by start, then id
pub fn sorted_appointments(group: &ConflictGroup) -> Vec<&Appointment> {
    let mut appointments: Vec<&Appointment> = group.conflicting_appointments.iter().collect();
    appointments.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    appointments
}

/// Formats one conflict group: the person heading, then one line per appointment
pub fn format_conflict_group(group: &ConflictGroup) -> String {
    let mut out = format!(
        "{} ({} conflicting)\n",
        format_person_name(&group.person),
        group.conflicting_appointments.len()
    );
    for appointment in sorted_appointments(group) {
        out.push_str("  - ");
        out.push_str(&format_appointment(appointment));
        out.push('\n');
    }
    out
}

/// Formats a whole report as plain text
pub fn format_conflict_report(groups: &[ConflictGroup]) -> String {
    if groups.is_empty() {
        return format!("{}\n", NO_CONFLICTS_MESSAGE);
    }
    groups
        .iter()
        .map(format_conflict_group)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints a conflict report to stdout
pub fn print_conflict_report(groups: &[ConflictGroup]) {
    println!("\n=== Scheduling Conflicts ===");
    println!("People with conflicts: {}", groups.len());
    println!();
    print!("{}", format_conflict_report(groups));
}

/// Writes a conflict report to a text file
pub fn write_report_to_file<P: AsRef<Path>>(
    groups: &[ConflictGroup],
    filename: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(filename)?;
    writeln!(file, "** Scheduling Conflicts **")?;
    write!(file, "{}", format_conflict_report(groups))?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn html_page(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Schedule Conflicts</title>\n\
         <style>\
         .conflict {{ margin: 16px; padding: 24px; background: mistyrose; border: 3px solid #333; \
         border-radius: 5px; }}\
         .none {{ color: #888; }}\
         </style>\n</head>\n<body>\n{}</body>\n</html>\n",
        body
    )
}

/// Renders the page shown until every required setting has been chosen
pub fn render_setup_html(missing: &[&str]) -> String {
    let mut body = String::from("<h2>Finish setup to check for conflicts</h2>\n");
    body.push_str("<p>Still missing:</p>\n<ul>\n");
    for name in missing {
        body.push_str(&format!("<li>{}</li>\n", escape_html(name)));
    }
    body.push_str("</ul>\n");
    html_page(&body)
}

/// Renders the report as a standalone HTML page
pub fn render_report_html(groups: &[ConflictGroup]) -> String {
    let mut body = String::new();

    if groups.is_empty() {
        body.push_str(&format!("<h2 class=\"none\">{}</h2>\n", NO_CONFLICTS_MESSAGE));
    }

    for group in groups {
        body.push_str("<section class=\"conflict\">\n");
        body.push_str(&format!("<h3>{}</h3>\n<ul>\n", escape_html(&format_person_name(&group.person))));
        for appointment in sorted_appointments(group) {
            body.push_str(&format!(
                "<li><strong>{}</strong> {} &ndash; {}</li>\n",
                escape_html(&appointment.id),
                format_time(&appointment.start),
                format_time(&appointment.end)
            ));
        }
        body.push_str("</ul>\n</section>\n");
    }

    html_page(&body)
}

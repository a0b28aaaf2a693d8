use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use schedule_conflicts::config::Settings;
use schedule_conflicts::conflicts::detect;
use schedule_conflicts::display::{print_conflict_report, write_report_to_file};
use schedule_conflicts::export::export_conflicts_to_csv;
use schedule_conflicts::parser::load_snapshot;
use schedule_conflicts::web;

const DEFAULT_SETTINGS_PATH: &str = "settings.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Web mode: schedule-conflicts web [port] [settings.json]
    if args.len() > 1 && args[1] == "web" {
        let port = args.get(2)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let settings_path = args.get(3).map(String::as_str).unwrap_or(DEFAULT_SETTINGS_PATH);
        let settings = if Path::new(settings_path).exists() {
            Settings::load(settings_path)?
        } else {
            warn!(path = settings_path, "Settings file not found, starting with empty settings");
            Settings::default()
        };
        let password = match std::env::var("ADMIN_PASSWORD") {
            Ok(password) => password,
            Err(_) => {
                warn!("ADMIN_PASSWORD not set, using the default password");
                "admin123".to_string()
            }
        };

        info!(port, "Starting web server");
        println!("Access the report at http://localhost:{}", port);

        web::start_server(port, password, settings, PathBuf::from(settings_path)).await?;
        return Ok(());
    }

    // CLI mode: schedule-conflicts [settings.json]
    let settings_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_SETTINGS_PATH);
    let settings = Settings::load(settings_path)?;
    settings.validate()?;

    println!("Loading people and appointments...");
    let snapshot = load_snapshot(&settings)?;
    println!(
        "Loaded {} people and {} appointments",
        snapshot.people.len(),
        snapshot.appointments.len()
    );

    let unresolved = snapshot.unresolved_links();
    if !unresolved.is_empty() {
        info!(count = unresolved.len(), "Linked appointments outside the batch are ignored");
    }

    let conflicts = detect(&snapshot.people, &snapshot.appointments);
    print_conflict_report(&conflicts);

    println!("\n=== Writing Report ===");
    write_report_to_file(&conflicts, "conflicts_report.txt")?;
    export_conflicts_to_csv(&conflicts, Path::new("conflicts_report.csv"))?;
    println!("Report saved to:");
    println!("  - conflicts_report.txt");
    println!("  - conflicts_report.csv");

    Ok(())
}

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use optimal_route::format::format_journeys;
use optimal_route::gtfs::db;
use optimal_route::planner::{PlanError, Planner};

/// Interaktive ÖV-Routenberechnung über einem GTFS-Fahrplan
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Verzeichnis mit den GTFS-Dateien
    #[arg(short, long, env = "GTFS_DIR", default_value = "data")]
    data_dir: PathBuf,
    /// Anzahl Verbindungen pro Abfrage
    #[arg(short = 'k', long, default_value_t = 3)]
    count: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("{}", RULE);
    println!(" OptimalRoute.CH - ÖV-Routenberechnung");
    println!("{}", RULE);
    println!();
    println!("Lade GTFS-Daten...");
    let data = db::load_data(&args.data_dir).with_context(|| {
        format!("GTFS-Daten konnten nicht aus {:?} geladen werden", args.data_dir)
    })?;
    let planner = Planner::new(data);
    println!("Daten erfolgreich geladen!");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let start = match prompt(&mut lines, "Startstation: ")? {
            Some(line) => line,
            None => break,
        };
        if start.is_empty() {
            continue;
        }
        let end = match prompt(&mut lines, "Zielstation: ")? {
            Some(line) => line,
            None => break,
        };
        let date = match prompt(&mut lines, "Datum (YYYY-MM-DD, leer = heute): ")? {
            Some(line) if line.is_empty() => today(),
            Some(line) => line,
            None => break,
        };
        let time = match prompt(&mut lines, "Uhrzeit (HH:MM, leer = jetzt): ")? {
            Some(line) if line.is_empty() => now(),
            Some(line) => line,
            None => break,
        };

        println!();
        match planner.plan(&start, &end, &date, &time, args.count) {
            Ok(journeys) => println!("{}", format_journeys(&journeys, &start, &end)),
            Err(PlanError::StopNotFound(query)) => {
                println!("Station '{}' nicht gefunden!", query);
                let suggestions = planner.names().match_substring(&query, 10);
                if !suggestions.is_empty() {
                    println!("Meinten Sie:");
                    for name in suggestions {
                        println!("  - {}", name);
                    }
                }
            }
            Err(PlanError::SameEndpoints) => println!("Start- und Zielstation sind identisch!"),
            Err(PlanError::BadDate(input)) => println!("Ungültiges Datumsformat: {}", input),
            Err(PlanError::BadTime(input)) => println!("Ungültiges Zeitformat: {}", input),
            Err(PlanError::NoRoute) => println!("Keine Route gefunden."),
            Err(PlanError::Cancelled) => println!("Abfrage abgebrochen."),
        }

        println!();
        match prompt(&mut lines, "Weitere Verbindung suchen? (j/n): ")? {
            Some(answer) if is_yes(&answer) => continue,
            _ => break,
        }
    }
    println!("Auf Wiedersehen!");
    Ok(())
}

const RULE: &str = "==================================================";

/// One line of input, trimmed; `None` once stdin is closed
fn prompt(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    label: &str,
) -> anyhow::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_owned())),
        None => {
            println!();
            Ok(None)
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_lowercase().as_str(), "j" | "ja" | "y" | "yes")
}

fn today() -> String {
    zurich_now().format("%Y-%m-%d").to_string()
}

fn now() -> String {
    zurich_now().format("%H:%M").to_string()
}

fn zurich_now() -> chrono::DateTime<chrono_tz::Tz> {
    chrono::Utc::now().with_timezone(&chrono_tz::Europe::Zurich)
}

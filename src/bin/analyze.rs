use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use optimal_route::analysis;
use optimal_route::gtfs::db;

/// Ergänzende Auswertungen über einen GTFS-Fahrplan
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Verzeichnis mit den GTFS-Dateien
    #[arg(short, long, env = "GTFS_DIR", default_value = "data")]
    data_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let data = db::load_data(&args.data_dir).with_context(|| {
        format!("GTFS-Daten konnten nicht aus {:?} geladen werden", args.data_dir)
    })?;

    println!("1. Schnellste Direktverbindung pro Stunde:");
    for row in analysis::fastest_direct_per_hour(&data) {
        println!(
            "  {:>2} Uhr  {:>4} min  {}",
            row.departure_hour,
            row.duration.to_mins(),
            row.route_name
        );
    }

    println!();
    println!("2. Top 10 meistfrequentierte Haltestellen:");
    for row in analysis::most_frequented_stops(&data, 10) {
        println!("  {:>6}x  {}", row.visits, row.stop_name);
    }

    println!();
    println!("3. Übernacht-Verbindungen (erste 100):");
    for row in analysis::overnight_stop_times(&data, 100) {
        println!(
            "  {}  an {}  ab {}  {}  ({})",
            row.trip_id, row.arrival, row.departure, row.stop_name, row.route_name
        );
    }
    Ok(())
}

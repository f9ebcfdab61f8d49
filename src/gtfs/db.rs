use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info, warn};
use route_search::search_data::{ExceptionKind, SearchData};
use thiserror::Error;

use crate::gtfs;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("feed file {0:?} is missing")]
    FeedMissing(String),
    #[error("feed file {file:?} lacks the required column {column:?}")]
    FeedMalformed { file: String, column: String },
    #[error("failed to read the feed: {0}")]
    Csv(#[from] csv::Error),
}

/// Opens the CSV files of one feed directory
pub struct GTFSSource {
    dir_path: PathBuf,
}

impl GTFSSource {
    pub fn new(dir_path: impl AsRef<Path>) -> GTFSSource {
        GTFSSource {
            dir_path: dir_path.as_ref().to_path_buf(),
        }
    }

    fn open_csv(&self, filename: &str) -> Result<csv::Reader<File>, LoadError> {
        let path = self.dir_path.join(filename);
        debug!("opening {:?}", path);
        csv::Reader::from_path(&path).map_err(|err| {
            if file_not_found(&err) {
                LoadError::FeedMissing(filename.to_owned())
            } else {
                LoadError::Csv(err)
            }
        })
    }

    fn open_csv_optional(&self, filename: &str) -> Result<Option<csv::Reader<File>>, LoadError> {
        match self.open_csv(filename) {
            Ok(reader) => Ok(Some(reader)),
            Err(LoadError::FeedMissing(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn file_not_found(err: &csv::Error) -> bool {
    match err.kind() {
        csv::ErrorKind::Io(io_err) => io_err.kind() == io::ErrorKind::NotFound,
        _ => false,
    }
}

fn require_columns(
    reader: &mut csv::Reader<File>,
    file: &str,
    required: &[&str],
) -> Result<(), LoadError> {
    let headers = reader.headers()?.clone();
    for column in required {
        if !headers.iter().any(|header| header.trim() == *column) {
            return Err(LoadError::FeedMalformed {
                file: file.to_owned(),
                column: (*column).to_owned(),
            });
        }
    }
    Ok(())
}

/// `YYYYMMDD` as used in calendar.txt and calendar_dates.txt
fn parse_feed_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y%m%d").ok()
}

/// Read the six feed files of `gtfs_dir` into an indexed `SearchData`.
///
/// A missing calendar_dates.txt is tolerated; any other missing file or
/// missing required column aborts the load. Individual rows that cannot be
/// used (unparseable fields, references to unknown trips) are dropped.
pub fn load_data(gtfs_dir: &Path) -> Result<SearchData, LoadError> {
    let source = GTFSSource::new(gtfs_dir);
    let mut builder = SearchData::builder();

    info!("loading stops");
    let mut reader = source.open_csv("stops.txt")?;
    require_columns(&mut reader, "stops.txt", &["stop_id", "stop_name", "parent_station"])?;
    let mut dropped = 0;
    for result in reader.deserialize::<gtfs::Stop>() {
        match result {
            Ok(stop) => {
                let gtfs_id = stop.stop_id.trim();
                if gtfs_id.is_empty() {
                    dropped += 1;
                    continue;
                }
                let stop_id = builder.stop_id(gtfs_id);
                let parent = stop
                    .parent_station
                    .as_deref()
                    .map(str::trim)
                    .filter(|parent| !parent.is_empty())
                    .map(|parent| builder.stop_id(parent));
                builder.add_stop(stop_id, stop.stop_name, parent);
            }
            Err(err) => {
                dropped += 1;
                debug!("skipping stop row: {}", err);
            }
        }
    }
    log_dropped("stops.txt", dropped);

    info!("loading routes");
    let mut route_names: HashMap<String, String> = HashMap::new();
    let mut reader = source.open_csv("routes.txt")?;
    require_columns(&mut reader, "routes.txt", &["route_id"])?;
    let mut dropped = 0;
    for result in reader.deserialize::<gtfs::Route>() {
        match result {
            Ok(route) => {
                let route_id = route.route_id.trim().to_owned();
                if route_id.is_empty() {
                    dropped += 1;
                    continue;
                }
                let display_name = route.display_name();
                route_names.entry(route_id).or_insert(display_name);
            }
            Err(err) => {
                dropped += 1;
                debug!("skipping route row: {}", err);
            }
        }
    }
    log_dropped("routes.txt", dropped);

    info!("loading the service calendar");
    let mut reader = source.open_csv("calendar.txt")?;
    require_columns(
        &mut reader,
        "calendar.txt",
        &[
            "service_id",
            "monday",
            "tuesday",
            "wednesday",
            "thursday",
            "friday",
            "saturday",
            "sunday",
            "start_date",
            "end_date",
        ],
    )?;
    let mut dropped = 0;
    for result in reader.deserialize::<gtfs::Calendar>() {
        match result {
            Ok(calendar) => {
                let gtfs_id = calendar.service_id.trim();
                let dates = (
                    parse_feed_date(&calendar.start_date),
                    parse_feed_date(&calendar.end_date),
                );
                match (gtfs_id.is_empty(), dates) {
                    (false, (Some(start), Some(end))) => {
                        let service_id = builder.service_id(gtfs_id);
                        builder.add_service(service_id, calendar.weekday_mask(), start, end);
                    }
                    _ => dropped += 1,
                }
            }
            Err(err) => {
                dropped += 1;
                debug!("skipping calendar row: {}", err);
            }
        }
    }
    log_dropped("calendar.txt", dropped);

    match source.open_csv_optional("calendar_dates.txt")? {
        Some(mut reader) => {
            info!("loading service exceptions");
            require_columns(
                &mut reader,
                "calendar_dates.txt",
                &["service_id", "date", "exception_type"],
            )?;
            let mut dropped = 0;
            for result in reader.deserialize::<gtfs::CalendarDate>() {
                match result {
                    Ok(exception) => {
                        let gtfs_id = exception.service_id.trim();
                        let kind = match exception.exception_type {
                            1 => Some(ExceptionKind::Added),
                            2 => Some(ExceptionKind::Removed),
                            _ => None,
                        };
                        match (gtfs_id.is_empty(), parse_feed_date(&exception.date), kind) {
                            (false, Some(date), Some(kind)) => {
                                let service_id = builder.service_id(gtfs_id);
                                builder.add_exception(service_id, date, kind);
                            }
                            _ => dropped += 1,
                        }
                    }
                    Err(err) => {
                        dropped += 1;
                        debug!("skipping calendar exception row: {}", err);
                    }
                }
            }
            log_dropped("calendar_dates.txt", dropped);
        }
        None => info!("calendar_dates.txt not present, continuing without exceptions"),
    }

    info!("loading trips");
    let mut reader = source.open_csv("trips.txt")?;
    require_columns(&mut reader, "trips.txt", &["trip_id", "route_id", "service_id"])?;
    let mut dropped = 0;
    for result in reader.deserialize::<gtfs::Trip>() {
        match result {
            Ok(trip) => {
                let gtfs_id = trip.trip_id.trim();
                if gtfs_id.is_empty() {
                    dropped += 1;
                    continue;
                }
                let route_name = route_names
                    .get(trip.route_id.trim())
                    .cloned()
                    .unwrap_or_else(|| gtfs::UNKNOWN_ROUTE_NAME.to_owned());
                let trip_id = builder.trip_id(gtfs_id);
                let service_id = builder.service_id(trip.service_id.trim());
                builder.add_trip(trip_id, service_id, route_name);
            }
            Err(err) => {
                dropped += 1;
                debug!("skipping trip row: {}", err);
            }
        }
    }
    log_dropped("trips.txt", dropped);

    info!("loading stop times (this can take a while)");
    let mut reader = source.open_csv("stop_times.txt")?;
    require_columns(
        &mut reader,
        "stop_times.txt",
        &["trip_id", "stop_id", "stop_sequence", "arrival_time", "departure_time"],
    )?;
    let mut dropped = 0;
    let mut orphaned = 0;
    for result in reader.deserialize::<gtfs::StopTime>() {
        match result {
            Ok(stop_time) => {
                if stop_time.trip_id.trim().is_empty() || stop_time.stop_id.trim().is_empty() {
                    dropped += 1;
                    continue;
                }
                let trip_id = match builder.lookup_trip(stop_time.trip_id.trim()) {
                    Some(trip_id) => trip_id,
                    None => {
                        orphaned += 1;
                        continue;
                    }
                };
                let stop = builder.stop_id(stop_time.stop_id.trim());
                builder.add_stop_time(
                    trip_id,
                    stop_time.stop_sequence,
                    stop,
                    stop_time.arrival_time,
                    stop_time.departure_time,
                );
            }
            Err(err) => {
                dropped += 1;
                debug!("skipping stop time row: {}", err);
            }
        }
    }
    log_dropped("stop_times.txt", dropped);
    if orphaned != 0 {
        warn!("{} stop times referenced trips absent from trips.txt", orphaned);
    }

    let data = builder.build();
    info!("loaded {} stops and {} trips", data.stop_count(), data.trip_count());
    Ok(data)
}

fn log_dropped(file: &str, count: u32) {
    if count != 0 {
        warn!("dropped {} unusable rows of {}", count, file);
    }
}

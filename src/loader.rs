use crate::error::DashboardError;
use crate::types::{Column, Dataset, RawRow, RideRecord};
use crate::util::{
    day_name, parse_date_safe, parse_f64_safe, parse_hour_safe, parse_timestamp_safe,
};
use chrono::Timelike;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    /// Rows whose `Date` cell could not be parsed; they are kept with a null
    /// timestamp.
    pub unparsed_timestamps: usize,
    /// Calendar columns computed from the timestamp rather than read.
    pub derived_columns: Vec<Column>,
}

/// Read a ride CSV from disk.
pub fn load(path: &Path) -> Result<(Dataset, LoadReport), DashboardError> {
    let file = File::open(path).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loading rides");
    load_from_reader(file)
}

/// Read rides from any CSV byte stream.
///
/// Required columns must be present in the header; `Ride_Distance` and
/// `Booking_Value` are optional. Extra columns are ignored. `Ride_Date`,
/// `Hour` and `DayOfWeek` are taken from the file when present and derived
/// from the timestamp otherwise.
pub fn load_from_reader<R: Read>(reader: R) -> Result<(Dataset, LoadReport), DashboardError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let in_file = |c: Column| headers.iter().any(|h| h == c.name());

    if let Some(missing) = Column::REQUIRED.into_iter().find(|c| !in_file(*c)) {
        return Err(DashboardError::MissingColumn {
            column: missing.name(),
        });
    }

    let has_ride_date = in_file(Column::RideDate);
    let has_hour = in_file(Column::Hour);
    let has_day_of_week = in_file(Column::DayOfWeek);
    let derived_columns: Vec<Column> = [
        (Column::RideDate, has_ride_date),
        (Column::Hour, has_hour),
        (Column::DayOfWeek, has_day_of_week),
    ]
    .into_iter()
    .filter(|(_, present)| !present)
    .map(|(c, _)| c)
    .collect();

    let mut total_rows = 0usize;
    let mut unparsed_timestamps = 0usize;
    let mut records: Vec<RideRecord> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        let row = result?;
        total_rows += 1;

        let timestamp = parse_timestamp_safe(row.date.as_deref());
        if timestamp.is_none() {
            unparsed_timestamps += 1;
        }

        let ride_date = if has_ride_date {
            parse_date_safe(row.ride_date.as_deref())
        } else {
            timestamp.map(|ts| ts.date())
        };
        let hour = if has_hour {
            parse_hour_safe(row.hour.as_deref())
        } else {
            timestamp.map(|ts| ts.hour())
        };
        let day_of_week = if has_day_of_week {
            clean_text(row.day_of_week)
        } else {
            timestamp.map(|ts| day_name(ts.date()).to_string())
        };

        records.push(RideRecord {
            timestamp,
            ride_date,
            hour,
            day_of_week,
            booking_id: clean_text(row.booking_id),
            customer_id: clean_text(row.customer_id),
            vehicle_type: clean_text(row.vehicle_type),
            booking_status: clean_text(row.booking_status),
            payment_method: clean_text(row.payment_method),
            pickup_location: clean_text(row.pickup_location),
            drop_location: clean_text(row.drop_location),
            ride_distance: parse_f64_safe(row.ride_distance.as_deref()),
            booking_value: parse_f64_safe(row.booking_value.as_deref()),
        });
    }

    if unparsed_timestamps > 0 {
        warn!(
            unparsed_timestamps,
            "rows with an unparsable Date are kept but excluded from date filters"
        );
    }
    debug!(total_rows, ?derived_columns, "rides loaded");

    let columns = Column::ALL
        .into_iter()
        .filter(|c| c.is_derived() || in_file(*c));
    let report = LoadReport {
        total_rows,
        unparsed_timestamps,
        derived_columns,
    };
    Ok((Dataset::new(columns, records), report))
}

fn clean_text(s: Option<String>) -> Option<String> {
    let s = s?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

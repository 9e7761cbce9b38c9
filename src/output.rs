use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::error::{DashboardError, QueryError};
use crate::filter::FilterOptions;
use crate::reports::{Query, QueryResult, ReportSet};
use crate::types::{Dataset, Kpis, PreviewRow};
use crate::util::{format_int, format_number};

/// File name offered for the filtered-data download.
pub const EXPORT_FILE_NAME: &str = "filtered_ola_rides.csv";

/// Render `data` as UTF-8 CSV: one header row with the dataset's columns,
/// then one row per record. No index column; missing values are empty.
/// Source columns outside [`Column::ALL`](crate::types::Column::ALL) were
/// dropped at load time and are not written.
pub fn serialize_csv(data: &Dataset) -> Result<Vec<u8>, DashboardError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(data.columns().iter().map(|c| c.name()))?;
    for r in data.records() {
        wtr.write_record(
            data.columns()
                .iter()
                .map(|c| r.cell(*c).unwrap_or_default()),
        )?;
    }
    wtr.into_inner()
        .map_err(|e| DashboardError::Write(e.into_error()))
}

pub fn write_csv(path: &Path, data: &Dataset) -> Result<(), DashboardError> {
    let bytes = serialize_csv(data)?;
    std::fs::write(path, bytes).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DashboardError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// First `max_rows` records of the filtered table.
pub fn preview_records(data: &Dataset, max_rows: usize) {
    let rows: Vec<PreviewRow> = data
        .records()
        .iter()
        .take(max_rows)
        .map(PreviewRow::from)
        .collect();
    preview_table_rows(&rows, max_rows);
}

#[derive(Tabled, Clone)]
struct KpiCard {
    #[tabled(rename = "KPI")]
    title: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn print_kpis(kpis: &Kpis) {
    let cards = [
        KpiCard {
            title: "Total Rides",
            value: format_int(kpis.total_rides),
        },
        KpiCard {
            title: "Successful Rides",
            value: format_int(kpis.successful_rides),
        },
        KpiCard {
            title: "Cancelled Rides",
            value: format_int(kpis.cancelled_rides),
        },
        KpiCard {
            title: "Total Booking Value",
            value: format_number(kpis.total_booking_value, 2),
        },
    ];
    preview_table_rows(&cards, cards.len());
}

pub fn print_options(options: &FilterOptions) {
    let date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
    println!("Ride Date range: {} .. {}", date(options.min_date), date(options.max_date));
    println!("Vehicle Type: {}", options.vehicle_types.join(", "));
    println!("Booking Status: {}", options.booking_statuses.join(", "));
    println!("Payment Method: {}", options.payment_methods.join(", "));
}

fn print_query<T>(query: Query, result: &QueryResult<T>)
where
    T: Tabled + Clone,
{
    println!("{}\n", query.title());
    match result {
        Ok(rows) => preview_table_rows(rows, rows.len()),
        Err(reason) => println!("(skipped: {})\n", reason),
    }
}

/// Print every report in catalogue order.
pub fn print_reports(set: &ReportSet) {
    print_query(Query::RideVolumeOverTime, &set.ride_volume);
    print_query(Query::BookingStatusBreakdown, &set.status_breakdown);
    print_query(Query::TopVehicleTypesByDistance, &set.top_vehicle_distance);
    print_query(Query::RidesByDayOfWeek, &set.rides_by_weekday);
    print_query(Query::BookingsByHour, &set.bookings_by_hour);
    print_query(Query::AverageDistanceByVehicleType, &set.avg_distance);
    print_query(Query::PaymentMethodDistribution, &set.payment_distribution);
    print_query(Query::TopCustomers, &set.top_customers);
}

fn query_json<T: Serialize>(result: &QueryResult<T>) -> Result<Value, DashboardError> {
    Ok(match result {
        Ok(rows) => serde_json::to_value(rows)?,
        Err(QueryError::MissingColumn(column)) => json!({ "skipped": { "missing_column": column } }),
    })
}

/// JSON object keyed by [`Query::key`].
pub fn reports_json(set: &ReportSet) -> Result<Value, DashboardError> {
    let mut map = Map::new();
    let mut put = |query: Query, value: Value| {
        map.insert(query.key().to_string(), value);
    };
    put(Query::RideVolumeOverTime, query_json(&set.ride_volume)?);
    put(Query::BookingStatusBreakdown, query_json(&set.status_breakdown)?);
    put(Query::TopVehicleTypesByDistance, query_json(&set.top_vehicle_distance)?);
    put(Query::RidesByDayOfWeek, query_json(&set.rides_by_weekday)?);
    put(Query::BookingsByHour, query_json(&set.bookings_by_hour)?);
    put(Query::AverageDistanceByVehicleType, query_json(&set.avg_distance)?);
    put(Query::PaymentMethodDistribution, query_json(&set.payment_distribution)?);
    put(Query::TopCustomers, query_json(&set.top_customers)?);
    Ok(Value::Object(map))
}

use crate::error::QueryError;
use crate::types::{
    CategoryCount, CategoryMean, CategoryTotal, Column, CustomerRides, Dataset, DateCount,
    HourCount, RideRecord, WeekdayCount,
};
use crate::util::{average, WEEKDAY_NAMES};
use chrono::Datelike;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Payment method value left out of the payment distribution.
pub const UNKNOWN_PAYMENT: &str = "Unknown";

const TOP_N: usize = 5;

/// The fixed catalogue of aggregation queries, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    RideVolumeOverTime,
    BookingStatusBreakdown,
    TopVehicleTypesByDistance,
    RidesByDayOfWeek,
    BookingsByHour,
    AverageDistanceByVehicleType,
    PaymentMethodDistribution,
    TopCustomers,
}

impl Query {
    pub const ALL: [Query; 8] = [
        Query::RideVolumeOverTime,
        Query::BookingStatusBreakdown,
        Query::TopVehicleTypesByDistance,
        Query::RidesByDayOfWeek,
        Query::BookingsByHour,
        Query::AverageDistanceByVehicleType,
        Query::PaymentMethodDistribution,
        Query::TopCustomers,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Query::RideVolumeOverTime => "Ride Volume Over Time",
            Query::BookingStatusBreakdown => "Booking Status Breakdown",
            Query::TopVehicleTypesByDistance => "Top 5 Vehicle Types by Ride Distance",
            Query::RidesByDayOfWeek => "Total Rides by Day of the Week",
            Query::BookingsByHour => "Total Bookings by Hour of the Day",
            Query::AverageDistanceByVehicleType => "Average Ride Distance by Vehicle Type",
            Query::PaymentMethodDistribution => "Payment Method Distribution (excluding Unknown)",
            Query::TopCustomers => "Top 5 Customers by Number of Rides",
        }
    }

    /// Machine-friendly key used in JSON output.
    pub fn key(self) -> &'static str {
        match self {
            Query::RideVolumeOverTime => "ride_volume_over_time",
            Query::BookingStatusBreakdown => "booking_status_breakdown",
            Query::TopVehicleTypesByDistance => "top_vehicle_types_by_distance",
            Query::RidesByDayOfWeek => "rides_by_day_of_week",
            Query::BookingsByHour => "bookings_by_hour",
            Query::AverageDistanceByVehicleType => "average_distance_by_vehicle_type",
            Query::PaymentMethodDistribution => "payment_method_distribution",
            Query::TopCustomers => "top_customers",
        }
    }
}

pub type QueryResult<T> = Result<Vec<T>, QueryError>;

/// Results of every query over one filtered table. A query that could not
/// run holds the reason instead of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSet {
    pub ride_volume: QueryResult<DateCount>,
    pub status_breakdown: QueryResult<CategoryCount>,
    pub top_vehicle_distance: QueryResult<CategoryTotal>,
    pub rides_by_weekday: QueryResult<WeekdayCount>,
    pub bookings_by_hour: QueryResult<HourCount>,
    pub avg_distance: QueryResult<CategoryMean>,
    pub payment_distribution: QueryResult<CategoryCount>,
    pub top_customers: QueryResult<CustomerRides>,
}

impl ReportSet {
    /// The skip reason of each query that did not run.
    pub fn skipped(&self) -> Vec<(Query, &QueryError)> {
        let errs = [
            (Query::RideVolumeOverTime, self.ride_volume.as_ref().err()),
            (Query::BookingStatusBreakdown, self.status_breakdown.as_ref().err()),
            (Query::TopVehicleTypesByDistance, self.top_vehicle_distance.as_ref().err()),
            (Query::RidesByDayOfWeek, self.rides_by_weekday.as_ref().err()),
            (Query::BookingsByHour, self.bookings_by_hour.as_ref().err()),
            (Query::AverageDistanceByVehicleType, self.avg_distance.as_ref().err()),
            (Query::PaymentMethodDistribution, self.payment_distribution.as_ref().err()),
            (Query::TopCustomers, self.top_customers.as_ref().err()),
        ];
        errs.into_iter()
            .filter_map(|(q, e)| e.map(|e| (q, e)))
            .collect()
    }
}

/// Run the whole catalogue. Returns `None` when `data` has no rows, in
/// which case no query is computed at all.
pub fn run_all(data: &Dataset) -> Option<ReportSet> {
    if data.is_empty() {
        info!("no rows for current selection, skipping all reports");
        return None;
    }
    let set = ReportSet {
        ride_volume: ride_volume_over_time(data),
        status_breakdown: booking_status_breakdown(data),
        top_vehicle_distance: top_vehicle_types_by_distance(data),
        rides_by_weekday: rides_by_day_of_week(data),
        bookings_by_hour: bookings_by_hour(data),
        avg_distance: average_distance_by_vehicle_type(data),
        payment_distribution: payment_method_distribution(data),
        top_customers: top_customers(data),
    };
    for (query, reason) in set.skipped() {
        info!(query = query.key(), %reason, "report skipped");
    }
    Some(set)
}

fn require(data: &Dataset, column: Column) -> Result<(), QueryError> {
    if data.has_column(column) {
        Ok(())
    } else {
        Err(QueryError::MissingColumn(column.name()))
    }
}

/// Counts per distinct value, in first-seen order. Missing values are not
/// counted.
fn count_first_seen<'a, I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut out: Vec<(String, usize)> = Vec::new();
    for v in values.into_iter().flatten() {
        match index.get(v) {
            Some(&i) => out[i].1 += 1,
            None => {
                index.insert(v, out.len());
                out.push((v.to_string(), 1));
            }
        }
    }
    out
}

/// Values per vehicle type, groups in first-seen order. Rows without a
/// vehicle type are dropped; a null distance contributes no value.
fn distances_by_vehicle(data: &Dataset) -> Vec<(String, Vec<f64>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<(String, Vec<f64>)> = Vec::new();
    for r in data.records() {
        let Some(vehicle) = r.vehicle_type.as_deref() else {
            continue;
        };
        let i = *index.entry(vehicle).or_insert_with(|| {
            out.push((vehicle.to_string(), Vec::new()));
            out.len() - 1
        });
        if let Some(d) = r.ride_distance {
            out[i].1.push(d);
        }
    }
    out
}

/// Keep the `n` largest by `key`, descending. The sort is stable so equal
/// keys stay in their incoming (first-seen) order.
fn top_n_by<T, F>(mut rows: Vec<T>, n: usize, key: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    rows.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
    rows.truncate(n);
    rows
}

pub fn ride_volume_over_time(data: &Dataset) -> QueryResult<DateCount> {
    require(data, Column::Date)?;
    let mut by_date: BTreeMap<_, usize> = BTreeMap::new();
    for date in data.records().iter().filter_map(RideRecord::event_date) {
        *by_date.entry(date).or_default() += 1;
    }
    Ok(by_date
        .into_iter()
        .map(|(date, count)| DateCount { date, count })
        .collect())
}

pub fn booking_status_breakdown(data: &Dataset) -> QueryResult<CategoryCount> {
    require(data, Column::BookingStatus)?;
    Ok(
        count_first_seen(data.records().iter().map(|r| r.booking_status.as_deref()))
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect(),
    )
}

pub fn top_vehicle_types_by_distance(data: &Dataset) -> QueryResult<CategoryTotal> {
    require(data, Column::VehicleType)?;
    require(data, Column::RideDistance)?;
    let totals: Vec<CategoryTotal> = distances_by_vehicle(data)
        .into_iter()
        .map(|(category, ds)| CategoryTotal {
            category,
            total: ds.iter().sum(),
        })
        .collect();
    Ok(top_n_by(totals, TOP_N, |t| t.total))
}

/// Always seven rows, Monday through Sunday. The weekday is recomputed from
/// the event timestamp; the stored `DayOfWeek` column is not consulted.
pub fn rides_by_day_of_week(data: &Dataset) -> QueryResult<WeekdayCount> {
    require(data, Column::Date)?;
    let mut counts = [0usize; 7];
    for date in data.records().iter().filter_map(RideRecord::event_date) {
        counts[date.weekday().num_days_from_monday() as usize] += 1;
    }
    Ok(WEEKDAY_NAMES
        .iter()
        .zip(counts)
        .map(|(day, count)| WeekdayCount {
            weekday: day.to_string(),
            count,
        })
        .collect())
}

pub fn bookings_by_hour(data: &Dataset) -> QueryResult<HourCount> {
    require(data, Column::Hour)?;
    let mut by_hour: BTreeMap<u32, usize> = BTreeMap::new();
    for hour in data.records().iter().filter_map(|r| r.hour) {
        *by_hour.entry(hour).or_default() += 1;
    }
    Ok(by_hour
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect())
}

pub fn average_distance_by_vehicle_type(data: &Dataset) -> QueryResult<CategoryMean> {
    require(data, Column::VehicleType)?;
    require(data, Column::RideDistance)?;
    Ok(distances_by_vehicle(data)
        .into_iter()
        .map(|(category, ds)| CategoryMean {
            category,
            mean: average(&ds),
        })
        .collect())
}

pub fn payment_method_distribution(data: &Dataset) -> QueryResult<CategoryCount> {
    require(data, Column::PaymentMethod)?;
    let methods = data
        .records()
        .iter()
        .map(|r| r.payment_method.as_deref())
        .filter(|m| *m != Some(UNKNOWN_PAYMENT));
    Ok(count_first_seen(methods)
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect())
}

pub fn top_customers(data: &Dataset) -> QueryResult<CustomerRides> {
    require(data, Column::CustomerId)?;
    let counts = count_first_seen(data.records().iter().map(|r| r.customer_id.as_deref()));
    Ok(top_n_by(counts, TOP_N, |(_, c)| *c as f64)
        .into_iter()
        .map(|(customer_id, rides)| CustomerRides { customer_id, rides })
        .collect())
}

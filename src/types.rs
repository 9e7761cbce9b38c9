use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::util::{format_number, format_optional};

/// One CSV row as it appears on disk. Every field is optional so a short or
/// partially filled row still deserializes; typing happens in the loader.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Ride_Date")]
    pub ride_date: Option<String>,
    #[serde(rename = "Hour")]
    pub hour: Option<String>,
    #[serde(rename = "DayOfWeek")]
    pub day_of_week: Option<String>,
    #[serde(rename = "Booking_ID")]
    pub booking_id: Option<String>,
    #[serde(rename = "Customer_ID")]
    pub customer_id: Option<String>,
    #[serde(rename = "Vehicle_Type")]
    pub vehicle_type: Option<String>,
    #[serde(rename = "Booking_Status")]
    pub booking_status: Option<String>,
    #[serde(rename = "Payment_Method")]
    pub payment_method: Option<String>,
    #[serde(rename = "Pickup_Location")]
    pub pickup_location: Option<String>,
    #[serde(rename = "Drop_Location")]
    pub drop_location: Option<String>,
    #[serde(rename = "Ride_Distance")]
    pub ride_distance: Option<String>,
    #[serde(rename = "Booking_Value")]
    pub booking_value: Option<String>,
}

/// The canonical columns a [`Dataset`] can carry, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Date,
    RideDate,
    Hour,
    DayOfWeek,
    BookingId,
    CustomerId,
    VehicleType,
    BookingStatus,
    PaymentMethod,
    PickupLocation,
    DropLocation,
    RideDistance,
    BookingValue,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::Date,
        Column::RideDate,
        Column::Hour,
        Column::DayOfWeek,
        Column::BookingId,
        Column::CustomerId,
        Column::VehicleType,
        Column::BookingStatus,
        Column::PaymentMethod,
        Column::PickupLocation,
        Column::DropLocation,
        Column::RideDistance,
        Column::BookingValue,
    ];

    /// Columns the source file must provide.
    pub const REQUIRED: [Column; 8] = [
        Column::Date,
        Column::BookingId,
        Column::CustomerId,
        Column::VehicleType,
        Column::BookingStatus,
        Column::PaymentMethod,
        Column::PickupLocation,
        Column::DropLocation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::RideDate => "Ride_Date",
            Column::Hour => "Hour",
            Column::DayOfWeek => "DayOfWeek",
            Column::BookingId => "Booking_ID",
            Column::CustomerId => "Customer_ID",
            Column::VehicleType => "Vehicle_Type",
            Column::BookingStatus => "Booking_Status",
            Column::PaymentMethod => "Payment_Method",
            Column::PickupLocation => "Pickup_Location",
            Column::DropLocation => "Drop_Location",
            Column::RideDistance => "Ride_Distance",
            Column::BookingValue => "Booking_Value",
        }
    }

    /// Derived calendar columns are always materialized by the loader.
    pub fn is_derived(self) -> bool {
        matches!(self, Column::RideDate | Column::Hour | Column::DayOfWeek)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RideRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub ride_date: Option<NaiveDate>,
    pub hour: Option<u32>,
    pub day_of_week: Option<String>,
    pub booking_id: Option<String>,
    pub customer_id: Option<String>,
    pub vehicle_type: Option<String>,
    pub booking_status: Option<String>,
    pub payment_method: Option<String>,
    pub pickup_location: Option<String>,
    pub drop_location: Option<String>,
    pub ride_distance: Option<f64>,
    pub booking_value: Option<f64>,
}

impl RideRecord {
    /// Calendar date of the event timestamp, the value every date filter
    /// and the volume-over-time query key on.
    pub fn event_date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }

    /// Text form of one column as written to CSV. `None` means an empty cell.
    pub fn cell(&self, column: Column) -> Option<String> {
        match column {
            Column::Date => self
                .timestamp
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            Column::RideDate => self.ride_date.map(|d| d.format("%Y-%m-%d").to_string()),
            Column::Hour => self.hour.map(|h| h.to_string()),
            Column::DayOfWeek => self.day_of_week.clone(),
            Column::BookingId => self.booking_id.clone(),
            Column::CustomerId => self.customer_id.clone(),
            Column::VehicleType => self.vehicle_type.clone(),
            Column::BookingStatus => self.booking_status.clone(),
            Column::PaymentMethod => self.payment_method.clone(),
            Column::PickupLocation => self.pickup_location.clone(),
            Column::DropLocation => self.drop_location.clone(),
            Column::RideDistance => self.ride_distance.map(|v| v.to_string()),
            Column::BookingValue => self.booking_value.map(|v| v.to_string()),
        }
    }
}

/// An immutable table of rides plus the set of columns it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    records: Vec<RideRecord>,
}

impl Dataset {
    /// Columns are normalized to canonical order.
    pub fn new(columns: impl IntoIterator<Item = Column>, records: Vec<RideRecord>) -> Self {
        let present: Vec<Column> = columns.into_iter().collect();
        let columns = Column::ALL
            .into_iter()
            .filter(|c| present.contains(c))
            .collect();
        Self { columns, records }
    }

    /// A table with the same columns holding a different set of rows.
    pub fn with_records(&self, records: Vec<RideRecord>) -> Self {
        Self {
            columns: self.columns.clone(),
            records,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn records(&self) -> &[RideRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DateCount {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "count")]
    #[tabled(rename = "count")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CategoryCount {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "count")]
    #[tabled(rename = "count")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CategoryTotal {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total", display_with = "display_total")]
    pub total: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CategoryMean {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    /// `None` when the group has no non-null values to average.
    #[serde(rename = "Mean")]
    #[tabled(rename = "Mean", display_with = "format_optional")]
    pub mean: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct WeekdayCount {
    #[serde(rename = "DayOfWeek")]
    #[tabled(rename = "DayOfWeek")]
    pub weekday: String,
    #[serde(rename = "count")]
    #[tabled(rename = "count")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct HourCount {
    #[serde(rename = "Hour")]
    #[tabled(rename = "Hour")]
    pub hour: u32,
    #[serde(rename = "count")]
    #[tabled(rename = "count")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CustomerRides {
    #[serde(rename = "Customer_ID")]
    #[tabled(rename = "Customer_ID")]
    pub customer_id: String,
    #[serde(rename = "Number_of_Rides")]
    #[tabled(rename = "Number_of_Rides")]
    pub rides: usize,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Kpis {
    pub total_rides: usize,
    pub successful_rides: usize,
    pub cancelled_rides: usize,
    pub total_booking_value: f64,
}

/// Stringly row for the filtered-data preview table.
#[derive(Debug, Tabled, Clone)]
pub struct PreviewRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Booking_ID")]
    pub booking_id: String,
    #[tabled(rename = "Customer_ID")]
    pub customer_id: String,
    #[tabled(rename = "Vehicle_Type")]
    pub vehicle_type: String,
    #[tabled(rename = "Booking_Status")]
    pub booking_status: String,
    #[tabled(rename = "Payment_Method")]
    pub payment_method: String,
    #[tabled(rename = "Pickup_Location")]
    pub pickup_location: String,
    #[tabled(rename = "Drop_Location")]
    pub drop_location: String,
    #[tabled(rename = "Ride_Distance")]
    pub ride_distance: String,
    #[tabled(rename = "Booking_Value")]
    pub booking_value: String,
}

impl From<&RideRecord> for PreviewRow {
    fn from(r: &RideRecord) -> Self {
        let text = |c: Column| r.cell(c).unwrap_or_default();
        Self {
            date: text(Column::Date),
            booking_id: text(Column::BookingId),
            customer_id: text(Column::CustomerId),
            vehicle_type: text(Column::VehicleType),
            booking_status: text(Column::BookingStatus),
            payment_method: text(Column::PaymentMethod),
            pickup_location: text(Column::PickupLocation),
            drop_location: text(Column::DropLocation),
            ride_distance: text(Column::RideDistance),
            booking_value: text(Column::BookingValue),
        }
    }
}

fn display_total(v: &f64) -> String {
    format_number(*v, 2)
}

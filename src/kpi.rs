use crate::types::{Dataset, Kpis};

/// Booking status counted as a completed ride.
pub const SUCCESS_STATUS: &str = "Success";

/// Headline numbers over the full, unfiltered dataset.
pub fn compute(data: &Dataset) -> Kpis {
    let mut successful_rides = 0usize;
    let mut cancelled_rides = 0usize;
    let mut total_booking_value = 0.0;
    for r in data.records() {
        match r.booking_status.as_deref() {
            Some(SUCCESS_STATUS) => successful_rides += 1,
            Some(s) if is_cancelled(s) => cancelled_rides += 1,
            _ => {}
        }
        total_booking_value += r.booking_value.unwrap_or(0.0);
    }
    Kpis {
        total_rides: data.len(),
        successful_rides,
        cancelled_rides,
        total_booking_value,
    }
}

// Covers "Canceled by Driver", "Cancelled by Customer" and friends.
fn is_cancelled(status: &str) -> bool {
    status.to_lowercase().contains("cancel")
}

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::error::DashboardError;
use crate::types::{Dataset, RideRecord};

/// The active filter selections. Built fresh for every pass and never
/// mutated afterwards; the `with_*` methods consume and return a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    start: NaiveDate,
    end: NaiveDate,
    vehicle_types: HashSet<String>,
    booking_statuses: HashSet<String>,
    payment_methods: HashSet<String>,
    query: Option<String>,
}

impl FilterSpec {
    /// Inclusive date range with every category set empty (matches nothing
    /// until categories are selected).
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DashboardError> {
        if start > end {
            return Err(DashboardError::InvalidDateRange { start, end });
        }
        Ok(Self {
            start,
            end,
            vehicle_types: HashSet::new(),
            booking_statuses: HashSet::new(),
            payment_methods: HashSet::new(),
            query: None,
        })
    }

    /// Everything the control surface offers is selected; `None` when the
    /// dataset has no parsable timestamps to bound the range.
    pub fn select_all(options: &FilterOptions) -> Option<Self> {
        let (start, end) = (options.min_date?, options.max_date?);
        Some(Self {
            start,
            end,
            vehicle_types: options.vehicle_types.iter().cloned().collect(),
            booking_statuses: options.booking_statuses.iter().cloned().collect(),
            payment_methods: options.payment_methods.iter().cloned().collect(),
            query: None,
        })
    }

    pub fn with_vehicle_types<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vehicle_types = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_booking_statuses<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.booking_statuses = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_payment_methods<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.payment_methods = values.into_iter().map(Into::into).collect();
        self
    }

    /// Free-text search. An empty string disables the search.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = if query.is_empty() { None } else { Some(query) };
        self
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// True when the record passes all five predicates.
    pub fn matches(&self, record: &RideRecord) -> bool {
        let in_range = record
            .event_date()
            .is_some_and(|d| self.start <= d && d <= self.end);
        in_range
            && is_selected(&self.vehicle_types, &record.vehicle_type)
            && is_selected(&self.booking_statuses, &record.booking_status)
            && is_selected(&self.payment_methods, &record.payment_method)
            && self.matches_query(record)
    }

    fn matches_query(&self, record: &RideRecord) -> bool {
        let Some(query) = &self.query else {
            return true;
        };
        let needle = query.to_lowercase();
        [
            &record.booking_id,
            &record.customer_id,
            &record.pickup_location,
            &record.drop_location,
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

fn is_selected(selected: &HashSet<String>, value: &Option<String>) -> bool {
    value.as_ref().is_some_and(|v| selected.contains(v))
}

/// Rows of `dataset` satisfying `spec`, in source order.
pub fn apply(dataset: &Dataset, spec: &FilterSpec) -> Dataset {
    let records: Vec<RideRecord> = dataset
        .records()
        .iter()
        .filter(|r| spec.matches(r))
        .cloned()
        .collect();
    debug!(
        matched = records.len(),
        total = dataset.len(),
        "filter applied"
    );
    dataset.with_records(records)
}

/// What the filter controls can offer for a dataset: the date bounds and
/// the sorted distinct values of each category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub vehicle_types: Vec<String>,
    pub booking_statuses: Vec<String>,
    pub payment_methods: Vec<String>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let records = dataset.records();
        let dates = records.iter().filter_map(RideRecord::event_date);
        let distinct = |pick: fn(&RideRecord) -> &Option<String>| -> Vec<String> {
            records
                .iter()
                .filter_map(|r| pick(r).clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        Self {
            min_date: dates.clone().min(),
            max_date: dates.max(),
            vehicle_types: distinct(|r| &r.vehicle_type),
            booking_statuses: distinct(|r| &r.booking_status),
            payment_methods: distinct(|r| &r.payment_method),
        }
    }
}

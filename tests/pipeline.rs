use chrono::NaiveDate;
use ride_dashboard::cache::DatasetCache;
use ride_dashboard::filter::{apply, FilterOptions, FilterSpec};
use ride_dashboard::loader::load_from_reader;
use ride_dashboard::types::{Dataset, RideRecord};
use ride_dashboard::{kpi, output, reports};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HEADER: &str = "Date,Booking_ID,Booking_Status,Customer_ID,Vehicle_Type,Pickup_Location,Drop_Location,Ride_Distance,Booking_Value,Payment_Method";

// July 2024: the 1st is a Monday.
const ROWS: &str = "\
2024-07-01 08:15:00,CNR001,Success,C1,Auto,Koramangala,Indiranagar,5.2,120,Cash
2024-07-01 09:40:00,CNR002,Canceled by Driver,C2,Bike,HSR Layout,Whitefield,,0,Unknown
2024-07-02 18:05:00,CNR003,Success,C1,Prime Sedan,Jayanagar,MG Road,12,450,UPI
2024-07-02 19:30:00,CNR004,Driver Not Found,C3,Auto,Hebbal,Yelahanka,,,Unknown
2024-07-05 07:00:00,CNR005,Success,C1,Bike,Indiranagar,Koramangala,3.5,80,Cash
2024-07-05 22:45:00,CNR006,Canceled by Customer,C4,Prime Sedan,Whitefield,Marathahalli,,0,Card
bad-timestamp,CNR007,Success,C5,Auto,BTM,JP Nagar,4,95,Cash
2024-07-07 11:11:00,CNR008,Success,C2,Auto,MG Road,Hebbal,7.8,200,UPI
";

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
}

fn write_fixture(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn fixture() -> Dataset {
    load_from_reader(format!("{HEADER}\n{ROWS}").as_bytes())
        .unwrap()
        .0
}

fn select_all(ds: &Dataset) -> FilterSpec {
    FilterSpec::select_all(&FilterOptions::from_dataset(ds)).unwrap()
}

fn ids(ds: &Dataset) -> Vec<&str> {
    ds.records()
        .iter()
        .map(|r| r.booking_id.as_deref().unwrap_or(""))
        .collect()
}

/// Independent restatement of the five filter predicates.
fn satisfies(
    r: &RideRecord,
    range: (NaiveDate, NaiveDate),
    vehicles: &[&str],
    statuses: &[&str],
    payments: &[&str],
    query: &str,
) -> bool {
    let in_set = |v: &Option<String>, set: &[&str]| {
        v.as_deref().map(|v| set.contains(&v)).unwrap_or(false)
    };
    let date_ok = r
        .timestamp
        .map(|ts| ts.date() >= range.0 && ts.date() <= range.1)
        .unwrap_or(false);
    let query_ok = query.is_empty()
        || [&r.booking_id, &r.customer_id, &r.pickup_location, &r.drop_location]
            .iter()
            .any(|f| {
                f.as_deref()
                    .map(|s| s.to_lowercase().contains(&query.to_lowercase()))
                    .unwrap_or(false)
            });
    date_ok
        && in_set(&r.vehicle_type, vehicles)
        && in_set(&r.booking_status, statuses)
        && in_set(&r.payment_method, payments)
        && query_ok
}

#[test]
fn filter_is_sound_and_complete() {
    let ds = fixture();
    let cases: Vec<((NaiveDate, NaiveDate), Vec<&str>, Vec<&str>, Vec<&str>, &str)> = vec![
        (
            (date(1), date(7)),
            vec!["Auto", "Bike"],
            vec!["Success", "Canceled by Driver"],
            vec!["Cash", "Unknown", "UPI"],
            "",
        ),
        (
            (date(2), date(5)),
            vec!["Auto", "Bike", "Prime Sedan"],
            vec!["Success", "Driver Not Found", "Canceled by Customer"],
            vec!["Cash", "Unknown", "UPI", "Card"],
            "koRAMangala",
        ),
        (
            (date(1), date(31)),
            vec!["Auto"],
            vec!["Success"],
            vec!["UPI"],
            "hebbal",
        ),
    ];

    for (range, vehicles, statuses, payments, query) in cases {
        let spec = FilterSpec::new(range.0, range.1)
            .unwrap()
            .with_vehicle_types(vehicles.iter().copied())
            .with_booking_statuses(statuses.iter().copied())
            .with_payment_methods(payments.iter().copied())
            .with_query(query);
        let out = apply(&ds, &spec);

        let expected: Vec<&RideRecord> = ds
            .records()
            .iter()
            .filter(|r| satisfies(r, range, &vehicles, &statuses, &payments, query))
            .collect();
        let actual: Vec<&RideRecord> = out.records().iter().collect();
        assert_eq!(actual, expected, "query {query:?}");
    }
}

#[test]
fn full_selection_returns_table_unchanged() {
    let clean: String = ROWS
        .lines()
        .filter(|l| !l.starts_with("bad"))
        .map(|l| format!("{l}\n"))
        .collect();
    let ds = load_from_reader(format!("{HEADER}\n{clean}").as_bytes())
        .unwrap()
        .0;
    let out = apply(&ds, &select_all(&ds));
    assert_eq!(out, ds);
}

#[test]
fn undated_rows_never_pass_a_date_filter() {
    let ds = fixture();
    let out = apply(&ds, &select_all(&ds));
    assert_eq!(out.len(), ds.len() - 1);
    assert!(!ids(&out).contains(&"CNR007"));
}

#[test]
fn single_day_selection() {
    let ds = fixture();
    let all = select_all(&ds);
    let opts = FilterOptions::from_dataset(&ds);
    let spec = FilterSpec::new(date(5), date(5))
        .unwrap()
        .with_vehicle_types(opts.vehicle_types.clone())
        .with_booking_statuses(opts.booking_statuses.clone())
        .with_payment_methods(opts.payment_methods.clone());
    assert_ne!(spec, all);
    let out = apply(&ds, &spec);
    assert_eq!(ids(&out), vec!["CNR005", "CNR006"]);
    assert!(out.records().iter().all(|r| r.event_date() == Some(date(5))));
}

#[test]
fn weekday_report_zero_fills_missing_days() {
    let ds = fixture();
    let opts = FilterOptions::from_dataset(&ds);
    let spec = FilterSpec::new(date(2), date(5))
        .unwrap()
        .with_vehicle_types(opts.vehicle_types.clone())
        .with_booking_statuses(opts.booking_statuses.clone())
        .with_payment_methods(opts.payment_methods.clone());
    let out = reports::rides_by_day_of_week(&apply(&ds, &spec)).unwrap();
    let counts: Vec<(&str, usize)> = out.iter().map(|w| (w.weekday.as_str(), w.count)).collect();
    assert_eq!(
        counts,
        vec![
            ("Monday", 0),
            ("Tuesday", 2),
            ("Wednesday", 0),
            ("Thursday", 0),
            ("Friday", 2),
            ("Saturday", 0),
            ("Sunday", 0),
        ]
    );
}

#[test]
fn top_customers_puts_heaviest_rider_first() {
    let mut body = format!("{HEADER}\n");
    let mut n = 0;
    for (customer, rides) in [("C2", 5), ("C3", 4), ("C1", 10), ("C4", 5), ("C5", 3), ("C6", 1)] {
        for _ in 0..rides {
            n += 1;
            body.push_str(&format!(
                "2024-07-03 10:00:00,B{n},Success,{customer},Auto,A,B,2,50,Cash\n"
            ));
        }
    }
    let ds = load_from_reader(body.as_bytes()).unwrap().0;
    let out = reports::top_customers(&apply(&ds, &select_all(&ds))).unwrap();
    assert!(out.len() <= 5);
    assert_eq!(out[0].customer_id, "C1");
    assert_eq!(out[0].rides, 10);
    assert!(out.windows(2).all(|w| w[0].rides >= w[1].rides));
}

#[test]
fn payment_distribution_sums_to_known_rows() {
    let mut body = format!("{HEADER}\n");
    let methods = ["Unknown", "Cash", "Unknown", "UPI", "Card", "Unknown", "Cash", "UPI", "Cash", "Card"];
    for (i, m) in methods.iter().enumerate() {
        body.push_str(&format!(
            "2024-07-03 10:00:00,B{i},Success,C{i},Auto,A,B,2,50,{m}\n"
        ));
    }
    let ds = load_from_reader(body.as_bytes()).unwrap().0;
    let out = reports::payment_method_distribution(&ds).unwrap();
    assert_eq!(out.iter().map(|c| c.count).sum::<usize>(), 7);
    let names: Vec<&str> = out.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, vec!["Cash", "UPI", "Card"]);
}

#[test]
fn export_round_trips_rows_and_columns() {
    let ds = fixture();
    let filtered = apply(&ds, &select_all(&ds));
    let bytes = output::serialize_csv(&filtered).unwrap();

    let mut rdr = csv::Reader::from_reader(bytes.as_slice());
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    let expected: Vec<String> = filtered
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(headers, expected);
    assert_eq!(rdr.records().count(), filtered.len());

    let (reloaded, report) = load_from_reader(bytes.as_slice()).unwrap();
    assert!(report.derived_columns.is_empty());
    assert_eq!(reloaded, filtered);
}

#[test]
fn empty_selection_skips_reports_and_exports_header_only() {
    let ds = fixture();
    let opts = FilterOptions::from_dataset(&ds);
    let spec = FilterSpec::new(date(20), date(25))
        .unwrap()
        .with_vehicle_types(opts.vehicle_types.clone())
        .with_booking_statuses(opts.booking_statuses.clone())
        .with_payment_methods(opts.payment_methods.clone());
    let filtered = apply(&ds, &spec);
    assert!(filtered.is_empty());
    assert!(reports::run_all(&filtered).is_none());

    let text = String::from_utf8(output::serialize_csv(&filtered).unwrap()).unwrap();
    assert_eq!(text.lines().count(), 1);
}

#[test]
fn reports_over_fixture() {
    let ds = fixture();
    let set = reports::run_all(&apply(&ds, &select_all(&ds))).unwrap();
    assert!(set.skipped().is_empty());

    let volume: Vec<(NaiveDate, usize)> = set
        .ride_volume
        .unwrap()
        .into_iter()
        .map(|p| (p.date, p.count))
        .collect();
    assert_eq!(
        volume,
        vec![(date(1), 2), (date(2), 2), (date(5), 2), (date(7), 1)]
    );

    let top = set.top_vehicle_distance.unwrap();
    let names: Vec<&str> = top.iter().map(|t| t.category.as_str()).collect();
    assert_eq!(names, vec!["Auto", "Prime Sedan", "Bike"]);
    for (t, want) in top.iter().zip([13.0, 12.0, 3.5]) {
        assert!((t.total - want).abs() < 1e-9, "{}: {}", t.category, t.total);
    }

    let hours: Vec<u32> = set
        .bookings_by_hour
        .unwrap()
        .iter()
        .map(|h| h.hour)
        .collect();
    assert_eq!(hours, vec![7, 8, 9, 11, 18, 19, 22]);
}

#[test]
fn kpis_use_the_full_table() {
    let ds = fixture();
    let k = kpi::compute(&ds);
    assert_eq!(k.total_rides, 8);
    assert_eq!(k.successful_rides, 5);
    assert_eq!(k.cancelled_rides, 2);
    assert!((k.total_booking_value - 945.0).abs() < 1e-9);
}

#[test]
fn cache_loads_from_disk_once_per_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "rides.csv", &format!("{HEADER}\n{ROWS}"));
    let cache = DatasetCache::new();

    let first = cache.get_or_load(&path).unwrap();
    assert_eq!(first.dataset.len(), 8);
    assert_eq!(first.report.unparsed_timestamps, 1);

    // Served from memory even once the file is gone.
    fs::remove_file(&path).unwrap();
    let second = cache.get_or_load(&path).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn write_csv_uses_export_name() {
    let dir = tempfile::tempdir().unwrap();
    let ds = fixture();
    let path = dir.path().join(output::EXPORT_FILE_NAME);
    output::write_csv(&path, &ds).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), ds.len() + 1);
    assert!(path.ends_with("filtered_ola_rides.csv"));
}

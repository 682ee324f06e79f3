use agenda_report::ingest::{IngestError, RecordCache, SpreadsheetLoader};
use agenda_report::scheduling::export::to_csv_bytes;
use agenda_report::scheduling::filters::filter_records;
use agenda_report::scheduling::forecast::MonthStatus;
use agenda_report::scheduling::{build_report, FilterSelection, FixedClock, PlanTier};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

const HEADER: &str = "Data da Finalização,Plano,Cidade,Bairro,Tecnologia\n";

fn write_sheet(dir: &Path, name: &str, rows: &[String]) {
    let mut body = HEADER.to_string();
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    fs::write(dir.join(name), body).expect("write sheet");
}

/// September 2025 complete, October 2025 partially collected.
fn seed_directory(dir: &Path) {
    let september: Vec<String> = (1..=30)
        .filter_map(|day| NaiveDate::from_ymd_opt(2025, 9, day))
        .filter(|date| date.weekday() != Weekday::Sun)
        .take(20)
        .map(|date| format!("{},Fibra 500 Mega,Recife,Boa Vista,FTTH", date.format("%d/%m/%Y")))
        .collect();
    write_sheet(dir, "setembro.csv", &september);

    let mut october = Vec::new();
    for day in 1..=4 {
        october.push(format!("0{day}/10/2025,Fibra 800 Mega,Olinda,Carmo,FTTH"));
        october.push(format!("0{day}/10/2025,Internet 1 GB,Recife,Casa Forte,FTTH"));
    }
    october.push("11/10/2025,Plano 1500 Mega,Recife,Boa Vista,Rádio".to_string());
    october.push("11/10/2025,Internet 1GB,Recife,Boa Vista,FTTH".to_string());
    october.push("sem data,Fibra 500 Mega,Recife,Boa Vista,FTTH".to_string());
    write_sheet(dir, "outubro.csv", &october);
}

fn clock() -> FixedClock {
    FixedClock(NaiveDate::from_ymd_opt(2025, 10, 17).expect("valid date"))
}

#[test]
fn loader_reads_every_file_in_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_directory(dir.path());
    fs::write(dir.path().join("~$setembro.xlsx"), "lock").expect("write lock file");

    let set = SpreadsheetLoader::from_dir(dir.path()).expect("load");
    assert_eq!(set.files().len(), 2);
    assert_eq!(set.len(), 31);
    assert_eq!(set.undated(), 1);
}

#[test]
fn full_pipeline_builds_metrics_and_forecast() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_directory(dir.path());
    let set = SpreadsheetLoader::from_dir(dir.path()).expect("load");

    let report = build_report(set.records(), &FilterSelection::default(), &clock());

    // The undated October row stays out of the default view.
    assert_eq!(report.metrics.total_records, 30);
    assert_eq!(report.metrics.valid_days, 25);
    assert_eq!(report.metrics.daily_average, Some(30.0 / 25.0));

    let tiers: Vec<(PlanTier, usize)> = report
        .tier_distribution
        .iter()
        .map(|entry| (entry.tier, entry.count))
        .collect();
    assert_eq!(
        tiers,
        vec![
            (PlanTier::Tier500, 20),
            (PlanTier::Tier1Gig, 5),
            (PlanTier::Tier800, 4),
        ]
    );

    assert_eq!(report.forecast.len(), 2);
    let september = &report.forecast[0];
    assert_eq!(september.status, MonthStatus::Complete);
    assert_eq!(september.collected_days, 26);
    assert_eq!(september.projected_total, Some(20));

    let october = &report.forecast[1];
    assert_eq!(october.status, MonthStatus::InProgress);
    assert_eq!(october.records, 10);
    assert_eq!(october.collected_days, 5);
    assert_eq!(october.expected_days, 27);
    assert_eq!(october.projected_total, Some(54));
}

#[test]
fn undated_rows_can_be_opted_back_in() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_directory(dir.path());
    let set = SpreadsheetLoader::from_dir(dir.path()).expect("load");

    let selection = FilterSelection {
        include_undated: true,
        ..FilterSelection::default()
    };
    let report = build_report(set.records(), &selection, &clock());
    assert_eq!(report.metrics.total_records, 31);
    assert_eq!(report.metrics.valid_days, 25);
    assert_eq!(report.records.last().and_then(|row| row.completed_on), None);
}

#[test]
fn cutoff_and_weekday_filters_compose() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_directory(dir.path());
    let set = SpreadsheetLoader::from_dir(dir.path()).expect("load");

    let mut selection = FilterSelection {
        common_day_cutoff: true,
        ..FilterSelection::default()
    };
    selection.exclude_weekday(Weekday::Sat);

    let report = build_report(set.records(), &selection, &clock());
    // September's latest record is the 23rd, October's the 11th.
    assert_eq!(report.cutoff_day, Some(11));
    assert!(report
        .records
        .iter()
        .filter_map(|row| row.completed_on)
        .all(|date| date.day() <= 11 && date.weekday() != Weekday::Sat));
    assert!(report.records.iter().all(|row| row.completed_on.is_some()));
}

#[test]
fn dimension_filters_do_not_change_forecast_or_valid_days() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_directory(dir.path());
    let set = SpreadsheetLoader::from_dir(dir.path()).expect("load");

    let unfiltered = build_report(set.records(), &FilterSelection::default(), &clock());
    let selection = FilterSelection {
        city: Some("Olinda".to_string()),
        ..FilterSelection::default()
    };
    let olinda = build_report(set.records(), &selection, &clock());

    assert_eq!(olinda.metrics.total_records, 4);
    assert_eq!(olinda.metrics.valid_days, unfiltered.metrics.valid_days);
    assert_eq!(olinda.forecast, unfiltered.forecast);
    assert_eq!(olinda.options.plans, unfiltered.options.plans);
    assert_eq!(olinda.options.cities, unfiltered.options.cities);
    assert_eq!(olinda.options.neighborhood_limit_max, 1);
    assert_eq!(olinda.neighborhood_distribution.len(), 1);
}

#[test]
fn report_is_idempotent_for_same_inputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_directory(dir.path());
    let cache = RecordCache::new(dir.path());
    let selection = FilterSelection {
        months: BTreeSet::from([10]),
        common_day_cutoff: true,
        ..FilterSelection::default()
    };

    let first = build_report(cache.get_or_load().expect("load").records(), &selection, &clock());
    let second = build_report(cache.get_or_load().expect("load").records(), &selection, &clock());
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("serialize"),
        serde_json::to_string(&second).expect("serialize")
    );
}

#[test]
fn export_contains_filtered_rows_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_directory(dir.path());
    let set = SpreadsheetLoader::from_dir(dir.path()).expect("load");
    let selection = FilterSelection {
        plan: Some("Internet 1GB".to_string()),
        ..FilterSelection::default()
    };

    let filtered = filter_records(set.records(), &selection);
    let csv = String::from_utf8(to_csv_bytes(&filtered.records).expect("export")).expect("utf-8");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        "2025-10-11,Boa Vista,Recife,Internet 1GB,FTTH,1 Giga (was 700 Mega through April)"
    );
}

#[test]
fn directory_without_spreadsheets_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    match SpreadsheetLoader::from_dir(dir.path()) {
        Err(IngestError::Empty(_)) => {}
        other => panic!("expected empty directory error, got {other:?}"),
    }
}

use crate::cli::{ExportArgs, FilterArgs, ReportArgs};
use agenda_report::config::AppConfig;
use agenda_report::error::AppError;
use agenda_report::ingest::{RecordSet, SpreadsheetLoader};
use agenda_report::scheduling::export::write_csv;
use agenda_report::scheduling::filters::filter_records;
use agenda_report::scheduling::report::views::{decimal_comma, display_average, CountEntry};
use agenda_report::scheduling::{build_report, Clock, DashboardReport, FixedClock, SystemClock};
use std::fs::File;
use std::io::BufWriter;

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        filters,
        today,
        list_records,
    } = args;

    let selection = filters.selection()?;
    let records = load_records(&filters)?;
    let clock: Box<dyn Clock> = match today {
        Some(date) => Box::new(FixedClock(date)),
        None => Box::new(SystemClock),
    };

    let report = build_report(records.records(), &selection, clock.as_ref());
    print!("{}", render_report(&report, &records, list_records));
    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let selection = args.filters.selection()?;
    let records = load_records(&args.filters)?;
    let filtered = filter_records(records.records(), &selection);

    let file = File::create(&args.out)?;
    write_csv(BufWriter::new(file), &filtered.records)?;
    println!(
        "Wrote {} records to {}",
        filtered.records.len(),
        args.out.display()
    );
    Ok(())
}

fn load_records(filters: &FilterArgs) -> Result<RecordSet, AppError> {
    let directory = match &filters.data_dir {
        Some(directory) => directory.clone(),
        None => AppConfig::load()?.data.directory,
    };
    Ok(SpreadsheetLoader::from_dir(&directory)?)
}

pub(crate) fn render_report(
    report: &DashboardReport,
    records: &RecordSet,
    list_records: bool,
) -> String {
    let mut out = String::new();
    out.push_str("Scheduling records dashboard\n");
    out.push_str(&format!(
        "Source: {} file(s), {} record(s), {} without a date (evaluated {})\n",
        records.files().len(),
        records.len(),
        records.undated(),
        report.today
    ));

    let metrics = &report.metrics;
    out.push_str("\nSummary\n");
    out.push_str(&format!("- Total records: {}\n", metrics.total_records));
    out.push_str(&format!("- Valid days: {}\n", metrics.valid_days));
    out.push_str(&format!(
        "- Daily average: {}\n",
        display_average(metrics.daily_average)
    ));
    if let Some(day) = report.cutoff_day {
        out.push_str(&format!("- Common-day cutoff: day {day}\n"));
    }

    out.push_str("\nPlan tiers\n");
    if report.tier_distribution.is_empty() {
        out.push_str("- none\n");
    }
    for entry in &report.tier_distribution {
        out.push_str(&format!(
            "- {}: {} ({}%)\n",
            entry.tier_label,
            entry.count,
            decimal_comma(entry.share_pct, 1)
        ));
    }

    push_counts(&mut out, "Plans", &report.plan_distribution);
    push_counts(&mut out, "Cities", &report.city_distribution);
    push_counts(
        &mut out,
        &format!("Top {} neighborhoods", report.neighborhood_limit),
        &report.neighborhood_distribution,
    );
    push_counts(&mut out, "Technologies", &report.technology_distribution);

    out.push_str("\nRecords by day of month\n");
    if report.day_of_month.is_empty() {
        out.push_str("- none\n");
    }
    for entry in &report.day_of_month {
        out.push_str(&format!("- {:>2}: {}\n", entry.day, entry.count));
    }

    out.push_str("\nMonth-end forecast\n");
    if report.forecast.is_empty() {
        out.push_str("- none\n");
    }
    for month in &report.forecast {
        let projected = month
            .projected_total
            .map(|total| total.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        out.push_str(&format!(
            "- {} [{}]: {} records over {}/{} days, average {}, projected {}\n",
            month.label,
            month.status.label(),
            month.records,
            month.collected_days,
            month.expected_days,
            display_average(month.daily_average),
            projected
        ));
    }

    if list_records {
        out.push_str("\nRecords\n");
        for row in &report.records {
            out.push_str(&format!(
                "- {} | {} | {} | {} | {} | {}\n",
                row.completed_on_label,
                row.neighborhood.as_deref().unwrap_or("-"),
                row.city.as_deref().unwrap_or("-"),
                row.plan.as_deref().unwrap_or("-"),
                row.technology.as_deref().unwrap_or("-"),
                if row.tier.is_classified() {
                    row.tier.label()
                } else {
                    "-"
                }
            ));
        }
    }

    out
}

fn push_counts(out: &mut String, title: &str, entries: &[CountEntry]) {
    out.push_str(&format!("\n{title}\n"));
    if entries.is_empty() {
        out.push_str("- none\n");
    }
    for entry in entries {
        out.push_str(&format!("- {}: {}\n", entry.label, entry.count));
    }
}

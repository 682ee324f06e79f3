use super::super::domain::{month_name, SchedulingRecord};
use super::super::filters::{daily_average, filter_records, FilterSelection};
use super::super::forecast::{forecast_months, Clock};
use super::super::tier::PlanTier;
use super::views::{
    CountEntry, DashboardMetrics, DashboardReport, DayCountEntry, FilterOptions, MonthOption,
    RecordRow, TierShareEntry,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const DEFAULT_NEIGHBORHOOD_LIMIT: usize = 10;

/// Runs the whole filter → aggregate pass. Pure in its inputs: the same
/// records, selection and clock always produce the same report.
pub fn build_report(
    records: &[SchedulingRecord],
    selection: &FilterSelection,
    clock: &dyn Clock,
) -> DashboardReport {
    let filtered = filter_records(records, selection);
    let total_records = filtered.records.len();
    let valid_days = filtered.dated.valid_days;

    let metrics = DashboardMetrics {
        total_records,
        valid_days,
        daily_average: daily_average(total_records, valid_days),
    };

    let plan_distribution = by_label(count_by(&filtered.records, |r| r.plan.as_deref()));
    let city_distribution = by_label(count_by(&filtered.records, |r| r.city.as_deref()));
    let technology_distribution =
        by_count(count_by(&filtered.records, |r| r.technology.as_deref()));

    let mut neighborhood_distribution =
        by_count(count_by(&filtered.records, |r| r.neighborhood.as_deref()));
    let neighborhood_limit_max = neighborhood_distribution.len();
    let neighborhood_limit =
        resolve_neighborhood_limit(selection.top_neighborhoods, neighborhood_limit_max);
    neighborhood_distribution.truncate(neighborhood_limit);

    DashboardReport {
        today: clock.today(),
        selection: selection.clone(),
        cutoff_day: filtered.dated.cutoff_day,
        neighborhood_limit,
        metrics,
        plan_distribution,
        tier_distribution: tier_distribution(&filtered.records),
        city_distribution,
        neighborhood_distribution,
        technology_distribution,
        day_of_month: day_of_month_series(&filtered.records),
        records: record_rows(&filtered.records),
        forecast: forecast_months(filtered.dated.records.iter().copied(), clock),
        options: filter_options(records, neighborhood_limit_max),
    }
}

fn count_by<'a, F>(records: &[&'a SchedulingRecord], key: F) -> BTreeMap<&'a str, usize>
where
    F: Fn(&'a SchedulingRecord) -> Option<&'a str>,
{
    let mut counts = BTreeMap::new();
    for value in records.iter().copied().filter_map(key) {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

fn by_label(counts: BTreeMap<&str, usize>) -> Vec<CountEntry> {
    counts
        .into_iter()
        .map(|(label, count)| CountEntry {
            label: label.to_string(),
            count,
        })
        .collect()
}

/// Descending count; ties keep label order.
fn by_count(counts: BTreeMap<&str, usize>) -> Vec<CountEntry> {
    let mut entries = by_label(counts);
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

fn resolve_neighborhood_limit(requested: Option<usize>, available: usize) -> usize {
    if available == 0 {
        return 0;
    }
    requested
        .unwrap_or_else(|| DEFAULT_NEIGHBORHOOD_LIMIT.min(available))
        .clamp(1, available)
}

fn tier_distribution(records: &[&SchedulingRecord]) -> Vec<TierShareEntry> {
    let mut counts: HashMap<PlanTier, usize> = HashMap::new();
    for tier in records.iter().map(|record| record.tier()) {
        if tier.is_classified() {
            *counts.entry(tier).or_insert(0) += 1;
        }
    }

    let classified: usize = counts.values().sum();
    if classified == 0 {
        return Vec::new();
    }

    let mut entries: Vec<TierShareEntry> = PlanTier::ordered()
        .into_iter()
        .filter_map(|tier| {
            counts.get(&tier).map(|&count| TierShareEntry {
                tier,
                tier_label: tier.label(),
                count,
                share_pct: ((count as f64 / classified as f64) * 1000.0).round_ties_even() / 10.0,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

fn day_of_month_series(records: &[&SchedulingRecord]) -> Vec<DayCountEntry> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for day in records.iter().filter_map(|record| record.day_of_month()) {
        *counts.entry(day).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(day, count)| DayCountEntry { day, count })
        .collect()
}

/// Newest first; undated rows sink to the bottom.
fn record_rows(records: &[&SchedulingRecord]) -> Vec<RecordRow> {
    let mut rows: Vec<RecordRow> = records
        .iter()
        .map(|record| RecordRow {
            completed_on: record.completed_on,
            completed_on_label: record
                .completed_on
                .map(|date| date.format("%d/%m/%y").to_string())
                .unwrap_or_default(),
            neighborhood: record.neighborhood.clone(),
            city: record.city.clone(),
            plan: record.plan.clone(),
            technology: record.technology.clone(),
            tier: record.tier(),
        })
        .collect();
    rows.sort_by(|a, b| b.completed_on.cmp(&a.completed_on));
    rows
}

fn filter_options(records: &[SchedulingRecord], neighborhood_limit_max: usize) -> FilterOptions {
    let months = records
        .iter()
        .filter_map(SchedulingRecord::month)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|month| month_name(month).map(|name| MonthOption { month, name }))
        .collect();

    FilterOptions {
        months,
        plans: distinct(records, |r| r.plan.as_deref()),
        cities: distinct(records, |r| r.city.as_deref()),
        neighborhoods: distinct(records, |r| r.neighborhood.as_deref()),
        neighborhood_limit_max,
    }
}

fn distinct<'a, F>(records: &'a [SchedulingRecord], key: F) -> Vec<String>
where
    F: Fn(&'a SchedulingRecord) -> Option<&'a str>,
{
    records
        .iter()
        .filter_map(key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

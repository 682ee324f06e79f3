use super::domain::{SchedulingRecord, YearMonth};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// User-selected predicates for one dashboard pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    /// Month numbers (1-12) to keep. Empty selects every month present,
    /// which still drops undated rows.
    #[serde(default)]
    pub months: BTreeSet<u32>,
    /// Keep undated rows when no month is selected.
    #[serde(default)]
    pub include_undated: bool,
    #[serde(default)]
    pub excluded_weekdays: Vec<Weekday>,
    /// Trim every month to the smallest "latest day" among them.
    #[serde(default)]
    pub common_day_cutoff: bool,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub top_neighborhoods: Option<usize>,
}

impl FilterSelection {
    pub fn validate(&self) -> Result<(), FilterError> {
        match self.months.iter().find(|month| !(1..=12).contains(*month)) {
            Some(&month) => Err(FilterError::InvalidMonth(month)),
            None => Ok(()),
        }
    }

    pub fn exclude_weekday(&mut self, weekday: Weekday) {
        if !self.excluded_weekdays.contains(&weekday) {
            self.excluded_weekdays.push(weekday);
        }
    }

    pub fn excludes_saturdays(&self) -> bool {
        self.excluded_weekdays.contains(&Weekday::Sat)
    }

    fn excludes(&self, date: NaiveDate) -> bool {
        self.excluded_weekdays.contains(&date.weekday())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("month {0} is outside the range 1-12")]
    InvalidMonth(u32),
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
}

/// Records that survived the date filters, plus what the cutoff resolved to.
#[derive(Debug, Clone)]
pub struct DateFiltered<'a> {
    pub records: Vec<&'a SchedulingRecord>,
    pub cutoff_day: Option<u32>,
    pub valid_days: usize,
}

/// Output of the full filter pipeline.
#[derive(Debug, Clone)]
pub struct FilteredRecords<'a> {
    /// Date-filtered set; feeds the valid-day count and the forecast.
    pub dated: DateFiltered<'a>,
    /// Date and dimension filtered set; feeds every other view.
    pub records: Vec<&'a SchedulingRecord>,
}

pub fn filter_records<'a>(
    records: &'a [SchedulingRecord],
    selection: &FilterSelection,
) -> FilteredRecords<'a> {
    let dated = apply_date_filters(records, selection);
    let records = apply_dimension_filters(&dated.records, selection);
    FilteredRecords { dated, records }
}

pub fn apply_date_filters<'a>(
    records: &'a [SchedulingRecord],
    selection: &FilterSelection,
) -> DateFiltered<'a> {
    let by_month: Vec<&SchedulingRecord> = records
        .iter()
        .filter(|record| in_selected_months(record, selection))
        .collect();

    let cutoff_day = if selection.common_day_cutoff {
        common_day_cutoff(by_month.iter().copied())
    } else {
        None
    };

    let records: Vec<&SchedulingRecord> = by_month
        .into_iter()
        .filter(|record| match record.completed_on {
            Some(date) => !selection.excludes(date),
            None => true,
        })
        .filter(|record| match cutoff_day {
            Some(cutoff) => record.day_of_month().is_some_and(|day| day <= cutoff),
            None => true,
        })
        .collect();

    let valid_days = count_valid_days(&records);

    DateFiltered {
        records,
        cutoff_day,
        valid_days,
    }
}

fn in_selected_months(record: &SchedulingRecord, selection: &FilterSelection) -> bool {
    match record.month() {
        Some(month) => selection.months.is_empty() || selection.months.contains(&month),
        None => selection.months.is_empty() && selection.include_undated,
    }
}

/// Smallest "latest day of month" across the (year, month) groups present.
/// `None` when no record carries a date.
pub fn common_day_cutoff<'a, I>(records: I) -> Option<u32>
where
    I: IntoIterator<Item = &'a SchedulingRecord>,
{
    let mut latest: BTreeMap<YearMonth, u32> = BTreeMap::new();
    for record in records {
        if let (Some(period), Some(day)) = (record.period(), record.day_of_month()) {
            let latest_day = latest.entry(period).or_insert(0);
            *latest_day = (*latest_day).max(day);
        }
    }
    latest.into_values().min()
}

pub fn apply_dimension_filters<'a>(
    records: &[&'a SchedulingRecord],
    selection: &FilterSelection,
) -> Vec<&'a SchedulingRecord> {
    records
        .iter()
        .copied()
        .filter(|record| matches_value(record.plan.as_deref(), selection.plan.as_deref()))
        .filter(|record| matches_value(record.city.as_deref(), selection.city.as_deref()))
        .filter(|record| {
            matches_value(
                record.neighborhood.as_deref(),
                selection.neighborhood.as_deref(),
            )
        })
        .collect()
}

fn matches_value(value: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted {
        Some(wanted) => value == Some(wanted),
        None => true,
    }
}

/// Distinct calendar dates present in the set.
pub fn count_valid_days(records: &[&SchedulingRecord]) -> usize {
    records
        .iter()
        .filter_map(|record| record.completed_on)
        .collect::<HashSet<_>>()
        .len()
}

/// Records per valid day; `None` when there are no valid days.
pub fn daily_average(total: usize, valid_days: usize) -> Option<f64> {
    if valid_days == 0 {
        None
    } else {
        Some(total as f64 / valid_days as f64)
    }
}

use super::domain::{SchedulingRecord, YearMonth};
use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Source of "today" for past/current month decisions.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthStatus {
    Complete,
    InProgress,
}

impl MonthStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Complete => "Complete",
            Self::InProgress => "In progress",
        }
    }
}

/// Month-end estimate for one (year, month) bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthForecast {
    pub period: YearMonth,
    pub label: String,
    pub status: MonthStatus,
    pub records: usize,
    pub collected_days: u32,
    pub expected_days: u32,
    pub daily_average: Option<f64>,
    pub projected_total: Option<u64>,
    pub is_past: bool,
}

impl MonthForecast {
    /// Applies the projection rules to already aggregated counts. Past months
    /// are treated as fully observed and keep their actual count.
    pub fn compute(
        period: YearMonth,
        records: usize,
        collected_days: u32,
        expected_days: u32,
        is_past: bool,
    ) -> Self {
        let collected_days = if is_past {
            expected_days
        } else {
            collected_days
        };

        let daily_average = if collected_days == 0 {
            None
        } else {
            Some(records as f64 / f64::from(collected_days))
        };

        // Projection uses the unrounded average.
        let projected_total = if is_past {
            Some(records as u64)
        } else {
            daily_average.map(|average| (average * f64::from(expected_days)).round_ties_even() as u64)
        };

        let status = if collected_days >= expected_days {
            MonthStatus::Complete
        } else {
            MonthStatus::InProgress
        };

        Self {
            period,
            label: period.label(),
            status,
            records,
            collected_days,
            expected_days,
            daily_average,
            projected_total,
            is_past,
        }
    }
}

/// Days in the month that are not Sundays.
pub fn expected_days(period: YearMonth) -> u32 {
    period
        .days()
        .filter(|date| date.weekday() != Weekday::Sun)
        .count() as u32
}

/// One bucket per (year, month) present among the dated records, oldest first.
pub fn forecast_months<'a, I>(records: I, clock: &dyn Clock) -> Vec<MonthForecast>
where
    I: IntoIterator<Item = &'a SchedulingRecord>,
{
    let mut buckets: BTreeMap<YearMonth, (usize, HashSet<NaiveDate>)> = BTreeMap::new();
    for record in records {
        if let (Some(period), Some(date)) = (record.period(), record.completed_on) {
            let (count, days) = buckets.entry(period).or_default();
            *count += 1;
            days.insert(date);
        }
    }

    let current = YearMonth::of(clock.today());
    buckets
        .into_iter()
        .map(|(period, (count, days))| {
            MonthForecast::compute(
                period,
                count,
                days.len() as u32,
                expected_days(period),
                period < current,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth { year, month }
    }

    fn dated(year: i32, month: u32, day: u32) -> SchedulingRecord {
        SchedulingRecord {
            completed_on: NaiveDate::from_ymd_opt(year, month, day),
            plan: Some("500 Mega".to_string()),
            city: None,
            neighborhood: None,
            technology: None,
            source: "test.xlsx".to_string(),
        }
    }

    #[test]
    fn expected_days_skip_sundays() {
        // September 2025 has four Sundays.
        assert_eq!(expected_days(ym(2025, 9)), 26);
        // June 2025 starts on a Sunday and has five.
        assert_eq!(expected_days(ym(2025, 6)), 25);
        assert_eq!(expected_days(ym(2026, 2)), 24);
    }

    #[test]
    fn past_month_is_treated_as_complete() {
        let bucket = MonthForecast::compute(ym(2025, 9), 20, 18, 26, true);
        assert_eq!(bucket.collected_days, 26);
        assert_eq!(bucket.projected_total, Some(20));
        assert_eq!(bucket.status, MonthStatus::Complete);
    }

    #[test]
    fn current_month_projects_from_daily_average() {
        let bucket = MonthForecast::compute(ym(2025, 10), 10, 5, 22, false);
        assert_eq!(bucket.daily_average, Some(2.0));
        assert_eq!(bucket.projected_total, Some(44));
        assert_eq!(bucket.status, MonthStatus::InProgress);
    }

    #[test]
    fn zero_collected_days_yield_no_projection() {
        let bucket = MonthForecast::compute(ym(2025, 10), 0, 0, 26, false);
        assert_eq!(bucket.daily_average, None);
        assert_eq!(bucket.projected_total, None);
        assert_eq!(bucket.status, MonthStatus::InProgress);
    }

    #[test]
    fn projection_uses_unrounded_average() {
        // 5/6 per day over 21 days is 17.5; a 0.83 average would give 17.
        let bucket = MonthForecast::compute(ym(2025, 10), 5, 6, 21, false);
        assert_eq!(bucket.projected_total, Some(18));
    }

    #[test]
    fn projection_rounds_half_to_even() {
        // 5 records over 2 days -> 2.5/day, 25 expected days -> 62.5.
        let bucket = MonthForecast::compute(ym(2025, 10), 5, 2, 25, false);
        assert_eq!(bucket.projected_total, Some(62));
    }

    #[test]
    fn buckets_follow_the_injected_clock() {
        let mut records: Vec<SchedulingRecord> = (1..=30)
            .filter(|day| {
                NaiveDate::from_ymd_opt(2025, 9, *day).map(|d| d.weekday()) != Some(Weekday::Sun)
            })
            .take(20)
            .map(|day| dated(2025, 9, day))
            .collect();
        records.extend((1..=5).flat_map(|day| [dated(2025, 10, day), dated(2025, 10, day)]));

        let clock = FixedClock(NaiveDate::from_ymd_opt(2025, 10, 6).expect("valid date"));
        let buckets = forecast_months(&records, &clock);
        assert_eq!(buckets.len(), 2);

        let september = &buckets[0];
        assert_eq!(september.period, ym(2025, 9));
        assert!(september.is_past);
        assert_eq!(september.records, 20);
        assert_eq!(september.collected_days, 26);
        assert_eq!(september.projected_total, Some(20));
        assert_eq!(september.status, MonthStatus::Complete);

        let october = &buckets[1];
        assert!(!october.is_past);
        assert_eq!(october.collected_days, 5);
        assert_eq!(october.daily_average, Some(2.0));
        assert_eq!(october.projected_total, Some(2 * u64::from(expected_days(ym(2025, 10)))));
        assert_eq!(october.label, "Outubro/2025");

        let later = FixedClock(NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid date"));
        let buckets = forecast_months(&records, &later);
        assert!(buckets.iter().all(|bucket| bucket.is_past));
        assert_eq!(buckets[1].projected_total, Some(10));
    }

    #[test]
    fn undated_records_are_ignored() {
        let mut undated = dated(2025, 9, 1);
        undated.completed_on = None;
        let clock = FixedClock(NaiveDate::from_ymd_opt(2025, 10, 6).expect("valid date"));
        assert!(forecast_months(&[undated], &clock).is_empty());
    }
}

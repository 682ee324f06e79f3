use super::tier::{categorize, PlanTier};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

/// One scheduling entry as read from a spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulingRecord {
    pub completed_on: Option<NaiveDate>,
    pub plan: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub technology: Option<String>,
    /// File name the row was read from.
    #[serde(skip)]
    pub source: String,
}

impl SchedulingRecord {
    pub fn tier(&self) -> PlanTier {
        self.plan.as_deref().map(categorize).unwrap_or_default()
    }

    pub fn period(&self) -> Option<YearMonth> {
        self.completed_on.map(YearMonth::of)
    }

    pub fn day_of_month(&self) -> Option<u32> {
        self.completed_on.map(|date| date.day())
    }

    pub fn month(&self) -> Option<u32> {
        self.completed_on.map(|date| date.month())
    }
}

/// Calendar month key used by the cutoff and the forecast buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Every calendar day of the month, in order.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        let month = self.month;
        self.first_day()
            .into_iter()
            .flat_map(|first| first.iter_days())
            .take_while(move |date| date.month() == month)
    }

    pub fn label(self) -> String {
        format!("{}/{}", month_name(self.month).unwrap_or("?"), self.year)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Portuguese month name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}

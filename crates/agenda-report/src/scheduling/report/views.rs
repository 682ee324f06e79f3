use super::super::filters::FilterSelection;
use super::super::forecast::MonthForecast;
use super::super::tier::PlanTier;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_records: usize,
    pub valid_days: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierShareEntry {
    pub tier: PlanTier,
    pub tier_label: &'static str,
    pub count: usize,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCountEntry {
    pub day: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRow {
    pub completed_on: Option<NaiveDate>,
    pub completed_on_label: String,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub plan: Option<String>,
    pub technology: Option<String>,
    pub tier: PlanTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthOption {
    pub month: u32,
    pub name: &'static str,
}

/// Values the filter widgets can offer, taken from the unfiltered data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub months: Vec<MonthOption>,
    pub plans: Vec<String>,
    pub cities: Vec<String>,
    pub neighborhoods: Vec<String>,
    /// Distinct neighborhoods left after filtering; upper bound of the display count.
    pub neighborhood_limit_max: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub today: NaiveDate,
    pub selection: FilterSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff_day: Option<u32>,
    pub neighborhood_limit: usize,
    pub metrics: DashboardMetrics,
    pub plan_distribution: Vec<CountEntry>,
    pub tier_distribution: Vec<TierShareEntry>,
    pub city_distribution: Vec<CountEntry>,
    pub neighborhood_distribution: Vec<CountEntry>,
    pub technology_distribution: Vec<CountEntry>,
    pub day_of_month: Vec<DayCountEntry>,
    pub records: Vec<RecordRow>,
    pub forecast: Vec<MonthForecast>,
    pub options: FilterOptions,
}

/// Fixed-point rendering with a decimal comma, e.g. `2,50`.
pub fn decimal_comma(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}").replace('.', ",")
}

/// Daily average as shown to people: two decimals or `n/a`.
pub fn display_average(value: Option<f64>) -> String {
    value
        .map(|average| decimal_comma(average, 2))
        .unwrap_or_else(|| "n/a".to_string())
}

pub mod domain;
pub mod export;
pub mod filters;
pub mod forecast;
pub mod report;
pub mod tier;

pub use domain::SchedulingRecord;
pub use filters::FilterSelection;
pub use forecast::{Clock, FixedClock, MonthForecast, SystemClock};
pub use report::{build_report, DashboardReport};
pub use tier::PlanTier;

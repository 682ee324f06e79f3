mod summary;
pub mod views;

pub use summary::{build_report, DEFAULT_NEIGHBORHOOD_LIMIT};
pub use views::DashboardReport;

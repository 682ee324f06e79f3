use crate::infra::dimension_value;
use crate::report::{run_export, run_report};
use crate::server;
use agenda_report::error::AppError;
use agenda_report::scheduling::filters::FilterError;
use agenda_report::scheduling::FilterSelection;
use chrono::{NaiveDate, Weekday};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Scheduling Records Dashboard",
    about = "Serve or print the scheduling records dashboard built from a spreadsheet folder",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the dashboard metrics, distributions and forecast as text
    Report(ReportArgs),
    /// Write the filtered records to a CSV file
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the spreadsheet directory (APP_DATA_DIR)
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
}

/// Filters shared by the `report` and `export` commands.
#[derive(Args, Debug, Default)]
pub(crate) struct FilterArgs {
    /// Spreadsheet directory (defaults to APP_DATA_DIR or `planilhas`)
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Month numbers to keep, e.g. `--months 9,10`
    #[arg(long, value_delimiter = ',')]
    pub(crate) months: Vec<u32>,
    /// Keep rows without a completion date (only when no month is given)
    #[arg(long)]
    pub(crate) include_undated: bool,
    /// Drop Saturday records
    #[arg(long)]
    pub(crate) exclude_saturdays: bool,
    /// Trim every month to the smallest latest day across months
    #[arg(long)]
    pub(crate) common_day_cutoff: bool,
    #[arg(long)]
    pub(crate) plan: Option<String>,
    #[arg(long)]
    pub(crate) city: Option<String>,
    #[arg(long)]
    pub(crate) neighborhood: Option<String>,
    /// How many neighborhoods to list (defaults to 10)
    #[arg(long)]
    pub(crate) top_neighborhoods: Option<usize>,
}

impl FilterArgs {
    pub(crate) fn selection(&self) -> Result<FilterSelection, FilterError> {
        let mut selection = FilterSelection {
            months: self.months.iter().copied().collect(),
            include_undated: self.include_undated,
            common_day_cutoff: self.common_day_cutoff,
            plan: dimension_value(self.plan.clone()),
            city: dimension_value(self.city.clone()),
            neighborhood: dimension_value(self.neighborhood.clone()),
            top_neighborhoods: self.top_neighborhoods,
            ..FilterSelection::default()
        };
        if self.exclude_saturdays {
            selection.exclude_weekday(Weekday::Sat);
        }
        selection.validate()?;
        Ok(selection)
    }
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// Evaluation date for the forecast (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Include the full record listing in the output
    #[arg(long)]
    pub(crate) list_records: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// Destination CSV file
    #[arg(long, default_value = agenda_report::scheduling::export::EXPORT_FILE_NAME)]
    pub(crate) out: PathBuf,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_report(args),
        Command::Export(args) => run_export(args),
    }
}

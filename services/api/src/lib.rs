mod cli;
mod infra;
mod page;
mod report;
mod routes;
mod server;

use agenda_report::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

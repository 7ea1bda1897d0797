mod cli;
mod infra;
mod report;
mod routes;
mod server;

use appraisal_comps::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

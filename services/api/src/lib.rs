mod cli;
mod infra;
mod routes;
mod server;

use nhif_enroll::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

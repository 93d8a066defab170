mod cli;
mod infra;
mod routes;
mod server;
mod terminal;

use noise_wizard::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

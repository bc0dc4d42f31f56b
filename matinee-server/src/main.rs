use colored::Colorize;
use log::{error, info};
use matinee_server::{logging, Config, ServerError};

#[tokio::main]
async fn main() {
    logging::init_logger();

    match run().await {
        Ok(()) => {}
        Err(err) => {
            error!(
                "{} Read the error below to troubleshoot the issue.",
                "Matinee failed to start!".bold().red()
            );
            error!("{err}");
            error!("{}", format!("Hint: {}", err.hint()).dimmed().italic());
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let config = Config::from_env()?;

    info!("Starting matinee on port {}...", config.port);
    matinee_server::run_server(config).await
}

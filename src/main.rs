mod pipeline;

use forecast_core::{AppError, Config};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = forecast_core::init() {
        eprintln!("{:#}", e);
    }

    match run().await {
        Ok(true) => {
            println!("Email successfully sent!");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("Email failed to send");
            ExitCode::FAILURE
        }
        Err(e) => {
            let detail = format!("{:#}", e);
            let error = AppError::classify(e);
            eprintln!("Error: {}", error.user_message());
            eprintln!("  {}", detail);
            ExitCode::from(2)
        }
    }
}

async fn run() -> anyhow::Result<bool> {
    let (config, _) = Config::load_validated()?;
    tracing::info!("Sending forecast for {} to {}", config.weather.location, config.mail.recipient);
    pipeline::run(&config).await
}

use std::{process::ExitCode, sync::Arc};

use alert_logger::{
    alertmanager_webhook_receiver::ReceiverState,
    clock::{Clock, SystemClock},
    log::{self, Logger},
    server,
    settings::{AuthToken, Settings},
    telemetry_endpoint::Metrics,
};
use anyhow::{Context, Result};

/// exit the complete program if one thread panics
fn setup_panic_handler() {
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));
}

/// the entry point of the program
#[tokio::main(flavor = "current_thread")]
pub async fn main() -> Result<ExitCode> {
    setup_panic_handler();

    let settings = Settings::load()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let level = log::parse_level(&settings.log_level)?;
    log::setup_logging(level, clock.clone()).context("could not setup logging")?;
    let logger = Logger::new(clock);

    let token = match AuthToken::new(settings.auth_token.clone()) {
        Ok(token) => token,
        Err(err) => {
            logger.fatal(&err.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let metrics = Metrics::new().context("failed to register metrics")?;
    let state = Arc::new(ReceiverState::new(token, logger, metrics));

    server::run(&settings, state).await?;

    Ok(ExitCode::SUCCESS)
}

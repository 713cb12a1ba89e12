use metar_daemon::{
    get_config_info, log_startup, setup_logger, CheckWxClient, InfluxWriter, Poller, SystemClock,
};
use slog::{error, info, warn, Logger};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    let cli = get_config_info()?;
    let logger = setup_logger(&cli);

    let config = match cli.into_agent_config() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            error!(logger, "Error: {}", err);
            // flush the async drain before exiting
            drop(logger);
            return Err(err.into());
        }
    };

    log_startup(&logger, &config);

    let source = Arc::new(CheckWxClient::new(logger.clone(), &config)?);
    let writer = Arc::new(InfluxWriter::new(logger.clone(), &config)?);

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(logger.clone(), shutdown.clone()));

    let poller = Poller::new(logger.clone(), config, source, writer, Arc::new(SystemClock));
    poller.run(shutdown).await;

    info!(logger, "METAR Daemon stopped");
    Ok(())
}

async fn wait_for_signal(logger: Logger, shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(logger, "could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(logger, "could not listen for ctrl-c: {}", e);
                return;
            }
        }
        _ = terminate => {}
    }
    info!(logger, "Received shutdown signal");
    shutdown.cancel();
}

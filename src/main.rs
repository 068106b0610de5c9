//! msgdispatch - send one notification through a configured channel.

use anyhow::Result;
use clap::Parser;
use msgdispatch::{app::App, cli::Cli, config::Settings, Context};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let settings = match Settings::load(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", settings.log_level);
    match settings.send_timeout_ms {
        Some(ms) => info!("Send Timeout: {}ms", ms),
        None => info!("Send Timeout: Disabled"),
    }
    info!("Require Receiver: {}", settings.require_receiver);
    info!("Channels: {}", settings.channels.len());
    info!("Default Mappings: {}", settings.defaults.len());
    info!("Templates: {}", settings.templates.len());
    info!("-------------------------------------------------------");

    let app = App::from_settings(&settings)?;

    let Some(msg) = cli.message() else {
        for channel in app.manager().get_channels() {
            info!(channel = %channel.name(), driver = %channel.driver_name(), kind = %channel.driver_type(), "Registered channel");
        }
        info!("No --content given; nothing to send.");
        app.shutdown();
        return Ok(());
    };

    // Ctrl-C cancels the in-flight send.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let ctx = Context::background().with_cancel(cancel_rx);

    let result = app.send(&ctx, &msg).await;
    app.shutdown();

    match result {
        Ok(()) => {
            info!("Message sent.");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Failed to send message");
            Err(e.into())
        }
    }
}

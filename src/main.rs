use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use gateway_console::tui_dashboard::TuiDashboard;
use gateway_console::{
    Config, ExpiringStore, GatewayApi, GatewayClient, MetricsCollector, SystemClock, ViewStateController, BUILD_INFO,
};

#[derive(Parser)]
#[command(name = "gateway-console")]
#[command(about = "Terminal dashboard for a multi-instance messaging gateway")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override the gateway base URL
    #[arg(long, env = "GATEWAY_BASE_URL")]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config).await?;
    if let Some(base_url) = cli.base_url {
        config.gateway.base_url = base_url;
    }
    config.validate()?;

    // The dashboard owns stdout, so logs go to a file.
    let _guard = init_logging(cli.debug, &config.dashboard.log_dir)?;
    info!("📡 {}", BUILD_INFO);
    info!("Starting with config: {} (gateway {})", cli.config, config.gateway.base_url);

    if let Some(parent) = Path::new(&config.storage.store_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let store = Arc::new(ExpiringStore::open(&config.storage.store_path, Arc::new(SystemClock))?);
    let metrics = Arc::new(MetricsCollector::new()?);
    let client: Arc<dyn GatewayApi> =
        Arc::new(GatewayClient::new(&config)?.with_metrics(Arc::clone(&metrics)));

    let mut controller =
        ViewStateController::new(config.session.clone(), store, client).with_metrics(metrics);
    let restore_error = match controller.restore().await {
        Ok(state) => {
            info!("✅ Restored session: {:?}", state);
            None
        }
        Err(e) => {
            error!("❌ Could not restore session: {}", e);
            Some(e)
        }
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut dashboard = TuiDashboard::new(config.dashboard.clone(), controller, restore_error, shutdown_rx)?;

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("📡 Received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    });

    dashboard.run().await?;
    info!("✅ Gateway console shutdown complete");
    Ok(())
}

fn init_logging(debug: bool, log_dir: &str) -> Result<WorkerGuard> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if debug {
        EnvFilter::new("gateway_console=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gateway_console=info,warn"))
    };

    let appender = tracing_appender::rolling::daily(log_dir, "gateway-console.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    Ok(guard)
}

use std::sync::Arc;

use clap::Parser;
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::{
    alerts::AlertDispatcher,
    config::read_config_file,
    notify::Notifier,
    scheduler::{MemoryTransitionTracker, MonitorContext, MonitoringScheduler, Recipients},
    store::{MemoryAlertStore, MemoryDeviceStore, MemoryLogStore},
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("vigil", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let device_store = Arc::new(MemoryDeviceStore::new());
    let log_store = Arc::new(MemoryLogStore::new());
    let alert_store = Arc::new(MemoryAlertStore::new());

    if let Some(devices) = config.devices {
        for device_config in devices {
            let device = device_config.into_device("local");
            info!("seeding device {} ({})", device.name, device.protocol);
            device_store.insert(device).await;
        }
    } else {
        warn!("config contains no devices, nothing will be monitored");
    }

    let recipients = match config.recipients {
        Some(recipients) => Recipients::from(recipients),
        None => Recipients::from_env(),
    };
    if recipients.channel().is_none() {
        warn!("no alert recipients configured, transitions will only be logged");
    }

    let client = reqwest::Client::new();
    let notifier = Notifier::from_env(&client);
    let dispatcher = Arc::new(AlertDispatcher::new(alert_store.clone(), notifier));

    let ctx = MonitorContext {
        device_store,
        log_store,
        tracker: Arc::new(MemoryTransitionTracker::new()),
        dispatcher,
        recipients,
    };

    let mut scheduler = MonitoringScheduler::new(ctx, config.retention.unwrap_or_default());
    let scheduled = scheduler.start().await?;
    info!("monitoring {scheduled} device(s), press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    scheduler.stop().await;

    Ok(())
}

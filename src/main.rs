use anyhow::{anyhow, Result};
use muezzin::config::{self, MuezzinConfig};
use muezzin::content::ContentProvider;
use muezzin::notify::{LogNotifier, Notifier, WebhookNotifier};
use muezzin::registry::GroupRegistry;
use muezzin::schedule;
use muezzin::scheduler::Scheduler;
use muezzin::store::ScheduleStore;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muezzin=info".into()),
        )
        .init();

    info!("Muezzin starting...");

    let config_path =
        std::env::var("MUEZZIN_CONFIG").unwrap_or_else(|_| "muezzin.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        info!(path = %config_path, "Loading configuration");
        config::load_config(&config_path)
            .map_err(|e| anyhow!("failed to load config '{}': {}", config_path, e))?
    } else {
        info!(path = %config_path, "No configuration file, using defaults");
        let config = MuezzinConfig::default();
        config.validate()?;
        config
    };

    // Recover persisted state (entities + fire records); a missing or
    // corrupt store is a cold start, never an error
    let store = ScheduleStore::new(config.store.path.clone());
    let document = store.load();

    let registry = Arc::new(GroupRegistry::new(
        config.calculation.default_coordinates()?,
    ));
    registry.load_from(document.entities);
    for entity_id in &config.registry.seed_entities {
        registry.ensure_registered(entity_id);
    }

    let notifier: Arc<dyn Notifier> = if config.notifier.webhook_url.is_empty() {
        info!("No webhook URL configured, notifications go to the log");
        Arc::new(LogNotifier)
    } else {
        info!(url = %config.notifier.webhook_url, "Using webhook notifier");
        Arc::new(WebhookNotifier::new(&config.notifier))
    };

    let content = Arc::new(ContentProvider::new(&config.content));
    let definitions = schedule::build_definitions(&config.scheduler, &config.broadcast)?;

    let scheduler = Scheduler::new(
        registry,
        store,
        notifier,
        content,
        definitions,
        &config,
    )
    .with_fire_records(document.fire_records);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(async move { scheduler.run_tick_loop(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, letting the in-flight tick finish");
    let _ = shutdown_tx.send(true);

    loop_handle.await??;
    info!("Muezzin stopped");

    Ok(())
}

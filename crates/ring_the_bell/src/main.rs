use std::{sync::Arc, time::Duration};

use color_eyre::eyre::Context as _;
use jiff::SignedDuration;
use migration::{Migrator, MigratorTrait as _};
use reqwest::redirect::Policy;
use ring_the_bell::{
    actor::sweeper::subscription_sweeper,
    blocklist::Blocklist,
    callbacks::{CallbackRegistry, register_sponsor_detection},
    config::Config,
    hub::HubClient,
    llm::LlmClient,
    queue::QueueClient,
    quota::QuotaManager,
    subscription::SubscriptionManager,
    web::{WebState, web_server},
    worker::{WorkerContext, enrichment_worker, queue_reaper, sponsor_worker},
    youtube::YouTubeApi,
};
use sea_orm::{ConnectOptions, Database};
use tokio::signal::unix::SignalKind;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(ErrorLayer::default())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let client = reqwest::ClientBuilder::new()
        .redirect(Policy::none())
        .timeout(Duration::from_secs(30))
        .build()
        .wrap_err("unable to setup reqwest client")?;

    let mut connect_options = ConnectOptions::new(&config.database_url);
    connect_options
        .max_connections(25)
        .min_connections(5)
        .idle_timeout(Duration::from_secs(30 * 60))
        .max_lifetime(Duration::from_secs(60 * 60));

    let database = Database::connect(connect_options)
        .await
        .wrap_err("unable to open database")?;

    // Apply all pending migrations
    Migrator::up(&database, None).await?;

    let redis_client = redis::Client::open(config.redis_url.connection_string())
        .wrap_err("unable to configure redis client")?;
    let redis = redis_client
        .get_connection_manager()
        .await
        .wrap_err("unable to connect to redis")?;

    let queue = QueueClient::new(redis.clone());

    let blocklist = Blocklist::new(database.clone(), redis);
    blocklist
        .sync()
        .await
        .wrap_err("initial blocklist load failed")?;

    let quota = QuotaManager::new(
        database.clone(),
        config.daily_quota_limit,
        config.quota_threshold_percent,
    );

    let hub = HubClient::new(
        client.clone(),
        config.hub_url.clone(),
        config.callback_url.clone(),
    );
    let subscriptions = SubscriptionManager::new(
        database.clone(),
        hub,
        config.callback_url.clone(),
        config.hub_url.clone(),
        config.webhook_secret.clone(),
        config.lease_seconds,
    );

    let callbacks = Arc::new(CallbackRegistry::new());
    if config.sponsor_detection_enabled {
        register_sponsor_detection(&callbacks);
    }

    let youtube = config
        .youtube_api_key
        .clone()
        .map(|api_key| YouTubeApi::new(client.clone(), api_key));
    let llm = config
        .llm
        .clone()
        .map(|llm| LlmClient::new(client.clone(), llm));

    let worker_context = WorkerContext {
        database: database.clone(),
        queue: queue.clone(),
        quota,
        youtube,
        llm,
        callbacks,
        batch_size: config.enrich_batch_size,
    };

    let web_state = WebState {
        database: database.clone(),
        queue: queue.clone(),
        blocklist: blocklist.clone(),
        webhook_secret: Arc::from(config.webhook_secret.as_str()),
        enrichment_enabled: config.enrichment_enabled,
    };

    let shutdown = CancellationToken::new();
    let tasks = TaskTracker::new();

    let mut web_server_task = tasks.spawn(web_server(
        shutdown.clone(),
        web_state,
        config.listen_addr,
    ));

    if config.enrichment_enabled {
        for worker_index in 0..config.enrichment_workers {
            tasks.spawn(enrichment_worker(
                shutdown.clone(),
                worker_context.clone(),
                worker_index,
            ));
        }
    }
    if config.sponsor_detection_enabled {
        for worker_index in 0..config.sponsor_workers {
            tasks.spawn(sponsor_worker(
                shutdown.clone(),
                worker_context.clone(),
                worker_index,
            ));
        }
    }

    tasks.spawn(queue_reaper(shutdown.clone(), database.clone(), queue));
    tasks.spawn(subscription_sweeper(
        shutdown.clone(),
        subscriptions,
        SignedDuration::from_secs(config.renewal_margin_seconds),
    ));
    tasks.spawn(blocklist.sync_loop(shutdown.clone()));

    // Shutdown signals
    let mut sigint_task = tokio::signal::unix::signal(SignalKind::interrupt())
        .wrap_err("unable to install SIGINT handler")?;
    let mut sigterm_task = tokio::signal::unix::signal(SignalKind::terminate())
        .wrap_err("unable to install SIGTERM handler")?;

    let mut shutdown_signal = async move || {
        tokio::select! {
            Some(_) = sigint_task.recv() => {
                tracing::info!("Received signal INTERRUPT");
            },
            Some(_) = sigterm_task.recv() => {
                tracing::info!("Received signal TERMINATE");
            },
        }
    };

    tokio::select! {
        result = &mut web_server_task => tracing::error!(?result, "web server task exited"),
        _ = shutdown_signal() => tracing::warn!("User requested exit"),
    }

    shutdown.cancel();
    tasks.close();

    tracing::info!("Performing clean shutdown");

    // Wait for clean shutdown, the drain deadline, or a second interrupt
    tokio::select! {
        () = tasks.wait() => tracing::info!("exited gracefully"),
        _ = tokio::time::sleep(Duration::from_secs(30)) => tracing::warn!("shutdown deadline exceeded, aborting"),
        _ = shutdown_signal() => tracing::warn!("user sent second exit request during clean shutown"),
    }

    Ok(())
}

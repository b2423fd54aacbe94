//! Office Stretch - A break-reminder timer served over HTTP
//!
//! This is the main entry point for the office-stretch application.

use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::info;

use office_stretch::{
    api::create_router,
    config::Config,
    services::{
        BroadcastSink, Clock, DesktopNotifier, FileStore, LogNotifier, MemoryStore, Notifier,
        Persistence, SystemClock, WeeklyUsageLimiter,
    },
    state::{app_state::BREAK_CHANNEL_CAPACITY, AppState},
    tasks::{countdown_task, wake_up_recovery_task},
    timer::{BreakTimer, Collaborators},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("office_stretch={},tower_http=info", config.log_level()))
        .init();

    info!("Starting office-stretch server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, interval={}min, data_dir={}",
        config.host,
        config.port,
        config.interval,
        config.data_dir.display()
    );

    let store: Arc<dyn Persistence> = if config.ephemeral {
        info!("Ephemeral mode, nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::open(&config.data_dir)?)
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier: Arc<dyn Notifier> = if config.no_desktop_notifications {
        Arc::new(LogNotifier::new())
    } else {
        Arc::new(DesktopNotifier::new("office-stretch", true))
    };

    let (break_tx, _) = broadcast::channel(BREAK_CHANNEL_CAPACITY);
    let sink = Arc::new(BroadcastSink::new(break_tx.clone(), Arc::clone(&clock)));

    let mut deps = Collaborators::new(Arc::clone(&clock), Arc::clone(&store), notifier, sink);
    if let Some(limit) = config.weekly_limit {
        info!("Weekly usage limit: {} breaks", limit);
        deps = deps.with_limiter(Arc::new(WeeklyUsageLimiter::new(
            limit,
            Arc::clone(&store),
            Arc::clone(&clock),
        )));
    }

    // Restore settings and any countdown that was running before the restart
    let timer = BreakTimer::restore(deps, config.user_id.clone(), config.default_settings());
    info!("Timer restored in phase {:?}", timer.phase());

    let state = Arc::new(AppState::new(
        timer,
        break_tx,
        config.port,
        config.host.clone(),
    ));

    // Start the background tasks
    let countdown_state = Arc::clone(&state);
    tokio::spawn(async move {
        countdown_task(countdown_state).await;
    });

    let wake_state = Arc::clone(&state);
    tokio::spawn(async move {
        wake_up_recovery_task(wake_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start                - Start or resume the countdown");
    info!("  POST /timer/pause                - Pause the countdown");
    info!("  POST /timer/reset                - Reset to a full interval");
    info!("  POST /timer/snooze               - Snooze the break for N minutes");
    info!("  POST /timer/cancel-snooze        - End the snooze, break now");
    info!("  POST /break                      - Take a break right now");
    info!("  GET  /settings, PUT /settings    - Read or edit the schedule");
    info!("  POST /notifications/permission   - Ask for notification rights");
    info!("  GET  /status                     - Timer status and server info");
    info!("  GET  /status/events              - Live timer status (server-sent)");
    info!("  GET  /events                     - Break events (server-sent)");
    info!("  GET  /health                     - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use relay_node::config::LoggingConfig;
use relay_node::{ApiChannel, Debouncer, Dispatcher, EventEnvelope, RelayConfig, Sender};
use relay_protocol::Arbiter;

/// Shared per-process state for the event pipeline
struct AppState {
    config: RelayConfig,
    dispatcher: Dispatcher,
    debouncer: Debouncer,
    arbiter: Arbiter<Arc<ApiChannel>>,
    sender: Sender,
}

type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from file if available, otherwise use defaults
    let (config, config_note) = match RelayConfig::from_file("config/default") {
        Ok(config) => (config, "loaded from config/default.toml"),
        Err(_) => (RelayConfig::default(), "file not found, using defaults"),
    };

    init_tracing(&config.logging);
    info!("Starting Relay Node v{}", env!("CARGO_PKG_VERSION"));
    info!(note = config_note, "Configuration ready");

    config.validate().context("Invalid configuration")?;

    // The HTTP channel is built once and shared by the arbiter and the
    // reply path; there is no process-global client.
    let api = Arc::new(ApiChannel::new(&config.api).context("Failed to build API channel")?);
    let arbiter = Arbiter::new(Arc::clone(&api));
    let sender = Sender::new(Arc::clone(&api));

    let dispatcher = Dispatcher::new(&config.dispatch.enabled_platforms)
        .context("Failed to build dispatch table")?;
    info!(routes = dispatcher.route_count(), "Dispatch table built");

    let debouncer = Debouncer::new(std::time::Duration::from_secs(
        config.debounce.interval_seconds,
    ));

    let bind = format!(
        "{}:{}",
        config.webhook.bind_address, config.webhook.bind_port
    );
    let state: SharedState = Arc::new(AppState {
        config,
        dispatcher,
        debouncer,
        arbiter,
        sender,
    });

    let app = Router::new()
        .route("/event", post(receive_event))
        .with_state(state);

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind webhook listener on {bind}"))?;
    info!(address = %bind, "Webhook listener started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Webhook server failed")?;

    info!("Relay node stopped");
    Ok(())
}

fn init_tracing(config: &LoggingConfig) {
    let default_filter = format!(
        "relay_node={level},relay_protocol={level}",
        level = config.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install shutdown handler");
        return;
    }
    info!("Shutdown signal received");
}

/// Accept an event from the platform adapter and process it off the
/// request path. The adapter only needs an acknowledgement; everything
/// interesting happens in the spawned pipeline.
async fn receive_event(
    State(state): State<SharedState>,
    Json(envelope): Json<EventEnvelope>,
) -> StatusCode {
    tokio::spawn(process_event(state, envelope));
    StatusCode::NO_CONTENT
}

async fn process_event(state: SharedState, envelope: EventEnvelope) {
    if !envelope.is_message() {
        return;
    }

    // Share cards carry their URL in the card payload, not in the text.
    let Some(text) = envelope.relay_text() else {
        return;
    };

    let Some(hit) = state.dispatcher.matched(&text) else {
        return;
    };
    debug!(platform = hit.platform, link = %hit.link, "link matched");

    // Group messages are observed by every deployed bot instance, so the
    // expensive reply work is gated on winning the arbitration round.
    // Private chats have a single receiver and skip straight through.
    if envelope.is_group() {
        let Some(ctx) = envelope.arbitration_context() else {
            debug!("event unsuitable for arbitration, skipping");
            return;
        };

        let round = Uuid::new_v4();
        let span = tracing::info_span!("arbitration", %round, resource = %ctx.resource);
        let won = state.arbiter.compete(&ctx).instrument(span).await;
        if !won {
            debug!(%round, "lost arbitration, skipping relay");
            return;
        }
        debug!(%round, "won arbitration");
    } else if !state.config.dispatch.handle_private_chats {
        return;
    }

    let session = envelope.session();

    if state.debouncer.hit_link(&session, &hit.link) {
        warn!(%session, link = %hit.link, "link seen recently, suppressed");
        return;
    }
    if state.debouncer.hit_resource(&session, &hit.resource) {
        warn!(%session, resource = %hit.resource, "resource seen recently, suppressed");
        return;
    }

    if let Err(e) = state.sender.send_hit(&envelope, &hit).await {
        error!(error = %e, resource = %hit.resource, "failed to send relay reply");
    }
}

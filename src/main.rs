use billboard_client::{ConnectionConfig, ConnectionManager, RealtimeService, WsConnector};

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Demo consumer: connect to a billboard server, log everything it streams.
///
/// BILLBOARD_WS_URL sets the server base URL, BILLBOARD_LOCATION_ID scopes
/// the connection to one location.
#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = ConnectionConfig {
        base_url: std::env::var("BILLBOARD_WS_URL")
            .unwrap_or_else(|_| "ws://localhost:3000".into()),
        ..Default::default()
    };
    let location_id = std::env::var("BILLBOARD_LOCATION_ID").ok();

    info!("Billboard client starting");
    info!("  server: {}", config.base_url);
    if let Some(id) = &location_id {
        info!("  location: {}", id);
    }

    let service = RealtimeService::new(ConnectionManager::new(config, WsConnector::new()));

    let _status_sub = service.on_connection_status_change(|status| {
        if status.is_connected {
            info!("Billboard is LIVE");
        } else if status.is_connecting {
            info!("Connecting...");
        } else if let Some(error) = &status.error {
            error!("Connection failed: {}", error);
        } else {
            warn!("Billboard is OFFLINE");
        }
    });

    // A rejected dial does not auto-retry, so the demo keeps asking until
    // the server is reachable.
    while let Err(e) = service.connect(location_id.as_deref()).await {
        error!("Connect failed, retrying in 5s: {}", e);
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    }

    let mut subs = Vec::new();
    subs.push(service.on_new_check_in(|update| {
        info!("Check-in: {:?}", update.check_in);
    }));
    subs.push(service.on_state_update(|update| {
        info!("State update: {:?}", update.state);
    }));
    subs.push(service.on_notification_update(|n| {
        info!("Notification [{}]: {}", n.kind, n.message);
    }));
    subs.push(service.on_billboard_state_change(|state| {
        info!("Billboard state: {:?}", state);
    }));
    subs.push(service.on_security_code_added(|ev| {
        info!("Security code added: {} (event {})", ev.code, ev.event_id);
    }));
    subs.push(service.on_security_code_removed(|ev| {
        info!("Security code removed: {} (event {})", ev.code, ev.event_id);
    }));
    subs.push(service.on_billboard_launched(|control| {
        info!(
            "Billboard launched: {} at {} ({} codes)",
            control.event_name,
            control.location_name,
            control.security_codes.len()
        );
    }));
    subs.push(service.on_billboard_cleared(|cleared| {
        info!("Billboard cleared (event {})", cleared.event_id);
    }));

    if let Some(id) = &location_id {
        service.subscribe_to_location(id);
    }
    service.subscribe_to_notifications();
    service.subscribe_to_billboard_state();

    tokio::signal::ctrl_c().await.ok();
    info!("Shutting down");
    service.disconnect().await;
}

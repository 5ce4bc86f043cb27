// WebSocket status stream: current view on connect, then one message per published snapshot

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, timeout};

use super::{AppState, StatusView};
use crate::aggregator::Aggregator;
use crate::models::StatusSnapshot;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_status(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let aggregator = state.aggregator.clone();
    ws.on_upgrade(move |socket| async move {
        let mut rx = aggregator.subscribe();
        if let Err(e) = stream_status(socket, &mut rx, aggregator).await {
            tracing::info!("Status stream error: {}", e);
        }
    })
}

async fn send_view(socket: &mut WebSocket, view: &StatusView) -> anyhow::Result<bool> {
    let json = serde_json::to_string(view)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

async fn stream_status(
    mut socket: WebSocket,
    rx: &mut watch::Receiver<Arc<StatusSnapshot>>,
    aggregator: Arc<Aggregator>,
) -> anyhow::Result<()> {
    tracing::info!("Client connected to status stream");

    let current = rx.borrow_and_update().clone();
    if !send_view(&mut socket, &StatusView::of(&aggregator, current)).await? {
        return Ok(());
    }

    let mut ping_interval =
        tokio::time::interval_at(tokio::time::Instant::now() + WS_PING_INTERVAL, WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                if !send_view(&mut socket, &StatusView::of(&aggregator, snapshot)).await? {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("Status stream closed");
    Ok(())
}

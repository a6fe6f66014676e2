use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.ride_events_tx.subscribe();

    info!("ride event subscriber connected");

    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "ride event subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize ride event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    run_until_first(send_task, recv_task).await;

    info!("ride event subscriber disconnected");
}

/// Waits for either task to finish and aborts the other.
async fn run_until_first(mut left: JoinHandle<()>, mut right: JoinHandle<()>) {
    tokio::select! {
        _ = &mut left => right.abort(),
        _ = &mut right => left.abort(),
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::run_until_first;

    #[tokio::test]
    async fn finishing_task_aborts_the_other() {
        let (tx, rx) = oneshot::channel::<()>();

        let quick = tokio::spawn(async {});
        let stuck = tokio::spawn(async move {
            let _held = tx;
            std::future::pending::<()>().await;
        });

        run_until_first(quick, stuck).await;

        // the aborted task drops its sender
        assert!(rx.await.is_err());
    }
}

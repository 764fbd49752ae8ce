use crate::bridge::run_turn;
use crate::error::{handle_error, AppError};
use crate::types::AppState;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// JSON frame sent back over the voice stream.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum BridgeReply {
    Text {
        response: String,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

/// Task that forwards binary audio frames from the caller to the turn loop.
/// It never waits on the turn loop: frames that arrive while the queue is
/// full are dropped, so a close is always seen and cancels the in-flight turn.
pub async fn receive_audio(
    mut stream: SplitStream<WebSocket>,
    audio_sink: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let res = loop {
        match stream.next().await {
            Some(Ok(Message::Binary(audio))) => {
                debug!(bytes = audio.len(), "got audio frame");
                match audio_sink.try_send(audio) {
                    Ok(()) => (),
                    Err(TrySendError::Full(dropped)) => {
                        warn!(bytes = dropped.len(), "turn queue full, dropping audio frame");
                    }
                    Err(TrySendError::Closed(_)) => break Ok(()),
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                info!("end of voice stream");
                break Ok(());
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => (),
            Some(Ok(m)) => {
                warn!(message=?m, "unsupported message type on voice stream");
            }
            Some(Err(e)) => {
                error!(error=%e, "failed to receive voice stream message");
                break Err(AppError::Unknown(e.to_string()));
            }
        }
    };
    cancel.cancel();
    res
}

/// Run one audio turn: transcribe, relay to the assistant, shape the reply.
pub async fn audio_turn(
    app_state: &AppState,
    assistant_id: &str,
    thread_id: &str,
    audio: Vec<u8>,
    cancel: &CancellationToken,
) -> BridgeReply {
    let result = async {
        if audio.is_empty() {
            return Err(AppError::Validation("empty audio frame"));
        }
        let transcript = app_state.assistant.transcribe(audio).await?;
        debug!(transcript=%transcript, "transcribed caller audio");
        run_turn(
            app_state.assistant.as_ref(),
            assistant_id,
            thread_id,
            &transcript,
            app_state.poll_policy,
            cancel,
        )
        .await
    }
    .await;

    match result {
        Ok(Some(response)) => BridgeReply::Text { response },
        Ok(None) => BridgeReply::Error {
            error: "Received non-text response".to_string(),
            details: None,
        },
        Err(e) => {
            handle_error(&e);
            BridgeReply::Error {
                error: "Failed to process audio".to_string(),
                details: Some(e.public_message()),
            }
        }
    }
}

/// Task that answers each audio frame in order until the receiver closes.
pub async fn answer_audio(
    mut audio_stream: mpsc::Receiver<Vec<u8>>,
    mut sink: SplitSink<WebSocket, Message>,
    assistant_id: String,
    thread_id: String,
    app_state: Arc<AppState>,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    while let Some(audio) = audio_stream.recv().await {
        if cancel.is_cancelled() {
            debug!("caller left, dropping queued audio");
            break;
        }
        let reply = audio_turn(&app_state, &assistant_id, &thread_id, audio, &cancel).await;
        if cancel.is_cancelled() {
            debug!("caller left before the reply was ready");
            break;
        }
        let json = serde_json::to_string(&reply).map_err(|e| AppError::Unknown(e.to_string()))?;
        sink.send(Message::Text(json)).await.map_err(|e| {
            error!(error=%e, "failed to send reply on voice stream");
            AppError::Unknown(e.to_string())
        })?;
    }
    let _ = sink.close().await;
    Ok(())
}

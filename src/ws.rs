//! Autoreload WebSocket: pushes build status to connected browsers.

use crate::serve;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;

/// (outgoing) communication messages with the websocket
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    Reload,
    BuildFailure { reason: String },
}

/// The most recent build outcome, observed by every connected client.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BuildState {
    #[default]
    Ok,
    Failed {
        reason: String,
    },
}

/// The autoreload client, served at `/_gantry/autoreload.js` and referenced
/// from built HTML in serve mode.
pub(crate) const AUTORELOAD_JS: &str = r#"(function () {
  'use strict';
  var url = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '/_gantry/ws';
  function connect() {
    var socket = new WebSocket(url);
    socket.onmessage = function (event) {
      var msg = JSON.parse(event.data);
      if (msg.type === 'reload') {
        location.reload();
      } else if (msg.type === 'buildFailure') {
        console.error('[gantry] build failed:', msg.data.reason);
      }
    };
    socket.onclose = function () {
      setTimeout(connect, 1000);
    };
  }
  connect();
})();
"#;

pub(crate) async fn handle_ws(mut ws: WebSocket, state: Arc<serve::State>) {
    let mut changes = WatchStream::new(state.ws_state.clone());
    tracing::debug!("autoreload websocket opened");

    // The watch stream yields the current state immediately; a fresh client
    // must not reload right after connecting, though a failed state is still
    // worth showing after a reconnect.
    let mut first = true;

    loop {
        tokio::select! {
            msg = ws.recv() => {
                match msg {
                    Some(Ok(Message::Close(reason))) => {
                        tracing::debug!("received close from browser: {reason:?}");
                        let _ = ws.send(Message::Close(reason)).await;
                        let _ = ws.close().await;
                        return;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(msg)) => {
                        tracing::debug!("ignoring message from browser: {msg:?}");
                    }
                    Some(Err(err)) => {
                        tracing::debug!("autoreload websocket closed: {err}");
                        return;
                    }
                    None => {
                        tracing::debug!("lost websocket");
                        return;
                    }
                }
            }
            change = changes.next() => {
                let Some(change) = change else {
                    tracing::debug!("build status channel closed");
                    return;
                };

                let msg = match change {
                    BuildState::Ok if first => None,
                    BuildState::Ok => Some(ClientMessage::Reload),
                    BuildState::Failed { reason } => Some(ClientMessage::BuildFailure { reason }),
                };
                first = false;

                if let Some(msg) = msg {
                    if let Ok(text) = serde_json::to_string(&msg) {
                        if let Err(err) = ws.send(Message::Text(text.into())).await {
                            tracing::debug!("autoreload websocket failed to send: {err}");
                            break;
                        }
                    }
                }
            }
        }
    }

    tracing::debug!("exiting WS handler");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_tagged_wire_format() {
        let reload = serde_json::to_string(&ClientMessage::Reload).expect("serializable");
        assert_eq!(reload, r#"{"type":"reload"}"#);

        let failure = serde_json::to_string(&ClientMessage::BuildFailure {
            reason: "boom".into(),
        })
        .expect("serializable");
        assert_eq!(failure, r#"{"type":"buildFailure","data":{"reason":"boom"}}"#);
    }
}

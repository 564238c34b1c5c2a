//! Local print bridge client
//!
//! The bridge is a machine-resident helper process exposing the host's
//! printers over a local WebSocket. Frames are JSON objects; requests
//! carry a correlation id and the matching response echoes it back, so
//! concurrent callers can share the single connection. A call whose
//! response never arrives is rejected after a timeout and its pending
//! entry removed, never left to hang the workflow.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

/// Quick ack window for the liveness check; many bridge builds never
/// answer it, so it is much shorter than the default call timeout.
const STATUS_ACK_TIMEOUT: Duration = Duration::from_millis(1200);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<BridgeFrame>>>>;

/// An incoming bridge frame. Unsolicited frames (no id) are logged and
/// dropped.
#[derive(Debug, Deserialize)]
pub struct BridgeFrame {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("could not reach the print bridge: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("print bridge rejected the request: {0}")]
    Rejected(String),

    #[error("timed out waiting for the print bridge")]
    Timeout,

    #[error("print bridge connection closed mid-call")]
    Disconnected,

    #[error("malformed bridge frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where a ZPL job should land: a logical printer name, a raw network
/// address, or both (the bridge picks the address when present).
#[derive(Debug, Clone, Default)]
pub struct ZplTarget {
    pub printer: Option<String>,
    pub addr: Option<(String, u16)>,
}

/// Reusable handle to the local print bridge. Cheap to share; the
/// underlying connection is established lazily and reused across calls.
pub struct PrintBridge {
    url: String,
    timeout: Duration,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    pending: PendingMap,
}

impl PrintBridge {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            timeout,
            sink: tokio::sync::Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// List the printers known to the host.
    pub async fn list_printers(&self) -> Result<Vec<String>, BridgeError> {
        let frame = self
            .send_and_wait("list-printers", Map::new(), self.timeout)
            .await?;
        let printers = frame
            .extra
            .get("printers")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(printers)
    }

    /// Print one base64 ZPL payload to the given target.
    pub async fn print_zpl(&self, zpl_base64: &str, target: &ZplTarget) -> Result<(), BridgeError> {
        let mut payload = Map::new();
        payload.insert("zpl_base64".into(), json!(zpl_base64));
        if let Some((ip, port)) = &target.addr {
            payload.insert("ip".into(), json!(ip));
            payload.insert("port".into(), json!(port));
        }
        if let Some(printer) = &target.printer {
            payload.insert("printer".into(), json!(printer));
        }
        self.send_and_wait("print-zpl", payload, self.timeout).await?;
        Ok(())
    }

    /// Print one base64 PDF document to a named printer (bridge default
    /// when `None`).
    pub async fn print_pdf(
        &self,
        pdf_base64: &str,
        printer: Option<&str>,
    ) -> Result<(), BridgeError> {
        let mut payload = Map::new();
        payload.insert("pdf_base64".into(), json!(pdf_base64));
        if let Some(printer) = printer {
            payload.insert("printer".into(), json!(printer));
        }
        self.send_and_wait("print-pdf", payload, self.timeout).await?;
        Ok(())
    }

    /// Liveness check. An open socket with a missing ack still counts as
    /// alive; only a failed connection or an explicit `ok: false` counts
    /// as dead.
    pub async fn check_status(&self) -> bool {
        if self.ensure_connected().await.is_err() {
            return false;
        }
        match self
            .send_and_wait("check-status", Map::new(), STATUS_ACK_TIMEOUT)
            .await
        {
            Ok(frame) => frame.ok != Some(false),
            Err(BridgeError::Timeout) => true,
            Err(_) => false,
        }
    }

    async fn ensure_connected(&self) -> Result<(), BridgeError> {
        let mut guard = self.sink.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let (ws, _) = connect_async(self.url.as_str()).await?;
        tracing::debug!(url = %self.url, "print bridge connected");
        let (sink, mut stream) = ws.split();

        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<BridgeFrame>(&text) {
                        Ok(frame) => {
                            let correlated = frame
                                .id
                                .as_ref()
                                .and_then(|id| pending.lock().unwrap().remove(id));
                            match correlated {
                                Some(tx) => {
                                    let _ = tx.send(frame);
                                }
                                None => {
                                    tracing::debug!(kind = %frame.kind, "unsolicited bridge frame")
                                }
                            }
                        }
                        Err(_) => tracing::debug!("non-JSON bridge frame dropped"),
                    },
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "print bridge read error");
                        break;
                    }
                }
            }
            // Connection gone: dropping the senders rejects every
            // in-flight call.
            pending.lock().unwrap().clear();
            tracing::debug!("print bridge reader stopped");
        });

        *guard = Some(sink);
        Ok(())
    }

    /// Send one correlated request frame and wait for the response with
    /// the same id.
    async fn send_and_wait(
        &self,
        kind: &str,
        mut payload: Map<String, Value>,
        timeout: Duration,
    ) -> Result<BridgeFrame, BridgeError> {
        self.ensure_connected().await?;

        let id = Uuid::new_v4().simple().to_string();
        payload.insert("id".into(), json!(id));
        payload.insert("type".into(), json!(kind));
        let text = serde_json::to_string(&Value::Object(payload))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id.clone(), tx);

        {
            let mut guard = self.sink.lock().await;
            let sink = guard.as_mut().ok_or(BridgeError::Disconnected)?;
            if let Err(e) = sink.send(Message::Text(text)).await {
                // Drop the broken sink so the next call reconnects.
                *guard = None;
                self.pending.lock().unwrap().remove(&id);
                return Err(BridgeError::Connect(e));
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(frame)) => {
                if frame.ok == Some(false) {
                    Err(BridgeError::Rejected(
                        frame.error.unwrap_or_else(|| "bridge error".to_string()),
                    ))
                } else {
                    Ok(frame)
                }
            }
            Ok(Err(_)) => Err(BridgeError::Disconnected),
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(BridgeError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_parses_with_extras() {
        let frame: BridgeFrame = serde_json::from_str(
            r#"{"id": "abc", "type": "list-printers", "printers": ["Zebra ZD420", "EPSON WF-3820"]}"#,
        )
        .unwrap();
        assert_eq!(frame.id.as_deref(), Some("abc"));
        assert_eq!(frame.kind, "list-printers");
        assert_eq!(frame.ok, None);
        assert_eq!(
            frame.extra.get("printers").and_then(Value::as_array).map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn frame_without_id_is_unsolicited() {
        let frame: BridgeFrame =
            serde_json::from_str(r#"{"type": "status", "ok": true}"#).unwrap();
        assert!(frame.id.is_none());
        assert_eq!(frame.ok, Some(true));
    }
}

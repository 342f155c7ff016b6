//! JSON-Lines Host Bridge
//!
//! Lets a host UI process drive the router over a pair of byte streams
//! (stdin/stdout in the binary). One JSON object per line in each direction.
//!
//! # Host → engine
//!
//! Router commands (`{"type":"relativeMotion","dx":3,"dy":-1}`), surface
//! bookkeeping (`activeSurface`, `settings`), and replies to probe requests:
//!
//! ```text
//! {"type":"probeReply","seq":7,"result":{"editable":true}}
//! {"type":"probeReply","seq":8,"error":"navigated"}
//! ```
//!
//! # Engine → host
//!
//! ```text
//! {"kind":"notification","event":{"type":"cursorMoved","x":640,"y":400}}
//! {"kind":"request","seq":7,"target":{"surface":"content","id":"..."},"request":{"op":"probe",...}}
//! ```
//!
//! Pointer and key replays are fire-and-forget; probe requests expect a
//! `probeReply` with the same `seq`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::input::cursor::InputMode;
use crate::input::keyboard::KeyEvent;
use crate::input::mouse::MouseButton;
use crate::input::routing::SurfaceTarget;
use crate::mirror::probe::ProbeScript;
use crate::server::{InputRouter, Notification, RouterCommand};
use crate::surface::{
    KeyReplay, PointerReplay, SettingsSnapshot, SharedSettings, SurfaceBridge, SurfaceError,
    SurfaceId,
};

/// Longest accepted host line
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Message from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    /// Raw relative pointer delta
    RelativeMotion {
        /// Horizontal delta
        dx: f64,
        /// Vertical delta
        dy: f64,
    },
    /// Place the virtual cursor
    SetCursor {
        /// Chrome x
        x: f64,
        /// Chrome y
        y: f64,
    },
    /// Switch input mode
    SetInputMode {
        /// New mode
        mode: InputMode,
    },
    /// Flip input mode
    ToggleInputMode,
    /// Button pressed
    PointerDown {
        /// Button
        #[serde(default)]
        button: MouseButton,
    },
    /// Button released
    PointerUp {
        /// Button
        #[serde(default)]
        button: MouseButton,
    },
    /// Full click
    Click {
        /// Button
        #[serde(default)]
        button: MouseButton,
    },
    /// Wheel scroll
    Wheel {
        /// Horizontal delta
        #[serde(default)]
        dx: f64,
        /// Vertical delta
        #[serde(default)]
        dy: f64,
    },
    /// Key pressed
    KeyDown(KeyEvent),
    /// Key released
    KeyUp(KeyEvent),
    /// Overlay text changed
    CommitMirrorValue {
        /// New text
        value: String,
    },
    /// Overlay submit
    SubmitMirror,
    /// Overlay blur, Escape, or navigation
    DeactivateMirror,
    /// Chrome band height changed
    SetUiOffset {
        /// New height
        offset: f64,
    },
    /// Window resized
    ResizeWindow {
        /// New width
        width: f64,
        /// New height
        height: f64,
    },
    /// Content surface shown or hidden
    SetContentVisible {
        /// Visibility
        visible: bool,
    },
    /// A surface settled after a click
    SurfaceSettled {
        /// Surface
        target: SurfaceTarget,
    },
    /// Active tab changed
    ActiveSurface {
        /// New active page surface
        #[serde(default)]
        id: Option<SurfaceId>,
    },
    /// Settings changed (flat key/value map)
    Settings {
        /// All settings
        values: Map<String, Value>,
    },
    /// Result of a probe request
    ProbeReply {
        /// Request sequence number
        seq: u64,
        /// Script result
        #[serde(default)]
        result: Value,
        /// Script or surface error
        #[serde(default)]
        error: Option<String>,
    },
    /// Stop the engine
    Shutdown,
}

impl HostMessage {
    /// Router command for this message, if it is one
    pub fn into_command(self) -> Option<RouterCommand> {
        let command = match self {
            Self::RelativeMotion { dx, dy } => RouterCommand::RelativeMotion { dx, dy },
            Self::SetCursor { x, y } => RouterCommand::SetCursor { x, y },
            Self::SetInputMode { mode } => RouterCommand::SetInputMode(mode),
            Self::ToggleInputMode => RouterCommand::ToggleInputMode,
            Self::PointerDown { button } => RouterCommand::PointerDown(button),
            Self::PointerUp { button } => RouterCommand::PointerUp(button),
            Self::Click { button } => RouterCommand::Click(button),
            Self::Wheel { dx, dy } => RouterCommand::Wheel { dx, dy },
            Self::KeyDown(event) => RouterCommand::KeyDown(event),
            Self::KeyUp(event) => RouterCommand::KeyUp(event),
            Self::CommitMirrorValue { value } => RouterCommand::CommitMirrorValue(value),
            Self::SubmitMirror => RouterCommand::SubmitMirror,
            Self::DeactivateMirror => RouterCommand::DeactivateMirror,
            Self::SetUiOffset { offset } => RouterCommand::SetUiOffset(offset),
            Self::ResizeWindow { width, height } => RouterCommand::ResizeWindow { width, height },
            Self::SetContentVisible { visible } => RouterCommand::SetContentVisible(visible),
            Self::SurfaceSettled { target } => RouterCommand::SurfaceSettled(target),
            Self::ActiveSurface { .. }
            | Self::Settings { .. }
            | Self::ProbeReply { .. }
            | Self::Shutdown => return None,
        };
        Some(command)
    }
}

/// Line written to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Router notification
    Notification {
        /// The notification
        event: Notification,
    },
    /// Surface operation for the host to perform
    Request {
        /// Sequence number (echoed in `probeReply`)
        seq: u64,
        /// Surface to act on
        target: SurfaceTarget,
        /// Operation
        request: BridgeRequest,
    },
}

/// Surface operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum BridgeRequest {
    /// Replay a pointer event
    Pointer {
        /// Event
        event: PointerReplay,
    },
    /// Replay a key event
    Key {
        /// Event
        event: KeyReplay,
    },
    /// Run a script and reply with its result
    Probe {
        /// Script name (for host logs)
        name: &'static str,
        /// JavaScript source
        script: String,
    },
}

type ProbeReplySender = oneshot::Sender<Result<Value, SurfaceError>>;

/// [`SurfaceBridge`] that forwards every operation to the host as a line
pub struct StdioBridge {
    outbound: mpsc::Sender<OutboundMessage>,
    pending: Mutex<HashMap<u64, ProbeReplySender>>,
    next_seq: AtomicU64,
    active: RwLock<Option<SurfaceId>>,
    closed: AtomicBool,
}

impl StdioBridge {
    /// Create a bridge writing to `outbound`
    pub fn new(outbound: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            active: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Record the host's active page surface; true if it changed
    pub fn set_active_surface(&self, id: Option<SurfaceId>) -> bool {
        debug!("Active surface: {:?}", id);
        let previous = std::mem::replace(&mut *self.active.write(), id);
        previous != id
    }

    /// Complete a probe request; false if `seq` is unknown
    pub fn resolve(&self, seq: u64, result: Value, error: Option<String>) -> bool {
        let Some(reply) = self.pending.lock().remove(&seq) else {
            return false;
        };
        let outcome = match error {
            Some(error) => Err(host_error(error)),
            None => Ok(result),
        };
        let _ = reply.send(outcome);
        true
    }

    /// Fail every outstanding probe and any later one (host went away)
    pub fn fail_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let pending: Vec<_> = self.pending.lock().drain().collect();
        if !pending.is_empty() {
            debug!("Failing {} outstanding probe requests", pending.len());
        }
        for (_, reply) in pending {
            let _ = reply.send(Err(SurfaceError::Transport("host closed".to_string())));
        }
    }

    /// Requests awaiting a reply
    pub fn outstanding(&self) -> usize {
        self.pending.lock().len()
    }

    fn seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    async fn post(&self, target: SurfaceTarget, request: BridgeRequest) -> Result<u64, SurfaceError> {
        let seq = self.seq();
        self.outbound
            .send(OutboundMessage::Request {
                seq,
                target,
                request,
            })
            .await
            .map_err(|_| SurfaceError::Transport("outbound channel closed".to_string()))?;
        Ok(seq)
    }
}

fn host_error(error: String) -> SurfaceError {
    match error.as_str() {
        "navigated" | "navigatedAway" => SurfaceError::NavigatedAway,
        "unavailable" => SurfaceError::Unavailable,
        _ => SurfaceError::Script(error),
    }
}

#[async_trait]
impl SurfaceBridge for StdioBridge {
    fn active_content_surface(&self) -> Option<SurfaceId> {
        *self.active.read()
    }

    async fn replay_pointer_event(
        &self,
        target: SurfaceTarget,
        event: PointerReplay,
    ) -> Result<(), SurfaceError> {
        self.post(target, BridgeRequest::Pointer { event }).await.map(|_| ())
    }

    async fn replay_key_event(&self, target: SurfaceTarget, event: KeyReplay) -> Result<(), SurfaceError> {
        self.post(target, BridgeRequest::Key { event }).await.map(|_| ())
    }

    async fn execute_probe(
        &self,
        target: SurfaceTarget,
        script: ProbeScript,
    ) -> Result<Value, SurfaceError> {
        let seq = self.seq();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(seq, tx);
        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().remove(&seq);
            return Err(SurfaceError::Transport("host closed".to_string()));
        }

        let request = BridgeRequest::Probe {
            name: script.name(),
            script: script.to_js(),
        };
        let sent = self
            .outbound
            .send(OutboundMessage::Request {
                seq,
                target,
                request,
            })
            .await;
        if sent.is_err() {
            self.pending.lock().remove(&seq);
            return Err(SurfaceError::Transport("outbound channel closed".to_string()));
        }

        rx.await
            .map_err(|_| SurfaceError::Transport("reply dropped".to_string()))?
    }
}

/// Serve a host over `reader`/`writer` until EOF or `shutdown`
///
/// Shuts the router down before returning and flushes everything it queued.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    router: InputRouter,
    bridge: Arc<StdioBridge>,
    settings: Arc<SharedSettings>,
    outbound_rx: mpsc::Receiver<OutboundMessage>,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let handle = router.handle();
    let outbound = bridge.outbound.clone();
    let stop_writer = CancellationToken::new();

    let writer_task = tokio::spawn(write_lines(writer, outbound_rx, stop_writer.clone()));
    let forwarder = tokio::spawn(forward_notifications(handle.subscribe(), outbound));

    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut received = 0u64;

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Skipping unreadable host line: {}", e);
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        received += 1;

        let message = match serde_json::from_str::<HostMessage>(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring malformed host message: {}", e);
                continue;
            }
        };

        match message {
            HostMessage::ProbeReply { seq, result, error } => {
                if !bridge.resolve(seq, result, error) {
                    debug!("Reply for unknown probe request {}", seq);
                }
            }
            HostMessage::ActiveSurface { id } => {
                let changed = bridge.set_active_surface(id);
                if changed && handle.content_surface_changed().await.is_err() {
                    break;
                }
            }
            HostMessage::Settings { values } => {
                settings.replace(SettingsSnapshot::from_json_map(&values));
                if handle.reload_settings().await.is_err() {
                    break;
                }
            }
            HostMessage::Shutdown => {
                info!("Host requested shutdown");
                break;
            }
            other => {
                let Some(command) = other.into_command() else {
                    continue;
                };
                if handle.send(command).await.is_err() {
                    warn!("Router closed, stopping host bridge");
                    break;
                }
            }
        }
    }

    info!("Host bridge closing after {} messages", received);
    bridge.fail_all();
    drop(handle);
    router.shutdown().await;
    forwarder.abort();
    stop_writer.cancel();

    match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(anyhow::anyhow!("Writer task failed: {}", e)),
    }
}

async fn forward_notifications(
    mut notifications: broadcast::Receiver<Notification>,
    outbound: mpsc::Sender<OutboundMessage>,
) {
    loop {
        match notifications.recv().await {
            Ok(event) => {
                if outbound
                    .send(OutboundMessage::Notification { event })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Host bridge lagged, {} notifications skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn write_lines<W>(
    writer: W,
    mut outbound: mpsc::Receiver<OutboundMessage>,
    stop: CancellationToken,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, LinesCodec::new());
    loop {
        let message = tokio::select! {
            biased;
            message = outbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
            _ = stop.cancelled() => break,
        };
        let line = serde_json::to_string(&message)?;
        trace!("-> {}", line);
        sink.send(line).await?;
    }
    SinkExt::<String>::flush(&mut sink).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn test_host_message_parsing() {
        let msg: HostMessage =
            serde_json::from_str(r#"{"type":"keyDown","key":"t","ctrl":true}"#).unwrap();
        let Some(RouterCommand::KeyDown(event)) = msg.into_command() else {
            panic!("expected keyDown");
        };
        assert!(event.modifiers.ctrl);

        let msg: HostMessage = serde_json::from_str(r#"{"type":"click"}"#).unwrap();
        assert_eq!(
            msg,
            HostMessage::Click {
                button: MouseButton::Left
            }
        );

        let msg: HostMessage =
            serde_json::from_str(r#"{"type":"probeReply","seq":3,"error":"navigated"}"#).unwrap();
        assert!(msg.into_command().is_none());
    }

    #[test]
    fn test_active_surface_change_detection() {
        let (tx, _rx) = mpsc::channel(1);
        let bridge = StdioBridge::new(tx);
        let tab = SurfaceId::new_v4();

        assert!(bridge.set_active_surface(Some(tab)));
        assert!(!bridge.set_active_surface(Some(tab)));
        assert_eq!(bridge.active_content_surface(), Some(tab));
        assert!(bridge.set_active_surface(None));
        assert_eq!(bridge.active_content_surface(), None);
    }

    #[tokio::test]
    async fn test_probe_round_trip() {
        let (tx, mut rx) = mpsc::channel(4);
        let bridge = Arc::new(StdioBridge::new(tx));

        let probe = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move {
                bridge
                    .execute_probe(SurfaceTarget::Chrome, ProbeScript::HitTest { x: 1.0, y: 2.0 })
                    .await
            })
        };

        let Some(OutboundMessage::Request { seq, request, .. }) = rx.recv().await else {
            panic!("expected a request");
        };
        assert!(matches!(request, BridgeRequest::Probe { name: "hit-test", .. }));
        assert_eq!(bridge.outstanding(), 1);

        assert!(bridge.resolve(seq, json!({"editable": false}), None));
        assert_eq!(probe.await.unwrap(), Ok(json!({"editable": false})));
        assert!(!bridge.resolve(seq, Value::Null, None));
    }

    #[tokio::test]
    async fn test_host_errors_and_shutdown_fail_pending() {
        let (tx, mut rx) = mpsc::channel(4);
        let bridge = Arc::new(StdioBridge::new(tx));

        let first = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move {
                bridge
                    .execute_probe(SurfaceTarget::Chrome, ProbeScript::Submit {
                        id: crate::mirror::ProbeRequestId(1),
                    })
                    .await
            })
        };
        let Some(OutboundMessage::Request { seq, .. }) = rx.recv().await else {
            panic!("expected a request");
        };
        bridge.resolve(seq, Value::Null, Some("navigated".to_string()));
        assert_eq!(first.await.unwrap(), Err(SurfaceError::NavigatedAway));

        let second = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move {
                bridge
                    .execute_probe(SurfaceTarget::Chrome, ProbeScript::Release {
                        id: crate::mirror::ProbeRequestId(1),
                    })
                    .await
            })
        };
        rx.recv().await.unwrap();
        bridge.fail_all();
        assert!(matches!(second.await.unwrap(), Err(SurfaceError::Transport(_))));

        let late = bridge
            .execute_probe(SurfaceTarget::Chrome, ProbeScript::HitTest { x: 0.0, y: 0.0 })
            .await;
        assert!(matches!(late, Err(SurfaceError::Transport(_))));
        assert_eq!(bridge.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_serve_over_duplex() {
        let config = Config::default_config();
        let settings = Arc::new(SharedSettings::new(SettingsSnapshot::from_config(&config)));
        let (out_tx, out_rx) = mpsc::channel(64);
        let bridge = Arc::new(StdioBridge::new(out_tx));
        let router = InputRouter::spawn(&config, bridge.clone(), settings.clone());

        let (mut host_in, engine_in) = tokio::io::duplex(4096);
        let (engine_out, host_out) = tokio::io::duplex(4096);
        let server = tokio::spawn(serve(engine_in, engine_out, router, bridge, settings, out_rx));

        host_in
            .write_all(b"{\"type\":\"setInputMode\",\"mode\":\"virtual\"}\nnot json\n")
            .await
            .unwrap();

        let mut lines = BufReader::new(host_out).lines();
        let mut saw_mode = false;
        while let Ok(Ok(Some(line))) =
            tokio::time::timeout(std::time::Duration::from_secs(2), lines.next_line()).await
        {
            let value: Value = serde_json::from_str(&line).unwrap();
            if value["kind"] == "notification" && value["event"]["type"] == "inputModeChanged" {
                assert_eq!(value["event"]["mode"], "virtual");
                saw_mode = true;
                break;
            }
        }
        assert!(saw_mode);

        host_in.write_all(b"{\"type\":\"shutdown\"}\n").await.unwrap();
        server.await.unwrap().unwrap();
    }
}

//! Input Router
//!
//! Orchestrates the input subsystems: one task owns every piece of shared
//! state and is reachable only through [`RouterHandle`].
//!
//! # Architecture
//!
//! ```text
//! InputRouter
//!   ├─> Router task (cursor, mode, zones, buttons, shortcuts, mirror)
//!   ├─> Surface dispatcher (replays and mirror scripts, FIFO)
//!   └─> Probe tasks (one per completed click, cancellable)
//! ```
//!
//! # Data Flow
//!
//! **Pointer:** handle → router → cursor + routing → dispatcher → surface
//!
//! **Click:** handle → router → dispatcher (release) → probe task → router → mirror
//!
//! **Keys:** handle → router → shortcut matcher → (consumed | dispatcher → surface)
//!
//! # Threading Model
//!
//! - **Router task:** sole owner of state; no locks
//! - **Dispatcher task:** awaits the surface bridge so the router never does
//! - **Probe tasks:** report back over an internal channel; results are
//!   checked against the pending request id before use
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use radiant_input::config::Config;
//! use radiant_input::server::InputRouter;
//! use radiant_input::surface::{SettingsSnapshot, SurfaceBridge};
//!
//! # async fn example(bridge: Arc<dyn SurfaceBridge>) -> anyhow::Result<()> {
//! let config = Config::default_config();
//! let settings = Arc::new(SettingsSnapshot::from_config(&config));
//! let router = InputRouter::spawn(&config, bridge, settings);
//!
//! let handle = router.handle();
//! let mut notifications = handle.subscribe();
//! handle.toggle_input_mode().await?;
//! handle.relative_motion(100.0, 0.0).await?;
//! let first = notifications.recv().await?;
//! println!("{:?}", first);
//!
//! router.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod events;
mod focus;
mod router_loop;

pub use events::{Notification, RouterCommand, RouterSnapshot, RouterStats};

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::input::cursor::InputMode;
use crate::input::error::{InputError, Result};
use crate::input::keyboard::KeyEvent;
use crate::input::mouse::MouseButton;
use crate::input::routing::SurfaceTarget;
use crate::surface::{SettingsStore, SurfaceBridge};

use dispatch::DispatchQueue;
use router_loop::RouterLoop;

/// Running router
pub struct InputRouter {
    handle: RouterHandle,
    router_task: JoinHandle<()>,
    dispatcher_task: JoinHandle<()>,
}

impl InputRouter {
    /// Start the router and its dispatcher
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        config: &Config,
        bridge: Arc<dyn SurfaceBridge>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let throttle = &config.throttle;
        let (command_tx, command_rx) = mpsc::channel(throttle.command_queue.max(1));
        let (probe_tx, probe_rx) = mpsc::channel(8);
        let (notifications, _) = broadcast::channel(throttle.notification_capacity.max(1));

        let (dispatch, dispatcher_task) =
            DispatchQueue::spawn(Arc::clone(&bridge), throttle.dispatch_queue);

        let router = RouterLoop::new(
            config,
            bridge,
            settings,
            dispatch,
            notifications.clone(),
            probe_tx,
        );
        let router_task = tokio::spawn(router.run(command_rx, probe_rx));

        Self {
            handle: RouterHandle {
                commands: command_tx,
                notifications,
            },
            router_task,
            dispatcher_task,
        }
    }

    /// A handle for sending commands
    pub fn handle(&self) -> RouterHandle {
        self.handle.clone()
    }

    /// Stop the router and wait for queued replays to drain
    pub async fn shutdown(self) {
        let _ = self.handle.commands.send(RouterCommand::Shutdown).await;
        drop(self.handle);

        if let Err(e) = self.router_task.await {
            warn!("Router task ended abnormally: {}", e);
        }
        if let Err(e) = self.dispatcher_task.await {
            warn!("Dispatcher task ended abnormally: {}", e);
        }
        debug!("Input router shut down");
    }
}

/// Cloneable entry point into the router
#[derive(Debug, Clone)]
pub struct RouterHandle {
    commands: mpsc::Sender<RouterCommand>,
    notifications: broadcast::Sender<Notification>,
}

impl RouterHandle {
    /// Send a raw command
    pub async fn send(&self, command: RouterCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| InputError::RouterClosed)
    }

    /// Receive notifications sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Apply a raw relative pointer delta
    pub async fn relative_motion(&self, dx: f64, dy: f64) -> Result<()> {
        self.send(RouterCommand::RelativeMotion { dx, dy }).await
    }

    /// Place the virtual cursor
    pub async fn set_cursor(&self, x: f64, y: f64) -> Result<()> {
        self.send(RouterCommand::SetCursor { x, y }).await
    }

    /// Switch input mode
    pub async fn set_input_mode(&self, mode: InputMode) -> Result<()> {
        self.send(RouterCommand::SetInputMode(mode)).await
    }

    /// Flip input mode
    pub async fn toggle_input_mode(&self) -> Result<()> {
        self.send(RouterCommand::ToggleInputMode).await
    }

    /// Press a button at the cursor
    pub async fn pointer_down(&self, button: MouseButton) -> Result<()> {
        self.send(RouterCommand::PointerDown(button)).await
    }

    /// Release a button at the cursor
    pub async fn pointer_up(&self, button: MouseButton) -> Result<()> {
        self.send(RouterCommand::PointerUp(button)).await
    }

    /// Click at the cursor
    pub async fn click(&self, button: MouseButton) -> Result<()> {
        self.send(RouterCommand::Click(button)).await
    }

    /// Scroll at the cursor
    pub async fn wheel(&self, dx: f64, dy: f64) -> Result<()> {
        self.send(RouterCommand::Wheel { dx, dy }).await
    }

    /// Key pressed
    pub async fn key_down(&self, event: KeyEvent) -> Result<()> {
        self.send(RouterCommand::KeyDown(event)).await
    }

    /// Key released
    pub async fn key_up(&self, event: KeyEvent) -> Result<()> {
        self.send(RouterCommand::KeyUp(event)).await
    }

    /// Push overlay text into the tracked element
    pub async fn commit_mirror_value(&self, value: impl Into<String>) -> Result<()> {
        self.send(RouterCommand::CommitMirrorValue(value.into())).await
    }

    /// Submit the tracked element's form
    pub async fn submit_mirror(&self) -> Result<()> {
        self.send(RouterCommand::SubmitMirror).await
    }

    /// Hide the mirror and restore the tracked element
    pub async fn deactivate_mirror(&self) -> Result<()> {
        self.send(RouterCommand::DeactivateMirror).await
    }

    /// Change the chrome band height
    pub async fn set_ui_offset(&self, offset: f64) -> Result<()> {
        self.send(RouterCommand::SetUiOffset(offset)).await
    }

    /// Report a window resize
    pub async fn resize_window(&self, width: f64, height: f64) -> Result<()> {
        self.send(RouterCommand::ResizeWindow { width, height }).await
    }

    /// Show or hide the content surface
    pub async fn set_content_visible(&self, visible: bool) -> Result<()> {
        self.send(RouterCommand::SetContentVisible(visible)).await
    }

    /// Report that a surface settled after a click
    pub async fn surface_settled(&self, target: SurfaceTarget) -> Result<()> {
        self.send(RouterCommand::SurfaceSettled(target)).await
    }

    /// Drop content-side probe and mirror after a tab switch
    ///
    /// Call after the bridge reports a different active page surface.
    pub async fn content_surface_changed(&self) -> Result<()> {
        self.send(RouterCommand::ContentSurfaceChanged).await
    }

    /// Re-read the settings store
    pub async fn reload_settings(&self) -> Result<()> {
        self.send(RouterCommand::ReloadSettings).await
    }

    /// Copy of the router state
    pub async fn snapshot(&self) -> Result<RouterSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(RouterCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| InputError::RouterClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::coordinates::CursorPoint;
    use crate::surface::{MockSurfaceBridge, SettingsSnapshot, SurfaceId};
    use serde_json::json;
    use std::time::Duration;

    fn router(bridge: MockSurfaceBridge) -> InputRouter {
        let config = Config::default_config();
        let settings = Arc::new(SettingsSnapshot::from_config(&config));
        InputRouter::spawn(&config, Arc::new(bridge), settings)
    }

    async fn next_matching<F>(rx: &mut broadcast::Receiver<Notification>, mut pred: F) -> Notification
    where
        F: FnMut(&Notification) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(n) if pred(&n) => return n,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("router closed"),
                }
            }
        })
        .await
        .expect("notification timed out")
    }

    #[tokio::test]
    async fn test_native_mode_replays_nothing() {
        let mut bridge = MockSurfaceBridge::new();
        bridge.expect_active_content_surface().returning(|| None);
        bridge.expect_replay_pointer_event().never();
        bridge.expect_replay_key_event().never();

        let router = router(bridge);
        let handle = router.handle();
        handle.click(MouseButton::Left).await.unwrap();
        handle
            .key_down(KeyEvent::new("a", Default::default()))
            .await
            .unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.mode, InputMode::Native);
        assert_eq!(snapshot.pending_probe, None);
        router.shutdown().await;
    }

    #[tokio::test]
    async fn test_shortcut_consumed_in_virtual_mode() {
        let mut bridge = MockSurfaceBridge::new();
        bridge.expect_active_content_surface().returning(|| None);
        bridge.expect_replay_key_event().never();

        let router = router(bridge);
        let handle = router.handle();
        let mut rx = handle.subscribe();
        handle.set_input_mode(InputMode::Virtual).await.unwrap();

        let ctrl_t = KeyEvent::new("t", crate::input::keyboard::KeyModifiers::ctrl());
        let meta_t = KeyEvent::new("t", crate::input::keyboard::KeyModifiers::meta());
        let primary = if crate::input::shortcuts::Platform::current()
            == crate::input::shortcuts::Platform::MacOs
        {
            meta_t
        } else {
            ctrl_t
        };
        handle.key_down(primary.clone()).await.unwrap();
        handle.key_up(primary).await.unwrap();

        let n = next_matching(&mut rx, |n| matches!(n, Notification::ShortcutTriggered { .. })).await;
        assert_eq!(
            n,
            Notification::ShortcutTriggered {
                action: "newTab".to_string()
            }
        );
        assert_eq!(handle.snapshot().await.unwrap().stats.shortcuts, 1);
        router.shutdown().await;
    }

    #[tokio::test]
    async fn test_mirror_lifecycle_with_mock_bridge() {
        let surface = SurfaceId::new_v4();
        let mut bridge = MockSurfaceBridge::new();
        bridge.expect_active_content_surface().returning(move || Some(surface));
        bridge.expect_replay_pointer_event().returning(|_, _| Ok(()));
        bridge.expect_execute_probe().returning(|_, script| {
            Ok(match script {
                crate::mirror::ProbeScript::HitTest { .. } => json!({"editable": true}),
                crate::mirror::ProbeScript::Track { .. } => json!({
                    "x": 10.0, "y": 4.0, "width": 100.0, "height": 20.0, "value": "", "style": {}
                }),
                _ => json!(true),
            })
        });

        let router = router(bridge);
        let handle = router.handle();
        let mut rx = handle.subscribe();
        handle.set_input_mode(InputMode::Virtual).await.unwrap();
        handle.set_cursor(300.0, 150.0).await.unwrap();
        handle.click(MouseButton::Left).await.unwrap();
        handle
            .surface_settled(SurfaceTarget::Content(surface))
            .await
            .unwrap();

        let shown = next_matching(&mut rx, |n| matches!(n, Notification::MirrorShown(_))).await;
        let Notification::MirrorShown(desc) = shown else {
            unreachable!()
        };
        assert!(desc.is_active);
        assert_eq!(desc.y, 100.0);
        assert_eq!(desc.target, SurfaceTarget::Content(surface));

        handle.commit_mirror_value("abc").await.unwrap();
        handle.deactivate_mirror().await.unwrap();
        handle.deactivate_mirror().await.unwrap();

        let hidden = next_matching(&mut rx, |n| matches!(n, Notification::MirrorHidden { .. })).await;
        assert_eq!(hidden, Notification::MirrorHidden { id: desc.id });

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.mirror.is_none());
        assert_eq!(snapshot.cursor, CursorPoint::new(300.0, 150.0));
        router.shutdown().await;
    }

    #[tokio::test]
    async fn test_closed_router_reports_error() {
        let mut bridge = MockSurfaceBridge::new();
        bridge.expect_active_content_surface().returning(|| None);
        let router = router(bridge);
        let handle = router.handle();
        router.shutdown().await;

        assert!(matches!(
            handle.toggle_input_mode().await,
            Err(InputError::RouterClosed)
        ));
    }
}

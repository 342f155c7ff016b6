//! Router Event Loop
//!
//! The single task that owns the virtual cursor, input mode, routing zones,
//! button state, pending probe and active mirror. Commands arrive over one
//! bounded channel and are applied strictly in order; probe completions
//! arrive over a second internal channel; a fixed tick flushes coalesced
//! cursor broadcasts and throttled move replays.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::input::coordinates::{CursorPoint, WindowBounds};
use crate::input::cursor::{InputMode, VirtualCursor};
use crate::input::error::{log_recovered, InputError, RecoveryAction};
use crate::input::keyboard::KeyEvent;
use crate::input::mouse::{ButtonTracker, MouseButton};
use crate::input::routing::{RouteDecision, RoutingEngine, SurfaceTarget};
use crate::input::shortcuts::ShortcutMatcher;
use crate::mirror::probe::{ProbeIdGenerator, ProbeOutcome, ProbeRequestId, ProbeScript};
use crate::mirror::synchronizer::{MirrorSynchronizer, MirrorUpdate, TextMirrorDescriptor};
use crate::performance::{BroadcastCoalescer, ReplayThrottle};
use crate::server::dispatch::{DispatchJob, DispatchQueue};
use crate::server::events::{
    Notification, ProbeCompletion, RouterCommand, RouterSnapshot, RouterStats,
};
use crate::server::focus::{spawn_probe, ProbeTask, SettlePolicy};
use crate::surface::{KeyKind, KeyReplay, PointerReplay, SettingsStore, SurfaceBridge};

/// Probe in flight
struct PendingProbe {
    id: ProbeRequestId,
    target: SurfaceTarget,
    cancel: CancellationToken,
    settle: Option<oneshot::Sender<()>>,
}

/// Router state, confined to the router task
pub(crate) struct RouterLoop {
    cursor: VirtualCursor,
    routing: RoutingEngine,
    matcher: ShortcutMatcher,
    buttons: ButtonTracker,
    mirror: MirrorSynchronizer,
    coalescer: BroadcastCoalescer,
    /// Window-space positions; routed when the replay goes out
    move_throttle: ReplayThrottle<CursorPoint>,

    /// Keys whose keydown matched a shortcut; their keyup is swallowed too
    consumed_keys: HashSet<String>,
    /// Keys whose keydown was replayed, and where
    held_keys: HashMap<String, SurfaceTarget>,

    probe_ids: ProbeIdGenerator,
    pending_probe: Option<PendingProbe>,
    settle: SettlePolicy,

    bridge: Arc<dyn SurfaceBridge>,
    settings: Arc<dyn SettingsStore>,
    dispatch: DispatchQueue,
    notifications: broadcast::Sender<Notification>,
    probe_done: mpsc::Sender<ProbeCompletion>,

    tick_interval: Duration,
    stats: RouterStats,
}

impl RouterLoop {
    pub(crate) fn new(
        config: &Config,
        bridge: Arc<dyn SurfaceBridge>,
        settings: Arc<dyn SettingsStore>,
        dispatch: DispatchQueue,
        notifications: broadcast::Sender<Notification>,
        probe_done: mpsc::Sender<ProbeCompletion>,
    ) -> Self {
        let bounds = WindowBounds::new(config.window.width, config.window.height);
        let cursor = VirtualCursor::new(bounds, settings.sensitivity(), settings.invert_mouse());
        let matcher = ShortcutMatcher::new(settings.shortcut_table(), config.platform());

        Self {
            cursor,
            routing: RoutingEngine::new(config.routing.ui_offset, config.routing.content_visible),
            matcher,
            buttons: ButtonTracker::new(config.input.click_slop_px),
            mirror: MirrorSynchronizer::new(),
            coalescer: BroadcastCoalescer::new(),
            move_throttle: ReplayThrottle::new(Duration::from_millis(
                config.throttle.move_replay_interval_ms,
            )),
            consumed_keys: HashSet::new(),
            held_keys: HashMap::new(),
            probe_ids: ProbeIdGenerator::new(),
            pending_probe: None,
            settle: SettlePolicy {
                wait_for_ack: config.focus.wait_for_settle,
                fallback: Duration::from_millis(config.focus.probe_settle_fallback_ms),
            },
            bridge,
            settings,
            dispatch,
            notifications,
            probe_done,
            tick_interval: Duration::from_millis(config.throttle.broadcast_interval_ms.max(1)),
            stats: RouterStats::default(),
        }
    }

    /// Run until shutdown or until every handle is dropped
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<RouterCommand>,
        mut probe_results: mpsc::Receiver<ProbeCompletion>,
    ) {
        info!(
            "Input router started: {}x{} window, ui offset {}, {:?} platform",
            self.cursor.bounds().width,
            self.cursor.bounds().height,
            self.routing.ui_offset(),
            self.matcher.platform()
        );

        let mut tick = tokio::time::interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = tick.tick() => self.on_tick(),

                Some(done) = probe_results.recv() => self.on_probe_completed(done).await,

                command = commands.recv() => match command {
                    Some(RouterCommand::Shutdown) | None => break,
                    Some(command) => {
                        self.stats.commands += 1;
                        if let Err(e) = self.handle(command).await {
                            if log_recovered(&e, "Router command") == RecoveryAction::Fail {
                                break;
                            }
                        }
                    }
                },
            }
        }

        self.cancel_probe();
        info!(
            "Input router stopped: {} commands, {} broadcasts, {} mirrors",
            self.stats.commands, self.stats.broadcasts, self.stats.mirrors_shown
        );
    }

    async fn handle(&mut self, command: RouterCommand) -> Result<(), InputError> {
        trace!("Router command: {}", command.name());
        match command {
            RouterCommand::RelativeMotion { dx, dy } => self.on_motion(dx, dy),
            RouterCommand::SetCursor { x, y } => {
                let point = self.cursor.set_absolute(x, y);
                self.coalescer.mark(point);
                Ok(())
            }
            RouterCommand::SetInputMode(mode) => self.set_mode(mode).await,
            RouterCommand::ToggleInputMode => {
                let mode = self.cursor.mode().toggled();
                self.set_mode(mode).await
            }
            RouterCommand::PointerDown(button) => self.on_pointer_down(button).await,
            RouterCommand::PointerUp(button) => self.on_pointer_up(button).await,
            RouterCommand::Click(button) => self.on_click(button).await,
            RouterCommand::Wheel { dx, dy } => self.on_wheel(dx, dy).await,
            RouterCommand::KeyDown(event) => self.on_key(KeyKind::Down, event).await,
            RouterCommand::KeyUp(event) => self.on_key(KeyKind::Up, event).await,
            RouterCommand::CommitMirrorValue(value) => {
                let update = self.mirror.commit_value(value);
                self.apply_mirror_update(update).await
            }
            RouterCommand::SubmitMirror => {
                let update = self.mirror.submit_form();
                self.apply_mirror_update(update).await
            }
            RouterCommand::DeactivateMirror => {
                self.cancel_probe();
                self.hide_mirror().await
            }
            RouterCommand::SetUiOffset(offset) => {
                let delta = self.routing.set_ui_offset(offset);
                if let Some(moved) = self.mirror.shift_content_geometry(delta) {
                    let moved = moved.clone();
                    self.notify(Notification::MirrorShown(moved));
                }
                Ok(())
            }
            RouterCommand::ResizeWindow { width, height } => {
                let before = self.cursor.position();
                let after = self.cursor.set_bounds(WindowBounds::new(width, height));
                debug!("Window resized to {}x{}", width, height);
                if after != before {
                    self.coalescer.mark(after);
                }
                Ok(())
            }
            RouterCommand::SetContentVisible(visible) => {
                self.routing.set_content_visible(visible);
                let content_mirror = self.mirror.active().is_some_and(|m| m.target.is_content());
                if !visible && content_mirror {
                    self.hide_mirror().await?;
                }
                Ok(())
            }
            RouterCommand::SurfaceSettled(target) => {
                if let Some(pending) = self.pending_probe.as_mut() {
                    if pending.target == target {
                        if let Some(settle) = pending.settle.take() {
                            let _ = settle.send(());
                        }
                    }
                }
                Ok(())
            }
            RouterCommand::ContentSurfaceChanged => {
                let active = self.bridge.active_content_surface();
                debug!("Active content surface: {:?}", active);
                if self.pending_probe.as_ref().is_some_and(|p| p.target.is_content()) {
                    self.cancel_probe();
                }
                let current = active.map(SurfaceTarget::Content);
                let stale_mirror = self
                    .mirror
                    .active()
                    .is_some_and(|m| m.target.is_content() && Some(m.target) != current);
                if stale_mirror {
                    self.hide_mirror().await?;
                }
                Ok(())
            }
            RouterCommand::ReloadSettings => {
                self.apply_settings();
                Ok(())
            }
            RouterCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
                Ok(())
            }
            RouterCommand::Shutdown => Ok(()),
        }
    }

    fn on_tick(&mut self) {
        if let Some(point) = self.coalescer.take() {
            self.stats.broadcasts += 1;
            self.notify(Notification::CursorMoved {
                x: point.x,
                y: point.y,
            });
        }

        if let Some(position) = self.move_throttle.poll(Instant::now()) {
            self.replay_move(position);
        }
    }

    fn on_motion(&mut self, dx: f64, dy: f64) -> Result<(), InputError> {
        let Some(position) = self.cursor.apply_delta(dx, dy) else {
            return Ok(());
        };
        self.stats.motions += 1;
        self.coalescer.mark(position);

        let in_content = self
            .route()
            .is_some_and(|decision| decision.target.is_content());
        if in_content {
            if let Some(position) = self.move_throttle.offer(position, Instant::now()) {
                self.replay_move(position);
            }
        }
        Ok(())
    }

    /// Replay a move using the routing state current at send time
    fn replay_move(&mut self, position: CursorPoint) {
        let Some(RouteDecision {
            target: target @ SurfaceTarget::Content(_),
            point,
        }) = self.route_point(position)
        else {
            trace!("Pending move no longer over content, dropped");
            return;
        };

        let job = DispatchJob::Pointer {
            target,
            event: PointerReplay::moved(point.x, point.y),
            delivered: None,
        };
        match self.dispatch.try_send(job) {
            Ok(()) => self.stats.move_replays += 1,
            Err(InputError::DispatchQueueFull) => {
                self.stats.moves_dropped += 1;
                trace!("Dispatch queue full, pointer move dropped");
            }
            Err(e) => {
                log_recovered(&e, "Pointer move replay");
            }
        }
    }

    async fn set_mode(&mut self, mode: InputMode) -> Result<(), InputError> {
        if !self.cursor.set_mode(mode) {
            return Ok(());
        }

        match mode {
            InputMode::Virtual => {
                info!("Input mode: Virtual");
                self.coalescer.mark(self.cursor.position());
            }
            InputMode::Native => {
                info!("Input mode: Native");
                let position = self.cursor.position();
                for (button, press) in self.buttons.release_all() {
                    debug!("Releasing held {:?} on {}", button, press.target);
                    let point = self.routing.to_surface_coordinates(press.target, position);
                    self.dispatch
                        .send(DispatchJob::Pointer {
                            target: press.target,
                            event: PointerReplay::up(point.x, point.y, button),
                            delivered: None,
                        })
                        .await?;
                }
                self.cancel_probe();
                self.hide_mirror().await?;
                self.move_throttle.clear();
            }
        }

        self.notify(Notification::InputModeChanged { mode });
        Ok(())
    }

    async fn on_pointer_down(&mut self, button: MouseButton) -> Result<(), InputError> {
        let Some(decision) = self.route() else {
            trace!("Pointer down in native mode ignored");
            return Ok(());
        };

        self.buttons.press(button, decision.target, self.cursor.position());
        self.dispatch
            .send(DispatchJob::Pointer {
                target: decision.target,
                event: PointerReplay::down(decision.point.x, decision.point.y, button),
                delivered: None,
            })
            .await
    }

    async fn on_pointer_up(&mut self, button: MouseButton) -> Result<(), InputError> {
        let Some(decision) = self.route() else {
            trace!("Pointer up in native mode ignored");
            return Ok(());
        };

        let release = self.buttons.release(button, self.cursor.position());
        // The surface that saw the press gets the release
        let (target, point) = match release.press {
            Some(press) => (
                press.target,
                self.routing
                    .to_surface_coordinates(press.target, self.cursor.position()),
            ),
            None => (decision.target, decision.point),
        };

        let delivered = if release.completed_click && button.is_primary() {
            self.begin_probe(target, point)
        } else {
            None
        };

        self.dispatch
            .send(DispatchJob::Pointer {
                target,
                event: PointerReplay::up(point.x, point.y, button),
                delivered,
            })
            .await
    }

    async fn on_click(&mut self, button: MouseButton) -> Result<(), InputError> {
        let Some(RouteDecision { target, point }) = self.route() else {
            trace!("Click in native mode ignored");
            return Ok(());
        };

        self.dispatch
            .send(DispatchJob::Pointer {
                target,
                event: PointerReplay::down(point.x, point.y, button),
                delivered: None,
            })
            .await?;

        let delivered = if button.is_primary() {
            self.begin_probe(target, point)
        } else {
            None
        };

        self.dispatch
            .send(DispatchJob::Pointer {
                target,
                event: PointerReplay::up(point.x, point.y, button),
                delivered,
            })
            .await
    }

    async fn on_wheel(&mut self, dx: f64, dy: f64) -> Result<(), InputError> {
        let Some(RouteDecision { target, point }) = self.route() else {
            return Ok(());
        };
        self.dispatch
            .send(DispatchJob::Pointer {
                target,
                event: PointerReplay::wheel(point.x, point.y, dx, dy),
                delivered: None,
            })
            .await
    }

    async fn on_key(&mut self, kind: KeyKind, event: KeyEvent) -> Result<(), InputError> {
        let key = event.normalized_key();

        match kind {
            KeyKind::Down => {
                if let Some(action) = self.matcher.match_event(&event) {
                    let action = action.to_string();
                    debug!("Shortcut {} consumed {:?}", action, event.key);
                    self.stats.shortcuts += 1;
                    self.consumed_keys.insert(key);
                    self.notify(Notification::ShortcutTriggered { action });
                    return Ok(());
                }
            }
            KeyKind::Up => {
                if self.consumed_keys.remove(&key) {
                    trace!("Keyup for consumed {:?} swallowed", event.key);
                    return Ok(());
                }
                // The surface that saw the keydown gets the keyup
                if let Some(target) = self.held_keys.remove(&key) {
                    return self.replay_key(target, kind, event).await;
                }
            }
        }

        if self.mirror.is_active() {
            trace!("Mirror active, overlay owns {:?}", event.key);
            return Ok(());
        }

        // Keys follow the zone of the last pointer position
        let Some(RouteDecision { target, .. }) = self.route() else {
            return Ok(());
        };

        if kind == KeyKind::Down {
            self.held_keys.insert(key, target);
        }
        self.replay_key(target, kind, event).await
    }

    async fn replay_key(
        &mut self,
        target: SurfaceTarget,
        kind: KeyKind,
        event: KeyEvent,
    ) -> Result<(), InputError> {
        self.stats.key_replays += 1;
        self.dispatch
            .send(DispatchJob::Key {
                target,
                event: KeyReplay {
                    kind,
                    key: event.key,
                    code: event.code,
                    modifiers: event.modifiers,
                },
            })
            .await
    }

    /// Start a probe for a completed click
    ///
    /// Returns the sender the dispatcher signals once the release is out.
    fn begin_probe(&mut self, target: SurfaceTarget, point: CursorPoint) -> Option<oneshot::Sender<()>> {
        if let Some(active) = self.mirror.active() {
            debug!("Mirror {} active, click not probed", active.id);
            return None;
        }

        self.cancel_probe();

        let id = self.probe_ids.next_id();
        let (delivered_tx, delivered) = oneshot::channel();
        let (settle_tx, settled) = oneshot::channel();
        let cancel = CancellationToken::new();

        debug!("Probe {} on {} at ({:.0}, {:.0})", id, target, point.x, point.y);
        spawn_probe(
            Arc::clone(&self.bridge),
            ProbeTask {
                id,
                target,
                point,
                delivered,
                settled,
                cancel: cancel.clone(),
                settle: self.settle,
            },
            self.probe_done.clone(),
        );

        self.stats.probes_started += 1;
        self.pending_probe = Some(PendingProbe {
            id,
            target,
            cancel,
            settle: Some(settle_tx),
        });
        Some(delivered_tx)
    }

    fn cancel_probe(&mut self) {
        if let Some(pending) = self.pending_probe.take() {
            debug!("Probe {} cancelled", pending.id);
            pending.cancel.cancel();
            self.stats.probes_cancelled += 1;
        }
    }

    async fn on_probe_completed(&mut self, done: ProbeCompletion) {
        let pending = self.pending_probe.as_ref().map(|p| p.id);
        if pending != Some(done.id) {
            self.stats.probes_stale += 1;
            log_recovered(
                &InputError::StaleProbe {
                    stale: done.id,
                    pending,
                },
                "Probe completion",
            );
            if done.outcome.is_editable() {
                self.release_element(done.target, done.id).await;
            }
            return;
        }
        self.pending_probe = None;

        match done.outcome {
            ProbeOutcome::NotEditable => debug!("Probe {}: nothing editable", done.id),
            ProbeOutcome::Failed(reason) => {
                log_recovered(&InputError::ProbeFailed(reason), "Probe");
            }
            ProbeOutcome::Editable(track) => {
                let offset = if done.target.is_content() {
                    self.routing.ui_offset()
                } else {
                    0.0
                };
                let descriptor = TextMirrorDescriptor::from_track(done.id, done.target, track, offset);
                match self.mirror.activate(descriptor).cloned() {
                    Ok(active) => {
                        self.stats.mirrors_shown += 1;
                        self.notify(Notification::MirrorShown(active));
                    }
                    Err(e) => {
                        log_recovered(&e, "Mirror activation");
                        self.release_element(done.target, done.id).await;
                    }
                }
            }
        }
    }

    async fn release_element(&mut self, target: SurfaceTarget, id: ProbeRequestId) {
        let job = DispatchJob::Script {
            target,
            script: ProbeScript::Release { id },
        };
        if let Err(e) = self.dispatch.send(job).await {
            log_recovered(&e, "Release tracked element");
        }
    }

    async fn hide_mirror(&mut self) -> Result<(), InputError> {
        let update = self.mirror.deactivate();
        self.apply_mirror_update(update).await
    }

    async fn apply_mirror_update(&mut self, update: Option<MirrorUpdate>) -> Result<(), InputError> {
        let Some(update) = update else {
            return Ok(());
        };

        for effect in update.effects {
            self.dispatch
                .send(DispatchJob::Script {
                    target: effect.target,
                    script: effect.script,
                })
                .await?;
        }
        if update.closed {
            self.notify(Notification::MirrorHidden { id: update.id });
        }
        Ok(())
    }

    fn apply_settings(&mut self) {
        let table = self.settings.shortcut_table();
        let sensitivity = self.settings.sensitivity();
        let invert = self.settings.invert_mouse();
        info!(
            "Settings reloaded: {} shortcuts, sensitivity {}, invert {}",
            table.len(),
            sensitivity.value(),
            invert
        );
        self.matcher.set_table(table);
        self.cursor.set_sensitivity(sensitivity);
        self.cursor.set_invert(invert);
    }

    fn route(&self) -> Option<RouteDecision> {
        self.route_point(self.cursor.position())
    }

    fn route_point(&self, position: CursorPoint) -> Option<RouteDecision> {
        self.routing.route(
            position,
            self.cursor.mode(),
            self.bridge.active_content_surface(),
        )
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            trace!("No notification subscribers");
        }
    }

    fn snapshot(&self) -> RouterSnapshot {
        RouterSnapshot {
            mode: self.cursor.mode(),
            cursor: self.cursor.position(),
            bounds: self.cursor.bounds(),
            ui_offset: self.routing.ui_offset(),
            content_visible: self.routing.content_visible(),
            mirror: self.mirror.active().cloned(),
            pending_probe: self.pending_probe.as_ref().map(|p| p.id),
            held_buttons: self.buttons.held_count(),
            stats: self.stats,
        }
    }
}

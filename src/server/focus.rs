//! Focus Resolution
//!
//! Runs the probe for one completed click on its own task:
//!
//! 1. Wait until the click's release has been replayed
//! 2. Wait for the surface to report it has settled, or the fallback delay
//! 3. Hit-test the click point; stop if nothing editable is there
//! 4. Track the element (mark, hide, measure)
//!
//! Steps 1-3 stop early when the probe is cancelled by a newer click, a mode
//! switch or a mirror deactivation. Once step 4 has started the script runs
//! to completion, because it has already changed the page; the router
//! releases the element again if the result turns out to be stale.
//!
//! Script failures end as [`ProbeOutcome::Failed`], which the router treats
//! like "not editable". No timeout applies to the scripts themselves.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::input::coordinates::CursorPoint;
use crate::input::routing::SurfaceTarget;
use crate::mirror::probe::{parse_hit_test, parse_track, ProbeOutcome, ProbeRequestId, ProbeScript};
use crate::server::events::ProbeCompletion;
use crate::surface::SurfaceBridge;

/// How the probe waits for the target surface after the click
#[derive(Debug, Clone, Copy)]
pub(crate) struct SettlePolicy {
    /// Wait for an explicit settled signal
    pub(crate) wait_for_ack: bool,
    /// Upper bound on the wait (or the fixed delay without acks)
    pub(crate) fallback: Duration,
}

/// One probe
pub(crate) struct ProbeTask {
    pub(crate) id: ProbeRequestId,
    pub(crate) target: SurfaceTarget,
    /// Surface-local click point
    pub(crate) point: CursorPoint,
    pub(crate) delivered: oneshot::Receiver<()>,
    pub(crate) settled: oneshot::Receiver<()>,
    pub(crate) cancel: CancellationToken,
    pub(crate) settle: SettlePolicy,
}

/// Spawn a probe that reports to `done`
pub(crate) fn spawn_probe(
    bridge: Arc<dyn SurfaceBridge>,
    task: ProbeTask,
    done: mpsc::Sender<ProbeCompletion>,
) {
    tokio::spawn(async move {
        let id = task.id;
        let target = task.target;
        let Some(outcome) = run_probe(bridge.as_ref(), task).await else {
            debug!("Probe {} cancelled", id);
            return;
        };

        if done
            .send(ProbeCompletion {
                id,
                target,
                outcome,
            })
            .await
            .is_err()
        {
            trace!("Router gone, probe {} result dropped", id);
        }
    });
}

/// Run a probe; `None` if it was cancelled before tracking started
async fn run_probe(bridge: &dyn SurfaceBridge, task: ProbeTask) -> Option<ProbeOutcome> {
    let ProbeTask {
        id,
        target,
        point,
        delivered,
        settled,
        cancel,
        settle,
    } = task;

    tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        // An Err means the dispatcher is gone; probing still ends cleanly
        _ = delivered => {}
    }

    if settle.wait_for_ack {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = settled => {
                if result.is_ok() {
                    trace!("Probe {}: {} settled", id, target);
                }
            }
            _ = tokio::time::sleep(settle.fallback) => {
                trace!("Probe {}: settle fallback after {:?}", id, settle.fallback);
            }
        }
    } else {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(settle.fallback) => {}
        }
    }

    let hit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        result = bridge.execute_probe(target, ProbeScript::HitTest { x: point.x, y: point.y }) => result,
    };

    let hit = match hit {
        Ok(value) => match parse_hit_test(value) {
            Ok(hit) => hit,
            Err(e) => return Some(ProbeOutcome::Failed(e.to_string())),
        },
        Err(e) => return Some(ProbeOutcome::Failed(e.to_string())),
    };

    if !hit.editable {
        return Some(ProbeOutcome::NotEditable);
    }
    if cancel.is_cancelled() {
        return None;
    }

    debug!(
        "Probe {}: editable {:?} at ({:.0}, {:.0}) on {}",
        id, hit.kind, point.x, point.y, target
    );
    let track = bridge
        .execute_probe(
            target,
            ProbeScript::Track {
                x: point.x,
                y: point.y,
                id,
            },
        )
        .await;

    let outcome = match track {
        Ok(value) => match parse_track(value) {
            Ok(Some(track)) => ProbeOutcome::Editable(track),
            Ok(None) => ProbeOutcome::NotEditable,
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        },
        Err(e) => ProbeOutcome::Failed(e.to_string()),
    };
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MockSurfaceBridge, SurfaceError};
    use serde_json::json;

    fn task(
        cancel: CancellationToken,
    ) -> (ProbeTask, oneshot::Sender<()>, oneshot::Sender<()>) {
        let (delivered_tx, delivered) = oneshot::channel();
        let (settled_tx, settled) = oneshot::channel();
        let task = ProbeTask {
            id: ProbeRequestId(1),
            target: SurfaceTarget::Chrome,
            point: CursorPoint::new(5.0, 5.0),
            delivered,
            settled,
            cancel,
            settle: SettlePolicy {
                wait_for_ack: true,
                fallback: Duration::from_millis(50),
            },
        };
        (task, delivered_tx, settled_tx)
    }

    fn track_json() -> serde_json::Value {
        json!({"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0, "value": "abc", "style": {}})
    }

    #[tokio::test]
    async fn test_editable_element_is_tracked() {
        let mut bridge = MockSurfaceBridge::new();
        bridge.expect_execute_probe().returning(|_, script| match script {
            ProbeScript::HitTest { .. } => Ok(json!({"editable": true, "kind": "input"})),
            ProbeScript::Track { .. } => Ok(track_json()),
            _ => Ok(json!(null)),
        });

        let (task, delivered, settled) = task(CancellationToken::new());
        delivered.send(()).unwrap();
        settled.send(()).unwrap();

        match run_probe(&bridge, task).await {
            Some(ProbeOutcome::Editable(track)) => assert_eq!(track.value, "abc"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_script_error_is_a_failed_outcome() {
        let mut bridge = MockSurfaceBridge::new();
        bridge
            .expect_execute_probe()
            .returning(|_, _| Err(SurfaceError::NavigatedAway));

        let (task, delivered, settled) = task(CancellationToken::new());
        delivered.send(()).unwrap();
        settled.send(()).unwrap();

        assert!(matches!(run_probe(&bridge, task).await, Some(ProbeOutcome::Failed(_))));
    }

    #[tokio::test]
    async fn test_non_editable_skips_track() {
        let mut bridge = MockSurfaceBridge::new();
        bridge
            .expect_execute_probe()
            .times(1)
            .returning(|_, _| Ok(json!({"editable": false})));

        let (task, delivered, settled) = task(CancellationToken::new());
        delivered.send(()).unwrap();
        settled.send(()).unwrap();

        assert_eq!(run_probe(&bridge, task).await, Some(ProbeOutcome::NotEditable));
    }

    #[tokio::test]
    async fn test_cancel_before_delivery() {
        let mut bridge = MockSurfaceBridge::new();
        bridge.expect_execute_probe().never();

        let cancel = CancellationToken::new();
        let (task, _delivered, _settled) = task(cancel.clone());
        cancel.cancel();

        assert_eq!(run_probe(&bridge, task).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_when_no_settle_ack() {
        let mut bridge = MockSurfaceBridge::new();
        bridge
            .expect_execute_probe()
            .returning(|_, _| Ok(json!({"editable": false})));

        let (task, delivered, _settled) = task(CancellationToken::new());
        delivered.send(()).unwrap();

        let started = tokio::time::Instant::now();
        assert_eq!(run_probe(&bridge, task).await, Some(ProbeOutcome::NotEditable));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}

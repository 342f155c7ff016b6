//! Surface Dispatcher
//!
//! A single task that performs every replay and mirror script against the
//! surface bridge, in the order the router queued them. The router never
//! awaits a surface directly, so a slow page cannot stall cursor tracking.
//!
//! # Drop Policy
//!
//! - **Pointer moves**: dropped if the queue is full (the next move
//!   supersedes them anyway)
//! - **Everything else**: the router waits for queue space

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::input::error::{log_recovered, InputError, Result};
use crate::input::routing::SurfaceTarget;
use crate::mirror::probe::ProbeScript;
use crate::surface::{KeyReplay, PointerReplay, SurfaceBridge};

/// Work for the dispatcher
#[derive(Debug)]
pub(crate) enum DispatchJob {
    Pointer {
        target: SurfaceTarget,
        event: PointerReplay,
        /// Signalled once the replay has been attempted
        delivered: Option<oneshot::Sender<()>>,
    },
    Key {
        target: SurfaceTarget,
        event: KeyReplay,
    },
    Script {
        target: SurfaceTarget,
        script: ProbeScript,
    },
}

/// Sending side of the dispatch queue
#[derive(Debug, Clone)]
pub(crate) struct DispatchQueue {
    tx: mpsc::Sender<DispatchJob>,
}

impl DispatchQueue {
    /// Start the dispatcher task
    pub(crate) fn spawn(bridge: Arc<dyn SurfaceBridge>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(run_dispatcher(bridge, rx));
        (Self { tx }, task)
    }

    /// Queue a job, waiting for space
    pub(crate) async fn send(&self, job: DispatchJob) -> Result<()> {
        self.tx.send(job).await.map_err(|_| InputError::RouterClosed)
    }

    /// Queue a job only if there is space
    pub(crate) fn try_send(&self, job: DispatchJob) -> Result<()> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => InputError::DispatchQueueFull,
            mpsc::error::TrySendError::Closed(_) => InputError::RouterClosed,
        })
    }
}

async fn run_dispatcher(bridge: Arc<dyn SurfaceBridge>, mut rx: mpsc::Receiver<DispatchJob>) {
    debug!("Surface dispatcher started");
    let mut processed = 0u64;

    while let Some(job) = rx.recv().await {
        processed += 1;
        match job {
            DispatchJob::Pointer {
                target,
                event,
                delivered,
            } => {
                trace!("Replay pointer {:?} to {}", event.kind, target);
                if let Err(e) = bridge.replay_pointer_event(target, event).await {
                    log_recovered(&InputError::Surface(e), "Pointer replay");
                }
                if let Some(delivered) = delivered {
                    let _ = delivered.send(());
                }
            }
            DispatchJob::Key { target, event } => {
                trace!("Replay key {:?} {} to {}", event.kind, event.key, target);
                if let Err(e) = bridge.replay_key_event(target, event).await {
                    log_recovered(&InputError::Surface(e), "Key replay");
                }
            }
            DispatchJob::Script { target, script } => {
                let name = script.name();
                match bridge.execute_probe(target, script).await {
                    Ok(result) => trace!("Script {} on {} returned {}", name, target, result),
                    Err(e) => {
                        log_recovered(&InputError::Surface(e), "Mirror script");
                    }
                }
            }
        }
    }

    debug!("Surface dispatcher stopped after {} jobs", processed);
}

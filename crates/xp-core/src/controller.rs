//! Background coordinator surface for a driving UI.
//!
//! Owns the single deletion session per process and the task driving it.
//! Concurrent sessions are not supported: a start while a session is
//! active is rejected, not queued.

use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::notify::ProgressSink;
use crate::orchestrator::{Orchestrator, SessionConfig};
use crate::platform::ActivityType;
use crate::protocol::{ControlRequest, ControlResponse};
use crate::relay::{Navigator, Relay};
use crate::session::{DeletionSession, SessionSnapshot, StopSignal};

pub struct SessionController<R, N, S> {
    relay: Arc<R>,
    nav: Arc<N>,
    sink: Arc<S>,
    config: SessionConfig,
    session: Arc<Mutex<DeletionSession>>,
    stop: StopSignal,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<R, N, S> SessionController<R, N, S>
where
    R: Relay + 'static,
    N: Navigator + 'static,
    S: ProgressSink + 'static,
{
    pub fn new(relay: R, nav: N, sink: S, config: SessionConfig, stop: StopSignal) -> Self {
        Self {
            relay: Arc::new(relay),
            nav: Arc::new(nav),
            sink: Arc::new(sink),
            config,
            session: Arc::new(Mutex::new(DeletionSession::default())),
            stop,
            task: Mutex::new(None),
        }
    }

    /// Handle one control message.
    pub fn handle(&self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::StartTikTokCommentDeletion { tab_id } => ControlResponse::Started {
                started: self.start(tab_id),
            },
            ControlRequest::StopDeletion => ControlResponse::Stopped {
                stopped: self.stop_session(),
            },
            ControlRequest::GetDeletionState => ControlResponse::State(self.state()),
        }
    }

    /// Begin an orchestrated session. Returns false when one is already
    /// active.
    pub fn start(&self, tab: Option<String>) -> bool {
        {
            let mut session = self.session.lock();
            if session.active {
                return false;
            }
            // The start message itself pins platform and activity.
            session.begin("tiktok", ActivityType::Comments, tab);
        }
        self.stop.reset();

        let orchestrator = Orchestrator::new(
            Arc::clone(&self.relay),
            Arc::clone(&self.nav),
            Arc::clone(&self.sink),
            self.config.clone(),
            Arc::clone(&self.session),
            self.stop.clone(),
        );
        let handle = tokio::spawn(async move {
            if let Err(err) = orchestrator.run().await {
                warn!("session ended with error: {err}");
            }
        });
        *self.task.lock() = Some(handle);
        true
    }

    /// Request a cooperative stop; the loop honors it at its next iteration
    /// boundary.
    pub fn stop_session(&self) -> bool {
        self.session.lock().active = false;
        self.stop.stop();
        true
    }

    pub fn state(&self) -> SessionSnapshot {
        self.session.lock().snapshot()
    }

    /// Await the running session task, if any.
    pub async fn wait(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

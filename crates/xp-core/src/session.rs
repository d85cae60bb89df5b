//! Session state shared between the coordinator and running loops.
//!
//! The original design kept stop and re-entrancy flags as ambient globals on
//! the page object; here they are explicit values handed to each routine,
//! with the guard checked as a precondition at entry.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::platform::ActivityType;

/// Cooperative stop flag.
///
/// Observed only at loop-iteration boundaries; an in-flight DOM action
/// always completes before a stop takes effect. There is no preemption.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Entry guard for page-driving loops.
///
/// At most one loop may act on a given tab; opening a second menu before the
/// first closes corrupts page state, so a second entry is rejected rather
/// than queued.
#[derive(Debug, Clone, Default)]
pub struct ActivityGuard(Arc<AtomicBool>);

impl ActivityGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard; `None` when another loop already holds it.
    pub fn try_acquire(&self) -> Option<ActivityPermit> {
        if self
            .0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(ActivityPermit(self.0.clone()))
        } else {
            None
        }
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Proof of guard ownership; released on drop.
#[derive(Debug)]
pub struct ActivityPermit(Arc<AtomicBool>);

impl Drop for ActivityPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Coordinator-owned state of one orchestrated deletion session.
///
/// Mutated only by the orchestrator loop; reset when a session starts. The
/// visited set only grows during a session: a target, once recorded, is
/// never navigated to again.
#[derive(Debug, Default)]
pub struct DeletionSession {
    pub active: bool,
    pub platform: Option<String>,
    pub activity: Option<ActivityType>,
    pub tab: Option<String>,
    pub identity: Option<String>,
    pub deleted_count: u64,
    pub visited: HashSet<String>,
}

impl DeletionSession {
    /// Reset for a fresh run.
    pub fn begin(&mut self, platform: &str, activity: ActivityType, tab: Option<String>) {
        self.active = true;
        self.platform = Some(platform.to_string());
        self.activity = Some(activity);
        self.tab = tab;
        self.identity = None;
        self.deleted_count = 0;
        self.visited.clear();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_active: self.active,
            platform: self.platform.clone(),
            activity: self.activity,
            tab_id: self.tab.clone(),
            username: self.identity.clone(),
            deleted_count: self.deleted_count,
            visited_count: self.visited.len(),
        }
    }
}

/// Serializable view of the session served to a driving UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_active: bool,
    pub platform: Option<String>,
    #[serde(rename = "type")]
    pub activity: Option<ActivityType>,
    pub tab_id: Option<String>,
    pub username: Option<String>,
    pub deleted_count: u64,
    pub visited_count: usize,
}

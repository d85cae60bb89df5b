//! Cross-context orchestration for navigation-based platforms.
//!
//! Item pages need a full page load, and only the privileged side can
//! command the tab to load a URL; the relay can only act inside whatever
//! page is currently loaded. Deletion therefore alternates between the two:
//! read the index through the relay, perform the navigation here, act on
//! the item page through the relay, return to the index.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::dom::sleep;
use crate::notify::{ProgressNotice, ProgressSink};
use crate::protocol::{PageKind, RelayRequest, RelayResponse};
use crate::relay::{Navigator, Relay, RelayError};
use crate::session::{DeletionSession, StopSignal};

/// Tuning for one orchestrated session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Index view the loop returns to between items.
    pub index_url: String,
    /// Consecutive empty index reads treated as exhaustion.
    pub max_no_items: u32,
    /// Extra settle after switching to the index view.
    pub index_settle: Duration,
    /// Pause before re-reading an index that came up empty.
    pub retry_delay: Duration,
    /// Pause after discarding an index entry with no target.
    pub discard_delay: Duration,
    /// Shorter pause after discarding an already-visited entry.
    pub dedup_delay: Duration,
    /// Delay separating loop iterations regardless of branch.
    pub loop_delay: Duration,
}

impl SessionConfig {
    pub fn new(index_url: impl Into<String>) -> Self {
        Self {
            index_url: index_url.into(),
            max_no_items: 3,
            index_settle: Duration::from_millis(3000),
            retry_delay: Duration::from_millis(2000),
            discard_delay: Duration::from_millis(1000),
            dedup_delay: Duration::from_millis(500),
            loop_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The acting user could not be determined. Session-fatal: every
    /// downstream filter depends on it.
    #[error("could not resolve the acting identity")]
    IdentityUnresolved,
    /// An iteration failed and the forced return to the index view failed
    /// too.
    #[error("recovery navigation failed: {0}")]
    RecoveryFailed(String),
    #[error(transparent)]
    Relay(#[from] RelayError),
    /// The relay answered an in-loop request with an error payload.
    #[error("relay reported: {0}")]
    RelayReport(String),
    /// The relay answered with a payload shape that does not fit the
    /// request.
    #[error("unexpected relay reply to {request}")]
    Protocol { request: &'static str },
}

enum LoopStep {
    Continue,
    Finished,
}

/// Drives one orchestrated deletion session over a relay and a navigator.
pub struct Orchestrator<R, N, S> {
    relay: R,
    nav: N,
    sink: S,
    config: SessionConfig,
    session: Arc<Mutex<DeletionSession>>,
    stop: StopSignal,
}

impl<R: Relay, N: Navigator, S: ProgressSink> Orchestrator<R, N, S> {
    pub fn new(
        relay: R,
        nav: N,
        sink: S,
        config: SessionConfig,
        session: Arc<Mutex<DeletionSession>>,
        stop: StopSignal,
    ) -> Self {
        Self {
            relay,
            nav,
            sink,
            config,
            session,
            stop,
        }
    }

    /// Run the session to termination (exhaustion, stop, or fatal error).
    ///
    /// Every termination path deactivates the session and emits a final
    /// `finished` notice, so a driving UI is never left in an indeterminate
    /// "still running" state.
    pub async fn run(&self) -> Result<u64, SessionError> {
        let result = self.drive().await;
        let deleted = {
            let mut session = self.session.lock();
            session.active = false;
            session.deleted_count
        };
        self.sink.emit(ProgressNotice::Finished { count: deleted });
        result.map(|()| deleted)
    }

    async fn drive(&self) -> Result<(), SessionError> {
        let username = self.resolve_identity().await?;
        debug!("acting as '{username}'");
        self.session.lock().identity = Some(username.clone());

        // Switch to the index view; its content loads asynchronously.
        self.relay.call(RelayRequest::ClickCommentsTab).await?;
        sleep(self.config.index_settle).await;

        self.run_loop(&username).await
    }

    async fn resolve_identity(&self) -> Result<String, SessionError> {
        match self.relay.call(RelayRequest::GetUsername).await? {
            RelayResponse::Username {
                username: Some(username),
            } if !username.is_empty() => Ok(username),
            RelayResponse::Username { .. } | RelayResponse::Error { .. } => {
                Err(SessionError::IdentityUnresolved)
            }
            _ => Err(SessionError::Protocol {
                request: "getUsername",
            }),
        }
    }

    async fn run_loop(&self, username: &str) -> Result<(), SessionError> {
        let mut no_items: u32 = 0;
        loop {
            if self.stop.is_stopped() || !self.session.lock().active {
                return Ok(());
            }
            match self.iteration(username, &mut no_items).await {
                Ok(LoopStep::Continue) => {}
                Ok(LoopStep::Finished) => return Ok(()),
                Err(err) => {
                    warn!("iteration failed: {err}; forcing return to index view");
                    if let Err(nav_err) = self.nav.goto(&self.config.index_url).await {
                        return Err(SessionError::RecoveryFailed(nav_err.to_string()));
                    }
                }
            }
            sleep(self.config.loop_delay).await;
        }
    }

    async fn iteration(
        &self,
        username: &str,
        no_items: &mut u32,
    ) -> Result<LoopStep, SessionError> {
        match self.page_kind().await? {
            PageKind::Index => self.index_step(no_items).await,
            PageKind::Item => {
                self.item_step(username).await?;
                Ok(LoopStep::Continue)
            }
            PageKind::Unknown => {
                debug!("unrecognized page, returning to index view");
                self.nav.goto(&self.config.index_url).await?;
                Ok(LoopStep::Continue)
            }
        }
    }

    async fn page_kind(&self) -> Result<PageKind, SessionError> {
        match self.relay.call(RelayRequest::GetPageType).await? {
            RelayResponse::PageType { page_type } => Ok(page_type),
            // A relay that cannot classify the page gets the same treatment
            // as an unrecognized page.
            RelayResponse::Error { .. } => Ok(PageKind::Unknown),
            _ => Err(SessionError::Protocol {
                request: "getPageType",
            }),
        }
    }

    async fn index_step(&self, no_items: &mut u32) -> Result<LoopStep, SessionError> {
        let (count, first_url) = match self.relay.call(RelayRequest::GetInboxItems).await? {
            RelayResponse::InboxItems {
                count,
                first_item_url,
            } => (count, first_item_url),
            RelayResponse::Error { error } => return Err(SessionError::RelayReport(error)),
            _ => {
                return Err(SessionError::Protocol {
                    request: "getInboxItems",
                })
            }
        };

        if count == 0 {
            *no_items += 1;
            debug!("index empty ({}/{})", no_items, self.config.max_no_items);
            if *no_items >= self.config.max_no_items {
                return Ok(LoopStep::Finished);
            }
            sleep(self.config.retry_delay).await;
            return Ok(LoopStep::Continue);
        }
        *no_items = 0;

        let Some(target) = first_url else {
            // Entry with nothing to open; drop it so it stops shadowing the
            // rest of the list.
            self.remove_first().await?;
            sleep(self.config.discard_delay).await;
            return Ok(LoopStep::Continue);
        };

        if self.session.lock().visited.contains(&target) {
            // The index re-rendered an entry we already handled; discard it
            // instead of navigating again.
            debug!("already visited {target}, discarding");
            self.remove_first().await?;
            sleep(self.config.dedup_delay).await;
            return Ok(LoopStep::Continue);
        }

        self.session.lock().visited.insert(target.clone());
        // Drop the entry before leaving so it is not re-encountered on
        // return.
        self.remove_first().await?;
        debug!("navigating to {target}");
        self.nav.goto(&target).await?;
        Ok(LoopStep::Continue)
    }

    async fn item_step(&self, username: &str) -> Result<(), SessionError> {
        let deleted = match self
            .relay
            .call(RelayRequest::DeleteComment {
                username: username.to_string(),
            })
            .await?
        {
            RelayResponse::CommentDeleted { deleted, .. } => deleted,
            RelayResponse::Error { .. } => false,
            _ => {
                return Err(SessionError::Protocol {
                    request: "deleteComment",
                })
            }
        };

        if deleted {
            let count = {
                let mut session = self.session.lock();
                session.deleted_count += 1;
                session.deleted_count
            };
            self.sink.emit(ProgressNotice::UpdateCounter { count });
        }

        // Whatever happened on the item page, go back for the next entry.
        self.nav.goto(&self.config.index_url).await?;
        Ok(())
    }

    async fn remove_first(&self) -> Result<(), SessionError> {
        match self.relay.call(RelayRequest::RemoveFirstInboxItem).await? {
            RelayResponse::ItemRemoved { .. } => Ok(()),
            RelayResponse::Error { error } => Err(SessionError::RelayReport(error)),
            _ => Err(SessionError::Protocol {
                request: "removeFirstInboxItem",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::notify::ChannelSink;
    use crate::platform::ActivityType;

    const INDEX: &str = "https://site.test/explore";

    #[derive(Default)]
    struct Shared {
        page: Mutex<PageKind>,
        inbox: Mutex<VecDeque<Option<String>>>,
        refills: Mutex<VecDeque<(u32, Vec<Option<String>>)>>,
        empty_reads: AtomicU32,
        deletable: Mutex<HashMap<String, bool>>,
        current_item: Mutex<Option<String>>,
        relay_calls: Mutex<Vec<&'static str>>,
        nav_log: Mutex<Vec<String>>,
    }

    struct FakeRelay {
        shared: Arc<Shared>,
        username: Option<String>,
        fail_page_type: AtomicU32,
    }

    #[async_trait]
    impl Relay for FakeRelay {
        async fn call(&self, request: RelayRequest) -> Result<RelayResponse, RelayError> {
            match request {
                RelayRequest::GetPageType => {
                    self.shared.relay_calls.lock().push("getPageType");
                    if self.fail_page_type.load(Ordering::SeqCst) > 0 {
                        self.fail_page_type.fetch_sub(1, Ordering::SeqCst);
                        return Err(RelayError::Unreachable("relay gone".into()));
                    }
                    Ok(RelayResponse::PageType {
                        page_type: *self.shared.page.lock(),
                    })
                }
                RelayRequest::GetUsername => {
                    self.shared.relay_calls.lock().push("getUsername");
                    Ok(RelayResponse::Username {
                        username: self.username.clone(),
                    })
                }
                RelayRequest::ClickCommentsTab => {
                    self.shared.relay_calls.lock().push("clickCommentsTab");
                    *self.shared.page.lock() = PageKind::Index;
                    Ok(RelayResponse::TabSelected {
                        success: true,
                        error: None,
                    })
                }
                RelayRequest::GetInboxItems => {
                    self.shared.relay_calls.lock().push("getInboxItems");
                    let mut inbox = self.shared.inbox.lock();
                    let response = RelayResponse::InboxItems {
                        count: inbox.len(),
                        first_item_url: inbox.front().cloned().flatten(),
                    };
                    if inbox.is_empty() {
                        let reads = self.shared.empty_reads.fetch_add(1, Ordering::SeqCst) + 1;
                        let mut refills = self.shared.refills.lock();
                        if refills.front().map(|(at, _)| *at == reads).unwrap_or(false) {
                            if let Some((_, items)) = refills.pop_front() {
                                inbox.extend(items);
                            }
                        }
                    }
                    Ok(response)
                }
                RelayRequest::DeleteComment { .. } => {
                    self.shared.relay_calls.lock().push("deleteComment");
                    let current = self.shared.current_item.lock().clone();
                    let outcome = current
                        .and_then(|url| self.shared.deletable.lock().get(&url).copied());
                    Ok(match outcome {
                        Some(true) => RelayResponse::CommentDeleted {
                            found: true,
                            deleted: true,
                            error: None,
                        },
                        _ => RelayResponse::CommentDeleted {
                            found: false,
                            deleted: false,
                            error: None,
                        },
                    })
                }
                RelayRequest::RemoveFirstInboxItem => {
                    self.shared.relay_calls.lock().push("removeFirstInboxItem");
                    let removed = self.shared.inbox.lock().pop_front().is_some();
                    Ok(RelayResponse::ItemRemoved { removed })
                }
            }
        }
    }

    struct FakeNav {
        shared: Arc<Shared>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl Navigator for FakeNav {
        async fn goto(&self, url: &str) -> Result<(), RelayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RelayError::Unreachable("tab did not load".into()));
            }
            self.shared.nav_log.lock().push(url.to_string());
            let mut page = self.shared.page.lock();
            if url == INDEX {
                *page = PageKind::Index;
            } else if url.contains("/video/") {
                *page = PageKind::Item;
                *self.shared.current_item.lock() = Some(url.to_string());
            } else {
                *page = PageKind::Unknown;
            }
            Ok(())
        }
    }

    struct Fixture {
        shared: Arc<Shared>,
        session: Arc<Mutex<DeletionSession>>,
        rx: tokio::sync::mpsc::UnboundedReceiver<ProgressNotice>,
        orchestrator: Orchestrator<FakeRelay, FakeNav, ChannelSink>,
    }

    fn fixture(
        inbox: Vec<Option<&str>>,
        deletable: &[(&str, bool)],
        username: Option<&str>,
    ) -> Fixture {
        let shared = Arc::new(Shared::default());
        *shared.inbox.lock() = inbox
            .into_iter()
            .map(|entry| entry.map(str::to_string))
            .collect();
        *shared.deletable.lock() = deletable
            .iter()
            .map(|(url, ok)| (url.to_string(), *ok))
            .collect();

        let session = Arc::new(Mutex::new(DeletionSession::default()));
        session
            .lock()
            .begin("tiktok", ActivityType::Comments, None);

        let (sink, rx) = ChannelSink::new();
        let orchestrator = Orchestrator::new(
            FakeRelay {
                shared: shared.clone(),
                username: username.map(str::to_string),
                fail_page_type: AtomicU32::new(0),
            },
            FakeNav {
                shared: shared.clone(),
                fail: AtomicBool::new(false),
            },
            sink,
            SessionConfig::new(INDEX),
            session.clone(),
            StopSignal::new(),
        );
        Fixture {
            shared,
            session,
            rx,
            orchestrator,
        }
    }

    fn notices(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressNotice>) -> Vec<ProgressNotice> {
        let mut all = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            all.push(notice);
        }
        all
    }

    #[tokio::test(start_paused = true)]
    async fn visits_items_in_order_and_counts() {
        let mut fx = fixture(
            vec![Some("https://site.test/video/1"), Some("https://site.test/video/2")],
            &[("https://site.test/video/1", true), ("https://site.test/video/2", true)],
            Some("alice"),
        );

        let deleted = fx.orchestrator.run().await.unwrap();
        assert_eq!(deleted, 2);

        assert_eq!(
            *fx.shared.nav_log.lock(),
            vec![
                "https://site.test/video/1",
                INDEX,
                "https://site.test/video/2",
                INDEX,
            ]
        );

        let session = fx.session.lock();
        assert!(!session.active);
        assert_eq!(session.deleted_count, 2);
        assert!(session.visited.contains("https://site.test/video/1"));
        assert!(session.visited.contains("https://site.test/video/2"));
        drop(session);

        let all = notices(&mut fx.rx);
        assert_eq!(
            all,
            vec![
                ProgressNotice::UpdateCounter { count: 1 },
                ProgressNotice::UpdateCounter { count: 2 },
                ProgressNotice::Finished { count: 2 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reserved_entries_are_discarded_without_renavigation() {
        let mut fx = fixture(
            vec![Some("https://site.test/video/1"), Some("https://site.test/video/1")],
            &[("https://site.test/video/1", true)],
            Some("alice"),
        );

        let deleted = fx.orchestrator.run().await.unwrap();
        assert_eq!(deleted, 1);

        let navigations = fx
            .shared
            .nav_log
            .lock()
            .iter()
            .filter(|url| url.contains("/video/1"))
            .count();
        assert_eq!(navigations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_without_target_is_discarded_then_next_is_visited() {
        let fx_inbox = vec![None, Some("https://site.test/video/2")];
        let mut fx = fixture(fx_inbox, &[("https://site.test/video/2", true)], Some("alice"));

        let deleted = fx.orchestrator.run().await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(
            *fx.shared.nav_log.lock(),
            vec!["https://site.test/video/2", INDEX]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_after_bounded_empty_reads() {
        let mut fx = fixture(vec![], &[], Some("alice"));

        let deleted = fx.orchestrator.run().await.unwrap();
        assert_eq!(deleted, 0);

        let calls = fx.shared.relay_calls.lock();
        let empty_reads = calls.iter().filter(|call| **call == "getInboxItems").count();
        assert_eq!(empty_reads, 3);
        // Nothing was asked of the relay after exhaustion.
        assert_eq!(*calls.last().unwrap(), "getInboxItems");
        drop(calls);

        assert_eq!(notices(&mut fx.rx), vec![ProgressNotice::Finished { count: 0 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_streak_resets_when_items_reappear() {
        let mut fx = fixture(vec![], &[("https://site.test/video/9", true)], Some("alice"));
        *fx.shared.refills.lock() =
            VecDeque::from(vec![(2, vec![Some("https://site.test/video/9".to_string())])]);

        let deleted = fx.orchestrator.run().await.unwrap();
        // Two empty reads, then the item appears and must still be
        // processed before the session can exhaust.
        assert_eq!(deleted, 1);
        assert!(fx
            .shared
            .nav_log
            .lock()
            .contains(&"https://site.test/video/9".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_comment_on_item_page_keeps_count_and_returns() {
        let mut fx = fixture(vec![Some("https://site.test/video/1")], &[], Some("alice"));

        let deleted = fx.orchestrator.run().await.unwrap();
        assert_eq!(deleted, 0);
        // Back to the index after the no-op item visit.
        assert_eq!(
            *fx.shared.nav_log.lock(),
            vec!["https://site.test/video/1", INDEX]
        );
        assert_eq!(notices(&mut fx.rx), vec![ProgressNotice::Finished { count: 0 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn unresolved_identity_is_fatal_but_still_notifies() {
        let mut fx = fixture(vec![Some("https://site.test/video/1")], &[], None);

        match fx.orchestrator.run().await {
            Err(SessionError::IdentityUnresolved) => {}
            other => panic!("expected IdentityUnresolved, got {other:?}"),
        }
        assert_eq!(*fx.shared.relay_calls.lock(), vec!["getUsername"]);
        assert_eq!(notices(&mut fx.rx), vec![ProgressNotice::Finished { count: 0 }]);
        assert!(!fx.session.lock().active);
    }

    #[tokio::test(start_paused = true)]
    async fn relay_failure_recovers_through_index_navigation() {
        let fx = fixture(vec![], &[], Some("alice"));
        fx.orchestrator.relay.fail_page_type.store(1, Ordering::SeqCst);

        let deleted = fx.orchestrator.run().await.unwrap();
        assert_eq!(deleted, 0);
        // The recovery forced one navigation back to the index view.
        assert_eq!(*fx.shared.nav_log.lock(), vec![INDEX]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_recovery_terminates_the_session() {
        let mut fx = fixture(vec![], &[], Some("alice"));
        fx.orchestrator.relay.fail_page_type.store(1, Ordering::SeqCst);
        fx.orchestrator.nav.fail.store(true, Ordering::SeqCst);

        match fx.orchestrator.run().await {
            Err(SessionError::RecoveryFailed(_)) => {}
            other => panic!("expected RecoveryFailed, got {other:?}"),
        }
        // Even the double failure leaves the UI with a final count.
        assert_eq!(notices(&mut fx.rx), vec![ProgressNotice::Finished { count: 0 }]);
    }
}

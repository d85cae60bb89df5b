//! In-page deletion state machine for single-context platforms.
//!
//! Implements the scan -> act -> confirm -> count loop over an activity
//! feed: open the entry's contextual menu, pick the delete-ish option,
//! confirm when asked, repeat until the feed stops yielding candidates.
//! All DOM access goes through [`PageDom`]; all page knowledge (selectors,
//! text classifiers) comes in as a [`FeedProfile`].

use log::debug;

use crate::dom::{sleep, DomError, PageDom, Pacing};
use crate::notify::{ProgressNotice, ProgressSink};
use crate::session::{ActivityGuard, StopSignal};

/// Selector and classifier bundle for one platform's activity feed.
#[derive(Debug, Clone, Copy)]
pub struct FeedProfile {
    /// Matches every contextual-menu button candidate on the page.
    pub menu_button_selector: &'static str,
    /// Ancestors consulted (in order) for an entry's descriptive text
    /// during scanning.
    pub scan_container_selectors: &'static [&'static str],
    /// Ancestors consulted for the own-post exclusion text.
    pub exclusion_container_selectors: &'static [&'static str],
    /// Matches the items of an opened contextual menu.
    pub menu_item_selector: &'static str,
    /// Matches second-stage confirmation controls.
    pub confirm_selector: &'static str,
    pub is_candidate: fn(aria_label: &str, container_text: &str) -> bool,
    pub is_excluded: fn(container_text: &str) -> bool,
    pub is_delete_option: fn(label: &str) -> bool,
    pub is_confirm: fn(label: &str) -> bool,
}

/// Loop states. `Acting` carries the candidate being processed; the stop
/// signal is observed only on entry to `Scanning`, so an in-flight
/// act/confirm sequence always completes first.
pub enum FeedState<E> {
    Scanning,
    Acting(E),
    Confirming,
    Counting,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEnd {
    /// The feed stopped yielding candidates.
    Exhausted,
    /// The user-stop signal was honored at an iteration boundary.
    Stopped,
}

/// Final report of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOutcome {
    pub end: FeedEnd,
    pub deleted: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("a deletion loop is already running on this page")]
    AlreadyRunning,
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Caller-supplied engine options.
#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    /// Skip entries classified as comments on the user's own posts.
    pub exclude_own_posts: bool,
    /// Consecutive empty rescans treated as feed exhaustion.
    pub max_idle_scans: u32,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            exclude_own_posts: false,
            max_idle_scans: 5,
        }
    }
}

pub struct FeedEngine<'a, D: PageDom, S: ProgressSink> {
    dom: &'a D,
    profile: FeedProfile,
    options: FeedOptions,
    pacing: Pacing,
    stop: StopSignal,
    sink: &'a S,
}

impl<'a, D: PageDom, S: ProgressSink> FeedEngine<'a, D, S> {
    pub fn new(
        dom: &'a D,
        profile: FeedProfile,
        options: FeedOptions,
        pacing: Pacing,
        stop: StopSignal,
        sink: &'a S,
    ) -> Self {
        Self {
            dom,
            profile,
            options,
            pacing,
            stop,
            sink,
        }
    }

    /// Run until exhaustion or stop. A second concurrent run against the
    /// same guard is rejected.
    pub async fn run(&self, guard: &ActivityGuard) -> Result<FeedOutcome, FeedError> {
        let _permit = guard.try_acquire().ok_or(FeedError::AlreadyRunning)?;

        let mut deleted: u64 = 0;
        let mut idle_scans: u32 = 0;
        let mut state: FeedState<D::Element> = FeedState::Scanning;

        let outcome = loop {
            state = match state {
                FeedState::Scanning => {
                    if self.stop.is_stopped() {
                        break FeedOutcome {
                            end: FeedEnd::Stopped,
                            deleted,
                        };
                    }
                    let candidates = self.scan().await?;
                    if candidates.is_empty() {
                        // Nudge lazy loading before giving up on this round.
                        self.dom.scroll_to_bottom().await?;
                        sleep(self.pacing.scroll_settle).await;
                        if self.scan().await?.is_empty() {
                            idle_scans += 1;
                            debug!(
                                "empty rescan {}/{}",
                                idle_scans, self.options.max_idle_scans
                            );
                            if idle_scans >= self.options.max_idle_scans {
                                break FeedOutcome {
                                    end: FeedEnd::Exhausted,
                                    deleted,
                                };
                            }
                        } else {
                            idle_scans = 0;
                        }
                        sleep(self.pacing.iteration_delay).await;
                        FeedState::Scanning
                    } else {
                        idle_scans = 0;
                        let mut candidates = candidates.into_iter();
                        match candidates.next() {
                            Some(first) => {
                                if self.options.exclude_own_posts
                                    && self.is_excluded(&first).await?
                                {
                                    // Skipped, not consumed: the entry stays
                                    // in the feed for later passes.
                                    self.dismiss_menus().await?;
                                    sleep(self.pacing.iteration_delay).await;
                                    FeedState::Scanning
                                } else {
                                    FeedState::Acting(first)
                                }
                            }
                            None => FeedState::Scanning,
                        }
                    }
                }
                FeedState::Acting(candidate) => {
                    self.dom.click(&candidate).await?;
                    sleep(self.pacing.menu_settle).await;
                    FeedState::Confirming
                }
                FeedState::Confirming => match self.find_delete_option().await? {
                    None => {
                        // Menu had nothing actionable; abandon the candidate.
                        self.dismiss_menus().await?;
                        sleep(self.pacing.iteration_delay).await;
                        FeedState::Scanning
                    }
                    Some(option) => {
                        self.dom.click(&option).await?;
                        sleep(self.pacing.action_settle).await;
                        match self.find_confirm().await? {
                            Some(confirm) => {
                                self.dom.click(&confirm).await?;
                                sleep(self.pacing.confirm_settle).await;
                            }
                            None => sleep(self.pacing.action_settle).await,
                        }
                        FeedState::Counting
                    }
                },
                FeedState::Counting => {
                    deleted += 1;
                    self.sink.emit(ProgressNotice::UpdateCounter { count: deleted });
                    self.dismiss_menus().await?;
                    sleep(self.pacing.iteration_delay).await;
                    FeedState::Scanning
                }
            };
        };

        self.sink.emit(ProgressNotice::Finished {
            count: outcome.deleted,
        });
        Ok(outcome)
    }

    /// Locate every rendered entry that still qualifies for deletion.
    async fn scan(&self) -> Result<Vec<D::Element>, FeedError> {
        let buttons = self.dom.query_all(self.profile.menu_button_selector).await?;
        let mut found = Vec::new();
        for button in buttons {
            let label = self
                .dom
                .attr(&button, "aria-label")
                .await?
                .unwrap_or_default();
            let text = self
                .container_text(&button, self.profile.scan_container_selectors)
                .await?;
            if (self.profile.is_candidate)(&label, &text) {
                found.push(button);
            }
        }
        Ok(found)
    }

    async fn container_text(
        &self,
        element: &D::Element,
        selectors: &[&str],
    ) -> Result<String, FeedError> {
        for selector in selectors {
            if let Some(container) = self.dom.closest(element, selector).await? {
                return Ok(self.dom.text(&container).await?);
            }
        }
        Ok(String::new())
    }

    async fn is_excluded(&self, element: &D::Element) -> Result<bool, FeedError> {
        let text = self
            .container_text(element, self.profile.exclusion_container_selectors)
            .await?;
        Ok(!text.is_empty() && (self.profile.is_excluded)(&text))
    }

    async fn find_delete_option(&self) -> Result<Option<D::Element>, FeedError> {
        for item in self.dom.query_all(self.profile.menu_item_selector).await? {
            let label = self.dom.text(&item).await?;
            if (self.profile.is_delete_option)(&label) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    async fn find_confirm(&self) -> Result<Option<D::Element>, FeedError> {
        for button in self.dom.query_all(self.profile.confirm_selector).await? {
            let label = self.dom.text(&button).await?;
            if (self.profile.is_confirm)(&label) {
                return Ok(Some(button));
            }
        }
        Ok(None)
    }

    async fn dismiss_menus(&self) -> Result<(), FeedError> {
        self.dom.press_escape().await?;
        sleep(self.pacing.dismiss_settle).await;
        Ok(())
    }
}

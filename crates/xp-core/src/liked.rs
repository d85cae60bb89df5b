//! Viewer walk that removes reactions one item at a time.
//!
//! Some sites expose no activity feed for likes; the only path is to open
//! the first liked item in the media viewer and walk forward, un-reacting
//! each item, until the next-arrow runs out. Same pacing, stop, guard, and
//! notification discipline as the feed engine.

use std::time::Duration;

use crate::dom::{sleep, wait_for_element, DomError, PageDom, Pacing};
use crate::feed::{FeedEnd, FeedError, FeedOutcome};
use crate::notify::{ProgressNotice, ProgressSink};
use crate::session::{ActivityGuard, StopSignal};

const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Selectors for one platform's liked-media walk.
#[derive(Debug, Clone, Copy)]
pub struct LikedWalkProfile {
    pub profile_tab_selector: &'static str,
    pub liked_tab_selector: &'static str,
    pub first_item_selector: &'static str,
    pub unlike_selector: &'static str,
    pub next_selector: &'static str,
    pub close_selector: &'static str,
}

pub struct LikedWalker<'a, D: PageDom, S: ProgressSink> {
    dom: &'a D,
    profile: LikedWalkProfile,
    pacing: Pacing,
    stop: StopSignal,
    sink: &'a S,
}

impl<'a, D: PageDom, S: ProgressSink> LikedWalker<'a, D, S> {
    pub fn new(
        dom: &'a D,
        profile: LikedWalkProfile,
        pacing: Pacing,
        stop: StopSignal,
        sink: &'a S,
    ) -> Self {
        Self {
            dom,
            profile,
            pacing,
            stop,
            sink,
        }
    }

    /// Walk the liked list until it runs out or a stop lands. A missing
    /// entry point (no profile tab, nothing liked) is exhaustion, not an
    /// error.
    pub async fn run(&self, guard: &ActivityGuard) -> Result<FeedOutcome, FeedError> {
        let _permit = guard.try_acquire().ok_or(FeedError::AlreadyRunning)?;

        let mut deleted: u64 = 0;
        let end = self.walk(&mut deleted).await?;
        self.sink.emit(ProgressNotice::Finished { count: deleted });
        Ok(FeedOutcome { end, deleted })
    }

    async fn walk(&self, deleted: &mut u64) -> Result<FeedEnd, FeedError> {
        // Reach the viewer through profile -> liked tab -> first item.
        for selector in [
            self.profile.profile_tab_selector,
            self.profile.liked_tab_selector,
            self.profile.first_item_selector,
        ] {
            match wait_for_element(self.dom, selector, OPEN_TIMEOUT, self.pacing.poll_interval)
                .await
            {
                Ok(element) => {
                    self.dom.click(&element).await?;
                    sleep(self.pacing.view_settle).await;
                }
                Err(DomError::WaitTimeout { .. }) => return Ok(FeedEnd::Exhausted),
                Err(err) => return Err(err.into()),
            }
        }

        loop {
            if self.stop.is_stopped() {
                return Ok(FeedEnd::Stopped);
            }

            let Some(unlike) = self.first_match(self.profile.unlike_selector).await? else {
                // No like control means the end of the list (or a viewer
                // that fell apart); either way the walk is over.
                self.close_viewer().await?;
                return Ok(FeedEnd::Exhausted);
            };
            self.dom.click(&unlike).await?;
            *deleted += 1;
            self.sink.emit(ProgressNotice::UpdateCounter { count: *deleted });

            match self.first_match(self.profile.next_selector).await? {
                Some(next) => {
                    if self.is_disabled(&next).await? {
                        self.close_viewer().await?;
                        return Ok(FeedEnd::Exhausted);
                    }
                    self.dom.click(&next).await?;
                }
                None => {
                    self.close_viewer().await?;
                    return Ok(FeedEnd::Exhausted);
                }
            }

            sleep(self.pacing.step_interval).await;
        }
    }

    async fn first_match(&self, selector: &str) -> Result<Option<D::Element>, FeedError> {
        Ok(self.dom.query_all(selector).await?.into_iter().next())
    }

    async fn is_disabled(&self, element: &D::Element) -> Result<bool, FeedError> {
        Ok(self.dom.attr(element, "disabled").await?.is_some())
    }

    async fn close_viewer(&self) -> Result<(), FeedError> {
        if let Some(close) = self.first_match(self.profile.close_selector).await? {
            self.dom.click(&close).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::notify::ChannelSink;

    const TEST_WALK: LikedWalkProfile = LikedWalkProfile {
        profile_tab_selector: "a.profile",
        liked_tab_selector: "a.liked",
        first_item_selector: "div.first",
        unlike_selector: "button.unlike",
        next_selector: "button.next",
        close_selector: "button.close",
    };

    #[derive(Clone, Debug, PartialEq)]
    enum El {
        Profile,
        Liked,
        First,
        Unlike,
        Next,
        Close,
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Stage {
        Home,
        Profile,
        LikedGrid,
        Viewer,
    }

    struct ViewerState {
        stage: Stage,
        videos: u32,
        position: u32,
        unliked: u32,
        closed: bool,
    }

    struct FakeViewer {
        state: Mutex<ViewerState>,
        stop_after: Option<(u32, StopSignal)>,
    }

    impl FakeViewer {
        fn with_videos(videos: u32) -> Self {
            Self {
                state: Mutex::new(ViewerState {
                    stage: Stage::Home,
                    videos,
                    position: 0,
                    unliked: 0,
                    closed: false,
                }),
                stop_after: None,
            }
        }
    }

    #[async_trait]
    impl PageDom for FakeViewer {
        type Element = El;

        async fn query_all(&self, selector: &str) -> Result<Vec<El>, DomError> {
            let state = self.state.lock().unwrap();
            Ok(match selector {
                "a.profile" if state.stage == Stage::Home => vec![El::Profile],
                "a.liked" if state.stage == Stage::Profile => vec![El::Liked],
                "div.first" if state.stage == Stage::LikedGrid && state.videos > 0 => {
                    vec![El::First]
                }
                "button.unlike" if state.stage == Stage::Viewer && state.position < state.videos => {
                    vec![El::Unlike]
                }
                "button.next"
                    if state.stage == Stage::Viewer && state.position + 1 < state.videos =>
                {
                    vec![El::Next]
                }
                "button.close" if state.stage == Stage::Viewer => vec![El::Close],
                _ => vec![],
            })
        }

        async fn query_within(&self, _: &El, _: &str) -> Result<Vec<El>, DomError> {
            Ok(vec![])
        }
        async fn closest(&self, _: &El, _: &str) -> Result<Option<El>, DomError> {
            Ok(None)
        }
        async fn text(&self, _: &El) -> Result<String, DomError> {
            Ok(String::new())
        }
        async fn attr(&self, _: &El, _: &str) -> Result<Option<String>, DomError> {
            Ok(None)
        }
        async fn prop(&self, _: &El, _: &str) -> Result<Option<String>, DomError> {
            Ok(None)
        }

        async fn click(&self, element: &El) -> Result<(), DomError> {
            let mut state = self.state.lock().unwrap();
            match element {
                El::Profile => state.stage = Stage::Profile,
                El::Liked => state.stage = Stage::LikedGrid,
                El::First => state.stage = Stage::Viewer,
                El::Unlike => {
                    state.unliked += 1;
                    if let Some((after, stop)) = &self.stop_after {
                        if state.unliked >= *after {
                            stop.stop();
                        }
                    }
                }
                El::Next => state.position += 1,
                El::Close => {
                    state.closed = true;
                    state.stage = Stage::LikedGrid;
                }
            }
            Ok(())
        }

        async fn remove(&self, _: &El) -> Result<(), DomError> {
            Ok(())
        }
        async fn scroll_to_bottom(&self) -> Result<(), DomError> {
            Ok(())
        }
        async fn press_escape(&self) -> Result<(), DomError> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String, DomError> {
            Ok("https://example.com/".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unlikes_everything_then_closes_viewer() {
        let page = FakeViewer::with_videos(3);
        let (sink, mut rx) = ChannelSink::new();
        let walker = LikedWalker::new(
            &page,
            TEST_WALK,
            Pacing::default(),
            StopSignal::new(),
            &sink,
        );

        let outcome = walker.run(&ActivityGuard::new()).await.unwrap();
        assert_eq!(outcome.end, FeedEnd::Exhausted);
        assert_eq!(outcome.deleted, 3);

        let state = page.state.lock().unwrap();
        assert_eq!(state.unliked, 3);
        assert!(state.closed);
        drop(state);

        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        assert_eq!(
            notices,
            vec![
                ProgressNotice::UpdateCounter { count: 1 },
                ProgressNotice::UpdateCounter { count: 2 },
                ProgressNotice::UpdateCounter { count: 3 },
                ProgressNotice::Finished { count: 3 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_liked_is_exhaustion_not_an_error() {
        let page = FakeViewer::with_videos(0);
        let (sink, mut rx) = ChannelSink::new();
        let walker = LikedWalker::new(
            &page,
            TEST_WALK,
            Pacing::default(),
            StopSignal::new(),
            &sink,
        );

        let outcome = walker.run(&ActivityGuard::new()).await.unwrap();
        assert_eq!(outcome.end, FeedEnd::Exhausted);
        assert_eq!(outcome.deleted, 0);
        assert_eq!(rx.try_recv().unwrap(), ProgressNotice::Finished { count: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lands_between_steps() {
        let stop = StopSignal::new();
        let mut page = FakeViewer::with_videos(5);
        page.stop_after = Some((2, stop.clone()));
        let (sink, _rx) = ChannelSink::new();
        let walker = LikedWalker::new(&page, TEST_WALK, Pacing::default(), stop, &sink);

        let outcome = walker.run(&ActivityGuard::new()).await.unwrap();
        assert_eq!(outcome.end, FeedEnd::Stopped);
        assert_eq!(outcome.deleted, 2);
        // Stopped mid-walk: the viewer is left as-is.
        assert!(!page.state.lock().unwrap().closed);
    }
}

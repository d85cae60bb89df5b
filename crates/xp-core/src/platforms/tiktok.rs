//! TikTok descriptor: liked-video walk plus orchestrated inbox comment
//! deletion.
//!
//! Comment deletion cannot run inside one page: each comment lives on its
//! own video page, reached from the inbox, so the cross-context
//! orchestrator drives it through [`InboxSurface`].

use std::time::Duration;

use async_trait::async_trait;

use crate::dom::{sleep, wait_for_element, DomError, PageDom};
use crate::liked::LikedWalkProfile;
use crate::platform::{ActivityType, CleanupPlan, Platform};
use crate::protocol::{PageKind, RelayRequest, RelayResponse};
use crate::relay::{Relay, RelayError};

pub const EXPLORE_URL: &str = "https://www.tiktok.com/explore";
const HOME_URL: &str = "https://www.tiktok.com/";

const POLL: Duration = Duration::from_millis(200);
const USERNAME_TIMEOUT: Duration = Duration::from_secs(3);
const TAB_TIMEOUT: Duration = Duration::from_secs(5);
const TAB_SETTLE: Duration = Duration::from_secs(2);
const WRAPPER_TIMEOUT: Duration = Duration::from_secs(5);
const COMMENT_SETTLE: Duration = Duration::from_secs(1);
const CONTROL_TIMEOUT: Duration = Duration::from_secs(3);
const CONFIRM_SETTLE: Duration = Duration::from_millis(1500);

mod sel {
    pub const NAV_PROFILE: &str = "[data-e2e=\"nav-profile\"]";
    pub const COMMENTS_TAB: &str = "[data-e2e=\"comments\"]";
    pub const INBOX_ITEM: &str = "[data-e2e=\"inbox-list-item\"]";
    pub const INBOX_ITEM_LINK: &str = "a[href*=\"/video/\"]";
    pub const COMMENT_WRAPPER: &str = "[class*=\"CommentItemWrapper\"]";
    pub const COMMENT_MORE: &str = "[class*=\"DivMore\"][aria-haspopup=\"dialog\"]";
    pub const COMMENT_MORE_FALLBACK: &str = "div[aria-haspopup=\"dialog\"]";
    pub const COMMENT_DELETE: &str = "[data-e2e=\"comment-delete\"]";
    pub const COMMENT_CONFIRM: &str = "[data-e2e=\"comment-modal-delete\"]";
    pub const LIKED_TAB: &str = "[data-e2e=\"liked-tab\"]";
    pub const PLAYER: &str = "[class*=\"DivPlayerContainer\"]";
    pub const UNLIKE: &str = "[data-e2e=\"browse-like-icon\"]";
    pub const NEXT: &str = "[data-e2e=\"arrow-right\"]";
    pub const CLOSE: &str = "[data-e2e=\"browse-close\"]";
}

pub const LIKED_WALK: LikedWalkProfile = LikedWalkProfile {
    profile_tab_selector: sel::NAV_PROFILE,
    liked_tab_selector: sel::LIKED_TAB,
    first_item_selector: sel::PLAYER,
    unlike_selector: sel::UNLIKE,
    next_selector: sel::NEXT,
    close_selector: sel::CLOSE,
};

/// Classify the current URL for the orchestrated comment flow.
pub fn classify_page(url: &str) -> PageKind {
    if url.contains("/explore") {
        PageKind::Index
    } else if url.contains("/video/") {
        PageKind::Item
    } else {
        PageKind::Unknown
    }
}

/// Extract the handle from a profile link href (`/@user?...`, absolute or
/// relative).
fn username_from_href(href: &str) -> Option<String> {
    let start = href.find("/@")? + 2;
    let name: String = href[start..]
        .chars()
        .take_while(|c| *c != '?' && *c != '/')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

pub struct TikTokPlatform;

impl Platform for TikTokPlatform {
    fn id(&self) -> &'static str {
        "tiktok"
    }

    fn name(&self) -> &'static str {
        "TikTok"
    }

    fn domain(&self) -> &'static str {
        "tiktok.com"
    }

    fn activity_url(&self, activity: ActivityType) -> Option<&'static str> {
        Some(match activity {
            ActivityType::Comments => EXPLORE_URL,
            // Reactions start at home; the walker reaches the liked grid
            // through the profile tab itself.
            ActivityType::Reactions => HOME_URL,
        })
    }

    fn matches_activity_page(&self, activity: ActivityType, url: &str) -> bool {
        match activity {
            ActivityType::Comments => self.on_site(url) && url.contains("/explore"),
            ActivityType::Reactions => self.on_site(url),
        }
    }

    fn matches_any_activity(&self, url: &str) -> bool {
        self.on_site(url)
    }

    fn on_site(&self, url: &str) -> bool {
        url.contains("tiktok.com")
    }

    fn manual_instructions(&self, activity: ActivityType) -> String {
        format!("Navigate to your profile to see your {activity}")
    }

    fn cleanup_plan(&self, activity: ActivityType) -> CleanupPlan {
        match activity {
            ActivityType::Comments => CleanupPlan::Orchestrated,
            ActivityType::Reactions => CleanupPlan::LikedWalk(LIKED_WALK),
        }
    }
}

/// Page-side executor for the orchestrated comment flow.
///
/// Plays the relay role: every operation runs against the live DOM of
/// whatever page the tab currently shows, and answers with a structured
/// payload or an error the coordinator can reason about.
pub struct InboxSurface<D> {
    dom: D,
}

impl<D: PageDom> InboxSurface<D> {
    pub fn new(dom: D) -> Self {
        Self { dom }
    }

    async fn page_type(&self) -> Result<RelayResponse, DomError> {
        let url = self.dom.current_url().await?;
        Ok(RelayResponse::PageType {
            page_type: classify_page(&url),
        })
    }

    async fn username(&self) -> Result<RelayResponse, DomError> {
        let username =
            match wait_for_element(&self.dom, sel::NAV_PROFILE, USERNAME_TIMEOUT, POLL).await {
                Ok(profile) => self
                    .dom
                    .attr(&profile, "href")
                    .await?
                    .as_deref()
                    .and_then(username_from_href),
                Err(DomError::WaitTimeout { .. }) => None,
                Err(err) => return Err(err),
            };
        Ok(RelayResponse::Username { username })
    }

    async fn click_comments_tab(&self) -> Result<RelayResponse, DomError> {
        match wait_for_element(&self.dom, sel::COMMENTS_TAB, TAB_TIMEOUT, POLL).await {
            Ok(tab) => {
                self.dom.click(&tab).await?;
                sleep(TAB_SETTLE).await;
                Ok(RelayResponse::TabSelected {
                    success: true,
                    error: None,
                })
            }
            Err(DomError::WaitTimeout { selector }) => Ok(RelayResponse::TabSelected {
                success: false,
                error: Some(format!("no element matched '{selector}'")),
            }),
            Err(err) => Err(err),
        }
    }

    async fn inbox_items(&self) -> Result<RelayResponse, DomError> {
        let items = self.dom.query_all(sel::INBOX_ITEM).await?;
        let first_item_url = match items.first() {
            Some(first) => {
                match self
                    .dom
                    .query_within(first, sel::INBOX_ITEM_LINK)
                    .await?
                    .into_iter()
                    .next()
                {
                    // The property, not the attribute: targets must be
                    // absolute URLs the coordinator can navigate to.
                    Some(link) => self.dom.prop(&link, "href").await?,
                    None => None,
                }
            }
            None => None,
        };
        Ok(RelayResponse::InboxItems {
            count: items.len(),
            first_item_url,
        })
    }

    async fn remove_first(&self) -> Result<RelayResponse, DomError> {
        match self.dom.query_all(sel::INBOX_ITEM).await?.into_iter().next() {
            Some(item) => {
                self.dom.remove(&item).await?;
                Ok(RelayResponse::ItemRemoved { removed: true })
            }
            None => Ok(RelayResponse::ItemRemoved { removed: false }),
        }
    }

    async fn delete_comment(&self, username: &str) -> Result<RelayResponse, DomError> {
        // Comments render late; a video with none never grows a wrapper.
        let _ = wait_for_element(&self.dom, sel::COMMENT_WRAPPER, WRAPPER_TIMEOUT, POLL).await;
        sleep(COMMENT_SETTLE).await;

        let Some(menu) = self.find_comment_menu(username).await? else {
            return Ok(RelayResponse::CommentDeleted {
                found: false,
                deleted: false,
                error: None,
            });
        };
        self.dom.click(&menu).await?;
        sleep(COMMENT_SETTLE).await;

        if !self.click_present(sel::COMMENT_DELETE, CONTROL_TIMEOUT).await? {
            return Ok(RelayResponse::CommentDeleted {
                found: true,
                deleted: false,
                error: Some("delete control did not appear".into()),
            });
        }
        sleep(COMMENT_SETTLE).await;

        if !self.click_present(sel::COMMENT_CONFIRM, CONTROL_TIMEOUT).await? {
            return Ok(RelayResponse::CommentDeleted {
                found: true,
                deleted: false,
                error: Some("confirmation control did not appear".into()),
            });
        }
        sleep(CONFIRM_SETTLE).await;

        Ok(RelayResponse::CommentDeleted {
            found: true,
            deleted: true,
            error: None,
        })
    }

    /// Find the three-dot menu of the comment authored by `username` on the
    /// current video page.
    async fn find_comment_menu(&self, username: &str) -> Result<Option<D::Element>, DomError> {
        let own_link = format!("a[href=\"/@{username}\"]");
        for wrapper in self.dom.query_all(sel::COMMENT_WRAPPER).await? {
            if self.dom.query_within(&wrapper, &own_link).await?.is_empty() {
                continue;
            }
            if let Some(more) = self
                .dom
                .query_within(&wrapper, sel::COMMENT_MORE)
                .await?
                .into_iter()
                .next()
            {
                return Ok(Some(more));
            }
            return Ok(self
                .dom
                .query_within(&wrapper, sel::COMMENT_MORE_FALLBACK)
                .await?
                .into_iter()
                .next());
        }
        Ok(None)
    }

    async fn click_present(&self, selector: &str, timeout: Duration) -> Result<bool, DomError> {
        match wait_for_element(&self.dom, selector, timeout, POLL).await {
            Ok(element) => {
                self.dom.click(&element).await?;
                Ok(true)
            }
            Err(DomError::WaitTimeout { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl<D: PageDom> Relay for InboxSurface<D> {
    async fn call(&self, request: RelayRequest) -> Result<RelayResponse, RelayError> {
        let result = match request {
            RelayRequest::GetPageType => self.page_type().await,
            RelayRequest::GetUsername => self.username().await,
            RelayRequest::ClickCommentsTab => self.click_comments_tab().await,
            RelayRequest::GetInboxItems => self.inbox_items().await,
            RelayRequest::DeleteComment { username } => self.delete_comment(&username).await,
            RelayRequest::RemoveFirstInboxItem => self.remove_first().await,
        };
        match result {
            Ok(response) => Ok(response),
            // The page is reachable but the operation could not complete;
            // report it on the wire instead of dropping the session.
            Err(DomError::WaitTimeout { selector }) => Ok(RelayResponse::Error {
                error: format!("timeout: no element matched '{selector}'"),
            }),
            Err(DomError::Backend(message)) => Err(RelayError::Unreachable(message)),
        }
    }
}

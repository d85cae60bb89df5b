//! Facebook descriptor: activity-log cleanup for comments and reactions.
//!
//! Both activity types render in the same activity-log feed, so both use
//! the single-context feed engine; only the entry URL differs.

use crate::feed::FeedProfile;
use crate::heuristics;
use crate::platform::{ActivityType, CleanupPlan, Platform};

const COMMENTS_URL: &str =
    "https://www.facebook.com/me/allactivity?activity_history=false&category_key=COMMENTSCLUSTER";
const REACTIONS_URL: &str =
    "https://www.facebook.com/me/allactivity?activity_history=false&category_key=LIKEDPOSTS";

/// Feed profile for the activity log. The log exposes no stable hooks
/// beyond ARIA roles, so candidate detection leans on the text classifiers.
pub const FEED_PROFILE: FeedProfile = FeedProfile {
    menu_button_selector: "[role=\"button\"]",
    scan_container_selectors: &["div[role=\"main\"]", "[data-pagelet]"],
    exclusion_container_selectors: &["[role=\"article\"]", "div[data-ad-preview]", "li"],
    menu_item_selector: "[role=\"menuitem\"]",
    confirm_selector: "[role=\"button\"]",
    is_candidate: heuristics::is_activity_entry,
    is_excluded: heuristics::is_own_post_comment,
    is_delete_option: heuristics::is_delete_option,
    is_confirm: heuristics::is_confirm_label,
};

pub struct FacebookPlatform;

impl Platform for FacebookPlatform {
    fn id(&self) -> &'static str {
        "facebook"
    }

    fn name(&self) -> &'static str {
        "Facebook"
    }

    fn domain(&self) -> &'static str {
        "facebook.com"
    }

    fn activity_url(&self, activity: ActivityType) -> Option<&'static str> {
        Some(match activity {
            ActivityType::Comments => COMMENTS_URL,
            ActivityType::Reactions => REACTIONS_URL,
        })
    }

    fn matches_activity_page(&self, activity: ActivityType, url: &str) -> bool {
        let marker = match activity {
            ActivityType::Comments => "COMMENTSCLUSTER",
            ActivityType::Reactions => "LIKEDPOSTS",
        };
        self.matches_any_activity(url) && url.contains(marker)
    }

    fn matches_any_activity(&self, url: &str) -> bool {
        self.on_site(url) && url.contains("allactivity")
    }

    fn on_site(&self, url: &str) -> bool {
        url.contains("facebook.com")
    }

    fn cleanup_plan(&self, _activity: ActivityType) -> CleanupPlan {
        CleanupPlan::Feed(FEED_PROFILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_activity_pages_by_category_marker() {
        let platform = FacebookPlatform;
        let comments =
            "https://www.facebook.com/me/allactivity?activity_history=false&category_key=COMMENTSCLUSTER";
        assert!(platform.matches_activity_page(ActivityType::Comments, comments));
        assert!(!platform.matches_activity_page(ActivityType::Reactions, comments));
        assert!(platform.matches_any_activity(comments));
        assert!(platform.on_site("https://www.facebook.com/groups/1"));
        assert!(!platform.on_site("https://www.tiktok.com/explore"));
    }

    #[test]
    fn both_activity_types_use_the_feed_engine() {
        let platform = FacebookPlatform;
        assert!(matches!(
            platform.cleanup_plan(ActivityType::Comments),
            CleanupPlan::Feed(_)
        ));
        assert!(matches!(
            platform.cleanup_plan(ActivityType::Reactions),
            CleanupPlan::Feed(_)
        ));
        assert!(!platform.requires_manual_navigation());
    }
}

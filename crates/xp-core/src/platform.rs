//! Platform descriptor interface.
//!
//! A platform is a per-site capability bundle: navigation URLs, page-type
//! predicates, and a cleanup capability. Implementations are interchangeable
//! and are dispatched only through this interface; loop code never compares
//! identifier strings. The single- vs cross-context distinction is a
//! capability ([`CleanupPlan`]), not a special case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::feed::FeedProfile;
use crate::liked::LikedWalkProfile;

/// Activity categories a platform can clean up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Comments,
    Reactions,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Comments => "comments",
            ActivityType::Reactions => "reactions",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comments" | "comment" => Ok(ActivityType::Comments),
            "reactions" | "reaction" | "likes" => Ok(ActivityType::Reactions),
            other => Err(format!(
                "unknown activity type '{other}' (expected 'comments' or 'reactions')"
            )),
        }
    }
}

/// How cleanup for a given activity executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationModel {
    /// Runs entirely inside one loaded page.
    SingleContext,
    /// Needs tab navigation between an index view and item pages, driven by
    /// the cross-context orchestrator.
    CrossContext,
}

impl fmt::Display for NavigationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NavigationModel::SingleContext => "single-context",
            NavigationModel::CrossContext => "cross-context",
        })
    }
}

/// Self-contained cleanup capability for one (platform, activity) pair.
#[derive(Debug, Clone, Copy)]
pub enum CleanupPlan {
    /// Menu-driven removal inside a single activity feed page.
    Feed(FeedProfile),
    /// Viewer walk that un-reacts items one at a time.
    LikedWalk(LikedWalkProfile),
    /// Index/item alternation driven by the cross-context orchestrator.
    Orchestrated,
}

impl CleanupPlan {
    pub fn navigation(&self) -> NavigationModel {
        match self {
            CleanupPlan::Orchestrated => NavigationModel::CrossContext,
            _ => NavigationModel::SingleContext,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CleanupPlan::Feed(_) => "feed",
            CleanupPlan::LikedWalk(_) => "liked-walk",
            CleanupPlan::Orchestrated => "orchestrated",
        }
    }
}

/// Per-site capability bundle. Immutable once registered.
pub trait Platform: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn domain(&self) -> &'static str;

    /// URL that enumerates the given activity, when the platform can be
    /// navigated there automatically.
    fn activity_url(&self, activity: ActivityType) -> Option<&'static str>;

    /// URL predicate: currently on the page listing this activity type.
    fn matches_activity_page(&self, activity: ActivityType, url: &str) -> bool;

    /// URL predicate: on any activity page (catch-all).
    fn matches_any_activity(&self, url: &str) -> bool;

    /// URL predicate: anywhere on the platform's site.
    fn on_site(&self, url: &str) -> bool;

    /// Whether the user must navigate to the activity view themselves.
    fn requires_manual_navigation(&self) -> bool {
        false
    }

    /// Instructions shown when manual navigation is required.
    fn manual_instructions(&self, _activity: ActivityType) -> String {
        String::new()
    }

    /// Cleanup capability for the activity type.
    fn cleanup_plan(&self, activity: ActivityType) -> CleanupPlan;

    fn navigation(&self, activity: ActivityType) -> NavigationModel {
        self.cleanup_plan(activity).navigation()
    }
}

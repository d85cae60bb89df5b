//! Best-effort text classifiers over the target UI.
//!
//! These predicates encode coupling to unversioned page markup and copy, so
//! they live behind this narrow seam instead of inside loop logic. All
//! matching is lowercase-normalized.

/// True for a contextual-menu control that belongs to an activity entry
/// (reacted/liked/commented/shared) rather than a chat row.
pub fn is_activity_entry(aria_label: &str, container_text: &str) -> bool {
    if !aria_label.to_lowercase().contains("more options") {
        return false;
    }
    let text = container_text.to_lowercase();
    if text.contains("delete chat") || text.contains("archive chat") {
        return false;
    }
    text.contains("reacted")
        || text.contains("liked")
        || text.contains("commented")
        || text.contains("shared")
}

/// True when the entry text indicates a comment left on the user's own
/// post.
///
/// Grouping is deliberate and pinned by test: "your post" alone only counts
/// together with a "comment" mention somewhere in the same entry.
pub fn is_own_post_comment(container_text: &str) -> bool {
    let text = container_text.to_lowercase();
    text.contains("you commented on your")
        || (text.contains("your post") && text.contains("comment"))
}

/// True for a menu item that deletes/unlikes/removes the entry. Anything
/// mentioning "chat" is rejected outright.
pub fn is_delete_option(label: &str) -> bool {
    let text = label.to_lowercase();
    if text.contains("chat") {
        return false;
    }
    ["unlike", "delete", "remove", "move to trash", "move to bin"]
        .iter()
        .any(|keyword| text.contains(keyword))
}

/// True for a second-stage confirmation control. Matched on the exact
/// trimmed label, not a substring, so ordinary buttons don't qualify.
pub fn is_confirm_label(label: &str) -> bool {
    let text = label.trim().to_lowercase();
    if text.contains("chat") {
        return false;
    }
    matches!(
        text.as_str(),
        "delete" | "confirm" | "remove" | "move to trash" | "move to bin"
    )
}

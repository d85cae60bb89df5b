//! Wire protocol between the coordinator, the page relay, and a driving UI.
//!
//! Every relay reply is either a structured success payload or an
//! `{ "error": ... }` object; a request with an unknown action answers
//! `{ "error": "Unknown action" }` without reaching the relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::relay::{Relay, RelayError};
use crate::session::SessionSnapshot;

/// Page classification reported by the relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// A view enumerating candidate items (inbox, activity feed).
    Index,
    /// A view focused on one item where the delete action happens.
    Item,
    /// Anything else.
    #[default]
    Unknown,
}

/// Requests the coordinator issues to the page relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RelayRequest {
    GetPageType,
    GetUsername,
    ClickCommentsTab,
    GetInboxItems,
    DeleteComment { username: String },
    RemoveFirstInboxItem,
}

/// Relay replies. Shapes mirror the request they answer; `Error` carries a
/// condition the relay observed but could not satisfy (element missing,
/// page not ready).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayResponse {
    #[serde(rename_all = "camelCase")]
    PageType { page_type: PageKind },
    #[serde(rename_all = "camelCase")]
    InboxItems {
        count: usize,
        first_item_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CommentDeleted {
        found: bool,
        #[serde(default)]
        deleted: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TabSelected {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ItemRemoved { removed: bool },
    #[serde(rename_all = "camelCase")]
    Error { error: String },
    #[serde(rename_all = "camelCase")]
    Username { username: Option<String> },
}

/// Control messages from a driving UI to the background coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlRequest {
    #[serde(rename_all = "camelCase")]
    StartTikTokCommentDeletion {
        #[serde(default)]
        tab_id: Option<String>,
    },
    StopDeletion,
    GetDeletionState,
}

/// Coordinator replies to control messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlResponse {
    Started { started: bool },
    Stopped { stopped: bool },
    State(SessionSnapshot),
}

/// Execute a raw wire request against a relay. Malformed or unknown actions
/// are answered locally.
pub async fn dispatch_wire<R: Relay>(relay: &R, raw: Value) -> Result<RelayResponse, RelayError> {
    match serde_json::from_value::<RelayRequest>(raw) {
        Ok(request) => relay.call(request).await,
        Err(_) => Ok(RelayResponse::Error {
            error: "Unknown action".to_string(),
        }),
    }
}

//! Expunge Core Library
//!
//! Engine for bulk deletion of a user's own social-media activity by
//! driving the site's live web UI, not a documented API. The heart of the
//! crate is the cross-context split: a coordinator that may navigate the
//! tab but never touches the DOM, and page-side routines that act on the
//! DOM but cannot navigate themselves. Everything is written against
//! traits, so the engine runs unchanged against a WebDriver session or an
//! in-memory fake.
//!
//! # Modules
//!
//! - `dom`: bounded-wait element polling and interaction primitives
//! - `heuristics`: text classifiers over the target UI (own-post, menu
//!   labels)
//! - `feed`: in-page scan/act/confirm/count state machine
//! - `liked`: viewer walk for un-reacting liked media
//! - `platform` / `platforms` / `registry`: per-site capability bundles
//! - `protocol` / `relay`: typed coordinator <-> page wire protocol
//! - `orchestrator` / `controller` / `session`: the navigation-based
//!   deletion session and its control surface
//! - `notify`: fire-and-forget progress events

pub mod controller;
pub mod dom;
pub mod feed;
pub mod heuristics;
pub mod liked;
pub mod notify;
pub mod orchestrator;
pub mod platform;
pub mod platforms;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod session;

// Re-export commonly used types
pub use dom::{sleep, wait_for_element, DomError, PageDom, Pacing};
pub use feed::{FeedEngine, FeedEnd, FeedOptions, FeedOutcome};
pub use notify::{ProgressNotice, ProgressSink};
pub use platform::{ActivityType, CleanupPlan, NavigationModel, Platform};
pub use registry::PlatformRegistry;
pub use session::{ActivityGuard, DeletionSession, StopSignal};

//! Selector/action primitives over a live page.
//!
//! Everything above this layer (feed engine, liked walker, relay surfaces)
//! drives the page exclusively through [`PageDom`], so the whole engine runs
//! against an in-memory fake in tests and against a WebDriver session in the
//! CLI.

use std::time::Duration;

use async_trait::async_trait;

/// Error type for page interaction.
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    /// The polled selector never matched before the deadline. Recoverable:
    /// callers treat this as "element not present yet", not as a failure,
    /// unless explicitly documented otherwise.
    #[error("timeout: no element matched '{selector}'")]
    WaitTimeout { selector: String },
    /// The page backend (driver connection) failed.
    #[error("page backend error: {0}")]
    Backend(String),
}

/// Abstract DOM surface of the page currently loaded in the driven tab.
///
/// Selectors are CSS. All operations act on the live document; element
/// handles become stale when the page navigates.
#[async_trait]
pub trait PageDom: Send + Sync {
    type Element: Clone + Send + Sync;

    /// All elements currently matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>, DomError>;

    /// Elements matching `selector` inside `scope`.
    async fn query_within(
        &self,
        scope: &Self::Element,
        selector: &str,
    ) -> Result<Vec<Self::Element>, DomError>;

    /// Nearest ancestor (or self) of `element` matching `selector`.
    async fn closest(
        &self,
        element: &Self::Element,
        selector: &str,
    ) -> Result<Option<Self::Element>, DomError>;

    /// Rendered text content of the element and its descendants.
    async fn text(&self, element: &Self::Element) -> Result<String, DomError>;

    /// Attribute value as written in the markup.
    async fn attr(&self, element: &Self::Element, name: &str)
        -> Result<Option<String>, DomError>;

    /// DOM property value (e.g. `href` resolved to an absolute URL).
    async fn prop(&self, element: &Self::Element, name: &str)
        -> Result<Option<String>, DomError>;

    /// Simulated user click.
    async fn click(&self, element: &Self::Element) -> Result<(), DomError>;

    /// Detach the element from the document.
    async fn remove(&self, element: &Self::Element) -> Result<(), DomError>;

    /// Scroll the viewport to the bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<(), DomError>;

    /// Dispatch an Escape keydown at the document, closing open menus.
    async fn press_escape(&self) -> Result<(), DomError>;

    /// URL of the currently loaded page.
    async fn current_url(&self) -> Result<String, DomError>;
}

/// Poll the live document at a fixed interval; resolves with the first
/// matching element as soon as one exists, fails with
/// [`DomError::WaitTimeout`] once the deadline passes.
pub async fn wait_for_element<D: PageDom>(
    dom: &D,
    selector: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<D::Element, DomError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(element) = dom.query_all(selector).await?.into_iter().next() {
            return Ok(element);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(DomError::WaitTimeout {
                selector: selector.to_string(),
            });
        }
        sleep(poll).await;
    }
}

/// Cooperative settle delay. No side effects; never blocks other work in
/// the same context.
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Settle delays between interaction steps on the driven page.
///
/// The target pages render asynchronously; shaving these delays causes
/// silent action failures (a click lands before the menu exists).
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Interval between element polls in [`wait_for_element`].
    pub poll_interval: Duration,
    /// Wait after opening a contextual menu.
    pub menu_settle: Duration,
    /// Wait after clicking a menu option.
    pub action_settle: Duration,
    /// Wait after a second-stage confirmation click.
    pub confirm_settle: Duration,
    /// Wait after dismissing menus with Escape.
    pub dismiss_settle: Duration,
    /// Wait for lazy-loaded content after scrolling.
    pub scroll_settle: Duration,
    /// Delay between full loop iterations.
    pub iteration_delay: Duration,
    /// Cadence of the viewer walk (one item per step).
    pub step_interval: Duration,
    /// Wait after opening a profile/tab/viewer view.
    pub view_settle: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            menu_settle: Duration::from_millis(1500),
            action_settle: Duration::from_millis(1500),
            confirm_settle: Duration::from_millis(2000),
            dismiss_settle: Duration::from_millis(500),
            scroll_settle: Duration::from_millis(3000),
            iteration_delay: Duration::from_millis(1500),
            step_interval: Duration::from_millis(2000),
            view_settle: Duration::from_millis(5000),
        }
    }
}

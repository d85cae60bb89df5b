//! thirtyfour-backed implementations of the page and navigation seams.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;

use xp_core::dom::{sleep, DomError, PageDom};
use xp_core::relay::{Navigator, RelayError};

/// Extra wait after the load event before the page is considered usable.
pub const NAVIGATION_SETTLE: Duration = Duration::from_secs(2);

const READY_POLLS: u32 = 150;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

const ESCAPE_JS: &str = "document.dispatchEvent(new KeyboardEvent('keydown', \
    { key: 'Escape', code: 'Escape', keyCode: 27, which: 27, bubbles: true }));";

/// Build Chrome capabilities and connect to a chromedriver endpoint.
pub async fn connect(
    webdriver_url: &str,
    headless: bool,
    user_data_dir: Option<&str>,
) -> Result<WebDriver, String> {
    let mut caps = ChromeCapabilities::new();
    caps.add_arg("--no-first-run")
        .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    caps.add_arg("--no-default-browser-check")
        .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    caps.add_arg("--disable-default-apps")
        .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    if let Some(dir) = user_data_dir {
        let arg = format!("--user-data-dir={}", dir);
        caps.add_arg(&arg)
            .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    }
    if headless {
        caps.add_arg("--headless=new")
            .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
        caps.add_arg("--disable-gpu")
            .map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    }

    WebDriver::new(webdriver_url, caps)
        .await
        .map_err(|e| format!("Failed to connect to chromedriver: {}", e))
}

/// Navigate and wait for the document to finish loading, plus settle time.
pub async fn goto_settled(driver: &WebDriver, url: &str, settle: Duration) -> Result<(), String> {
    driver
        .goto(url)
        .await
        .map_err(|e| format!("Failed to navigate to '{}': {}", url, e))?;
    wait_for_ready(driver)
        .await
        .map_err(|e| format!("Failed waiting for '{}' to load: {}", url, e))?;
    sleep(settle).await;
    Ok(())
}

async fn wait_for_ready(driver: &WebDriver) -> WebDriverResult<()> {
    for _ in 0..READY_POLLS {
        let ret = driver
            .execute("return document.readyState;", Vec::<Value>::new())
            .await?;
        if ret.json().as_str() == Some("complete") {
            return Ok(());
        }
        sleep(READY_POLL_INTERVAL).await;
    }
    // Never reached "complete"; the settle delay still applies and slow
    // pages get picked up by element polling downstream.
    Ok(())
}

fn backend(err: impl std::fmt::Display) -> DomError {
    DomError::Backend(err.to_string())
}

/// Live page surface over a WebDriver session.
#[derive(Clone)]
pub struct WebDriverPage {
    driver: WebDriver,
}

impl WebDriverPage {
    pub fn new(driver: WebDriver) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl PageDom for WebDriverPage {
    type Element = WebElement;

    async fn query_all(&self, selector: &str) -> Result<Vec<WebElement>, DomError> {
        self.driver
            .find_all(By::Css(selector))
            .await
            .map_err(backend)
    }

    async fn query_within(
        &self,
        scope: &WebElement,
        selector: &str,
    ) -> Result<Vec<WebElement>, DomError> {
        scope.find_all(By::Css(selector)).await.map_err(backend)
    }

    async fn closest(
        &self,
        element: &WebElement,
        selector: &str,
    ) -> Result<Option<WebElement>, DomError> {
        let args = vec![
            element.to_json().map_err(backend)?,
            Value::String(selector.to_string()),
        ];
        let ret = self
            .driver
            .execute("return arguments[0].closest(arguments[1]);", args)
            .await
            .map_err(backend)?;
        if ret.json().is_null() {
            Ok(None)
        } else {
            ret.element().map(Some).map_err(backend)
        }
    }

    async fn text(&self, element: &WebElement) -> Result<String, DomError> {
        element.text().await.map_err(backend)
    }

    async fn attr(&self, element: &WebElement, name: &str) -> Result<Option<String>, DomError> {
        element.attr(name).await.map_err(backend)
    }

    async fn prop(&self, element: &WebElement, name: &str) -> Result<Option<String>, DomError> {
        element.prop(name).await.map_err(backend)
    }

    async fn click(&self, element: &WebElement) -> Result<(), DomError> {
        element.click().await.map_err(backend)
    }

    async fn remove(&self, element: &WebElement) -> Result<(), DomError> {
        let args = vec![element.to_json().map_err(backend)?];
        self.driver
            .execute("arguments[0].remove();", args)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), DomError> {
        self.driver
            .execute(
                "window.scrollTo(0, document.body.scrollHeight);",
                Vec::<Value>::new(),
            )
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), DomError> {
        self.driver
            .execute(ESCAPE_JS, Vec::<Value>::new())
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DomError> {
        self.driver
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(backend)
    }
}

/// Tab navigation with the load-completion contract.
pub struct WebDriverNavigator {
    driver: WebDriver,
    settle: Duration,
}

impl WebDriverNavigator {
    pub fn new(driver: WebDriver, settle: Duration) -> Self {
        Self { driver, settle }
    }
}

#[async_trait]
impl Navigator for WebDriverNavigator {
    async fn goto(&self, url: &str) -> Result<(), RelayError> {
        goto_settled(&self.driver, url, self.settle)
            .await
            .map_err(RelayError::Unreachable)
    }
}

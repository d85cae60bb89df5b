//! The `run` command: wire a platform's cleanup plan to a live browser.

use thirtyfour::WebDriver;

use xp_core::controller::SessionController;
use xp_core::dom::Pacing;
use xp_core::feed::{FeedEnd, FeedEngine, FeedOptions, FeedOutcome};
use xp_core::liked::LikedWalker;
use xp_core::notify::{ProgressNotice, ProgressSink};
use xp_core::orchestrator::SessionConfig;
use xp_core::platform::{ActivityType, CleanupPlan, Platform};
use xp_core::platforms::tiktok;
use xp_core::protocol::{ControlRequest, ControlResponse};
use xp_core::registry;
use xp_core::session::{ActivityGuard, StopSignal};

use crate::webdriver::{self, WebDriverNavigator, WebDriverPage, NAVIGATION_SETTLE};

pub struct RunOptions {
    pub platform: String,
    pub activity: ActivityType,
    pub exclude_own_posts: bool,
    pub webdriver_url: String,
    pub headless: bool,
    pub user_data_dir: Option<String>,
}

/// Progress printer for the terminal.
struct PrintSink;

impl ProgressSink for PrintSink {
    fn emit(&self, notice: ProgressNotice) {
        match notice {
            ProgressNotice::UpdateCounter { count } => println!("  deleted {}", count),
            ProgressNotice::Finished { count } => println!("Finished: {} deleted", count),
        }
    }
}

pub fn run_session(opts: RunOptions) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_session_async(opts))
}

async fn run_session_async(opts: RunOptions) -> Result<(), String> {
    let platform = registry::global()
        .get(&opts.platform)
        .ok_or_else(|| format!("Unknown platform '{}'", opts.platform))?;

    let driver = webdriver::connect(
        &opts.webdriver_url,
        opts.headless,
        opts.user_data_dir.as_deref(),
    )
    .await?;

    let result = drive_cleanup(platform, &opts, &driver).await;

    driver.quit().await.ok();
    result
}

async fn drive_cleanup(
    platform: &dyn Platform,
    opts: &RunOptions,
    driver: &WebDriver,
) -> Result<(), String> {
    let stop = StopSignal::new();
    spawn_stop_on_ctrl_c(stop.clone());

    if platform.requires_manual_navigation() {
        println!("{}", platform.manual_instructions(opts.activity));
    } else if let Some(url) = platform.activity_url(opts.activity) {
        println!("Opening {}", url);
        webdriver::goto_settled(driver, url, NAVIGATION_SETTLE).await?;
    }

    let page = WebDriverPage::new(driver.clone());
    match platform.cleanup_plan(opts.activity) {
        CleanupPlan::Feed(profile) => {
            let sink = PrintSink;
            let engine = FeedEngine::new(
                &page,
                profile,
                FeedOptions {
                    exclude_own_posts: opts.exclude_own_posts,
                    ..FeedOptions::default()
                },
                Pacing::default(),
                stop,
                &sink,
            );
            let outcome = engine
                .run(&ActivityGuard::new())
                .await
                .map_err(|e| format!("Cleanup failed: {}", e))?;
            report(outcome);
        }
        CleanupPlan::LikedWalk(profile) => {
            let sink = PrintSink;
            let walker = LikedWalker::new(&page, profile, Pacing::default(), stop, &sink);
            let outcome = walker
                .run(&ActivityGuard::new())
                .await
                .map_err(|e| format!("Cleanup failed: {}", e))?;
            report(outcome);
        }
        CleanupPlan::Orchestrated => {
            run_orchestrated(driver, page, stop).await?;
        }
    }
    Ok(())
}

async fn run_orchestrated(
    driver: &WebDriver,
    page: WebDriverPage,
    stop: StopSignal,
) -> Result<(), String> {
    let relay = tiktok::InboxSurface::new(page);
    let nav = WebDriverNavigator::new(driver.clone(), NAVIGATION_SETTLE);
    let controller = SessionController::new(
        relay,
        nav,
        PrintSink,
        SessionConfig::new(tiktok::EXPLORE_URL),
        stop,
    );

    let tab = driver.window().await.ok().map(|handle| handle.to_string());
    match controller.handle(ControlRequest::StartTikTokCommentDeletion { tab_id: tab }) {
        ControlResponse::Started { started: true } => {}
        _ => return Err("A deletion session is already running".to_string()),
    }

    controller.wait().await;

    let snapshot = controller.state();
    println!(
        "Session ended: {} deleted across {} visited items",
        snapshot.deleted_count, snapshot.visited_count
    );
    Ok(())
}

fn spawn_stop_on_ctrl_c(stop: StopSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nStopping after the current item...");
            stop.stop();
        }
    });
}

fn report(outcome: FeedOutcome) {
    println!(
        "Done ({}): {} deleted",
        match outcome.end {
            FeedEnd::Exhausted => "no more items",
            FeedEnd::Stopped => "stopped",
        },
        outcome.deleted
    );
}

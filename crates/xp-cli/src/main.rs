//! Expunge CLI
//!
//! Drives a WebDriver-controlled browser through a platform's bulk
//! activity cleanup.

mod run;
mod webdriver;

use clap::{Parser, Subcommand};

use xp_core::platform::ActivityType;
use xp_core::registry;

#[derive(Parser)]
#[command(name = "xp-cli")]
#[command(about = "Bulk deletion of your own social-media activity via the live web UI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered platforms and their navigation models
    Platforms,

    /// Show navigation details for one platform/activity pair
    Info {
        /// Platform identifier (see `platforms`)
        #[arg(short, long)]
        platform: String,

        /// Activity type: comments or reactions
        #[arg(short, long, default_value = "comments")]
        activity: ActivityType,
    },

    /// Run a deletion session against a live browser
    Run {
        /// Platform identifier (see `platforms`)
        #[arg(short, long)]
        platform: String,

        /// Activity type: comments or reactions
        #[arg(short, long, default_value = "comments")]
        activity: ActivityType,

        /// Skip comments left on your own posts
        #[arg(long)]
        exclude_own_posts: bool,

        /// WebDriver endpoint (a running chromedriver)
        #[arg(long, default_value = "http://localhost:9515")]
        webdriver_url: String,

        /// Run the browser headless
        #[arg(long)]
        headless: bool,

        /// Chrome profile directory with an authenticated session
        #[arg(long)]
        user_data_dir: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Platforms => cmd_platforms(),
        Commands::Info { platform, activity } => cmd_info(&platform, activity),
        Commands::Run {
            platform,
            activity,
            exclude_own_posts,
            webdriver_url,
            headless,
            user_data_dir,
        } => run::run_session(run::RunOptions {
            platform,
            activity,
            exclude_own_posts,
            webdriver_url,
            headless,
            user_data_dir,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_platforms() -> Result<(), String> {
    let registry = registry::global();
    for id in registry.ids() {
        let Some(platform) = registry.get(id) else {
            continue;
        };
        println!("{}  ({}, {})", id, platform.name(), platform.domain());
        for activity in [ActivityType::Comments, ActivityType::Reactions] {
            println!("  {:<10} {}", activity, platform.navigation(activity));
        }
    }
    Ok(())
}

fn cmd_info(id: &str, activity: ActivityType) -> Result<(), String> {
    let platform = registry::global()
        .get(id)
        .ok_or_else(|| format!("Unknown platform '{}'", id))?;

    println!("Platform:   {} ({})", platform.name(), platform.domain());
    println!("Activity:   {}", activity);
    println!("Model:      {}", platform.navigation(activity));
    println!("Plan:       {}", platform.cleanup_plan(activity).kind());
    if platform.requires_manual_navigation() {
        println!("Navigate:   manually - {}", platform.manual_instructions(activity));
    } else if let Some(url) = platform.activity_url(activity) {
        println!("Navigate:   {}", url);
    }
    Ok(())
}

mod config;
mod error;
mod logging;
mod pipeline;
mod portable;
mod scrape;
mod sections;
mod session;
mod writer;

use crate::config::Config;
use crate::error::Result;
use crate::logging::{init_logging, parse_log_level, LoggerConfig};
use crate::session::ChromiumSession;

#[tokio::main]
async fn main() -> Result<()> {
    let Some(course_url) = std::env::args().nth(1) else {
        eprintln!("Usage: coursera-scraper <COURSE_URL>");
        std::process::exit(1);
    };

    // Load configuration; preconditions fail here, before any navigation
    let config = Config::load("config.toml")?;

    let logger_config = LoggerConfig {
        directory: config.logging.directory.clone(),
        file_name: config.logging.filename.clone(),
        rotation: tracing_appender::rolling::Rotation::DAILY,
        level: parse_log_level(&config.logging.level)?,
    };
    init_logging(logger_config)?;

    log_info!(
        "[main] Starting browser session from {}",
        config.session.session_file
    );
    let session = ChromiumSession::launch(&config.session).await?;

    let outcome = pipeline::run(&session, &config, &course_url).await;

    // The browser always comes down, even when the run failed
    if let Err(e) = session.shutdown().await {
        log_warn!("[main] {}", e);
    }

    match outcome {
        Ok(summary) => {
            log_info!(
                "[main] Done. {} saved, {} skipped of {} discovered",
                summary.saved,
                summary.skipped,
                summary.discovered
            );
            Ok(())
        }
        Err(e) => {
            log_error!(&e => "[main] Run failed");
            Err(e)
        }
    }
}

use crate::config::Config;
use crate::error::Result;
use crate::scrape::{ContentRetriever, StructureDiscoverer};
use crate::sections::build_sections;
use crate::session::BrowsingSession;
use crate::writer::write_lesson_csv;
pub use crate::{log_info, log_warn};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub discovered: usize,
    pub saved: usize,
    pub skipped: usize,
}

/// Drive the whole batch: discover the course structure, then retrieve,
/// partition, and persist each reading lesson in order. One bad lesson is
/// a skip, never an abort.
pub async fn run(
    session: &dyn BrowsingSession,
    config: &Config,
    course_url: &str,
) -> Result<RunSummary> {
    log_info!("[pipeline] Fetching course structure from {}", course_url);
    let discoverer = StructureDiscoverer::new(session, &config.scrape);
    let (lessons, course_slug) = discoverer.discover(course_url).await?;

    let mut summary = RunSummary {
        discovered: lessons.len(),
        ..Default::default()
    };

    if lessons.is_empty() {
        log_warn!("[pipeline] No reading lessons found in this course");
        return Ok(summary);
    }

    log_info!(
        "[pipeline] Found {} reading lessons. Starting extraction...",
        lessons.len()
    );

    let retriever = ContentRetriever::new(session, &config.scrape);
    let output_dir = Path::new(&config.output.directory);
    let cooldown = Duration::from_secs(config.scrape.lesson_delay);

    for (index, lesson) in lessons.iter().enumerate() {
        log_info!(
            "[pipeline] [{}/{}] {} / {}",
            index + 1,
            lessons.len(),
            lesson.module,
            lesson.lesson_title
        );

        let Some(html) = retriever.retrieve(&lesson.url).await else {
            log_warn!(
                "[pipeline] Skipping {}: could not extract content",
                lesson.lesson_title
            );
            summary.skipped += 1;
            continue;
        };

        let sections = build_sections(&html, &lesson.lesson_title);
        match write_lesson_csv(
            output_dir,
            &course_slug,
            &lesson.module,
            &lesson.lesson_title,
            &sections,
        ) {
            Ok(path) => {
                log_info!("[pipeline] Saved {}", path.display());
                summary.saved += 1;
            }
            Err(e) => {
                log_warn!(
                    "[pipeline] Skipping {}: failed to persist: {}",
                    lesson.lesson_title,
                    e
                );
                summary.skipped += 1;
                continue;
            }
        }

        // Stay gentle with the platform between lessons
        if index + 1 < lessons.len() {
            tokio::time::sleep(cooldown).await;
        }
    }

    Ok(summary)
}

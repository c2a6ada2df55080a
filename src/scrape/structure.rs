use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};
use crate::session::BrowsingSession;
pub use crate::{log_info, log_warn};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

const COURSE_PATH_MARKER: &str = "/learn/";

// Markup structure is the contract with the platform; these markers are the
// fragile part and live together so a platform change is a one-place fix.
const MODULE_LINK_SELECTOR: &str = r#"a[data-testid="module-link"]"#;
const MODULE_NAME_SELECTOR: &str = r#"[data-testid="module-name"]"#;
const LESSON_ITEM_SELECTOR: &str = r#"[data-testid="lesson-item"]"#;
const ITEM_TYPE_ATTR: &str = "data-item-type";
const READING_ITEM_TYPE: &str = "reading";

/// One reading lesson found during course discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDescriptor {
    pub module: String,
    pub lesson_title: String,
    pub url: String,
}

pub struct StructureDiscoverer<'a> {
    session: &'a dyn BrowsingSession,
    config: &'a ScrapeConfig,
}

impl<'a> StructureDiscoverer<'a> {
    pub fn new(session: &'a dyn BrowsingSession, config: &'a ScrapeConfig) -> Self {
        Self { session, config }
    }

    /// Walk the course structure and return its reading lessons in module
    /// order, then page order, along with the course slug.
    pub async fn discover(&self, course_url: &str) -> Result<(Vec<LessonDescriptor>, String)> {
        let timeout = Duration::from_secs(self.config.nav_timeout);
        let slug = course_slug(course_url)?;

        let root_html = self.session.fetch_page(course_url, timeout).await?;
        let module_urls = parse_module_links(&root_html, &self.config.base_origin);

        let mut lessons = Vec::new();
        if module_urls.is_empty() {
            log_warn!(
                "[discover] No module links on {}; treating it as a single module page",
                course_url
            );
            collect_module_lessons(&root_html, &self.config.base_origin, &mut lessons);
        } else {
            log_info!("[discover] Found {} module pages", module_urls.len());
            for module_url in &module_urls {
                let html = match self.session.fetch_page(module_url, timeout).await {
                    Ok(html) => html,
                    Err(e) => {
                        log_warn!("[discover] Skipping module page {}: {}", module_url, e);
                        continue;
                    }
                };
                collect_module_lessons(&html, &self.config.base_origin, &mut lessons);
            }
        }

        Ok((lessons, slug))
    }
}

/// Course identifier from the URL path: the segment after the course-path
/// marker, or the last path segment when the marker is absent.
fn course_slug(course_url: &str) -> Result<String> {
    let trimmed = course_url.trim_end_matches('/');

    if let Some((_, rest)) = trimmed.split_once(COURSE_PATH_MARKER) {
        if let Some(slug) = rest.split('/').next().filter(|s| !s.is_empty()) {
            return Ok(slug.to_string());
        }
    }

    trimmed
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(String::from)
        .ok_or_else(|| ScrapeError::InvalidUrl(course_url.to_string()).into())
}

fn parse_module_links(html: &str, base_origin: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(MODULE_LINK_SELECTOR).unwrap();

    document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| absolute_url(href, base_origin))
        .collect()
}

fn collect_module_lessons(html: &str, base_origin: &str, lessons: &mut Vec<LessonDescriptor>) {
    let document = Html::parse_document(html);
    let module = module_heading(&document);

    let item_selector = Selector::parse(LESSON_ITEM_SELECTOR).unwrap();
    let link_selector = Selector::parse("a").unwrap();

    let before = lessons.len();
    for item in document.select(&item_selector) {
        if item.value().attr(ITEM_TYPE_ATTR) != Some(READING_ITEM_TYPE) {
            continue;
        }

        // Items without a navigable link are malformed entries, not failures
        let Some(link) = item.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href").filter(|h| !h.is_empty()) else {
            continue;
        };
        let Some(url) = absolute_url(href, base_origin) else {
            continue;
        };

        lessons.push(LessonDescriptor {
            module: module.clone(),
            lesson_title: normalized_text(link),
            url,
        });
    }

    log_info!(
        "[discover] {}: {} reading lessons",
        module,
        lessons.len() - before
    );
}

fn module_heading(document: &Html) -> String {
    let selector = Selector::parse(MODULE_NAME_SELECTOR).unwrap();
    match document.select(&selector).next() {
        Some(heading) => heading_text(heading),
        None => "Unknown Module".to_string(),
    }
}

/// Heading text with nested badge decorations stripped out.
fn heading_text(heading: ElementRef) -> String {
    let mut text = String::new();
    push_text_skipping_badges(heading, &mut text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_text_skipping_badges(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            if el.value().name() == "span" && el.value().attr("data-testid") == Some("badge") {
                continue;
            }
            push_text_skipping_badges(el, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

fn normalized_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn absolute_url(href: &str, base_origin: &str) -> Option<String> {
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    Url::parse(base_origin)
        .ok()?
        .join(href)
        .ok()
        .map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://www.coursera.org";

    #[test]
    fn slug_comes_from_the_learn_segment() {
        assert_eq!(
            course_slug("https://www.coursera.org/learn/machine-learning/home/welcome").unwrap(),
            "machine-learning"
        );
        assert_eq!(
            course_slug("https://www.coursera.org/learn/nlp-basics/").unwrap(),
            "nlp-basics"
        );
    }

    #[test]
    fn slug_falls_back_to_last_path_segment() {
        assert_eq!(
            course_slug("https://www.coursera.org/specializations/deep-learning").unwrap(),
            "deep-learning"
        );
    }

    #[test]
    fn parses_module_links_and_resolves_them() {
        let html = r#"
            <nav>
                <a data-testid="module-link" href="/learn/test/home/module/1">Module 1</a>
                <a data-testid="module-link" href="https://www.coursera.org/learn/test/home/module/2">Module 2</a>
                <a href="/learn/test/home/info">Not a module</a>
            </nav>
        "#;

        let links = parse_module_links(html, ORIGIN);
        assert_eq!(
            links,
            vec![
                "https://www.coursera.org/learn/test/home/module/1",
                "https://www.coursera.org/learn/test/home/module/2",
            ]
        );
    }

    #[test]
    fn keeps_reading_items_and_drops_the_rest() {
        let html = r#"
            <h2 data-testid="module-name">Week 1: Foundations</h2>
            <ul>
                <li data-testid="lesson-item" data-item-type="reading">
                    <a href="/learn/test/supplement/a1">Welcome Notes</a>
                </li>
                <li data-testid="lesson-item" data-item-type="video">
                    <a href="/learn/test/lecture/v1">Intro Video</a>
                </li>
                <li data-testid="lesson-item" data-item-type="reading">
                    <a href="/learn/test/supplement/a2">Reading Two</a>
                </li>
                <li data-testid="lesson-item" data-item-type="reading">
                    <a href="/learn/test/supplement/a3">Reading Three</a>
                </li>
            </ul>
        "#;

        let mut lessons = Vec::new();
        collect_module_lessons(html, ORIGIN, &mut lessons);

        let titles: Vec<&str> = lessons.iter().map(|l| l.lesson_title.as_str()).collect();
        assert_eq!(titles, vec!["Welcome Notes", "Reading Two", "Reading Three"]);
        assert!(titles.iter().all(|t| *t != "Intro Video"));
        assert!(lessons.iter().all(|l| l.module == "Week 1: Foundations"));
        assert_eq!(
            lessons[0].url,
            "https://www.coursera.org/learn/test/supplement/a1"
        );
    }

    #[test]
    fn item_without_link_is_skipped_silently() {
        let html = r#"
            <h2 data-testid="module-name">Week 2</h2>
            <div data-testid="lesson-item" data-item-type="reading">No link here</div>
            <div data-testid="lesson-item" data-item-type="reading">
                <a href="/learn/test/supplement/ok">Good Item</a>
            </div>
        "#;

        let mut lessons = Vec::new();
        collect_module_lessons(html, ORIGIN, &mut lessons);

        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].lesson_title, "Good Item");
    }

    #[test]
    fn badge_text_is_stripped_from_the_module_heading() {
        let html = r#"
            <h2 data-testid="module-name">
                Week 3: Advanced Topics
                <span data-testid="badge">Completed</span>
            </h2>
        "#;

        let document = Html::parse_document(html);
        assert_eq!(module_heading(&document), "Week 3: Advanced Topics");
    }

    #[test]
    fn missing_heading_falls_back_to_unknown_module() {
        let html = r#"<div data-testid="lesson-item" data-item-type="reading">
            <a href="/x">T</a>
        </div>"#;

        let document = Html::parse_document(html);
        assert_eq!(module_heading(&document), "Unknown Module");
    }
}

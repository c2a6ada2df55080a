use crate::portable;
use scraper::{ElementRef, Html};

/// One heading-delimited block of a lesson's converted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub content: String,
}

/// Partition lesson markup into titled sections, splitting on top-level
/// `h2`/`h3` nodes. Always returns at least one section.
pub fn build_sections(html: &str, fallback_title: &str) -> Vec<Section> {
    build_sections_with(html, fallback_title, portable::html_to_markdown)
}

/// Same as [`build_sections`], with the markup converter injected so the
/// partitioning can be exercised independently of the conversion.
pub fn build_sections_with<F>(html: &str, fallback_title: &str, convert: F) -> Vec<Section>
where
    F: Fn(&str) -> String,
{
    if html.trim().is_empty() {
        return vec![Section {
            heading: fallback_title.to_string(),
            content: String::new(),
        }];
    }

    let fragment = Html::parse_fragment(html);
    let mut sections: Vec<Section> = Vec::new();
    let mut current_heading = fallback_title.to_string();
    let mut buffer: Vec<String> = Vec::new();

    for node in fragment.root_element().children() {
        if let Some(element) = ElementRef::wrap(node) {
            let name = element.value().name();
            if name == "h2" || name == "h3" {
                if !buffer.is_empty() {
                    flush(&mut sections, &current_heading, &mut buffer, &convert);
                }
                current_heading = element.text().collect::<String>().trim().to_string();
                continue;
            }
            buffer.push(element.html());
        } else if let Some(text) = node.value().as_text() {
            // Bare whitespace between nodes is not content
            if !text.trim().is_empty() || !buffer.is_empty() {
                buffer.push(text.to_string());
            }
        }
    }

    if !buffer.is_empty() {
        flush(&mut sections, &current_heading, &mut buffer, &convert);
    }

    if sections.is_empty() {
        // Markup was headings all the way down: keep the whole document
        // under the lesson title rather than returning nothing
        sections.push(Section {
            heading: fallback_title.to_string(),
            content: convert(html).trim().to_string(),
        });
    }

    sections
}

fn flush<F>(sections: &mut Vec<Section>, heading: &str, buffer: &mut Vec<String>, convert: &F)
where
    F: Fn(&str) -> String,
{
    let raw: String = buffer.join("");
    sections.push(Section {
        heading: heading.to_string(),
        content: convert(&raw).trim().to_string(),
    });
    buffer.clear();
}

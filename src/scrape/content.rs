use crate::config::ScrapeConfig;
use crate::session::BrowsingSession;
pub use crate::{log_info, log_warn};
use serde_json::Value;
use std::time::Duration;

/// Matches network responses whose address belongs to the content API.
#[derive(Debug, Clone)]
pub struct ResponseFilter {
    fragments: Vec<String>,
}

impl ResponseFilter {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.fragments
            .iter()
            .any(|fragment| url.contains(fragment.as_str()))
    }
}

pub struct ContentRetriever<'a> {
    session: &'a dyn BrowsingSession,
    filter: ResponseFilter,
    request_timeout: Duration,
    settle_grace: Duration,
    retry_delay: Duration,
    max_retries: u32,
}

impl<'a> ContentRetriever<'a> {
    pub fn new(session: &'a dyn BrowsingSession, config: &ScrapeConfig) -> Self {
        Self {
            session,
            filter: ResponseFilter::new(config.api_fragments.iter().cloned()),
            request_timeout: Duration::from_secs(config.request_timeout),
            settle_grace: Duration::from_secs(config.settle_grace),
            retry_delay: Duration::from_secs(config.retry_delay),
            max_retries: config.max_retries,
        }
    }

    /// Navigate to a reading lesson and capture its content from the data
    /// responses the page issues while loading. The rendered DOM never holds
    /// the content, only these responses do. Returns `None` once every
    /// attempt has come up empty.
    pub async fn retrieve(&self, lesson_url: &str) -> Option<String> {
        for attempt in 0..=self.max_retries {
            let responses = match self
                .session
                .observe_responses(
                    lesson_url,
                    &self.filter,
                    self.request_timeout,
                    self.settle_grace,
                )
                .await
            {
                Ok(responses) => responses,
                Err(e) => {
                    log_warn!(
                        "[retrieve] Navigation error on attempt {}: {}",
                        attempt + 1,
                        e
                    );
                    Vec::new()
                }
            };

            if let Some(html) = responses
                .iter()
                .find_map(|response| content_html(&response.body))
            {
                return Some(html);
            }

            if attempt < self.max_retries {
                log_info!("[retrieve] Retrying {} (attempt {})", lesson_url, attempt + 2);
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        log_warn!("[retrieve] Could not extract content from {}", lesson_url);
        None
    }
}

/// Pull the reading HTML out of a captured API payload, trying the direct
/// shape first, then the linked-asset shape. Missing keys mean "not this
/// response", never an error.
pub fn content_html(body: &Value) -> Option<String> {
    direct_html(body).or_else(|| linked_html(body))
}

/// Direct shape: `elements[].definition.value.html`.
fn direct_html(body: &Value) -> Option<String> {
    body.get("elements")?.as_array()?.iter().find_map(|element| {
        element
            .get("definition")?
            .get("value")?
            .get("html")?
            .as_str()
            .filter(|html| !html.is_empty())
            .map(str::to_string)
    })
}

/// Linked-asset shape: lightweight `elements[].itemId` entries joined
/// against the `linked` side-table on `itemId`.
fn linked_html(body: &Value) -> Option<String> {
    let elements = body.get("elements")?.as_array()?;
    let linked = body.get("linked")?.as_object()?;

    elements.iter().find_map(|element| {
        let item_id = element.get("itemId")?.as_str()?;
        linked
            .values()
            .filter_map(Value::as_array)
            .flatten()
            .find_map(|asset| {
                if asset.get("itemId")?.as_str()? != item_id {
                    return None;
                }
                asset
                    .get("definition")?
                    .get("renderableHtmlWithMetadata")?
                    .get("renderableHtml")?
                    .as_str()
                    .filter(|html| !html.is_empty())
                    .map(str::to_string)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_html_from_direct_shape() {
        let body = json!({
            "elements": [
                {
                    "typeName": "reading",
                    "definition": {
                        "value": {
                            "html": "<p>Hello world</p>"
                        }
                    }
                }
            ]
        });

        assert_eq!(content_html(&body).as_deref(), Some("<p>Hello world</p>"));
    }

    #[test]
    fn empty_elements_yield_nothing() {
        assert_eq!(content_html(&json!({ "elements": [] })), None);
    }

    #[test]
    fn unrelated_structure_yields_nothing() {
        assert_eq!(content_html(&json!({ "data": "something_else" })), None);
        assert_eq!(content_html(&json!([1, 2, 3])), None);
        assert_eq!(content_html(&json!(null)), None);
    }

    #[test]
    fn missing_html_field_yields_nothing() {
        let body = json!({
            "elements": [
                {
                    "typeName": "video",
                    "definition": { "value": { "videoId": "abc123" } }
                }
            ]
        });

        assert_eq!(content_html(&body), None);
    }

    #[test]
    fn empty_html_string_yields_nothing() {
        let body = json!({
            "elements": [
                { "definition": { "value": { "html": "" } } }
            ]
        });

        assert_eq!(content_html(&body), None);
    }

    #[test]
    fn extracts_html_from_linked_assets() {
        let body = json!({
            "elements": [{ "itemId": "CIPwz", "id": "course~CIPwz" }],
            "linked": {
                "openCourseAssets.v1": [
                    {
                        "itemId": "CIPwz",
                        "typeName": "cml",
                        "definition": {
                            "renderableHtmlWithMetadata": {
                                "renderableHtml": "<p>Reading content here</p>"
                            }
                        }
                    }
                ]
            }
        });

        assert_eq!(
            content_html(&body).as_deref(),
            Some("<p>Reading content here</p>")
        );
    }

    #[test]
    fn linked_asset_with_wrong_item_id_is_ignored() {
        let body = json!({
            "elements": [{ "itemId": "wanted" }],
            "linked": {
                "openCourseAssets.v1": [
                    {
                        "itemId": "other",
                        "definition": {
                            "renderableHtmlWithMetadata": { "renderableHtml": "<p>nope</p>" }
                        }
                    }
                ]
            }
        });

        assert_eq!(content_html(&body), None);
    }

    #[test]
    fn filter_matches_known_api_fragments() {
        let filter = ResponseFilter::new([
            "onDemandLectureAssets.v1",
            "onDemandElements.v1",
            "onDemandSupplements.v1",
        ]);

        assert!(filter.matches(
            "https://www.coursera.org/api/onDemandSupplements.v1/abc?fields=definition"
        ));
        assert!(filter.matches("https://www.coursera.org/api/onDemandElements.v1/xyz"));
        assert!(!filter.matches("https://www.coursera.org/api/userProfiles.v1/me"));
    }
}

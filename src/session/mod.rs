//! Browsing session abstraction.
//!
//! Defines the `BrowsingSession` trait that abstracts over the browser
//! engine, so discovery and retrieval never name it directly.

mod chromium;

use crate::error::Result;
use crate::scrape::ResponseFilter;
use async_trait::async_trait;
pub use chromium::ChromiumSession;
use serde_json::Value;
use std::time::Duration;

/// One JSON network response captured while a page loaded.
#[derive(Debug, Clone)]
pub struct ObservedResponse {
    /// Address the response was served from.
    pub url: String,
    /// Parsed response body.
    pub body: Value,
}

/// An authenticated browsing context shared across the whole run.
#[async_trait]
pub trait BrowsingSession: Send + Sync {
    /// Navigate to a URL, wait for the page to settle, and return the
    /// rendered markup.
    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String>;

    /// Open a transient page, subscribe to network traffic before
    /// navigating, navigate to the URL, wait for settle plus `grace`, and
    /// return the responses matching `filter`, fully materialized. The
    /// transient page is released on every exit path.
    async fn observe_responses(
        &self,
        url: &str,
        filter: &ResponseFilter,
        timeout: Duration,
        grace: Duration,
    ) -> Result<Vec<ObservedResponse>>;
}

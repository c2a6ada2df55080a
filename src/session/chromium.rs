//! Chromium-backed browsing session using chromiumoxide.

use super::{BrowsingSession, ObservedResponse};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::scrape::ResponseFilter;
pub use crate::{log_debug, log_info, log_warn};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EnableParams, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Playwright-style storage state, reduced to the part the scraper needs.
#[derive(Debug, Deserialize)]
struct StorageState {
    #[serde(default)]
    cookies: Vec<StoredCookie>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCookie {
    name: String,
    value: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    http_only: bool,
    #[serde(default)]
    secure: bool,
}

/// Find the Chromium binary to drive.
fn resolve_executable(config: &SessionConfig) -> Result<PathBuf> {
    if let Some(configured) = &config.executable {
        let path = PathBuf::from(configured);
        if path.exists() {
            return Ok(path);
        }
        return Err(SessionError::Launch(format!(
            "configured executable not found: {}",
            path.display()
        ))
        .into());
    }

    if let Ok(env_path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path);
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    Err(SessionError::Launch(
        "no Chromium binary found; set session.executable or CHROMIUM_PATH".to_string(),
    )
    .into())
}

/// A headless Chromium instance carrying the stored login session.
pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launch the browser and restore cookies from the stored session file.
    pub async fn launch(config: &SessionConfig) -> Result<Self> {
        let executable = resolve_executable(config)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg(format!("--user-agent={}", config.user_agent));
        if config.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let browser_config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        // Drive the CDP message loop for the lifetime of the session
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let session = Self {
            browser,
            handler_task,
        };
        session.restore_cookies(&config.session_file).await?;

        Ok(session)
    }

    async fn restore_cookies(&self, session_file: &str) -> Result<()> {
        let raw = std::fs::read_to_string(session_file).map_err(|e| {
            SessionError::SessionState(format!("failed to read {}: {}", session_file, e))
        })?;
        let state: StorageState = serde_json::from_str(&raw).map_err(|e| {
            SessionError::SessionState(format!("failed to parse {}: {}", session_file, e))
        })?;

        let params: Vec<CookieParam> = state.cookies.iter().filter_map(cookie_param).collect();
        if params.is_empty() {
            return Err(SessionError::SessionState(format!(
                "{} contains no usable cookies; log in and export the session again",
                session_file
            ))
            .into());
        }
        let count = params.len();

        let page = self.new_page().await?;
        let result = page
            .set_cookies(params)
            .await
            .map(|_| ())
            .map_err(|e| SessionError::SessionState(e.to_string()));
        let _ = page.close().await;
        result?;

        log_info!("[session] Restored {} cookies from {}", count, session_file);
        Ok(())
    }

    async fn new_page(&self) -> Result<Page> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Launch(format!("failed to open page: {}", e)).into())
    }

    /// Close the browser and reap the process. Runs unconditionally at the
    /// end of a run, success or failure.
    pub async fn shutdown(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| SessionError::Shutdown(e.to_string()))?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}

#[async_trait]
impl BrowsingSession for ChromiumSession {
    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String> {
        let page = self.new_page().await?;
        let result = fetch_on_page(&page, url, timeout).await;
        let _ = page.close().await;
        result
    }

    async fn observe_responses(
        &self,
        url: &str,
        filter: &ResponseFilter,
        timeout: Duration,
        grace: Duration,
    ) -> Result<Vec<ObservedResponse>> {
        let page = self.new_page().await?;
        let result = observe_on_page(&page, url, filter, timeout, grace).await;
        let _ = page.close().await;
        result
    }
}

async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<()> {
    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(Ok(_)) => {
            let _ = page.wait_for_navigation().await;
            Ok(())
        }
        Ok(Err(e)) => Err(SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        }
        .into()),
        Err(_) => Err(SessionError::Timeout {
            url: url.to_string(),
            seconds: timeout.as_secs(),
        }
        .into()),
    }
}

async fn fetch_on_page(page: &Page, url: &str, timeout: Duration) -> Result<String> {
    navigate(page, url, timeout).await?;
    page.content().await.map_err(|e| {
        SessionError::Navigation {
            url: url.to_string(),
            reason: format!("failed to read rendered markup: {}", e),
        }
        .into()
    })
}

async fn observe_on_page(
    page: &Page,
    url: &str,
    filter: &ResponseFilter,
    timeout: Duration,
    grace: Duration,
) -> Result<Vec<ObservedResponse>> {
    page.execute(EnableParams::default())
        .await
        .map_err(|e| SessionError::Capture(e.to_string()))?;

    // Subscribe before navigating: the data calls fire during page load
    let mut events = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(|e| SessionError::Capture(e.to_string()))?;

    let captured: Arc<Mutex<Vec<(String, RequestId)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);
    let url_filter = filter.clone();
    let collector = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if url_filter.matches(&event.response.url) {
                sink.lock()
                    .await
                    .push((event.response.url.clone(), event.request_id.clone()));
            }
        }
    });

    let nav_result = navigate(page, url, timeout).await;
    if nav_result.is_ok() {
        // Data calls can land after the settled signal fires
        tokio::time::sleep(grace).await;
    }

    // Stop listening before the page goes away so nothing leaks into a
    // later attempt
    collector.abort();
    nav_result?;

    let mut responses = Vec::new();
    for (response_url, request_id) in captured.lock().await.iter() {
        let reply = match page
            .execute(GetResponseBodyParams::new(request_id.clone()))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                log_debug!("[session] No body for {}: {}", response_url, e);
                continue;
            }
        };

        let raw = if reply.base64_encoded {
            match base64::engine::general_purpose::STANDARD.decode(&reply.body) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => continue,
            }
        } else {
            reply.body.clone()
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(body) => responses.push(ObservedResponse {
                url: response_url.clone(),
                body,
            }),
            // Not JSON, so not a content payload
            Err(_) => {}
        }
    }

    Ok(responses)
}

fn cookie_param(cookie: &StoredCookie) -> Option<CookieParam> {
    if cookie.domain.is_empty() {
        return None;
    }

    CookieParam::builder()
        .name(&cookie.name)
        .value(&cookie.value)
        .domain(&cookie.domain)
        .path(if cookie.path.is_empty() {
            "/"
        } else {
            cookie.path.as_str()
        })
        .http_only(cookie.http_only)
        .secure(cookie.secure)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_playwright_storage_state() {
        let raw = r#"{
            "cookies": [
                {
                    "name": "CAUTH",
                    "value": "abc123",
                    "domain": ".coursera.org",
                    "path": "/",
                    "expires": 1999999999.5,
                    "httpOnly": true,
                    "secure": true,
                    "sameSite": "Lax"
                }
            ],
            "origins": []
        }"#;

        let state: StorageState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.cookies.len(), 1);
        assert_eq!(state.cookies[0].name, "CAUTH");
        assert!(state.cookies[0].http_only);

        let param = cookie_param(&state.cookies[0]).unwrap();
        assert_eq!(param.name, "CAUTH");
        assert_eq!(param.domain.as_deref(), Some(".coursera.org"));
    }

    #[test]
    fn cookie_without_domain_is_dropped() {
        let cookie = StoredCookie {
            name: "x".to_string(),
            value: "y".to_string(),
            domain: String::new(),
            path: String::new(),
            http_only: false,
            secure: false,
        };
        assert!(cookie_param(&cookie).is_none());
    }

    #[tokio::test]
    #[ignore] // Requires a Chromium binary on PATH
    async fn fetches_a_data_url_page() {
        let dir = tempfile::tempdir().unwrap();
        let session_file = dir.path().join("session.json");
        std::fs::write(
            &session_file,
            r#"{"cookies":[{"name":"t","value":"1","domain":".example.com","path":"/"}],"origins":[]}"#,
        )
        .unwrap();

        let config = SessionConfig {
            session_file: session_file.to_string_lossy().into_owned(),
            ..SessionConfig::default()
        };

        let session = ChromiumSession::launch(&config).await.unwrap();
        let html = session
            .fetch_page(
                "data:text/html,<h1>Hello</h1><p>World</p>",
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        assert!(html.contains("<h1>Hello</h1>"));
        session.shutdown().await.unwrap();
    }
}

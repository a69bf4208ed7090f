//! Chromium DevTools Protocol-backed [`BrowserDriver`]: a
//! `chromiumoxide::Browser` launched once and held for the lifetime of
//! the session, one active page at a time.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, DriverVerb};
use crate::errors::BrowserError;

pub struct ChromiumBrowserDriver {
    browser: Option<Browser>,
    page: Option<Page>,
}

impl ChromiumBrowserDriver {
    pub fn new() -> Self {
        Self { browser: None, page: None }
    }

    fn page(&self) -> Result<&Page, BrowserError> {
        self.page.as_ref().ok_or(BrowserError::Closed)
    }
}

impl Default for ChromiumBrowserDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for ChromiumBrowserDriver {
    async fn initialize(&mut self, profile: Option<&str>, headless: bool) -> Result<(), BrowserError> {
        let mut builder = BrowserConfig::builder().with_head();
        if headless {
            builder = BrowserConfig::builder();
        }
        if let Some(dir) = profile {
            builder = builder.user_data_dir(dir);
        }
        let config = builder.build().map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "chromium handler event error");
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        info!("chromium browser launched");
        self.browser = Some(browser);
        self.page = Some(page);
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let page = self.page()?;
        page.goto(url).await.map_err(|e| BrowserError::NavigateFailed(e.to_string()))?;
        page.wait_for_navigation().await.map_err(|e| BrowserError::NavigateFailed(e.to_string()))?;
        Ok(())
    }

    async fn get_current_dom(&mut self) -> Result<(String, String, String), BrowserError> {
        let page = self.page()?;
        let html = page.content().await.map_err(|e| BrowserError::DomCaptureFailed(e.to_string()))?;
        let title = page.get_title().await.map_err(|e| BrowserError::DomCaptureFailed(e.to_string()))?.unwrap_or_default();
        let url = page.url().await.map_err(|e| BrowserError::DomCaptureFailed(e.to_string()))?.unwrap_or_default();
        Ok((html, title, url))
    }

    async fn execute_verb(&mut self, verb: &DriverVerb) -> Result<(), BrowserError> {
        let page = self.page()?;
        match verb {
            DriverVerb::Click { selector } => {
                debug!(selector, "clicking");
                let element = page
                    .find_element(selector)
                    .await
                    .map_err(|e| BrowserError::VerbFailed(format!("{selector}: {e}")))?;
                element.click().await.map_err(|e| BrowserError::VerbFailed(format!("{selector}: {e}")))?;
                Ok(())
            }
            DriverVerb::Type { selector, text, press_enter } => {
                debug!(selector, "typing");
                let element = page
                    .find_element(selector)
                    .await
                    .map_err(|e| BrowserError::VerbFailed(format!("{selector}: {e}")))?;
                element.click().await.map_err(|e| BrowserError::VerbFailed(format!("{selector}: {e}")))?;
                element.type_str(text).await.map_err(|e| BrowserError::VerbFailed(format!("{selector}: {e}")))?;
                if *press_enter {
                    element.press_key("Enter").await.map_err(|e| BrowserError::VerbFailed(format!("{selector}: {e}")))?;
                }
                Ok(())
            }
            DriverVerb::Press { key, selector } => {
                if let Some(selector) = selector {
                    let element = page
                        .find_element(selector)
                        .await
                        .map_err(|e| BrowserError::VerbFailed(format!("{selector}: {e}")))?;
                    element.press_key(key).await.map_err(|e| BrowserError::VerbFailed(format!("{selector}: {e}")))?;
                } else {
                    page.press_key(key).await.map_err(|e| BrowserError::VerbFailed(format!("{key}: {e}")))?;
                }
                Ok(())
            }
        }
    }

    async fn close(&mut self, save_state: bool) -> Result<(), BrowserError> {
        if !save_state {
            if let Some(page) = self.page.take() {
                let _ = page.close().await;
            }
        }
        if let Some(mut browser) = self.browser.take() {
            browser.close().await.map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
        }
        Ok(())
    }
}

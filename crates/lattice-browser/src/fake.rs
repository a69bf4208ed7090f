//! Deterministic in-memory [`BrowserDriver`] fake used by this crate's and
//! `lattice-executor`'s tests. No real browser, no timing jitter beyond
//! what the controller itself sleeps for.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::driver::{BrowserDriver, DriverVerb};
use crate::errors::BrowserError;

pub struct FakeBrowserDriver {
    html: String,
    title: String,
    url: String,
    click_effects: HashMap<String, String>,
    type_effects: HashMap<String, String>,
    fail_next_navigate: bool,
    closed: bool,
}

impl FakeBrowserDriver {
    pub fn new(initial_html: impl Into<String>) -> Self {
        Self {
            html: initial_html.into(),
            title: "Fake Page".to_string(),
            url: "https://fake.test/".to_string(),
            click_effects: HashMap::new(),
            type_effects: HashMap::new(),
            fail_next_navigate: false,
            closed: false,
        }
    }

    /// After a click on `selector`, the page's HTML becomes `new_html`.
    pub fn set_click_effect(&mut self, selector: &str, new_html: impl Into<String>) {
        self.click_effects.insert(selector.to_string(), new_html.into());
    }

    pub fn set_type_effect(&mut self, selector: &str, new_html: impl Into<String>) {
        self.type_effects.insert(selector.to_string(), new_html.into());
    }

    pub fn fail_next_navigate(&mut self) {
        self.fail_next_navigate = true;
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowserDriver {
    async fn initialize(&mut self, _profile: Option<&str>, _headless: bool) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.fail_next_navigate {
            self.fail_next_navigate = false;
            return Err(BrowserError::NavigateFailed(format!("simulated failure navigating to {url}")));
        }
        self.url = url.to_string();
        Ok(())
    }

    async fn get_current_dom(&mut self) -> Result<(String, String, String), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        Ok((self.html.clone(), self.title.clone(), self.url.clone()))
    }

    async fn execute_verb(&mut self, verb: &DriverVerb) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        match verb {
            DriverVerb::Click { selector } => match self.click_effects.get(selector) {
                Some(new_html) => {
                    self.html = new_html.clone();
                    Ok(())
                }
                None if self.html.contains(selector.trim_start_matches('#').trim_start_matches('.')) => Ok(()),
                None => Err(BrowserError::VerbFailed(format!("no element matches selector {selector}"))),
            },
            DriverVerb::Type { selector, .. } => match self.type_effects.get(selector) {
                Some(new_html) => {
                    self.html = new_html.clone();
                    Ok(())
                }
                None => Ok(()),
            },
            DriverVerb::Press { .. } => Ok(()),
        }
    }

    async fn close(&mut self, _save_state: bool) -> Result<(), BrowserError> {
        self.closed = true;
        Ok(())
    }
}

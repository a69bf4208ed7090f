//! Browser Controller driver abstraction (spec §4.4). The coordinator and
//! Step Executor never talk to Chromium directly: they hold a
//! `dyn BrowserDriver` so a deterministic fake can stand in for tests.

use async_trait::async_trait;

use crate::errors::BrowserError;

/// One resolved, low-level interaction. Unlike `lattice_types::Command`,
/// a `DriverVerb` carries a materialized CSS selector, never a
/// `candidate_id` — resolution happens one layer up, in
/// [`crate::controller::execute_action_batch`].
#[derive(Clone, Debug)]
pub enum DriverVerb {
    Click { selector: String },
    Type { selector: String, text: String, press_enter: bool },
    Press { key: String, selector: Option<String> },
}

/// `initialize`, `navigate`, `get_current_dom`, `execute_verb`, `close`
/// (spec §4.4). Implementors must execute verbs sequentially: the
/// controller never issues a second verb before the first's future
/// resolves.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn initialize(&mut self, profile: Option<&str>, headless: bool) -> Result<(), BrowserError>;

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Returns `(html, title, url)`.
    async fn get_current_dom(&mut self) -> Result<(String, String, String), BrowserError>;

    async fn execute_verb(&mut self, verb: &DriverVerb) -> Result<(), BrowserError>;

    async fn close(&mut self, save_state: bool) -> Result<(), BrowserError>;
}

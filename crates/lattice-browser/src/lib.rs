#![allow(dead_code)]

//! Browser Controller (spec §4.4, component C4): drives a real browser
//! through a `BrowserDriver` abstraction and turns command batches into
//! `Evidence` with before/after DOM signatures.

pub mod cancel;
pub mod chromium;
pub mod controller;
pub mod driver;
pub mod errors;
pub mod fake;

pub use cancel::{Canceller, CancellationToken};
pub use chromium::ChromiumBrowserDriver;
pub use controller::{execute_action_batch, DEBOUNCE_MS};
pub use driver::{BrowserDriver, DriverVerb};
pub use errors::BrowserError;
pub use fake::FakeBrowserDriver;

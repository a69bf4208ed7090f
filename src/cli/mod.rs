//! CLI surface (SPEC_FULL §0.3): a thin `clap`-derived harness around the
//! coordinator.

pub mod app;

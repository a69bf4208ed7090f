//! Layered configuration (SPEC_FULL §0.2): built-in defaults, an optional
//! `lattice.yaml`/`lattice.toml` file, then `WEB_AGENT_`/`LATTICE_`
//! prefixed environment variables, in increasing precedence — loaded via
//! the `config` crate into a typed wrapper (see `DESIGN.md` for the
//! dependency rationale).
//!
//! `DomConfig` and `PolicyConfig` already read their own `WEB_AGENT_*`
//! variables in their `Default` impls (spec §6); this module adds the
//! coordinator-level knobs spec.md leaves as "configuration" per
//! SPEC_FULL §0.7 (safety thresholds, host sets) plus CLI/runtime knobs
//! (max iterations, debug artifact directory, LLM model/timeouts).

use std::path::PathBuf;

use serde::Deserialize;

use lattice_dom::DomConfig;
use lattice_policy::{PolicyConfig, RunMode};

use crate::errors::LatticeError;

/// Optional overrides sourced from a config file or `LATTICE_`-prefixed
/// environment variables. Every field is optional: anything left unset
/// falls back to the hard-coded default already present in the relevant
/// crate.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileOverrides {
    max_iterations: Option<u32>,
    debug: Option<bool>,
    debug_dir: Option<String>,
    approved_hosts: Option<Vec<String>>,
    confirm_reason_threshold: Option<usize>,
    low_confidence_threshold: Option<f64>,
    autonomous: Option<bool>,
    step_sleep_ms: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub dom: DomConfig,
    pub policy: PolicyConfig,
    pub run_mode: RunMode,
    /// Cap on planned steps the coordinator will iterate (spec §4.7
    /// `execute_web_task(url, objectives, max_iterations)`).
    pub max_iterations: u32,
    /// `WEB_AGENT_DEBUG` (spec §6): enables verbose tracing and the
    /// audit-artifact writer (§0.5).
    pub debug: bool,
    pub debug_dir: PathBuf,
    /// Inter-step sleep (spec §4.7 step 4 "sleep briefly").
    pub step_sleep_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dom: DomConfig::default(),
            policy: PolicyConfig::default(),
            run_mode: RunMode::Autonomous,
            max_iterations: 12,
            debug: std::env::var("WEB_AGENT_DEBUG").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false),
            debug_dir: PathBuf::from("./lattice-agent-debug"),
            step_sleep_ms: 500,
        }
    }
}

impl RuntimeConfig {
    /// Loads defaults, then an optional config file, then
    /// `LATTICE_`-prefixed environment variables, in that precedence
    /// order (SPEC_FULL §0.2).
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, LatticeError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(::config::File::from(path).required(false));
        } else {
            builder = builder
                .add_source(::config::File::with_name("lattice").required(false))
                .add_source(::config::File::with_name("lattice.local").required(false));
        }
        builder = builder.add_source(::config::Environment::with_prefix("LATTICE").try_parsing(true));

        let raw = builder.build()?;
        let overrides: FileOverrides = raw.try_deserialize().unwrap_or_default();

        let mut cfg = Self::default();
        if let Some(v) = overrides.max_iterations {
            cfg.max_iterations = v;
        }
        if let Some(v) = overrides.debug {
            cfg.debug = v;
        }
        if let Some(v) = overrides.debug_dir {
            cfg.debug_dir = PathBuf::from(v);
        }
        if let Some(v) = overrides.approved_hosts {
            cfg.policy.approved_hosts = v;
        }
        if let Some(v) = overrides.confirm_reason_threshold {
            cfg.policy.confirm_reason_threshold = v;
        }
        if let Some(v) = overrides.low_confidence_threshold {
            cfg.policy.low_confidence_threshold = v;
        }
        if let Some(v) = overrides.autonomous {
            cfg.run_mode = if v { RunMode::Autonomous } else { RunMode::Interactive };
        }
        if let Some(v) = overrides.step_sleep_ms {
            cfg.step_sleep_ms = v;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_fallbacks() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.max_iterations, 12);
        assert_eq!(cfg.run_mode, RunMode::Autonomous);
    }

    #[test]
    fn load_without_any_file_falls_back_to_defaults() {
        let cfg = RuntimeConfig::load(Some(std::path::Path::new("/nonexistent/lattice.yaml"))).unwrap();
        assert_eq!(cfg.max_iterations, 12);
    }
}

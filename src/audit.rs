//! Debug/audit artifact writer (spec §6, SPEC_FULL §0.5): when
//! `WEB_AGENT_DEBUG=1`, writes one file per reasoning-prompt and one per
//! DOM capture into a per-run folder, via write-temp-then-rename (spec §5
//! persistence discipline), following the same debug-dump pattern used
//! elsewhere in this crate (see `DESIGN.md`).

use std::path::{Path, PathBuf};

/// Owns the per-run debug directory. A no-op writer (`enabled: false`)
/// when `WEB_AGENT_DEBUG` isn't set, so call sites never need to branch
/// on configuration themselves.
#[derive(Clone, Debug)]
pub struct AuditWriter {
    enabled: bool,
    dir: PathBuf,
}

impl AuditWriter {
    pub fn new(debug_dir: impl Into<PathBuf>, enabled: bool, session_id: &str) -> Self {
        let dir = debug_dir.into().join(session_id);
        if enabled {
            if let Err(err) = std::fs::create_dir_all(&dir) {
                tracing::warn!(error = %err, dir = %dir.display(), "failed to create debug directory, disabling audit writer");
                return Self { enabled: false, dir };
            }
        }
        Self { enabled, dir }
    }

    pub fn disabled() -> Self {
        Self { enabled: false, dir: PathBuf::new() }
    }

    fn write_atomic(&self, path: &Path, contents: &str) {
        let tmp = path.with_extension("tmp");
        if let Err(err) = std::fs::write(&tmp, contents) {
            tracing::warn!(error = %err, path = %path.display(), "audit write failed");
            return;
        }
        if let Err(err) = std::fs::rename(&tmp, path) {
            tracing::warn!(error = %err, path = %path.display(), "audit rename failed");
        }
    }

    /// `web_prompt_step<N>_<ts>.txt` (spec §6).
    pub fn write_prompt(&self, step_number: u32, timestamp_ms: u64, prompt: &str) {
        if !self.enabled {
            return;
        }
        let path = self.dir.join(format!("web_prompt_step{step_number}_{timestamp_ms}.txt"));
        self.write_atomic(&path, prompt);
    }

    /// `dom_debug_step<N>_<ts>.txt` (spec §6).
    pub fn write_dom(&self, step_number: u32, timestamp_ms: u64, skeleton: &str) {
        if !self.enabled {
            return;
        }
        let path = self.dir.join(format!("dom_debug_step{step_number}_{timestamp_ms}.txt"));
        self.write_atomic(&path, skeleton);
    }

    /// `llm_reply_step<N>_<ts>.txt`: the raw planner/observation reply,
    /// useful for debugging a malformed-JSON degradation.
    pub fn write_reply(&self, step_number: u32, timestamp_ms: u64, reply: &str) {
        if !self.enabled {
            return;
        }
        let path = self.dir.join(format!("llm_reply_step{step_number}_{timestamp_ms}.txt"));
        self.write_atomic(&path, reply);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_writer_touches_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AuditWriter::new(dir.path(), false, "session-1");
        writer.write_prompt(1, 1000, "prompt text");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn enabled_writer_persists_prompt_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AuditWriter::new(dir.path(), true, "session-1");
        writer.write_prompt(2, 12345, "the prompt");
        let expected = dir.path().join("session-1").join("web_prompt_step2_12345.txt");
        assert_eq!(std::fs::read_to_string(expected).unwrap(), "the prompt");
    }
}

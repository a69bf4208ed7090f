#![allow(dead_code)]

//! Cognitive Lattice (spec §4.6, component C6): an append-only event log
//! plus a task state machine, persisted as a single JSON document per
//! session (spec §6 "Persistent lattice file").
//!
//! Combines a namespace/key record store persisted on every mutation with
//! an append-only event export, generalized here into the task-lifecycle
//! + event-log shape spec §4.6 names. Persistence uses write-temp-then-
//! rename rather than a plain `fs::write` (spec §5/§9: "a crashed
//! half-written session file is the single most costly failure mode").

pub mod errors;
pub mod persistence;

use chrono::Utc;

use lattice_types::{
    CompletedStep, CompletedStepStatus, LatticeEvent, LatticeEventType, SessionId, Task, TaskStatus,
};

pub use errors::LatticeMemoryError;

/// On-disk shape (spec §6): `{session_id, created_at, nodes, event_log,
/// memory_chunks, last_updated}`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LatticeFile {
    pub session_id: String,
    pub created_at: chrono::DateTime<Utc>,
    pub nodes: Vec<Task>,
    pub event_log: Vec<LatticeEvent>,
    pub memory_chunks: Vec<serde_json::Value>,
    pub last_updated: chrono::DateTime<Utc>,
}

/// `{session_id, nodes, event_log, memory_chunks}` (spec §3). Owns its
/// event log exclusively; the Coordinator holds a shared reference and
/// only ever mutates through the methods below, never the fields
/// directly (fields are private for exactly that reason).
pub struct Lattice {
    session_id: SessionId,
    created_at: chrono::DateTime<Utc>,
    nodes: Vec<Task>,
    event_log: Vec<LatticeEvent>,
    memory_chunks: Vec<serde_json::Value>,
    persist_path: Option<std::path::PathBuf>,
}

impl Lattice {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            created_at: Utc::now(),
            nodes: Vec::new(),
            event_log: Vec::new(),
            memory_chunks: Vec::new(),
            persist_path: None,
        }
    }

    pub fn with_persistence(session_id: SessionId, path: impl Into<std::path::PathBuf>) -> Self {
        let mut lattice = Self::new(session_id);
        lattice.persist_path = Some(path.into());
        lattice
    }

    /// Loads a previously persisted session file (spec §6 "may be
    /// re-opened to resume a task"). `session_id` is immutable once
    /// loaded, matching the file's own field.
    pub fn load(path: impl Into<std::path::PathBuf>) -> Result<Self, LatticeMemoryError> {
        let path = path.into();
        let bytes = std::fs::read(&path)?;
        let file: LatticeFile = serde_json::from_slice(&bytes)?;
        Ok(Self {
            session_id: SessionId(file.session_id),
            created_at: file.created_at,
            nodes: file.nodes,
            event_log: file.event_log,
            memory_chunks: file.memory_chunks,
            persist_path: Some(path),
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// `save()` (spec §4.6): full-write, not append, via write-temp-then-
    /// rename (spec §5 "Persistence discipline"). A no-op when no path was
    /// configured — in-memory-only lattices (most unit tests) never touch
    /// the filesystem.
    pub fn save(&self) -> Result<(), LatticeMemoryError> {
        let Some(path) = self.persist_path.as_ref() else {
            return Ok(());
        };
        let file = LatticeFile {
            session_id: self.session_id.0.clone(),
            created_at: self.created_at,
            nodes: self.nodes.clone(),
            event_log: self.event_log.clone(),
            memory_chunks: self.memory_chunks.clone(),
            last_updated: Utc::now(),
        };
        persistence::write_atomic(path, &file)
    }

    /// Appends an immutable event (P5: the log is append-only) and
    /// persists. A persistence failure is logged and swallowed (spec §7
    /// "lattice-persistence-error": log; continue in-memory; retry on
    /// next save) — it never propagates past this call.
    pub fn add_event(&mut self, event_type: LatticeEventType, payload: serde_json::Value) {
        self.event_log.push(LatticeEvent { event_type, timestamp: Utc::now(), payload });
        if let Err(err) = self.save() {
            tracing::warn!(error = %err, "lattice persistence failed after add_event, continuing in-memory");
        }
    }

    pub fn get_recent_events(&self, limit: usize) -> &[LatticeEvent] {
        let start = self.event_log.len().saturating_sub(limit);
        &self.event_log[start..]
    }

    pub fn event_log(&self) -> &[LatticeEvent] {
        &self.event_log
    }

    pub fn get_active_task(&self) -> Option<&Task> {
        self.nodes.iter().find(|t| t.status == TaskStatus::Active)
    }

    fn get_active_task_mut(&mut self) -> Option<&mut Task> {
        self.nodes.iter_mut().find(|t| t.status == TaskStatus::Active)
    }

    pub fn get_task_progress(&self, task: &Task) -> (usize, usize) {
        task.progress()
    }

    /// Closes any task left `Active` with an inconsistent or incomplete
    /// `completed_steps` tail (a crash mid-step, or a prior session that
    /// never called `complete_current_task`) so the single-active-task
    /// precondition (spec §4.6, P6) always holds before a new task starts.
    /// Spec: "Precondition: no existing active Task (enforced by cleanup
    /// that closes any malformed/incomplete tasks)."
    fn cleanup_stale_active_tasks(&mut self) {
        for task in self.nodes.iter_mut().filter(|t| t.status == TaskStatus::Active) {
            tracing::warn!(task_id = %task.task_id, "closing stale active task before starting a new one");
            task.status = TaskStatus::Abandoned;
        }
    }

    /// `create_new_task(query, plan)` (spec §4.6).
    pub fn create_new_task(&mut self, query: impl Into<String>, plan: Vec<String>) -> &Task {
        self.cleanup_stale_active_tasks();
        let task = Task::new(query, plan);
        self.nodes.push(task);
        self.add_event(
            LatticeEventType::PlanGenerated,
            serde_json::json!({ "task_id": self.nodes.last().unwrap().task_id.0 }),
        );
        self.nodes.last().unwrap()
    }

    /// `execute_step(step_number, user_input, result)` (spec §4.6):
    /// appends a step to the active task, promoting the previous step to
    /// `Completed` if it was still `InProgress`.
    pub fn execute_step(
        &mut self,
        step_number: u32,
        description: impl Into<String>,
        user_input: Option<String>,
        result: serde_json::Value,
    ) -> Result<(), LatticeMemoryError> {
        let description = description.into();
        let task = self.get_active_task_mut().ok_or(LatticeMemoryError::NoActiveTask)?;
        if let Some(prev) = task.completed_steps.last_mut() {
            if prev.status == CompletedStepStatus::InProgress {
                prev.status = CompletedStepStatus::Completed;
            }
        }
        task.completed_steps.push(CompletedStep {
            step_number,
            description,
            user_input,
            result,
            status: CompletedStepStatus::InProgress,
        });
        self.add_event(
            LatticeEventType::WebStepCompleted,
            serde_json::json!({ "step_number": step_number }),
        );
        Ok(())
    }

    /// `mark_step_completed(step_number)` (spec §4.6).
    pub fn mark_step_completed(&mut self, step_number: u32) -> Result<(), LatticeMemoryError> {
        let task = self.get_active_task_mut().ok_or(LatticeMemoryError::NoActiveTask)?;
        let step = task
            .completed_steps
            .iter_mut()
            .find(|s| s.step_number == step_number)
            .ok_or(LatticeMemoryError::NoActiveTask)?;
        step.status = CompletedStepStatus::Completed;
        self.save().ok();
        Ok(())
    }

    /// `complete_current_task()` (spec §4.6): `active -> completed` is the
    /// only legal transition (no revert, per the task-state-machine
    /// invariant in spec §4.6).
    pub fn complete_current_task(&mut self) -> Result<(), LatticeMemoryError> {
        let task = self.get_active_task_mut().ok_or(LatticeMemoryError::NoActiveTask)?;
        task.status = TaskStatus::Completed;
        let task_id = task.task_id.0.clone();
        self.add_event(LatticeEventType::TaskCompleted, serde_json::json!({ "task_id": task_id }));
        Ok(())
    }

    pub fn abandon_current_task(&mut self) -> Result<(), LatticeMemoryError> {
        let task = self.get_active_task_mut().ok_or(LatticeMemoryError::NoActiveTask)?;
        task.status = TaskStatus::Abandoned;
        self.save().ok();
        Ok(())
    }

    pub fn nodes(&self) -> &[Task] {
        &self.nodes
    }

    pub fn add_memory_chunk(&mut self, chunk: serde_json::Value) {
        self.memory_chunks.push(chunk);
        self.save().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::TaskStatus;

    #[test]
    fn create_new_task_makes_it_active() {
        let mut lattice = Lattice::new(SessionId::new());
        lattice.create_new_task("find a store", vec!["a".into(), "b".into()]);
        let task = lattice.get_active_task().unwrap();
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.progress(), (0, 2));
    }

    #[test]
    fn execute_step_promotes_previous_in_progress_step() {
        let mut lattice = Lattice::new(SessionId::new());
        lattice.create_new_task("goal", vec!["a".into(), "b".into()]);
        lattice.execute_step(1, "a", None, serde_json::json!({})).unwrap();
        lattice.execute_step(2, "b", None, serde_json::json!({})).unwrap();

        let task = lattice.get_active_task().unwrap();
        assert_eq!(task.completed_steps[0].status, CompletedStepStatus::Completed);
        assert_eq!(task.completed_steps[1].status, CompletedStepStatus::InProgress);
    }

    #[test]
    fn single_active_task_invariant_holds_across_creates() {
        let mut lattice = Lattice::new(SessionId::new());
        lattice.create_new_task("first", vec!["a".into()]);
        lattice.create_new_task("second", vec!["b".into()]);

        let active_count = lattice.nodes().iter().filter(|t| t.status == TaskStatus::Active).count();
        assert_eq!(active_count, 1);
        assert_eq!(lattice.nodes()[0].status, TaskStatus::Abandoned);
    }

    #[test]
    fn complete_current_task_fires_task_completed_event() {
        let mut lattice = Lattice::new(SessionId::new());
        lattice.create_new_task("goal", vec!["a".into()]);
        lattice.execute_step(1, "a", None, serde_json::json!({})).unwrap();
        lattice.complete_current_task().unwrap();

        assert!(lattice.get_active_task().is_none());
        assert!(lattice
            .event_log()
            .iter()
            .any(|e| matches!(e.event_type, LatticeEventType::TaskCompleted)));
    }

    #[test]
    fn execute_step_without_active_task_errors() {
        let mut lattice = Lattice::new(SessionId::new());
        let result = lattice.execute_step(1, "x", None, serde_json::json!({}));
        assert!(matches!(result, Err(LatticeMemoryError::NoActiveTask)));
    }

    #[test]
    fn event_log_is_append_only_across_snapshots() {
        let mut lattice = Lattice::new(SessionId::new());
        lattice.create_new_task("goal", vec!["a".into()]);
        let snapshot_1: Vec<_> = lattice.event_log().to_vec();
        lattice.execute_step(1, "a", None, serde_json::json!({})).unwrap();
        let snapshot_2 = lattice.event_log();

        assert!(snapshot_2.len() >= snapshot_1.len());
        for (a, b) in snapshot_1.iter().zip(snapshot_2.iter()) {
            assert_eq!(format!("{:?}", a.event_type), format!("{:?}", b.event_type));
        }
    }

    #[test]
    fn save_and_load_round_trips_through_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut lattice = Lattice::with_persistence(SessionId::new(), &path);
        lattice.create_new_task("goal", vec!["a".into(), "b".into()]);
        lattice.execute_step(1, "a", None, serde_json::json!({"ok": true})).unwrap();

        let reloaded = Lattice::load(&path).unwrap();
        assert_eq!(reloaded.session_id().0, lattice.session_id().0);
        let task = reloaded.get_active_task().unwrap();
        assert_eq!(task.completed_steps.len(), 1);
        assert_eq!(task.task_plan.len(), 2);
    }

    #[test]
    fn crash_recovery_resumes_step_four_of_five() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        {
            let mut lattice = Lattice::with_persistence(SessionId::new(), &path);
            lattice.create_new_task("goal", (1..=5).map(|n| format!("step {n}")).collect());
            for n in 1..=3 {
                lattice.execute_step(n, format!("step {n}"), None, serde_json::json!({})).unwrap();
                lattice.mark_step_completed(n).unwrap();
            }
        }

        let mut resumed = Lattice::load(&path).unwrap();
        let task = resumed.get_active_task().unwrap();
        assert_eq!(task.completed_steps.len(), 3);

        resumed.execute_step(4, "step 4", None, serde_json::json!({})).unwrap();
        let task = resumed.get_active_task().unwrap();
        assert_eq!(task.completed_steps.len(), 4);
        assert_eq!(task.completed_steps[3].step_number, 4);
    }
}

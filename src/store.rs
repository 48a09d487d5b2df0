//! In-memory process store
//!
//! Single source of truth for process state: read by status queries and the
//! edit operation, written by the active pipeline worker. Each process holds
//! its own lock so that a field update (append a task, complete a task, set
//! the finished flag) is atomic with respect to concurrent readers, and
//! concurrent processes never contend with each other.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ProcessState, SubTaskResult, TaskStatus, SYNTHESIS_STEP_ID};

/// Store lookup errors, surfaced to the HTTP boundary as 4xx
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Process ID not found: {0}")]
    ProcessNotFound(Uuid),

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Process {0} still has tasks in flight")]
    PhaseUnfinished(Uuid),

    #[error("Card generation already running for {0}")]
    SynthesisRunning(Uuid),
}

type Shared<T> = Arc<RwLock<T>>;

/// Concurrency-safe keyed map of process id → process state
#[derive(Clone, Default)]
pub struct ProcessStore {
    inner: Shared<HashMap<Uuid, Shared<ProcessState>>>,
}

impl ProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new process. Ids are generated at state creation and
    /// never reused.
    pub async fn insert(&self, state: ProcessState) -> Uuid {
        let id = state.process_id;
        self.inner
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(state)));
        id
    }

    async fn entry(&self, id: Uuid) -> Result<Shared<ProcessState>, StoreError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::ProcessNotFound(id))
    }

    /// Consistent point-in-time copy of a process, for status responses.
    pub async fn snapshot(&self, id: Uuid) -> Result<ProcessState, StoreError> {
        let entry = self.entry(id).await?;
        let state = entry.read().await;
        Ok(state.clone())
    }

    /// Open the synthesis phase: guard checks and the phase transition happen
    /// under one write lock, so two concurrent generation requests cannot
    /// both pass. A regenerate removes the prior synthesis entry, keeping
    /// step ids unique across the task sequence.
    pub async fn begin_synthesis(&self, id: Uuid) -> Result<(), StoreError> {
        let entry = self.entry(id).await?;
        let mut state = entry.write().await;
        if state.synthesis_in_flight() {
            return Err(StoreError::SynthesisRunning(id));
        }
        if !state.is_finished {
            return Err(StoreError::PhaseUnfinished(id));
        }
        state.sub_tasks.retain(|t| t.step_id != SYNTHESIS_STEP_ID);
        state.is_finished = false;
        Ok(())
    }

    /// Append a sub-task to the process's ordered sequence.
    pub async fn append_task(&self, id: Uuid, task: SubTaskResult) -> Result<(), StoreError> {
        let entry = self.entry(id).await?;
        entry.write().await.sub_tasks.push(task);
        Ok(())
    }

    /// Move a sub-task to a terminal status with its content or error text.
    pub async fn complete_task(
        &self,
        id: Uuid,
        step_id: &str,
        status: TaskStatus,
        summary: String,
    ) -> Result<(), StoreError> {
        let entry = self.entry(id).await?;
        let mut state = entry.write().await;
        let task = state
            .task_mut(step_id)
            .ok_or_else(|| StoreError::StepNotFound(step_id.to_string()))?;
        task.complete(status, summary);
        Ok(())
    }

    /// Mark the current phase as finished (all tasks terminal).
    pub async fn finish_phase(&self, id: Uuid) -> Result<(), StoreError> {
        let entry = self.entry(id).await?;
        entry.write().await.is_finished = true;
        Ok(())
    }

    /// Replace a sub-task's result text with a user edit. Status is left
    /// unchanged.
    pub async fn update_task_result(
        &self,
        id: Uuid,
        step_id: &str,
        new_summary: String,
    ) -> Result<(), StoreError> {
        let entry = self.entry(id).await?;
        let mut state = entry.write().await;
        let task = state
            .task_mut(step_id)
            .ok_or_else(|| StoreError::StepNotFound(step_id.to_string()))?;
        tracing::info!(
            process_id = %id,
            step_id = %step_id,
            len = new_summary.len(),
            "sub-task result updated by user"
        );
        task.result_summary = Some(new_summary);
        Ok(())
    }

    /// Record the final artifact envelope after a successful synthesis.
    pub async fn set_final_json(&self, id: Uuid, json: String) -> Result<(), StoreError> {
        let entry = self.entry(id).await?;
        entry.write().await.final_json = Some(json);
        Ok(())
    }
}

//! Process state machine
//!
//! One `ProcessState` per submitted job: the owning profile, the ordered
//! sub-task sequence, a `finished` flag, and the final artifact once the
//! synthesis phase has run. Sub-tasks transition PROCESSING → SUCCESS|FAILED
//! and never leave a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::character::CharacterProfile;

/// Step identifier of the synthesis task appended by `generate_card`.
pub const SYNTHESIS_STEP_ID: &str = "step_final_gen";

/// Reliability weight carried by the synthesis task (above the 1..4 range
/// of user references).
pub const SYNTHESIS_RELIABILITY: u8 = 5;

/// Sub-task status
///
/// `Pending` is part of the wire contract but never used as an initial
/// state: tasks are enqueued and started together, so they are created
/// directly in `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl TaskStatus {
    /// SUCCESS or FAILED; a sub-task never leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

/// Task kind, one per reference kind plus the final synthesis step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    DocAnalysis,
    ImageAnalysis,
    LinkCrawl,
    Search,
    CardGeneration,
}

/// One unit of work within a process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTaskResult {
    /// Stable identifier, unique within the process
    pub step_id: String,
    /// Human title for display
    pub title: String,
    /// Task kind
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// Current status
    pub status: TaskStatus,
    /// Extracted content on success, error text on failure; editable by the
    /// user while status is SUCCESS, prior to generation
    #[serde(default)]
    pub result_summary: Option<String>,
    /// Reliability weight inherited from the reference (5 for synthesis)
    pub reliability_score: u8,
}

impl SubTaskResult {
    /// Create a sub-task directly in PROCESSING, per the enqueue-and-start
    /// execution model.
    pub fn processing(step_id: String, title: String, kind: TaskKind, reliability_score: u8) -> Self {
        Self {
            step_id,
            title,
            kind,
            status: TaskStatus::Processing,
            result_summary: None,
            reliability_score,
        }
    }

    /// Transition to a terminal status with the resolved content or error
    /// text. Ignored if the task is already terminal.
    pub fn complete(&mut self, status: TaskStatus, summary: String) {
        debug_assert!(status.is_terminal());
        if self.status.is_terminal() {
            tracing::warn!(
                step_id = %self.step_id,
                "ignoring terminal transition on already-terminal task"
            );
            return;
        }
        self.status = status;
        self.result_summary = Some(summary);
    }
}

/// One end-to-end run from submission to (optionally) artifact generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessState {
    /// Opaque unique token
    pub process_id: Uuid,
    /// True once every task of the current phase has reached a terminal state
    pub is_finished: bool,
    /// Owning profile, copied at submission time
    pub character_info: CharacterProfile,
    /// Ordered sub-task sequence (submission order, never reordered)
    pub sub_tasks: Vec<SubTaskResult>,
    /// Final artifact envelope, present after a successful synthesis
    #[serde(default)]
    pub final_json: Option<String>,
    /// Submission time
    pub created_at: DateTime<Utc>,
}

impl ProcessState {
    pub fn new(character_info: CharacterProfile) -> Self {
        Self {
            process_id: Uuid::new_v4(),
            is_finished: false,
            character_info,
            sub_tasks: Vec::new(),
            final_json: None,
            created_at: Utc::now(),
        }
    }

    pub fn task(&self, step_id: &str) -> Option<&SubTaskResult> {
        self.sub_tasks.iter().find(|t| t.step_id == step_id)
    }

    pub fn task_mut(&mut self, step_id: &str) -> Option<&mut SubTaskResult> {
        self.sub_tasks.iter_mut().find(|t| t.step_id == step_id)
    }

    /// True while a synthesis task exists that has not reached a terminal
    /// state. Used to reject concurrent generation requests.
    pub fn synthesis_in_flight(&self) -> bool {
        self.sub_tasks
            .iter()
            .any(|t| t.kind == TaskKind::CardGeneration && !t.status.is_terminal())
    }
}

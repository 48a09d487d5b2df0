//! Data model: character profiles, references, and process state

pub mod character;
pub mod process;

pub use character::{
    reliability_label, CharacterCard, CharacterProfile, ReferenceItem, ReferenceKind,
    PENDING_UPLOAD,
};
pub use process::{
    ProcessState, SubTaskResult, TaskKind, TaskStatus, SYNTHESIS_RELIABILITY, SYNTHESIS_STEP_ID,
};

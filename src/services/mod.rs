//! Service layer: planning, background execution, resolvers, synthesis

pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod resolvers;
pub mod search;
pub mod synthesizer;

pub use pipeline::PipelineExecutor;
pub use planner::{plan_reference_tasks, plan_synthesis_task, PlannedTask};

//! Pipeline executor
//!
//! Runs a process's task queue to completion in the background: appends each
//! sub-task in PROCESSING, dispatches it to the resolver for its kind, and
//! records the terminal status. Task failures are contained - they never
//! abort sibling tasks or the process. Tasks run strictly sequentially
//! within one process; processes are independent of each other.

use anyhow::Context;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{SubTaskResult, TaskKind, TaskStatus};
use crate::services::planner::PlannedTask;
use crate::services::resolvers::{DocumentReader, ImageTagger, Resolver, UrlReader};
use crate::services::search::SearchResolver;
use crate::services::synthesizer;
use crate::store::ProcessStore;

/// Background executor over one process's task queue
#[derive(Clone)]
pub struct PipelineExecutor {
    store: ProcessStore,
}

impl PipelineExecutor {
    pub fn new(store: ProcessStore) -> Self {
        Self { store }
    }

    /// Fire-and-forget launch. The triggering request returns immediately;
    /// worker failures are logged, never silently dropped.
    pub fn spawn(self, process_id: Uuid, tasks: Vec<PlannedTask>) {
        tokio::spawn(async move {
            tracing::info!(process_id = %process_id, tasks = tasks.len(), "pipeline worker started");
            if let Err(e) = self.run(process_id, tasks).await {
                tracing::error!(process_id = %process_id, error = %e, "pipeline worker failed");
            } else {
                tracing::info!(process_id = %process_id, "pipeline worker finished");
            }
        });
    }

    /// Run the queue in order against the store. The configuration is loaded
    /// fresh per run so operational changes take effect on the next process.
    pub async fn run(&self, process_id: Uuid, tasks: Vec<PlannedTask>) -> anyhow::Result<()> {
        let config = Config::load();

        for task in tasks {
            self.store
                .append_task(
                    process_id,
                    SubTaskResult::processing(
                        task.step_id.clone(),
                        task.title.clone(),
                        task.kind,
                        task.reliability_score,
                    ),
                )
                .await
                .context("append sub-task")?;

            let (status, summary) = match self.dispatch(process_id, &task, &config).await {
                Ok(content) => (TaskStatus::Success, content),
                Err(e) => {
                    tracing::warn!(
                        process_id = %process_id,
                        step_id = %task.step_id,
                        error = %e,
                        "task failed"
                    );
                    (TaskStatus::Failed, format!("Error: {:#}", e))
                }
            };

            self.store
                .complete_task(process_id, &task.step_id, status, summary)
                .await
                .context("complete sub-task")?;
        }

        self.store
            .finish_phase(process_id)
            .await
            .context("finish phase")?;
        Ok(())
    }

    async fn dispatch(
        &self,
        process_id: Uuid,
        task: &PlannedTask,
        config: &Config,
    ) -> anyhow::Result<String> {
        match task.kind {
            TaskKind::DocAnalysis => DocumentReader.resolve(task, config).await,
            TaskKind::ImageAnalysis => ImageTagger::new()?.resolve(task, config).await,
            TaskKind::LinkCrawl => UrlReader::new()?.resolve(task, config).await,
            TaskKind::Search => SearchResolver.resolve(task, config).await,
            TaskKind::CardGeneration => self.run_synthesis(process_id, config).await,
        }
    }

    /// The synthesis task delegates to the card synthesizer instead of a
    /// content resolver; its summary is a short status line while the
    /// artifact envelope lands in the process state.
    async fn run_synthesis(&self, process_id: Uuid, config: &Config) -> anyhow::Result<String> {
        let state = self.store.snapshot(process_id).await?;
        let materials = synthesizer::collect_materials(&state);

        let envelope = synthesizer::synthesize(&state.character_info, &materials, config).await?;

        self.store.set_final_json(process_id, envelope).await?;
        Ok("Character card generated".to_string())
    }
}

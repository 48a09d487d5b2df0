//! Card synthesizer
//!
//! Aggregates every successfully resolved material (with user edits and
//! reliability weights applied), invokes the generative model once, parses
//! its output as a JSON object, and embeds the pretty-printed card into the
//! PNG artifact envelope.

use std::path::PathBuf;
use thiserror::Error;

use crate::artifact;
use crate::config::Config;
use crate::models::{CharacterProfile, ProcessState, ReferenceKind, TaskKind, TaskStatus};
use crate::prompts;
use crate::services::llm::{ChatMessage, LlmClient, LlmError};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("No JSON object found in model output")]
    NoJsonObject,

    #[error("Model output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error(transparent)]
    Artifact(#[from] artifact::ArtifactError),

    #[error("Join error: {0}")]
    Join(String),
}

/// One weighted material fed into the generation request
#[derive(Debug, Clone)]
pub struct Material {
    pub kind: TaskKind,
    pub reliability_score: u8,
    pub content: String,
}

/// Collect every SUCCESS sub-task with non-empty result, excluding the
/// synthesis task itself. This is the only place reliability weights and
/// user edits feed forward.
pub fn collect_materials(state: &ProcessState) -> Vec<Material> {
    state
        .sub_tasks
        .iter()
        .filter(|t| t.kind != TaskKind::CardGeneration)
        .filter(|t| t.status == TaskStatus::Success)
        .filter_map(|t| {
            let content = t.result_summary.as_deref()?;
            if content.is_empty() {
                return None;
            }
            Some(Material {
                kind: t.kind,
                reliability_score: t.reliability_score,
                content: content.to_string(),
            })
        })
        .collect()
}

/// Extract the JSON object between the first `{` and the last `}` of the
/// raw model output.
pub fn extract_json_object(text: &str) -> Result<serde_json::Value, SynthesisError> {
    let start = text.find('{').ok_or(SynthesisError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(SynthesisError::NoJsonObject)?;
    if end < start {
        return Err(SynthesisError::NoJsonObject);
    }
    serde_json::from_str(&text[start..=end])
        .map_err(|e| SynthesisError::InvalidJson(e.to_string()))
}

/// First image reference of the profile, if any; its resolved file path
/// becomes the artifact's visual.
fn first_image_path(profile: &CharacterProfile) -> Option<PathBuf> {
    profile
        .reference
        .iter()
        .find(|r| r.resource_type == ReferenceKind::Image)
        .map(|r| PathBuf::from(&r.resource_url))
}

/// Run one synthesis: model call, JSON extraction, artifact embedding.
/// Returns the envelope JSON string. An empty materials list still invokes
/// the model.
pub async fn synthesize(
    profile: &CharacterProfile,
    materials: &[Material],
    config: &Config,
) -> Result<String, SynthesisError> {
    tracing::info!(
        character = %profile.character_name,
        materials = materials.len(),
        "starting card generation"
    );

    let mut messages = vec![
        ChatMessage::system(prompts::CARD_SYSTEM_PROMPT.to_string()),
        ChatMessage::user(prompts::render_character_brief(profile)),
    ];
    for material in materials {
        messages.push(ChatMessage::user(prompts::render_reference_material(
            material.kind,
            material.reliability_score,
            &material.content,
        )));
    }

    let client = LlmClient::new(&config.llm)?;
    let raw = client.complete(&messages).await?;

    let card = extract_json_object(&raw)?;
    let card_json = artifact::pretty_json(&card)?;

    // Image work is synchronous; keep it off the async worker
    let image_path = first_image_path(profile);
    let envelope = tokio::task::spawn_blocking(move || {
        let visual = match image_path {
            Some(path) => artifact::load_card_visual(&path)?,
            None => artifact::blank_card_visual(),
        };
        let png = artifact::encode_card_png(&visual, &card_json)?;
        artifact::build_envelope(&card_json, &png)
    })
    .await
    .map_err(|e| SynthesisError::Join(e.to_string()))??;

    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubTaskResult;

    #[test]
    fn extract_json_between_first_and_last_brace() {
        let text = "Here is your card:\n```json\n{\"name\": \"Alice\"}\n```\nEnjoy!";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["name"], "Alice");
    }

    #[test]
    fn missing_braces_is_an_error() {
        assert!(matches!(
            extract_json_object("no json here"),
            Err(SynthesisError::NoJsonObject)
        ));
        assert!(matches!(
            extract_json_object("} reversed {"),
            Err(SynthesisError::NoJsonObject)
        ));
    }

    #[test]
    fn invalid_json_between_braces_is_an_error() {
        assert!(matches!(
            extract_json_object("{not json}"),
            Err(SynthesisError::InvalidJson(_))
        ));
    }

    #[test]
    fn materials_exclude_failures_empties_and_synthesis() {
        let profile: CharacterProfile =
            serde_json::from_str(r#"{"character_name":"Alice"}"#).unwrap();
        let mut state = ProcessState::new(profile);

        let mut ok = SubTaskResult::processing("step_ref_0".into(), "t".into(), TaskKind::LinkCrawl, 2);
        ok.complete(TaskStatus::Success, "hello".into());
        state.sub_tasks.push(ok);

        let mut failed =
            SubTaskResult::processing("step_ref_1".into(), "t".into(), TaskKind::DocAnalysis, 3);
        failed.complete(TaskStatus::Failed, "Error: boom".into());
        state.sub_tasks.push(failed);

        let mut empty =
            SubTaskResult::processing("step_ref_2".into(), "t".into(), TaskKind::Search, 4);
        empty.complete(TaskStatus::Success, String::new());
        state.sub_tasks.push(empty);

        let mut synth = SubTaskResult::processing(
            "step_final_gen".into(),
            "t".into(),
            TaskKind::CardGeneration,
            5,
        );
        synth.complete(TaskStatus::Success, "done".into());
        state.sub_tasks.push(synth);

        let materials = collect_materials(&state);
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].content, "hello");
        assert_eq!(materials[0].reliability_score, 2);
    }
}

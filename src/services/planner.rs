//! Task planner
//!
//! Converts a profile's reference list into an ordered task queue, one task
//! per reference in submission order. Search references have their location
//! replaced with the fully rendered search-intent string here, a one-time
//! templating step never re-derived later.

use crate::models::{
    CharacterProfile, ReferenceKind, TaskKind, SYNTHESIS_RELIABILITY, SYNTHESIS_STEP_ID,
};
use crate::prompts;

/// One planned unit of work, carrying everything the executor needs to
/// dispatch its resolver.
#[derive(Debug, Clone)]
pub struct PlannedTask {
    pub step_id: String,
    pub title: String,
    pub kind: TaskKind,
    /// File path, URL, or rendered search intent
    pub location: String,
    pub reliability_score: u8,
}

/// Plan the reference-resolution phase. An empty reference list yields an
/// empty queue; the pipeline then finishes immediately with zero tasks.
pub fn plan_reference_tasks(profile: &CharacterProfile) -> Vec<PlannedTask> {
    profile
        .reference
        .iter()
        .enumerate()
        .map(|(idx, reference)| {
            let (title, kind, location) = match reference.resource_type {
                ReferenceKind::Image => (
                    format!(
                        "Visual analysis: {}",
                        reference.file_name.as_deref().unwrap_or("Image")
                    ),
                    TaskKind::ImageAnalysis,
                    reference.resource_url.clone(),
                ),
                ReferenceKind::File => (
                    format!(
                        "Document analysis: {}",
                        reference.file_name.as_deref().unwrap_or("Document")
                    ),
                    TaskKind::DocAnalysis,
                    reference.resource_url.clone(),
                ),
                ReferenceKind::Url => (
                    format!("Link crawl: {}", reference.resource_url),
                    TaskKind::LinkCrawl,
                    reference.resource_url.clone(),
                ),
                ReferenceKind::Search => (
                    format!("Web research: {}", profile.character_name),
                    TaskKind::Search,
                    prompts::render_search_intent(profile),
                ),
            };

            PlannedTask {
                step_id: format!("step_ref_{}", idx),
                title,
                kind,
                location,
                reliability_score: reference.reliability_score,
            }
        })
        .collect()
}

/// Plan the single synthesis task appended by `generate_card`.
pub fn plan_synthesis_task() -> PlannedTask {
    PlannedTask {
        step_id: SYNTHESIS_STEP_ID.to_string(),
        title: "Building character card from materials".to_string(),
        kind: TaskKind::CardGeneration,
        location: String::new(),
        reliability_score: SYNTHESIS_RELIABILITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(json: &str) -> CharacterProfile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_reference_list_yields_empty_queue() {
        let p = profile(r#"{"character_name":"Alice"}"#);
        assert!(plan_reference_tasks(&p).is_empty());
    }

    #[test]
    fn tasks_follow_submission_order_with_stable_step_ids() {
        let p = profile(
            r#"{"character_name":"Alice","reference":[
                {"resource_type":"url","reliability_score":2,"resource_url":"https://example.com/a"},
                {"resource_type":"file","reliability_score":3,"resource_url":"/tmp/a.txt","file_name":"a.txt"},
                {"resource_type":"image","reliability_score":1,"resource_url":"/tmp/a.png"},
                {"resource_type":"search","reliability_score":4,"resource_url":""}
            ]}"#,
        );
        let tasks = plan_reference_tasks(&p);
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0].step_id, "step_ref_0");
        assert_eq!(tasks[0].kind, TaskKind::LinkCrawl);
        assert_eq!(tasks[1].kind, TaskKind::DocAnalysis);
        assert_eq!(tasks[1].title, "Document analysis: a.txt");
        assert_eq!(tasks[2].kind, TaskKind::ImageAnalysis);
        assert_eq!(tasks[3].step_id, "step_ref_3");
        assert_eq!(tasks[3].kind, TaskKind::Search);
        assert_eq!(tasks[3].reliability_score, 4);
    }

    #[test]
    fn search_location_is_rendered_intent_not_raw_url() {
        let p = profile(
            r#"{"character_name":"Alice","source_work_name":"Wonderland","reference":[
                {"resource_type":"search","reliability_score":4,"resource_url":"ignored"}
            ]}"#,
        );
        let tasks = plan_reference_tasks(&p);
        assert!(tasks[0].location.contains("Alice"));
        assert!(tasks[0].location.contains("Wonderland"));
        assert!(!tasks[0].location.contains("ignored"));
    }

    #[test]
    fn synthesis_task_has_fixed_id_and_maximal_weight() {
        let t = plan_synthesis_task();
        assert_eq!(t.step_id, SYNTHESIS_STEP_ID);
        assert_eq!(t.kind, TaskKind::CardGeneration);
        assert_eq!(t.reliability_score, SYNTHESIS_RELIABILITY);
    }
}

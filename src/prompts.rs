//! Prompt templating
//!
//! Templates use `%PLACEHOLDER%` substitution. Optional fields render as a
//! labelled bullet line when present and as nothing when absent, so the
//! model never sees an empty label. The search-intent template is rendered
//! exactly once, when the task queue is planned.

use crate::models::{reliability_label, CharacterProfile, TaskKind};

/// System prompt for the card-generation call. The model must answer with a
/// single JSON object; everything around it is stripped by the parser.
pub const CARD_SYSTEM_PROMPT: &str = "\
You are an expert character-card writer. Using the character brief and the \
weighted reference materials that follow, write one complete character card.\n\
Respond with a single JSON object with exactly these string fields:\n\
\"name\", \"description\", \"personality\", \"scenario\", \"first_mes\", \"mes_example\".\n\
Weigh conflicting sources by their stated reliability. Do not add commentary \
outside the JSON object.";

const CHARACTER_BRIEF_TEMPLATE: &str = "\
# Character Brief\n\
- **Character name:** %CHARACTER_NAME%\n\
%CHARACTER_ALIASES%\
%SOURCE_WORK_NAME%\
%SOURCE_WORK_ALIASES%\
%USER_REQUIREMENT%";

const SEARCH_INTENT_TEMPLATE: &str = "\
Research the fictional character below. Collect canonical facts about their \
appearance, personality, backstory, relationships and speech style, citing \
source material where possible.\n\
- **Character name:** %CHARACTER_NAME%\n\
%CHARACTER_ALIASES%\
%SOURCE_WORK_NAME%\
%SOURCE_WORK_ALIASES%";

const REFERENCE_MATERIAL_TEMPLATE: &str = "\
# Reference Material\n\
- **Source kind:** %SOURCE_TYPE%\n\
- **Reliability:** %RELIABILITY%\n\
\n\
%CONTENT%";

fn optional_line(label: &str, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("- **{}:** {}\n", label, value)
    }
}

fn optional_list(label: &str, values: &[String]) -> String {
    if values.is_empty() {
        String::new()
    } else {
        format!("- **{}:** {}\n", label, values.join(", "))
    }
}

fn render_identity(template: &str, profile: &CharacterProfile) -> String {
    template
        .replace("%CHARACTER_NAME%", &profile.character_name)
        .replace(
            "%CHARACTER_ALIASES%",
            &optional_list("Character aliases", &profile.character_aliases),
        )
        .replace(
            "%SOURCE_WORK_NAME%",
            &optional_line("Source work", &profile.source_work_name),
        )
        .replace(
            "%SOURCE_WORK_ALIASES%",
            &optional_list("Source work aliases", &profile.source_work_aliases),
        )
}

/// Character brief sent as the first user message of the generation request.
pub fn render_character_brief(profile: &CharacterProfile) -> String {
    render_identity(CHARACTER_BRIEF_TEMPLATE, profile).replace(
        "%USER_REQUIREMENT%",
        &optional_line("User requirement", &profile.user_requirement),
    )
}

/// Fully rendered search-intent string for a `search` reference.
pub fn render_search_intent(profile: &CharacterProfile) -> String {
    render_identity(SEARCH_INTENT_TEMPLATE, profile)
}

/// One weighted reference-material message for the generation request.
pub fn render_reference_material(kind: TaskKind, reliability_score: u8, content: &str) -> String {
    let source_type = match kind {
        TaskKind::DocAnalysis => "document",
        TaskKind::ImageAnalysis => "image tags",
        TaskKind::LinkCrawl => "web page",
        TaskKind::Search => "web research",
        TaskKind::CardGeneration => "generated card",
    };
    REFERENCE_MATERIAL_TEMPLATE
        .replace("%SOURCE_TYPE%", source_type)
        .replace("%RELIABILITY%", reliability_label(reliability_score))
        .replace("%CONTENT%", content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(json: &str) -> CharacterProfile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn search_intent_includes_all_identity_fields() {
        let p = profile(
            r#"{"character_name":"Alice","character_aliases":["Al","Ally"],
                "source_work_name":"Wonderland","source_work_aliases":["WL"]}"#,
        );
        let intent = render_search_intent(&p);
        assert!(intent.contains("Alice"));
        assert!(intent.contains("Al, Ally"));
        assert!(intent.contains("Wonderland"));
        assert!(intent.contains("WL"));
        assert!(!intent.contains('%'));
    }

    #[test]
    fn empty_optional_fields_leave_no_labels() {
        let p = profile(r#"{"character_name":"Alice"}"#);
        let intent = render_search_intent(&p);
        assert!(!intent.contains("aliases"));
        assert!(!intent.contains("Source work"));

        let brief = render_character_brief(&p);
        assert!(!brief.contains("User requirement"));
        assert!(!brief.contains('%'));
    }

    #[test]
    fn reference_material_renders_reliability_label() {
        let msg = render_reference_material(TaskKind::LinkCrawl, 4, "hello");
        assert!(msg.contains("web page"));
        assert!(msg.contains("certain"));
        assert!(msg.ends_with("hello"));
    }
}

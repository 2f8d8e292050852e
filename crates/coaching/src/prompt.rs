//! Prompt assembly for each model call.

use crate::persona::{pattern_description, Companion};
use crate::stage::{SessionState, BRIEFING_STAGE, COACHING_STAGES};
use crate::templates::StageTemplates;

/// Name used when the profile has no display name.
pub const DEFAULT_USER_NAME: &str = "friend";

/// Everything outside the session that shapes the system prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// How to address the user.
    pub user_name: String,
    /// Assessment pattern key and display name, for assessment sessions.
    pub pattern: Option<(String, String)>,
    /// True when the session has no turns yet.
    pub is_first_turn: bool,
    pub companion: Companion,
}

/// Build the stage-specific instruction block.
///
/// Stage 0 and the briefing stage return their template text unchanged.
/// Coaching stages get the shared techniques, the stage text, a progress line
/// and, once `rounds_in_stage` reaches the stage's limit, a directive to
/// close the stage in this turn.
pub fn build_stage_prompt(stage: u8, rounds_in_stage: u32, templates: &StageTemplates) -> String {
    let stage_text = templates.stage_text(stage);

    let max_rounds = match templates.max_rounds(stage) {
        Some(max) => max,
        None => return stage_text.to_string(),
    };

    let mut prompt = String::new();
    prompt.push_str(templates.techniques());
    prompt.push_str("\n\n");
    prompt.push_str(stage_text);
    prompt.push_str(&format!(
        "\n[This stage has taken {rounds_in_stage} rounds so far, at most {max_rounds}]"
    ));

    if rounds_in_stage >= max_rounds {
        prompt.push_str(&format!(
            "\n⚠️ [The maximum of {max_rounds} rounds for this stage has been reached. \
             You must finish this stage in this reply: summarise for the user and call \
             complete_stage to move on.]\n"
        ));
    }

    prompt
}

fn stage_header(stage: u8) -> String {
    format!("[Current stage: {}/{}]", stage.min(BRIEFING_STAGE), COACHING_STAGES)
}

fn assessment_context(ctx: &PromptContext) -> Option<String> {
    let (pattern, pattern_name) = ctx.pattern.as_ref()?;
    let description = pattern_description(pattern)
        .unwrap_or("is going through some emotional difficulty");

    let mut text = format!(
        "[Assessment background]\n\
         The user has just completed an emotional-health assessment and their result is the \
         \"{pattern_name}\" pattern.\n\
         This suggests the user {description}.\n\n\
         With this background in mind, gently guide the user into the journey of emotional awareness."
    );
    if ctx.is_first_turn {
        text.push_str(
            "\nThis is the first round: first empathise with the user's situation, ask what has \
             troubled them most recently, then move naturally into the four steps.",
        );
    }
    Some(text)
}

/// Build the full system prompt for a regular turn.
pub fn build_system_prompt(
    templates: &StageTemplates,
    state: &SessionState,
    ctx: &PromptContext,
) -> String {
    let stage = state.current_stage();
    let name = if ctx.user_name.trim().is_empty() {
        DEFAULT_USER_NAME
    } else {
        ctx.user_name.as_str()
    };

    let mut sections = vec![
        templates.base_prompt().to_string(),
        format!(
            "[User]\nName: {name}\nUse the user's name now and then to keep things warm, \
             e.g. \"{name}, I can sense...\""
        ),
    ];

    if let Some(context) = assessment_context(ctx) {
        sections.push(context);
    }

    sections.push(format!(
        "{}\n{}",
        stage_header(stage),
        build_stage_prompt(stage, state.rounds(), templates)
    ));

    sections.push(format!(
        "[Companion]\nYou are \"{}\" {}, a gentle and professional emotional coach.",
        ctx.companion.name, ctx.companion.icon
    ));

    sections.join("\n\n")
}

/// Build the system prompt for the follow-up call made after a tool call.
///
/// The stage has just changed, so the round count starts from zero.
pub fn build_continuation_prompt(
    templates: &StageTemplates,
    stage: u8,
    companion: &Companion,
) -> String {
    format!(
        "You are \"{}\" {}, a gentle emotional companion.\n\n{}\n{}\n\n\
         Continue gently guiding the user through the current stage.",
        companion.name,
        companion.icon,
        stage_header(stage),
        build_stage_prompt(stage, 0, templates)
    )
}

/// Note appended to the system prompt when the model's tool arguments were unusable.
pub fn corrective_note(reason: &str) -> String {
    format!(
        "\n\n[System note] Your previous tool call could not be used ({reason}). \
         If you call a tool, its arguments must match the tool's JSON schema exactly. \
         Otherwise reply to the user in plain text."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTIVE_MARKER: &str = "must finish this stage";

    fn templates() -> StageTemplates {
        let doc = serde_json::json!({
            "coaching_techniques": "TECHNIQUES",
            "stages": {
                "0": "INTAKE",
                "1": "AWARENESS",
                "2": "UNDERSTANDING",
                "3": "REACTION",
                "4": "TRANSFORMATION",
                "5": "BRIEFING"
            }
        });
        StageTemplates::parse("BASE", &doc.to_string()).unwrap()
    }

    #[test]
    fn test_intake_and_briefing_are_raw() {
        let t = templates();
        assert_eq!(build_stage_prompt(0, 7, &t), "INTAKE");
        assert_eq!(build_stage_prompt(5, 7, &t), "BRIEFING");
    }

    #[test]
    fn test_coaching_stage_layout() {
        let prompt = build_stage_prompt(1, 1, &templates());
        assert!(prompt.starts_with("TECHNIQUES\n\nAWARENESS"));
        assert!(prompt.contains("taken 1 rounds so far, at most 3"));
        assert!(!prompt.contains(DIRECTIVE_MARKER));
    }

    #[test]
    fn test_directive_at_limit() {
        let t = templates();

        // Stage 2 with three prior rounds and a limit of three
        assert!(build_stage_prompt(2, 3, &t).contains(DIRECTIVE_MARKER));
        assert!(!build_stage_prompt(2, 2, &t).contains(DIRECTIVE_MARKER));

        // Stage 4 has a limit of two
        assert!(build_stage_prompt(4, 2, &t).contains(DIRECTIVE_MARKER));
        assert!(!build_stage_prompt(4, 1, &t).contains(DIRECTIVE_MARKER));
    }

    #[test]
    fn test_directive_iff_rounds_reach_limit() {
        let t = templates();
        for stage in 1..=4u8 {
            let max = t.max_rounds(stage).unwrap();
            for rounds in 0..=max + 2 {
                let prompt = build_stage_prompt(stage, rounds, &t);
                assert_eq!(prompt.contains(DIRECTIVE_MARKER), rounds >= max);
                // Pure: same inputs, same output
                assert_eq!(prompt, build_stage_prompt(stage, rounds, &t));
            }
        }
    }

    #[test]
    fn test_system_prompt_sections() {
        let t = templates();
        let ctx = PromptContext {
            user_name: "Lin".to_string(),
            pattern: Some(("anxiety".to_string(), "Anxious".to_string())),
            is_first_turn: true,
            companion: Companion::from_key(Some("wise_owl")),
        };
        let state = SessionState::Stage {
            number: 2,
            rounds: 1,
        };

        let prompt = build_system_prompt(&t, &state, &ctx);
        assert!(prompt.starts_with("BASE"));
        assert!(prompt.contains("Name: Lin"));
        assert!(prompt.contains("\"Anxious\" pattern"));
        assert!(prompt.contains("worries about the future"));
        assert!(prompt.contains("This is the first round"));
        assert!(prompt.contains("[Current stage: 2/4]\nTECHNIQUES"));
        assert!(prompt.contains("Wise Owl"));
    }

    #[test]
    fn test_system_prompt_defaults() {
        let prompt = build_system_prompt(&templates(), &SessionState::Intake, &PromptContext::default());
        assert!(prompt.contains("Name: friend"));
        assert!(!prompt.contains("[Assessment background]"));
        assert!(prompt.contains("[Current stage: 0/4]\nINTAKE"));
        assert!(prompt.contains("Coach Jing"));
    }

    #[test]
    fn test_continuation_prompt_resets_rounds() {
        let prompt = build_continuation_prompt(&templates(), 3, &Companion::default());
        assert!(prompt.contains("[Current stage: 3/4]"));
        assert!(prompt.contains("REACTION"));
        assert!(prompt.contains("taken 0 rounds so far"));
        assert!(prompt.ends_with("through the current stage."));
    }
}

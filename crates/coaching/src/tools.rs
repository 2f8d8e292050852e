//! Coach tools: their schemas and the interpreter for the model's calls.

use coach_core::{ToolCall, ToolDefinition};
use serde_json::{json, Map, Value};

use crate::briefing::Briefing;
use crate::error::MalformedToolCall;
use crate::persona::Companion;
use crate::stage::COACHING_STAGES;

pub const CAPTURE_EMOTION: &str = "capture_emotion";
pub const COMPLETE_STAGE: &str = "complete_stage";
pub const GENERATE_BRIEFING: &str = "generate_briefing";

/// The tools offered on every coaching turn.
pub fn coach_tools(companion: &Companion) -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            CAPTURE_EMOTION,
            "Record the event the user described and move on to emotional awareness",
            json!({
                "type": "object",
                "properties": {
                    "event_summary": {
                        "type": "string",
                        "description": "Short description of the emotional event, 20-30 words"
                    }
                },
                "required": ["event_summary"]
            }),
        ),
        ToolDefinition::function(
            COMPLETE_STAGE,
            "Finish the current stage, record the user's insight and move to the next stage",
            json!({
                "type": "object",
                "properties": {
                    "stage": {
                        "type": "number",
                        "description": "The stage being completed, 1-4"
                    },
                    "insight": {
                        "type": "string",
                        "description": "The core insight of this stage"
                    },
                    "reflection": {
                        "type": "string",
                        "description": format!("{}'s gentle response, 20-30 words", companion.name)
                    }
                },
                "required": ["stage", "insight", "reflection"]
            }),
        ),
        ToolDefinition::function(
            GENERATE_BRIEFING,
            "Generate the emotional briefing after all four stages are complete",
            json!({
                "type": "object",
                "properties": {
                    "emotion_theme": {
                        "type": "string",
                        "description": "Theme emotions, e.g. irritated · uneasy · not good enough"
                    },
                    "emotion_tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Emotion tags"
                    },
                    "stage_1_content": {
                        "type": "string",
                        "description": "Awareness: the emotion the user named and how it felt in the body"
                    },
                    "stage_2_content": {
                        "type": "string",
                        "description": "Understanding: the need or value the user saw, plus an insight sentence"
                    },
                    "stage_3_content": {
                        "type": "string",
                        "description": "Reaction: the automatic reaction pattern the user noticed"
                    },
                    "stage_4_content": {
                        "type": "string",
                        "description": "Transformation: a concrete small action and what it might change"
                    },
                    "insight": {
                        "type": "string",
                        "description": "Today's insight, in the user's own words"
                    },
                    "action": {
                        "type": "string",
                        "description": "Today's action: something doable within ten seconds"
                    },
                    "growth_story": {
                        "type": "string",
                        "description": "Today's growth: the possibility seen in this conversation"
                    }
                },
                "required": [
                    "emotion_theme", "emotion_tags", "stage_1_content", "stage_2_content",
                    "stage_3_content", "stage_4_content", "insight", "action", "growth_story"
                ]
            }),
        ),
    ]
}

/// A validated coach tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum CoachToolCall {
    CaptureEmotion {
        event_summary: String,
    },
    CompleteStage {
        stage: u8,
        insight: String,
        reflection: String,
    },
    GenerateBriefing(Briefing),
}

/// A tool call together with its provider id and decoded arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretedCall {
    pub id: String,
    pub tool: CoachToolCall,
    /// Arguments exactly as the model sent them.
    pub args: Value,
}

impl CoachToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            CoachToolCall::CaptureEmotion { .. } => CAPTURE_EMOTION,
            CoachToolCall::CompleteStage { .. } => COMPLETE_STAGE,
            CoachToolCall::GenerateBriefing(_) => GENERATE_BRIEFING,
        }
    }

    /// Validate a raw tool call from the model.
    pub fn interpret(call: &ToolCall) -> Result<InterpretedCall, MalformedToolCall> {
        let tool = call.function.name.as_str();
        if ![CAPTURE_EMOTION, COMPLETE_STAGE, GENERATE_BRIEFING].contains(&tool) {
            return Err(MalformedToolCall::UnknownTool(tool.to_string()));
        }

        let args: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
            MalformedToolCall::InvalidJson {
                tool: tool.to_string(),
                reason: e.to_string(),
            }
        })?;
        let fields = args
            .as_object()
            .ok_or_else(|| invalid(tool, "arguments must be a JSON object"))?;

        let parsed = match tool {
            CAPTURE_EMOTION => CoachToolCall::CaptureEmotion {
                event_summary: required_text(tool, fields, "event_summary")?,
            },
            COMPLETE_STAGE => CoachToolCall::CompleteStage {
                stage: stage_number(tool, fields)?,
                insight: required_text(tool, fields, "insight")?,
                reflection: required_string(tool, fields, "reflection")?,
            },
            _ => {
                let briefing: Briefing = serde_json::from_value(args.clone())
                    .map_err(|e| invalid(tool, &e.to_string()))?;
                CoachToolCall::GenerateBriefing(briefing)
            }
        };

        Ok(InterpretedCall {
            id: call.id.clone(),
            tool: parsed,
            args,
        })
    }
}

fn invalid(tool: &str, reason: &str) -> MalformedToolCall {
    MalformedToolCall::InvalidArguments {
        tool: tool.to_string(),
        reason: reason.to_string(),
    }
}

fn required_string(tool: &str, fields: &Map<String, Value>, key: &str) -> Result<String, MalformedToolCall> {
    match fields.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(invalid(tool, &format!("`{key}` must be a string"))),
        None => Err(invalid(tool, &format!("missing `{key}`"))),
    }
}

fn required_text(tool: &str, fields: &Map<String, Value>, key: &str) -> Result<String, MalformedToolCall> {
    let value = required_string(tool, fields, key)?;
    if value.trim().is_empty() {
        return Err(invalid(tool, &format!("`{key}` must not be empty")));
    }
    Ok(value)
}

/// Stage numbers arrive as JSON numbers and may be floats such as `2.0`.
fn stage_number(tool: &str, fields: &Map<String, Value>) -> Result<u8, MalformedToolCall> {
    let value = fields
        .get("stage")
        .ok_or_else(|| invalid(tool, "missing `stage`"))?;

    let number = value
        .as_f64()
        .filter(|n| n.fract() == 0.0)
        .ok_or_else(|| invalid(tool, &format!("`stage` must be an integer, got {value}")))?;

    if number < 1.0 || number > f64::from(COACHING_STAGES) {
        return Err(invalid(tool, &format!("`stage` must be 1-4, got {value}")));
    }

    Ok(number as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &str) -> ToolCall {
        ToolCall::function("call_1", name, args)
    }

    fn briefing_args() -> Value {
        json!({
            "emotion_theme": "uneasy · not good enough",
            "emotion_tags": ["anxiety", "self-doubt"],
            "stage_1_content": "Named anxiety, tight chest",
            "stage_2_content": "I care about doing well",
            "stage_3_content": "I overwork",
            "stage_4_content": "Take a five minute walk",
            "insight": "Resting is not failing",
            "action": "Three slow breaths",
            "growth_story": "Learning to pause"
        })
    }

    #[test]
    fn test_tool_schemas() {
        let tools = coach_tools(&Companion::default());
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec![CAPTURE_EMOTION, COMPLETE_STAGE, GENERATE_BRIEFING]);

        let json = serde_json::to_value(&tools[1]).unwrap();
        assert_eq!(json["type"], "function");
        assert!(json["function"]["parameters"]["properties"]["reflection"]["description"]
            .as_str()
            .unwrap()
            .contains("Coach Jing"));
    }

    #[test]
    fn test_capture_emotion() {
        let parsed =
            CoachToolCall::interpret(&call(CAPTURE_EMOTION, r#"{"event_summary":"failed an exam"}"#))
                .unwrap();
        assert_eq!(parsed.id, "call_1");
        assert_eq!(
            parsed.tool,
            CoachToolCall::CaptureEmotion {
                event_summary: "failed an exam".to_string()
            }
        );
    }

    #[test]
    fn test_complete_stage_accepts_float_stage() {
        for raw in [r#"2"#, r#"2.0"#] {
            let args = format!(r#"{{"stage":{raw},"insight":"I need rest","reflection":"Well seen"}}"#);
            let parsed = CoachToolCall::interpret(&call(COMPLETE_STAGE, &args)).unwrap();
            assert!(matches!(parsed.tool, CoachToolCall::CompleteStage { stage: 2, .. }));
        }
    }

    #[test]
    fn test_complete_stage_rejects_bad_stage() {
        for stage in [r#"0"#, r#"5"#, r#"2.5"#, r#""2""#, r#"null"#] {
            let args = format!(r#"{{"stage":{stage},"insight":"x","reflection":"y"}}"#);
            let result = CoachToolCall::interpret(&call(COMPLETE_STAGE, &args));
            assert!(
                matches!(result, Err(MalformedToolCall::InvalidArguments { .. })),
                "stage {stage} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let result = CoachToolCall::interpret(&call(COMPLETE_STAGE, r#"{"stage":1,"insight":"x"}"#));
        assert!(matches!(result, Err(MalformedToolCall::InvalidArguments { ref reason, .. }) if reason.contains("reflection")));

        let result = CoachToolCall::interpret(&call(CAPTURE_EMOTION, r#"{"event_summary":42}"#));
        assert!(matches!(result, Err(MalformedToolCall::InvalidArguments { .. })));

        let result = CoachToolCall::interpret(&call(CAPTURE_EMOTION, r#"{"event_summary":""}"#));
        assert!(matches!(result, Err(MalformedToolCall::InvalidArguments { .. })));

        let result = CoachToolCall::interpret(&call(CAPTURE_EMOTION, r#"["a"]"#));
        assert!(matches!(result, Err(MalformedToolCall::InvalidArguments { .. })));
    }

    #[test]
    fn test_bad_json_and_unknown_tool() {
        let result = CoachToolCall::interpret(&call(COMPLETE_STAGE, r#"{"stage": 1,"#));
        assert!(matches!(result, Err(MalformedToolCall::InvalidJson { .. })));

        let result = CoachToolCall::interpret(&call("web_search", "{}"));
        assert_eq!(result, Err(MalformedToolCall::UnknownTool("web_search".to_string())));
    }

    #[test]
    fn test_generate_briefing_round_trips_verbatim() {
        let args = briefing_args();
        let parsed =
            CoachToolCall::interpret(&call(GENERATE_BRIEFING, &args.to_string())).unwrap();

        assert_eq!(parsed.args, args);
        match parsed.tool {
            CoachToolCall::GenerateBriefing(briefing) => {
                assert_eq!(briefing.emotion_tags, vec!["anxiety", "self-doubt"]);
                assert_eq!(serde_json::to_value(&briefing).unwrap(), args);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_generate_briefing_requires_every_field() {
        let mut args = briefing_args();
        args.as_object_mut().unwrap().remove("growth_story");
        let result = CoachToolCall::interpret(&call(GENERATE_BRIEFING, &args.to_string()));
        assert!(matches!(result, Err(MalformedToolCall::InvalidArguments { .. })));
    }
}

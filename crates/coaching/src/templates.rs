//! Stage prompt templates.
//!
//! A coach's prompts live in the `coach_templates` table as a base system
//! prompt plus a JSON document:
//!
//! ```json
//! {
//!   "coaching_techniques": "...",
//!   "stages": { "0": "...", "1": "...", "2": "...", "3": "...", "4": "...", "5": "..." },
//!   "max_rounds": { "2": 4 }
//! }
//! ```
//!
//! Stages "0" through "4" are required; "5" and the other keys are optional.
//! The document is validated once, when it is loaded.

use std::collections::BTreeMap;

use database::{coach_template, CoachTemplate, Database};
use serde::Deserialize;
use tracing::info;

use crate::error::TemplateError;
use crate::stage::{BRIEFING_STAGE, COACHING_STAGES};

/// Coach key of the bundled template.
pub const DEFAULT_COACH_KEY: &str = "emotion_coach";

/// The bundled template, seeded into empty databases.
pub const DEFAULT_TEMPLATE_JSON: &str = include_str!("../prompts/emotion_coach.json");

/// Default per-stage round limits for stages 1..=4.
pub const DEFAULT_MAX_ROUNDS: [u32; COACHING_STAGES as usize] = [3, 3, 3, 2];

#[derive(Debug, Deserialize)]
struct RawStagePrompts {
    #[serde(default)]
    coaching_techniques: Option<String>,
    #[serde(default)]
    stages: Option<BTreeMap<String, String>>,
    #[serde(default)]
    max_rounds: BTreeMap<String, serde_json::Value>,
}

/// Validated prompt table for one coach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTemplates {
    base_prompt: String,
    techniques: String,
    /// Stage texts 0..=4.
    stages: Vec<String>,
    /// Optional text for the briefing stage.
    briefing: Option<String>,
    max_rounds: [u32; COACHING_STAGES as usize],
}

impl StageTemplates {
    /// Parse and validate a template.
    pub fn parse(base_prompt: &str, stage_prompts: &str) -> Result<Self, TemplateError> {
        let raw: RawStagePrompts = serde_json::from_str(stage_prompts)
            .map_err(|e| TemplateError::InvalidJson(e.to_string()))?;

        let mut stage_map = raw.stages.ok_or(TemplateError::MissingStages)?;

        let mut stages = Vec::with_capacity(COACHING_STAGES as usize + 1);
        for stage in 0..=COACHING_STAGES {
            match stage_map.remove(&stage.to_string()) {
                Some(text) if !text.trim().is_empty() => stages.push(text),
                _ => return Err(TemplateError::MissingStage(stage)),
            }
        }

        let briefing = stage_map
            .remove(&BRIEFING_STAGE.to_string())
            .filter(|t| !t.trim().is_empty());

        let mut max_rounds = DEFAULT_MAX_ROUNDS;
        for (key, value) in raw.max_rounds {
            let stage: u8 = key
                .parse()
                .ok()
                .filter(|s| (1..=COACHING_STAGES).contains(s))
                .ok_or_else(|| TemplateError::InvalidMaxRounds {
                    stage: key.clone(),
                    reason: "not a coaching stage".to_string(),
                })?;
            let limit = value
                .as_u64()
                .filter(|v| *v > 0)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| TemplateError::InvalidMaxRounds {
                    stage: key.clone(),
                    reason: format!("expected a positive integer, got {value}"),
                })?;
            max_rounds[usize::from(stage - 1)] = limit;
        }

        Ok(Self {
            base_prompt: base_prompt.to_string(),
            techniques: raw.coaching_techniques.unwrap_or_default(),
            stages,
            briefing,
            max_rounds,
        })
    }

    /// Validate a stored template row.
    pub fn from_row(row: &CoachTemplate) -> Result<Self, TemplateError> {
        Self::parse(&row.system_prompt, &row.stage_prompts)
    }

    /// The coach's base system prompt.
    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }

    /// Shared coaching techniques prepended to stages 1..=4.
    pub fn techniques(&self) -> &str {
        &self.techniques
    }

    /// Raw text for a stage; empty for the briefing stage when not configured.
    pub fn stage_text(&self, stage: u8) -> &str {
        if stage == BRIEFING_STAGE {
            return self.briefing.as_deref().unwrap_or("");
        }
        self.stages
            .get(usize::from(stage))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Round limit for a coaching stage. Stages outside 1..=4 have no limit.
    pub fn max_rounds(&self, stage: u8) -> Option<u32> {
        if (1..=COACHING_STAGES).contains(&stage) {
            Some(self.max_rounds[usize::from(stage - 1)])
        } else {
            None
        }
    }
}

/// A template file as bundled or supplied by operators.
#[derive(Debug, Deserialize)]
pub struct TemplateFile {
    pub coach_key: String,
    #[serde(default)]
    pub title: String,
    pub system_prompt: String,
    pub stage_prompts: serde_json::Value,
}

impl TemplateFile {
    /// Parse a template file and validate its prompts.
    pub fn parse(json: &str) -> Result<Self, TemplateError> {
        let file: TemplateFile =
            serde_json::from_str(json).map_err(|e| TemplateError::InvalidJson(e.to_string()))?;
        StageTemplates::parse(&file.system_prompt, &file.stage_prompts.to_string())?;
        Ok(file)
    }
}

/// Insert a template file unless the coach key already has a template.
///
/// Returns true when the template was written.
pub async fn seed_template(db: &Database, file: &TemplateFile) -> crate::Result<bool> {
    match coach_template::get_active_template(db.pool(), &file.coach_key).await {
        Ok(_) => Ok(false),
        Err(database::DatabaseError::NotFound { .. }) => {
            coach_template::upsert_template(
                db.pool(),
                &file.coach_key,
                &file.title,
                &file.system_prompt,
                &file.stage_prompts.to_string(),
            )
            .await?;
            info!("Seeded coach template {}", file.coach_key);
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

/// Load and validate the active template for a coach.
pub async fn load_templates(db: &Database, coach_key: &str) -> crate::Result<StageTemplates> {
    let row = match coach_template::get_active_template(db.pool(), coach_key).await {
        Ok(row) => row,
        Err(database::DatabaseError::NotFound { .. }) => {
            return Err(crate::CoachError::NotFound(format!("coach {coach_key}")))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(StageTemplates::from_row(&row)?)
}

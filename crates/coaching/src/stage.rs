//! Session state machine.
//!
//! A session walks a fixed script: intake (stage 0), four coaching stages
//! (awareness, understanding, reaction, transformation), then a terminal
//! briefing stage (5). Stage numbers never go down.

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Number of coaching stages between intake and the briefing.
pub const COACHING_STAGES: u8 = 4;

/// Stage number reported once every coaching stage is done.
pub const BRIEFING_STAGE: u8 = COACHING_STAGES + 1;

/// Where a session is in its script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionState {
    /// Stage 0: the user has not yet described the triggering event.
    Intake,
    /// A coaching stage (1..=4) and the user turns already taken in it.
    Stage { number: u8, rounds: u32 },
    /// Stage 5: all stages done, no briefing stored yet.
    AwaitingBriefing,
    /// The briefing is stored; the session accepts nothing more.
    Completed,
}

/// Something that happened during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The user sent a message.
    UserTurn,
    /// The model captured the triggering event (`capture_emotion`).
    EmotionCaptured,
    /// The model closed coaching stage `n` (`complete_stage`).
    StageCompleted(u8),
    /// The briefing was generated.
    BriefingGenerated,
}

impl SessionState {
    /// Rebuild a state from its stored columns.
    pub fn from_parts(stage: i64, rounds: i64, completed: bool) -> Result<Self, TransitionError> {
        if completed {
            return Ok(SessionState::Completed);
        }
        match stage {
            0 => Ok(SessionState::Intake),
            1..=4 => Ok(SessionState::Stage {
                number: stage as u8,
                rounds: u32::try_from(rounds).unwrap_or(0),
            }),
            5 => Ok(SessionState::AwaitingBriefing),
            other => Err(TransitionError::InvalidStage(other)),
        }
    }

    /// The stage number shown to clients (0..=5).
    pub fn current_stage(&self) -> u8 {
        match self {
            SessionState::Intake => 0,
            SessionState::Stage { number, .. } => *number,
            SessionState::AwaitingBriefing | SessionState::Completed => BRIEFING_STAGE,
        }
    }

    /// User turns already taken in the current stage.
    pub fn rounds(&self) -> u32 {
        match self {
            SessionState::Stage { rounds, .. } => *rounds,
            _ => 0,
        }
    }

    /// "active" or "completed".
    pub fn status(&self) -> &'static str {
        if self.is_completed() {
            "completed"
        } else {
            "active"
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SessionState::Completed)
    }

    /// The state after `event`, or why the event is not allowed.
    pub fn apply(self, event: SessionEvent) -> Result<SessionState, TransitionError> {
        if self.is_completed() {
            return Err(TransitionError::SessionCompleted);
        }

        let next = match event {
            SessionEvent::UserTurn => match self {
                SessionState::Stage { number, rounds } => SessionState::Stage {
                    number,
                    rounds: rounds.saturating_add(1),
                },
                other => other,
            },
            SessionEvent::EmotionCaptured => match self {
                SessionState::Intake => SessionState::Stage {
                    number: 1,
                    rounds: 0,
                },
                other => other,
            },
            SessionEvent::StageCompleted(n) => {
                if !(1..=COACHING_STAGES).contains(&n) {
                    return Err(TransitionError::StageOutOfRange(n));
                }
                let target = (n + 1).max(self.current_stage());
                if target > COACHING_STAGES {
                    SessionState::AwaitingBriefing
                } else if target == self.current_stage() {
                    // Closing an earlier stage again leaves progress untouched.
                    self
                } else {
                    SessionState::Stage {
                        number: target,
                        rounds: 0,
                    }
                }
            }
            SessionEvent::BriefingGenerated => SessionState::Completed,
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(number: u8, rounds: u32) -> SessionState {
        SessionState::Stage { number, rounds }
    }

    #[test]
    fn test_user_turn_counts_rounds() {
        let s = stage(2, 1).apply(SessionEvent::UserTurn).unwrap();
        assert_eq!(s, stage(2, 2));

        // Intake and the briefing stage do not count rounds
        assert_eq!(
            SessionState::Intake.apply(SessionEvent::UserTurn).unwrap(),
            SessionState::Intake
        );
        assert_eq!(
            SessionState::AwaitingBriefing
                .apply(SessionEvent::UserTurn)
                .unwrap(),
            SessionState::AwaitingBriefing
        );
    }

    #[test]
    fn test_capture_moves_intake_to_stage_one() {
        let s = SessionState::Intake.apply(SessionEvent::EmotionCaptured).unwrap();
        assert_eq!(s, stage(1, 0));

        // Later stages are not pulled back
        let s = stage(3, 2).apply(SessionEvent::EmotionCaptured).unwrap();
        assert_eq!(s, stage(3, 2));
    }

    #[test]
    fn test_stage_completed_advances_and_resets_rounds() {
        let s = stage(1, 3).apply(SessionEvent::StageCompleted(1)).unwrap();
        assert_eq!(s, stage(2, 0));

        let s = stage(4, 2).apply(SessionEvent::StageCompleted(4)).unwrap();
        assert_eq!(s, SessionState::AwaitingBriefing);
    }

    #[test]
    fn test_stage_never_decreases() {
        let s = stage(3, 1).apply(SessionEvent::StageCompleted(1)).unwrap();
        assert_eq!(s, stage(3, 1));

        let s = SessionState::AwaitingBriefing
            .apply(SessionEvent::StageCompleted(2))
            .unwrap();
        assert_eq!(s, SessionState::AwaitingBriefing);

        // Skipping ahead is allowed
        let s = SessionState::Intake
            .apply(SessionEvent::StageCompleted(2))
            .unwrap();
        assert_eq!(s, stage(3, 0));
    }

    #[test]
    fn test_stage_out_of_range() {
        for n in [0, 5, 9] {
            let result = stage(1, 0).apply(SessionEvent::StageCompleted(n));
            assert_eq!(result, Err(TransitionError::StageOutOfRange(n)));
        }
    }

    #[test]
    fn test_briefing_completes_from_any_active_state() {
        for s in [SessionState::Intake, stage(2, 1), SessionState::AwaitingBriefing] {
            assert_eq!(
                s.apply(SessionEvent::BriefingGenerated).unwrap(),
                SessionState::Completed
            );
        }
    }

    #[test]
    fn test_completed_is_terminal() {
        for event in [
            SessionEvent::UserTurn,
            SessionEvent::EmotionCaptured,
            SessionEvent::StageCompleted(1),
            SessionEvent::BriefingGenerated,
        ] {
            assert_eq!(
                SessionState::Completed.apply(event),
                Err(TransitionError::SessionCompleted)
            );
        }
    }

    #[test]
    fn test_stage_sequence_is_monotonic() {
        let events = [
            SessionEvent::UserTurn,
            SessionEvent::EmotionCaptured,
            SessionEvent::UserTurn,
            SessionEvent::StageCompleted(1),
            SessionEvent::StageCompleted(1),
            SessionEvent::UserTurn,
            SessionEvent::StageCompleted(3),
            SessionEvent::StageCompleted(2),
            SessionEvent::StageCompleted(4),
            SessionEvent::BriefingGenerated,
        ];

        let mut state = SessionState::Intake;
        let mut last = state.current_stage();
        for event in events {
            state = state.apply(event).unwrap();
            assert!(state.current_stage() >= last);
            last = state.current_stage();
        }
        assert!(state.is_completed());
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(SessionState::from_parts(0, 0, false).unwrap(), SessionState::Intake);
        assert_eq!(SessionState::from_parts(2, 3, false).unwrap(), stage(2, 3));
        assert_eq!(
            SessionState::from_parts(5, 0, false).unwrap(),
            SessionState::AwaitingBriefing
        );
        assert_eq!(
            SessionState::from_parts(2, 0, true).unwrap(),
            SessionState::Completed
        );
        assert_eq!(
            SessionState::from_parts(7, 0, false),
            Err(TransitionError::InvalidStage(7))
        );
    }

    #[test]
    fn test_status_and_stage_numbers() {
        assert_eq!(SessionState::Intake.status(), "active");
        assert_eq!(SessionState::Completed.status(), "completed");
        assert_eq!(SessionState::Completed.current_stage(), BRIEFING_STAGE);
        assert_eq!(stage(3, 2).rounds(), 2);
    }
}

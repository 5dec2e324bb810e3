//! Turn Policy
//!
//! Pure decision logic for who speaks on a given turn and with which
//! instructions. Nothing here touches the network, so every rule can be
//! checked directly.

use serde::{Deserialize, Serialize};

/// The turn on which the host wraps up the show.
pub const OUTRO_TURN: u32 = 6;

/// Fixed phrase the speaker must open with when answering an audience question.
pub const AUDIENCE_QUESTION_LEAD_IN: &str = "Oh I see we have a question from the audience";

/// Instructions used verbatim on [`OUTRO_TURN`].
pub const OUTRO_INSTRUCTIONS: &str = "You are Dan, you just held a podcast with your guest Anna. \
     Ask her and the audience for her time and thoughts on the podcast. (i.e., do the outro)";

/// One of the two fixed conversational roles.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    #[serde(rename = "Dan")]
    Host,
    #[serde(rename = "Anna")]
    Guest,
}

/// Which configured key/base pair a turn is billed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSlot {
    Primary,
    Secondary,
}

impl Speaker {
    pub fn name(self) -> &'static str {
        match self {
            Speaker::Host => "Dan",
            Speaker::Guest => "Anna",
        }
    }

    pub fn voice(self) -> &'static str {
        match self {
            Speaker::Host => "dan",
            Speaker::Guest => "marilyn",
        }
    }

    pub fn credential_slot(self) -> CredentialSlot {
        match self {
            Speaker::Host => CredentialSlot::Primary,
            Speaker::Guest => CredentialSlot::Secondary,
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The outcome of [`decide`] for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPlan {
    /// Even turns: the host moves the conversation along.
    HostTurn { instructions: String },
    /// Odd turns: the guest discusses the script.
    GuestTurn { instructions: String },
    /// The closing turn, which replaces everything else.
    OutroOverride,
}

impl TurnPlan {
    pub fn speaker(&self) -> Speaker {
        match self {
            TurnPlan::HostTurn { .. } | TurnPlan::OutroOverride => Speaker::Host,
            TurnPlan::GuestTurn { .. } => Speaker::Guest,
        }
    }

    pub fn voice(&self) -> &'static str {
        self.speaker().voice()
    }

    pub fn credential_slot(&self) -> CredentialSlot {
        self.speaker().credential_slot()
    }

    pub fn instructions(&self) -> &str {
        match self {
            TurnPlan::HostTurn { instructions } | TurnPlan::GuestTurn { instructions } => {
                instructions
            }
            TurnPlan::OutroOverride => OUTRO_INSTRUCTIONS,
        }
    }
}

/// Decides persona, voice, credentials and instructions for `turn`.
pub fn decide(turn: u32, podcast_script: &str, audience_question: Option<&str>) -> TurnPlan {
    if turn == OUTRO_TURN {
        return TurnPlan::OutroOverride;
    }

    let mut instructions = if turn % 2 == 0 {
        format!(
            "You are Dan, the host of a podcast. Make sure to move to the next talking point by \
             asking questions to Anna. Discuss the following topic: {}",
            podcast_script
        )
    } else {
        format!(
            "You are Anna, a guest on a podcast. Discuss the following topic: {}",
            podcast_script
        )
    };

    if let Some(question) = audience_question.filter(|q| !q.is_empty()) {
        instructions.push_str(&format!(
            " Answer the audience question before proceeding (start with '{}'): {}",
            AUDIENCE_QUESTION_LEAD_IN, question
        ));
    }

    if turn % 2 == 0 {
        TurnPlan::HostTurn { instructions }
    } else {
        TurnPlan::GuestTurn { instructions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_zero_is_host_on_primary() {
        let plan = decide(0, "AI safety", None);
        assert!(matches!(plan, TurnPlan::HostTurn { .. }));
        assert_eq!(plan.speaker(), Speaker::Host);
        assert_eq!(plan.voice(), "dan");
        assert_eq!(plan.credential_slot(), CredentialSlot::Primary);
        assert!(plan.instructions().contains("AI safety"));
        assert!(!plan.instructions().contains(AUDIENCE_QUESTION_LEAD_IN));
    }

    #[test]
    fn test_odd_turn_with_question_is_guest() {
        let plan = decide(3, "AI safety", Some("What about bias?"));
        assert_eq!(plan.speaker(), Speaker::Guest);
        assert_eq!(plan.voice(), "marilyn");
        assert_eq!(plan.credential_slot(), CredentialSlot::Secondary);

        let text = plan.instructions();
        let lead_in = text.find(AUDIENCE_QUESTION_LEAD_IN).expect("lead-in present");
        let question = text.find("What about bias?").expect("question present");
        assert!(lead_in < question);
        assert!(text.ends_with("What about bias?"));
    }

    #[test]
    fn test_parity_alternates_outside_outro() {
        for turn in (0..40).filter(|t| *t != OUTRO_TURN) {
            let expected = if turn % 2 == 0 { Speaker::Host } else { Speaker::Guest };
            assert_eq!(decide(turn, "script", None).speaker(), expected, "turn {}", turn);
        }
    }

    #[test]
    fn test_outro_ignores_script_and_question() {
        let plain = decide(OUTRO_TURN, "", None);
        let loaded = decide(OUTRO_TURN, "Quantum computing", Some("Will it break RSA?"));

        for plan in [plain, loaded] {
            assert_eq!(plan, TurnPlan::OutroOverride);
            assert_eq!(plan.instructions(), OUTRO_INSTRUCTIONS);
            assert_eq!(plan.speaker(), Speaker::Host);
            assert_eq!(plan.credential_slot(), CredentialSlot::Primary);
        }
    }

    #[test]
    fn test_question_applies_to_host_turns_too() {
        let plan = decide(2, "Rust", Some("Is it fast?"));
        assert_eq!(plan.speaker(), Speaker::Host);
        assert!(
            plan.instructions()
                .contains(&format!("'{}'): Is it fast?", AUDIENCE_QUESTION_LEAD_IN))
        );
    }

    #[test]
    fn test_empty_question_is_ignored() {
        let plan = decide(1, "Rust", Some(""));
        assert!(!plan.instructions().contains(AUDIENCE_QUESTION_LEAD_IN));
    }

    #[test]
    fn test_speaker_serializes_as_persona_name() {
        assert_eq!(serde_json::to_string(&Speaker::Host).unwrap(), "\"Dan\"");
        assert_eq!(serde_json::to_string(&Speaker::Guest).unwrap(), "\"Anna\"");
        assert_eq!(Speaker::Guest.to_string(), "Anna");
    }
}

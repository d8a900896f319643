//! Parse a language model's reply into a turn plan
//!
//! The model answers with one JSON object, possibly wrapped in prose or a code
//! fence:
//!
//! ```json
//! {
//!   "thinking": "The Medic is exposed on the left flank.",
//!   "firstAction": {"type": "move", "target": {"x": 2, "y": 3}},
//!   "secondAction": {"type": "ability", "ability": "attack", "target": {"x": 2, "y": 4}}
//! }
//! ```
//!
//! Missing actions are allowed; the orchestrator fills empty slots with `wait`.

use serde::{Deserialize, Serialize};

use crate::battle::actions::Action;
use crate::core::error::{Result, SibylError};

/// A decision for one unit turn
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPlan {
    /// Free-form reasoning, kept for logs
    #[serde(default)]
    pub thinking: String,
    #[serde(default)]
    pub first_action: Option<Action>,
    #[serde(default)]
    pub second_action: Option<Action>,
}

impl TurnPlan {
    /// Planned actions in submission order
    pub fn actions(&self) -> Vec<Action> {
        self.first_action
            .iter()
            .chain(self.second_action.iter())
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.first_action.is_none() && self.second_action.is_none()
    }
}

/// Parse a raw model reply
pub fn parse_turn_plan(response: &str) -> Result<TurnPlan> {
    let json_str = extract_json(response)?;
    serde_json::from_str(json_str).map_err(|e| {
        SibylError::Parse(format!(
            "Failed to parse turn plan: {} - Response: {}",
            e, response
        ))
    })
}

/// Extract JSON object from a reply (handles surrounding text)
fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| SibylError::Parse("No JSON found in response".into()))?;
    let end = response
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| SibylError::Parse("No closing brace found in response".into()))?;
    Ok(&response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::AbilityRequest;
    use crate::core::types::Position;

    #[test]
    fn test_parse_full_plan() {
        let plan = parse_turn_plan(
            r#"{"thinking":"Push up, then hit the Medic.",
                "firstAction":{"type":"move","target":{"x":2,"y":3}},
                "secondAction":{"type":"ability","ability":"attack","target":{"x":2,"y":4}}}"#,
        )
        .unwrap();

        assert_eq!(plan.thinking, "Push up, then hit the Medic.");
        assert_eq!(
            plan.actions(),
            vec![
                Action::move_to(2, 3),
                Action::Ability(AbilityRequest::new("attack").at(Position::new(2, 4))),
            ]
        );
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let plan = parse_turn_plan(
            "Sure! Here is my plan:\n```json\n{\"firstAction\": {\"type\": \"wait\"}}\n```",
        )
        .unwrap();
        assert_eq!(plan.actions(), vec![Action::Wait]);
        assert!(plan.thinking.is_empty());
    }

    #[test]
    fn test_missing_actions_yield_empty_plan() {
        let plan = parse_turn_plan(r#"{"thinking": "hmm"}"#).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_truncated_reply_is_an_error() {
        assert!(matches!(
            parse_turn_plan(r#"{"thinking": "I should"#),
            Err(SibylError::Parse(_))
        ));
        assert!(matches!(
            parse_turn_plan("This is not JSON at all"),
            Err(SibylError::Parse(_))
        ));
    }
}

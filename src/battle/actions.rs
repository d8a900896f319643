//! Action vocabulary submitted by decision-makers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::battle::abilities::AbilityRequest;
use crate::core::types::Position;

/// One action slot's worth of intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Move { target: Position },
    Ability(AbilityRequest),
    Wait,
}

impl Action {
    pub fn move_to(x: i32, y: i32) -> Self {
        Action::Move {
            target: Position::new(x, y),
        }
    }

    pub fn ability(request: AbilityRequest) -> Self {
        Action::Ability(request)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { target } => write!(f, "move to {target}"),
            Action::Ability(request) => {
                write!(f, "{}", request.ability)?;
                if let Some(target) = request.target {
                    write!(f, " at {target}")?;
                }
                if let Some(direction) = request.direction {
                    write!(f, " facing {direction}")?;
                }
                if let Some(addendum) = &request.addendum {
                    write!(f, " \"{addendum}\"")?;
                }
                Ok(())
            }
            Action::Wait => f.write_str("wait"),
        }
    }
}

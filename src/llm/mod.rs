//! Language-model decision-maker plumbing
//!
//! Prompt rendering from a decision view and parsing of the model's turn plan.
//! The model call itself lives outside this crate.

pub mod context;
pub mod parser;

pub use context::{TurnContext, TURN_SYSTEM_PROMPT};
pub use parser::{parse_turn_plan, TurnPlan};

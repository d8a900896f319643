//! Tactical squad combat engine
//!
//! Two three-unit squads on a fixed grid. Leaf-first:
//! geometry (`grid`), units and status effects, turn order, movement,
//! abilities, the round/game state machine (`lifecycle`), and the
//! [`Engine`] facade an orchestrator drives.

pub mod abilities;
pub mod actions;
pub mod ai;
pub mod engine;
pub mod events;
pub mod grid;
pub mod lifecycle;
pub mod movement;
pub mod state;
pub mod status;
pub mod turn_order;
pub mod units;
pub mod view;

pub use abilities::{use_ability, Ability, AbilityRequest};
pub use actions::Action;
pub use ai::{Commander, ScriptedCommander};
pub use engine::{Engine, Submitted};
pub use events::{CombatEvent, EventLog, EventSink, NullSink, TracingSink};
pub use grid::{distance, is_behind, Grid};
pub use movement::move_unit;
pub use state::{ActionRecord, EndReason, GameState, Phase, Snapshot, Trap};
pub use status::{RemovalReason, StatusEffect, StatusKind, Statuses};
pub use units::{apply_damage, Unit, UnitClass};
pub use view::{decision_view, DecisionView};

//! Encounter state and read-only queries over it

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::battle::actions::Action;
use crate::battle::grid::Grid;
use crate::battle::units::{Unit, UnitClass};
use crate::core::error::RejectionKind;
use crate::core::types::{Position, Round, Side, UnitId};

/// Encounter phases; transitions only go forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Setup,
    Play,
    Ended,
}

/// Why the encounter ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// One side has no living units
    Elimination,
    /// Both sides lost their last units in the same action
    Annihilation,
    /// The configured round limit was reached
    RoundLimit,
}

/// Hidden hazard placed by a Vector; persists until an enemy steps on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trap {
    pub position: Position,
    pub owner: UnitId,
    pub side: Side,
}

/// One submitted action and how it went
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub round: Round,
    pub unit: UnitId,
    pub name: String,
    pub side: Side,
    pub action: Action,
    pub success: bool,
    pub reason: Option<String>,
    pub kind: Option<RejectionKind>,
}

/// Full copy of the board at a boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub round: Round,
    pub units: Vec<Unit>,
    pub traps: Vec<Trap>,
}

/// Everything the rules mutate during one encounter
///
/// Dead units stay in `units` with hp 0. "Living" is always a filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub grid: Grid,
    pub units: Vec<Unit>,
    pub traps: Vec<Trap>,
    pub round: Round,
    pub phase: Phase,
    pub winner: Option<Side>,
    pub end_reason: Option<EndReason>,
    /// This round's order, fastest first
    pub turn_stack: Vec<UnitId>,
    /// Suffix of `turn_stack` that has not finished acting
    pub remaining: VecDeque<UnitId>,
    /// Oracle id -> enemy id -> last orders seen by scan
    pub scan_history: BTreeMap<UnitId, BTreeMap<UnitId, String>>,
    pub action_log: Vec<ActionRecord>,
    pub previous_action_log: Vec<ActionRecord>,
    next_id: u32,
}

impl GameState {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            units: Vec::new(),
            traps: Vec::new(),
            round: 0,
            phase: Phase::Setup,
            winner: None,
            end_reason: None,
            turn_stack: Vec::new(),
            remaining: VecDeque::new(),
            scan_history: BTreeMap::new(),
            action_log: Vec::new(),
            previous_action_log: Vec::new(),
            next_id: 0,
        }
    }

    /// Allocate the next stable unit id
    pub fn next_unit_id(&mut self) -> UnitId {
        let id = UnitId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_unit(&mut self, unit: Unit) {
        self.units.push(unit);
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Alive and on the board
    pub fn living_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.is_active())
    }

    pub fn living_on_side(&self, side: Side) -> impl Iterator<Item = &Unit> {
        self.living_units().filter(move |u| u.side == side)
    }

    pub fn living_count(&self, side: Side) -> usize {
        self.living_on_side(side).count()
    }

    pub fn is_occupied(&self, position: Position) -> bool {
        self.unit_at(position).is_some()
    }

    /// Living unit standing on `position`
    pub fn unit_at(&self, position: Position) -> Option<&Unit> {
        self.living_units().find(|u| u.position == position)
    }

    pub fn trap_at(&self, position: Position) -> Option<&Trap> {
        self.traps.iter().find(|t| t.position == position)
    }

    pub fn traps_of(&self, side: Side) -> impl Iterator<Item = &Trap> {
        self.traps.iter().filter(move |t| t.side == side)
    }

    /// Denial aura check: a living enemy Vector at distance exactly 1
    pub fn is_adjacent_to_enemy_vector(&self, id: UnitId) -> bool {
        let Some(unit) = self.unit(id) else {
            return false;
        };
        self.living_units().any(|other| {
            other.class == UnitClass::Vector
                && other.is_enemy_of(unit)
                && other.position.distance(&unit.position) == 1
        })
    }

    /// Whether `id` already finished acting this round
    pub fn has_acted(&self, id: UnitId) -> bool {
        self.turn_stack.contains(&id) && !self.remaining.contains(&id)
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::Ended
    }

    pub fn survivors(&self) -> Vec<Unit> {
        self.living_units().cloned().collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            round: self.round,
            units: self.units.clone(),
            traps: self.traps.clone(),
        }
    }
}

//! What a decision-maker may see when one of its units acts
//!
//! Visibility rules:
//! - the acting unit sees its own full record
//! - allies: hp only when the viewer is a Medic or the ally is the viewer
//! - enemies: living and not cloaked
//! - traps: own side only
//! - Oracles additionally get last round's action log and their scan notes

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::abilities::Ability;
use crate::battle::grid::Grid;
use crate::battle::state::{ActionRecord, GameState};
use crate::battle::status::StatusEffect;
use crate::battle::units::{Unit, UnitClass};
use crate::core::error::Rejection;
use crate::core::types::{Direction, Position, Round, Side, UnitId};

/// Another unit as the viewer perceives it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSighting {
    pub id: UnitId,
    pub name: String,
    pub class: UnitClass,
    pub position: Position,
    pub facing: Direction,
    pub hp: Option<u32>,
    pub max_hp: Option<u32>,
    pub statuses: Vec<StatusEffect>,
}

impl UnitSighting {
    fn of(unit: &Unit, show_hp: bool) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            class: unit.class,
            position: unit.position,
            facing: unit.facing,
            hp: show_hp.then_some(unit.hp),
            max_hp: show_hp.then_some(unit.max_hp),
            statuses: unit.statuses.iter().copied().collect(),
        }
    }
}

/// Turn order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnEntry {
    pub unit: UnitId,
    pub name: String,
    pub side: Side,
    pub acted: bool,
    pub alive: bool,
}

/// Read-only input for choosing one unit's actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionView {
    pub round: Round,
    pub grid: Grid,
    pub me: Unit,
    pub abilities: Vec<Ability>,
    pub actions_left: u32,
    pub allies: Vec<UnitSighting>,
    pub enemies: Vec<UnitSighting>,
    pub own_traps: Vec<Position>,
    pub turn_order: Vec<TurnEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_round_log: Option<Vec<ActionRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_history: Option<BTreeMap<UnitId, String>>,
}

/// Build the view for `viewer`
pub fn decision_view(
    state: &GameState,
    viewer: UnitId,
    actions_left: u32,
) -> Result<DecisionView, Rejection> {
    let me = state.unit(viewer).ok_or(Rejection::UnitNotFound(viewer))?;
    let is_medic = me.class == UnitClass::Medic;

    let allies = state
        .living_on_side(me.side)
        .filter(|u| u.id != viewer)
        .map(|u| UnitSighting::of(u, is_medic))
        .collect();

    let enemies = state
        .living_on_side(me.side.opponent())
        .filter(|u| !u.is_cloaked())
        .map(|u| UnitSighting::of(u, true))
        .collect();

    let own_traps = state.traps_of(me.side).map(|t| t.position).collect();

    let turn_order = state
        .turn_stack
        .iter()
        .filter_map(|id| state.unit(*id))
        .map(|u| TurnEntry {
            unit: u.id,
            name: u.name.clone(),
            side: u.side,
            acted: state.has_acted(u.id),
            alive: u.is_alive(),
        })
        .collect();

    let (last_round_log, scan_history) = if me.class == UnitClass::Oracle {
        (
            Some(state.previous_action_log.clone()),
            Some(state.scan_history.get(&viewer).cloned().unwrap_or_default()),
        )
    } else {
        (None, None)
    };

    Ok(DecisionView {
        round: state.round,
        grid: state.grid,
        me: me.clone(),
        abilities: Ability::for_class(me.class),
        actions_left,
        allies,
        enemies,
        own_traps,
        turn_order,
        last_round_log,
        scan_history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::Trap;
    use crate::core::config::ClassTable;

    fn spawn(state: &mut GameState, class: UnitClass, side: Side, x: i32, y: i32) -> UnitId {
        let id = state.next_unit_id();
        let table = ClassTable::default();
        let mut unit = Unit::new(id, format!("{class}"), class, side, table.get(class));
        unit.position = Position::new(x, y);
        unit.placed = true;
        state.add_unit(unit);
        id
    }

    fn board() -> (GameState, [UnitId; 5]) {
        let mut state = GameState::new(Grid::new(6, 6));
        let medic = spawn(&mut state, UnitClass::Medic, Side::Blue, 0, 0);
        let striker = spawn(&mut state, UnitClass::Striker, Side::Blue, 1, 0);
        let oracle = spawn(&mut state, UnitClass::Oracle, Side::Blue, 2, 0);
        let specter = spawn(&mut state, UnitClass::Specter, Side::Red, 4, 4);
        let vector = spawn(&mut state, UnitClass::Vector, Side::Red, 5, 5);
        (state, [medic, striker, oracle, specter, vector])
    }

    #[test]
    fn test_ally_hp_visible_to_medic_only() {
        let (state, [medic, striker, ..]) = board();

        let medic_view = decision_view(&state, medic, 2).unwrap();
        assert!(medic_view.allies.iter().all(|a| a.hp.is_some()));

        let striker_view = decision_view(&state, striker, 2).unwrap();
        assert!(striker_view.allies.iter().all(|a| a.hp.is_none()));
        assert_eq!(striker_view.me.hp, 7);
        assert!(striker_view.enemies.iter().all(|e| e.hp.is_some()));
    }

    #[test]
    fn test_cloaked_enemies_hidden() {
        let (mut state, [medic, _, _, specter, _]) = board();
        state
            .unit_mut(specter)
            .unwrap()
            .statuses
            .insert(StatusEffect::Cloaked { turns_left: 2 });

        let view = decision_view(&state, medic, 2).unwrap();
        assert_eq!(view.enemies.len(), 1);
        assert!(view.enemies.iter().all(|e| e.id != specter));
    }

    #[test]
    fn test_only_own_traps() {
        let (mut state, [medic, _, _, specter, vector]) = board();
        state.traps.push(Trap {
            position: Position::new(3, 3),
            owner: vector,
            side: Side::Red,
        });

        assert!(decision_view(&state, medic, 2).unwrap().own_traps.is_empty());
        assert_eq!(
            decision_view(&state, specter, 2).unwrap().own_traps,
            vec![Position::new(3, 3)]
        );
    }

    #[test]
    fn test_oracle_extras() {
        let (mut state, [medic, _, oracle, specter, _]) = board();
        state
            .scan_history
            .entry(oracle)
            .or_default()
            .insert(specter, "Flank.".into());

        let view = decision_view(&state, oracle, 2).unwrap();
        assert_eq!(view.scan_history.unwrap()[&specter], "Flank.");
        assert!(view.last_round_log.is_some());

        let view = decision_view(&state, medic, 2).unwrap();
        assert!(view.scan_history.is_none());
        assert!(view.last_round_log.is_none());
    }
}

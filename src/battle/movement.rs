//! Movement validation and resolution
//!
//! Moves are a straight Manhattan budget check with no path search. Ghost Step
//! (Specter) therefore only shows up as "may cross occupied tiles", which every
//! class effectively shares; the destination must always be free.

use crate::battle::abilities::{inflict_damage, Ability};
use crate::battle::events::{CombatEvent, EventSink};
use crate::battle::grid::facing_for;
use crate::battle::state::GameState;
use crate::battle::status::{RemovalReason, StatusKind};
use crate::core::config::RulesConfig;
use crate::core::error::Rejection;
use crate::core::types::{Direction, Position, UnitId};

/// Validate and apply a move of `unit_id` to `target`
pub fn move_unit(
    state: &mut GameState,
    rules: &RulesConfig,
    sink: &mut dyn EventSink,
    unit_id: UnitId,
    target: Position,
) -> Result<(), Rejection> {
    let unit = state.unit(unit_id).ok_or(Rejection::UnitNotFound(unit_id))?;
    if !unit.is_alive() {
        return Err(Rejection::UnitDead(unit_id));
    }

    if !state.grid.is_valid_position(target) {
        return Err(Rejection::OutOfBounds(target));
    }

    let budget = if unit.has_status(StatusKind::Suppressed) {
        1
    } else {
        unit.movement
    };

    let distance = unit.position.distance(&target);
    if distance == 0 {
        return Err(Rejection::AlreadyThere(target));
    }
    if distance > budget {
        return Err(Rejection::OutOfRange {
            distance,
            max: budget,
        });
    }

    if state.is_occupied(target) {
        return Err(Rejection::Occupied(target));
    }

    let facing = facing_for(unit.position, target).unwrap_or(unit.facing);
    relocate(state, rules, sink, unit_id, target, facing);
    Ok(())
}

/// Put a unit on `to` and apply everything stepping there entails
///
/// Marks the unit as moved, springs enemy traps and breaks Fortify. Returns
/// whether a trap went off. Callers validate the destination.
pub(crate) fn relocate(
    state: &mut GameState,
    rules: &RulesConfig,
    sink: &mut dyn EventSink,
    unit_id: UnitId,
    to: Position,
    facing: Direction,
) -> bool {
    let Some(unit) = state.unit_mut(unit_id) else {
        return false;
    };
    let from = unit.position;
    let side = unit.side;
    unit.position = to;
    unit.facing = facing;
    unit.moved_this_turn = true;

    let trap_index = state
        .traps
        .iter()
        .position(|trap| trap.position == to && trap.side != side);
    let trap_triggered = trap_index.is_some();

    sink.emit(CombatEvent::UnitMoved {
        unit: unit_id,
        from,
        to,
        facing,
        trap_triggered,
    });

    if let Some(index) = trap_index {
        let trap = state.traps.remove(index);
        let damage = rules.abilities.trap_damage;
        sink.emit(CombatEvent::TrapTriggered {
            owner: trap.owner,
            victim: unit_id,
            position: to,
            damage,
        });
        inflict_damage(
            state,
            sink,
            unit_id,
            damage,
            Some(trap.owner),
            Ability::Trap,
        );
    }

    if let Some(unit) = state.unit_mut(unit_id) {
        if let Some(status) = unit.statuses.remove(StatusKind::Fortified) {
            sink.emit(CombatEvent::StatusRemoved {
                unit: unit_id,
                status,
                reason: RemovalReason::Moved,
            });
        }
    }

    trap_triggered
}

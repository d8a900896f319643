//! Round and game state machine: setup -> play -> ended

use rand::Rng;
use tracing::{info, trace};

use crate::battle::events::{CombatEvent, EventSink};
use crate::battle::state::{EndReason, GameState, Phase};
use crate::battle::status::{RemovalReason, StatusEffect, StatusKind};
use crate::battle::turn_order;
use crate::battle::units::UnitClass;
use crate::core::config::RulesConfig;
use crate::core::error::Rejection;
use crate::core::types::{Side, UnitId};

/// Leave setup: round 1 begins with a fresh turn stack
pub fn start_play<R: Rng + ?Sized>(
    state: &mut GameState,
    rng: &mut R,
    sink: &mut dyn EventSink,
) -> Result<(), Rejection> {
    if state.phase != Phase::Setup {
        return Err(Rejection::WrongPhase(state.phase));
    }

    state.phase = Phase::Play;
    state.round = 1;
    turn_order::rebuild(state, rng);
    info!(units = state.turn_stack.len(), "play started");
    sink.emit(CombatEvent::RoundStarted {
        round: state.round,
        turn_order: state.turn_stack.clone(),
        snapshot: state.snapshot(),
    });

    check_win_condition(state, sink);
    Ok(())
}

/// End-of-action bookkeeping for the unit that just acted
pub fn cleanup(state: &mut GameState, sink: &mut dyn EventSink, unit_id: UnitId) {
    let Some(unit) = state.unit_mut(unit_id) else {
        return;
    };

    let mut removed = Vec::new();

    if let Some(StatusEffect::Cloaked { turns_left }) = unit.statuses.get_mut(StatusKind::Cloaked)
    {
        *turns_left = turns_left.saturating_sub(1);
        if *turns_left == 0 {
            if let Some(status) = unit.statuses.remove(StatusKind::Cloaked) {
                removed.push((status, RemovalReason::Expired));
            }
        }
    }

    for status in unit.statuses.take_single_cycle() {
        removed.push((status, RemovalReason::TurnEnd));
    }

    unit.moved_this_turn = false;

    if let Some(charges) = unit.breach.as_mut() {
        charges.cooldown = charges.cooldown.saturating_sub(1);
    }

    let mut restored = None;
    if let Some(saved) = unit.order_override.as_mut() {
        saved.turns_left = saved.turns_left.saturating_sub(1);
        if saved.turns_left == 0 {
            if let Some(saved) = unit.order_override.take() {
                unit.orders = saved.original_orders;
                restored = Some(unit.orders.clone());
            }
        }
    }

    let refortified = unit.class == UnitClass::Sentinel
        && unit.is_alive()
        && !unit.has_status(StatusKind::Fortified);
    if refortified {
        unit.statuses.insert(StatusEffect::Fortified);
    }

    trace!(unit = %unit_id, removed = removed.len(), refortified, "cleanup");

    for (status, reason) in removed {
        sink.emit(CombatEvent::StatusRemoved {
            unit: unit_id,
            status,
            reason,
        });
    }
    if let Some(orders) = restored {
        sink.emit(CombatEvent::OrdersRestored {
            unit: unit_id,
            orders,
        });
    }
    if refortified {
        sink.emit(CombatEvent::StatusApplied {
            unit: unit_id,
            status: StatusEffect::Fortified,
        });
    }
}

/// End the game if a side has no living units; true once the game is over
pub fn check_win_condition(state: &mut GameState, sink: &mut dyn EventSink) -> bool {
    if state.phase == Phase::Ended {
        return true;
    }
    if state.phase != Phase::Play {
        return false;
    }

    let blue = state.living_count(Side::Blue);
    let red = state.living_count(Side::Red);
    let (winner, reason) = match (blue, red) {
        (0, 0) => (None, EndReason::Annihilation),
        (0, _) => (Some(Side::Red), EndReason::Elimination),
        (_, 0) => (Some(Side::Blue), EndReason::Elimination),
        _ => return false,
    };

    end_game(state, sink, winner, reason);
    true
}

/// All units of the round acted: close it and open the next one
pub fn advance_round<R: Rng + ?Sized>(
    state: &mut GameState,
    rules: &RulesConfig,
    rng: &mut R,
    sink: &mut dyn EventSink,
) -> Result<(), Rejection> {
    if state.phase != Phase::Play {
        return Err(Rejection::WrongPhase(state.phase));
    }
    if check_win_condition(state, sink) {
        return Ok(());
    }

    sink.emit(CombatEvent::RoundEnded {
        round: state.round,
        snapshot: state.snapshot(),
    });

    if rules
        .turns
        .max_rounds
        .is_some_and(|limit| state.round >= limit)
    {
        end_game(state, sink, None, EndReason::RoundLimit);
        return Ok(());
    }

    state.round += 1;
    state.previous_action_log = std::mem::take(&mut state.action_log);
    turn_order::rebuild(state, rng);
    info!(round = state.round, units = state.turn_stack.len(), "round started");
    sink.emit(CombatEvent::RoundStarted {
        round: state.round,
        turn_order: state.turn_stack.clone(),
        snapshot: state.snapshot(),
    });
    Ok(())
}

fn end_game(
    state: &mut GameState,
    sink: &mut dyn EventSink,
    winner: Option<Side>,
    reason: EndReason,
) {
    state.phase = Phase::Ended;
    state.winner = winner;
    state.end_reason = Some(reason);

    info!(round = state.round, ?winner, ?reason, "game ended");
    sink.emit(CombatEvent::GameEnded {
        round: state.round,
        winner,
        reason,
        survivors: state.survivors(),
        snapshot: state.snapshot(),
    });
}

//! Per-round turn order
//!
//! Living units are shuffled, then stable-sorted by speed (fastest first).
//! The shuffle decides ties; differing speeds are always strictly ordered.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::battle::state::GameState;
use crate::core::types::UnitId;

/// Build a fresh order from the currently living units
pub fn build_turn_stack<R: Rng + ?Sized>(state: &GameState, rng: &mut R) -> Vec<UnitId> {
    let mut living: Vec<_> = state.living_units().collect();
    living.shuffle(rng);
    living.sort_by(|a, b| b.speed.cmp(&a.speed));
    living.into_iter().map(|u| u.id).collect()
}

/// Rebuild the stack and reset the remaining queue to all of it
pub fn rebuild<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) {
    let stack = build_turn_stack(state, rng);
    state.remaining = stack.iter().copied().collect();
    state.turn_stack = stack;
}

/// Front of the remaining queue, dropping units that died before acting
pub fn next_unit(state: &mut GameState) -> Option<UnitId> {
    while let Some(&front) = state.remaining.front() {
        if state.unit(front).is_some_and(|u| u.is_alive()) {
            return Some(front);
        }
        state.remaining.pop_front();
    }
    None
}

/// The front unit finished its turn
pub fn unit_acted(state: &mut GameState) {
    state.remaining.pop_front();
}

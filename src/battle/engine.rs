//! Engine facade driven by an external orchestrator
//!
//! One `Engine` owns one encounter: its state, rules, seeded RNG and event
//! sink. The orchestrator loop looks like:
//!
//! ```text
//! while let Some(unit) = engine.next_unit() {
//!     // ask a decision-maker, submit up to two actions
//!     engine.end_turn()?;
//! }
//! engine.advance_round()?;
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::battle::abilities::{use_ability, Ability};
use crate::battle::actions::Action;
use crate::battle::events::{CombatEvent, EventLog, EventSink};
use crate::battle::grid::Grid;
use crate::battle::lifecycle;
use crate::battle::movement::move_unit;
use crate::battle::state::{ActionRecord, GameState, Phase};
use crate::battle::status::StatusKind;
use crate::battle::turn_order;
use crate::battle::units::{Unit, UnitClass};
use crate::battle::view::{decision_view, DecisionView};
use crate::core::config::RulesConfig;
use crate::core::error::Rejection;
use crate::core::types::{Direction, Position, Side, UnitId};

/// The unit currently acting and its unused slots
#[derive(Debug, Clone, Copy)]
struct ActiveTurn {
    unit: UnitId,
    slots_left: u32,
}

/// Result of an accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    pub slots_left: u32,
    pub game_over: bool,
}

pub struct Engine<S: EventSink = EventLog> {
    state: GameState,
    rules: RulesConfig,
    rng: ChaCha8Rng,
    sink: S,
    turn: Option<ActiveTurn>,
}

impl Engine<EventLog> {
    /// Engine that records events in memory
    pub fn new(rules: RulesConfig, seed: u64) -> Self {
        Self::with_sink(rules, seed, EventLog::new())
    }
}

impl<S: EventSink> Engine<S> {
    pub fn with_sink(rules: RulesConfig, seed: u64, sink: S) -> Self {
        Self {
            state: GameState::new(Grid::from(rules.grid)),
            rules,
            rng: ChaCha8Rng::seed_from_u64(seed),
            sink,
            turn: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.state.unit(id)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    pub fn winner(&self) -> Option<Side> {
        self.state.winner
    }

    /// Register a unit with its class stats; it is not on the board yet
    pub fn create_unit(
        &mut self,
        name: impl Into<String>,
        class: UnitClass,
        side: Side,
    ) -> Result<UnitId, Rejection> {
        self.require_phase(Phase::Setup)?;
        let id = self.state.next_unit_id();
        let unit = Unit::new(id, name.into(), class, side, self.rules.classes.get(class));
        self.state.add_unit(unit);
        Ok(id)
    }

    pub fn place_unit(
        &mut self,
        id: UnitId,
        position: Position,
        facing: Direction,
    ) -> Result<(), Rejection> {
        self.require_phase(Phase::Setup)?;
        if !self.state.grid.is_valid_position(position) {
            return Err(Rejection::OutOfBounds(position));
        }
        if self.state.unit_at(position).is_some_and(|u| u.id != id) {
            return Err(Rejection::Occupied(position));
        }

        let unit = self.state.unit_mut(id).ok_or(Rejection::UnitNotFound(id))?;
        unit.position = position;
        unit.facing = facing;
        unit.placed = true;

        self.sink.emit(CombatEvent::UnitPlaced {
            unit: id,
            name: unit.name.clone(),
            class: unit.class,
            side: unit.side,
            position,
            facing,
        });
        Ok(())
    }

    pub fn start_play(&mut self) -> Result<(), Rejection> {
        lifecycle::start_play(&mut self.state, &mut self.rng, &mut self.sink)
    }

    /// The unit whose turn it is, opening its turn if needed
    ///
    /// `None` once the round is exhausted or the game is over.
    pub fn next_unit(&mut self) -> Option<UnitId> {
        if self.state.phase != Phase::Play {
            return None;
        }
        if let Some(turn) = self.turn {
            return Some(turn.unit);
        }

        let unit = turn_order::next_unit(&mut self.state)?;
        let slots_left = self.slots_for(unit);
        self.turn = Some(ActiveTurn { unit, slots_left });
        debug!(%unit, slots_left, "turn opened");
        Some(unit)
    }

    /// Unused slots of the active turn
    pub fn slots_left(&self) -> u32 {
        self.turn.map_or(0, |turn| turn.slots_left)
    }

    /// Validate and apply one action for the acting unit
    ///
    /// A rejection leaves the slot unused so the decision-maker may retry.
    pub fn submit(&mut self, unit: UnitId, action: Action) -> Result<Submitted, Rejection> {
        self.require_phase(Phase::Play)?;
        let current = self.next_unit().ok_or(Rejection::NotYourTurn(unit))?;
        if current != unit {
            return Err(Rejection::NotYourTurn(unit));
        }
        if !self.state.unit(unit).is_some_and(|u| u.is_alive()) {
            return Err(Rejection::UnitDead(unit));
        }
        if self.slots_left() == 0 {
            return Err(Rejection::NoActionsLeft);
        }

        let result = match &action {
            Action::Move { target } => {
                move_unit(&mut self.state, &self.rules, &mut self.sink, unit, *target).map(|_| 1)
            }
            Action::Ability(request) => {
                use_ability(&mut self.state, &self.rules, &mut self.sink, unit, request).map(
                    |ability| {
                        if ability == Ability::Intercept {
                            u32::MAX
                        } else {
                            1
                        }
                    },
                )
            }
            Action::Wait => {
                self.sink.emit(CombatEvent::Waited { unit });
                Ok(1)
            }
        };

        self.record(unit, &action, &result);

        let spent = result?;
        if let Some(turn) = self.turn.as_mut() {
            turn.slots_left = turn.slots_left.saturating_sub(spent);
        }
        debug!(%unit, %action, slots_left = self.slots_left(), "action accepted");

        let game_over = lifecycle::check_win_condition(&mut self.state, &mut self.sink);
        if game_over {
            self.turn = None;
        }
        Ok(Submitted {
            slots_left: self.slots_left(),
            game_over,
        })
    }

    /// Close the active turn: cleanup, pop the stack, check for a winner
    pub fn end_turn(&mut self) -> Result<(), Rejection> {
        self.require_phase(Phase::Play)?;
        let Some(turn) = self.turn.take() else {
            return Ok(());
        };

        lifecycle::cleanup(&mut self.state, &mut self.sink, turn.unit);
        turn_order::unit_acted(&mut self.state);
        lifecycle::check_win_condition(&mut self.state, &mut self.sink);
        Ok(())
    }

    /// Start the next round once everyone in this one has acted
    pub fn advance_round(&mut self) -> Result<(), Rejection> {
        self.require_phase(Phase::Play)?;
        if self.turn.is_some() || turn_order::next_unit(&mut self.state).is_some() {
            return Err(Rejection::RoundInProgress);
        }
        lifecycle::advance_round(&mut self.state, &self.rules, &mut self.rng, &mut self.sink)
    }

    /// Decision input for `unit`
    pub fn view_for(&self, unit: UnitId) -> Result<DecisionView, Rejection> {
        let actions_left = match self.turn {
            Some(turn) if turn.unit == unit => turn.slots_left,
            _ => 0,
        };
        decision_view(&self.state, unit, actions_left)
    }

    fn slots_for(&self, unit: UnitId) -> u32 {
        let overclocked = self
            .state
            .unit(unit)
            .is_some_and(|u| u.has_status(StatusKind::Overclocked));
        let turns = &self.rules.turns;
        if overclocked {
            turns.actions_per_turn + turns.overclock_bonus_actions
        } else {
            turns.actions_per_turn
        }
    }

    fn require_phase(&self, phase: Phase) -> Result<(), Rejection> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(Rejection::WrongPhase(self.state.phase))
        }
    }

    fn record(&mut self, unit: UnitId, action: &Action, result: &Result<u32, Rejection>) {
        let Some(actor) = self.state.unit(unit) else {
            return;
        };
        if let Err(reason) = result {
            debug!(%unit, %action, %reason, "action rejected");
        }
        let record = ActionRecord {
            round: self.state.round,
            unit,
            name: actor.name.clone(),
            side: actor.side,
            action: action.clone(),
            success: result.is_ok(),
            reason: result.as_ref().err().map(|r| r.to_string()),
            kind: result.as_ref().err().map(Rejection::kind),
        };
        self.state.action_log.push(record);
    }
}

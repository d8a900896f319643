//! Decision-maker interface and a scripted baseline
//!
//! The engine never calls into this module. Orchestrators (the skirmish
//! runner, tests) ask a [`Commander`] for one action per slot and submit it.

use crate::battle::abilities::{Ability, AbilityRequest};
use crate::battle::actions::Action;
use crate::battle::status::StatusKind;
use crate::battle::units::UnitClass;
use crate::battle::view::{DecisionView, UnitSighting};
use crate::core::types::Position;

/// Chooses actions from a decision view
pub trait Commander {
    /// Next action for the unit `view` belongs to
    fn choose(&mut self, view: &DecisionView) -> Action;

    fn name(&self) -> &str;
}

/// Greedy rule-based commander: use the class ability if it lands, else close in
#[derive(Debug, Clone, Default)]
pub struct ScriptedCommander;

impl ScriptedCommander {
    pub fn new() -> Self {
        Self
    }
}

impl Commander for ScriptedCommander {
    fn choose(&mut self, view: &DecisionView) -> Action {
        let me = &view.me;
        let Some(enemy) = nearest_enemy(view) else {
            return Action::Wait;
        };
        let distance = me.position.distance(&enemy.position);
        let denied = view
            .enemies
            .iter()
            .any(|e| e.class == UnitClass::Vector && e.position.distance(&me.position) == 1);

        let special = match me.class {
            UnitClass::Medic if !denied => most_wounded_neighbour(view)
                .map(|ally| AbilityRequest::new(Ability::Patch.name()).at(ally)),
            UnitClass::Striker if !denied && distance <= me.range => {
                Some(AbilityRequest::new(Ability::PrecisionShot.name()).at(enemy.position))
            }
            UnitClass::Oracle if !denied && distance <= me.range => {
                Some(AbilityRequest::new(Ability::Scan.name()).at(enemy.position))
            }
            UnitClass::Specter if distance == 1 => {
                Some(AbilityRequest::new(Ability::ShadowStrike.name()).at(enemy.position))
            }
            UnitClass::Vector if distance == 1 => Some(AbilityRequest::new(Ability::Pulse.name())),
            _ => None,
        };
        if let Some(request) = special {
            return Action::Ability(request);
        }

        if distance == 1 {
            return Action::ability(AbilityRequest::new(Ability::Attack.name()).at(enemy.position));
        }

        if !me.moved_this_turn {
            if let Some(tile) = step_toward(view, enemy.position) {
                return Action::Move { target: tile };
            }
        }
        Action::Wait
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn nearest_enemy(view: &DecisionView) -> Option<&UnitSighting> {
    let origin = view.me.position;
    view.enemies
        .iter()
        .min_by_key(|e| (origin.distance(&e.position), e.id))
}

/// Adjacent ally missing the most hp (needs hp visibility)
fn most_wounded_neighbour(view: &DecisionView) -> Option<Position> {
    view.allies
        .iter()
        .filter(|a| a.position.distance(&view.me.position) == 1)
        .filter_map(|a| Some((a.max_hp? - a.hp?, a.position)))
        .filter(|(missing, _)| *missing >= 2)
        .max_by_key(|(missing, position)| (*missing, std::cmp::Reverse(*position)))
        .map(|(_, position)| position)
}

/// Reachable free tile that gets closest to `goal`, if it improves on staying
fn step_toward(view: &DecisionView, goal: Position) -> Option<Position> {
    let me = &view.me;
    let budget = if me.has_status(StatusKind::Suppressed) {
        1
    } else {
        me.movement
    };
    let taken: Vec<Position> = view
        .allies
        .iter()
        .chain(view.enemies.iter())
        .map(|u| u.position)
        .collect();

    let current = me.position.distance(&goal);
    view.grid
        .tiles()
        .filter(|tile| {
            let moved = me.position.distance(tile);
            moved > 0 && moved <= budget && !taken.contains(tile)
        })
        .min_by_key(|tile| (tile.distance(&goal), *tile))
        .filter(|tile| tile.distance(&goal) < current)
}

//! Ability resolution
//!
//! Every ability goes through the same gates before its own checks:
//!
//! 1. the name must parse ([`Rejection::UnknownAbility`] otherwise, nothing changes)
//! 2. acting breaks the actor's cloak, except for `cloak` and `shadow_strike`;
//!    this happens even when a later check rejects the ability
//! 3. Denial: abilities in the denied list fail next to a living enemy Vector
//! 4. class gate
//!
//! Resolvers validate everything first and only then commit, so a rejection
//! never leaves partial effects behind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::battle::events::{CombatEvent, EventSink};
use crate::battle::grid::{extend_line, is_behind};
use crate::battle::movement::relocate;
use crate::battle::state::{GameState, Trap};
use crate::battle::status::{RemovalReason, StatusEffect, StatusKind};
use crate::battle::units::{apply_damage, BreachCharges, OrderOverride, Unit, UnitClass};
use crate::core::config::RulesConfig;
use crate::core::error::Rejection;
use crate::core::types::{Direction, Position, UnitId};

/// The fourteen abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Attack,
    ShieldWall,
    Intercept,
    Breach,
    Cloak,
    ShadowStrike,
    Scan,
    Recalibrate,
    PrecisionShot,
    SuppressingFire,
    Patch,
    Overclock,
    Trap,
    Pulse,
}

impl Ability {
    pub fn all() -> [Ability; 14] {
        [
            Ability::Attack,
            Ability::ShieldWall,
            Ability::Intercept,
            Ability::Breach,
            Ability::Cloak,
            Ability::ShadowStrike,
            Ability::Scan,
            Ability::Recalibrate,
            Ability::PrecisionShot,
            Ability::SuppressingFire,
            Ability::Patch,
            Ability::Overclock,
            Ability::Trap,
            Ability::Pulse,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Attack => "attack",
            Ability::ShieldWall => "shield_wall",
            Ability::Intercept => "intercept",
            Ability::Breach => "breach",
            Ability::Cloak => "cloak",
            Ability::ShadowStrike => "shadow_strike",
            Ability::Scan => "scan",
            Ability::Recalibrate => "recalibrate",
            Ability::PrecisionShot => "precision_shot",
            Ability::SuppressingFire => "suppressing_fire",
            Ability::Patch => "patch",
            Ability::Overclock => "overclock",
            Ability::Trap => "trap",
            Ability::Pulse => "pulse",
        }
    }

    /// Owning class; `None` means every class may use it
    pub fn class(&self) -> Option<UnitClass> {
        match self {
            Ability::Attack => None,
            Ability::ShieldWall | Ability::Intercept => Some(UnitClass::Sentinel),
            Ability::Breach | Ability::Cloak | Ability::ShadowStrike => Some(UnitClass::Specter),
            Ability::Scan | Ability::Recalibrate => Some(UnitClass::Oracle),
            Ability::PrecisionShot | Ability::SuppressingFire => Some(UnitClass::Striker),
            Ability::Patch | Ability::Overclock => Some(UnitClass::Medic),
            Ability::Trap | Ability::Pulse => Some(UnitClass::Vector),
        }
    }

    pub fn usable_by(&self, class: UnitClass) -> bool {
        self.class().map_or(true, |owner| owner == class)
    }

    /// Blocked by an adjacent enemy Vector
    pub fn is_denied_by_vector(&self) -> bool {
        matches!(
            self,
            Ability::Cloak
                | Ability::Breach
                | Ability::Scan
                | Ability::PrecisionShot
                | Ability::Trap
                | Ability::Patch
                | Ability::Overclock
        )
    }

    pub fn breaks_cloak(&self) -> bool {
        !matches!(self, Ability::Cloak | Ability::ShadowStrike)
    }

    /// Abilities available to a class, `attack` first
    pub fn for_class(class: UnitClass) -> Vec<Ability> {
        Ability::all()
            .into_iter()
            .filter(|ability| ability.usable_by(class))
            .collect()
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Ability {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Ability::all()
            .into_iter()
            .find(|ability| ability.name() == normalized)
            .ok_or_else(|| Rejection::UnknownAbility(s.to_string()))
    }
}

/// An ability submission as a decision-maker sends it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRequest {
    pub ability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addendum: Option<String>,
}

impl AbilityRequest {
    pub fn new(ability: impl Into<String>) -> Self {
        Self {
            ability: ability.into(),
            target: None,
            direction: None,
            addendum: None,
        }
    }

    pub fn at(mut self, target: Position) -> Self {
        self.target = Some(target);
        self
    }

    pub fn facing(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_addendum(mut self, addendum: impl Into<String>) -> Self {
        self.addendum = Some(addendum.into());
        self
    }
}

/// Resolve an ability for `actor`
///
/// Emits an `AbilityAttempted` event either way. On success returns the
/// parsed ability so callers can account for slot usage.
pub fn use_ability(
    state: &mut GameState,
    rules: &RulesConfig,
    sink: &mut dyn EventSink,
    actor: UnitId,
    request: &AbilityRequest,
) -> Result<Ability, Rejection> {
    let result = resolve(state, rules, sink, actor, request);
    sink.emit(CombatEvent::AbilityAttempted {
        unit: actor,
        ability: request.ability.clone(),
        target: request.target,
        success: result.is_ok(),
        reason: result.as_ref().err().map(|r| r.to_string()),
        kind: result.as_ref().err().map(Rejection::kind),
    });
    result
}

fn resolve(
    state: &mut GameState,
    rules: &RulesConfig,
    sink: &mut dyn EventSink,
    actor: UnitId,
    request: &AbilityRequest,
) -> Result<Ability, Rejection> {
    let ability: Ability = request.ability.parse()?;

    let unit = state.unit(actor).ok_or(Rejection::UnitNotFound(actor))?;
    if !unit.is_alive() {
        return Err(Rejection::UnitDead(actor));
    }
    let class = unit.class;

    if ability.breaks_cloak() {
        break_cloak(state, sink, actor);
    }

    if ability.is_denied_by_vector() && state.is_adjacent_to_enemy_vector(actor) {
        return Err(Rejection::Denied(ability));
    }

    if !ability.usable_by(class) {
        return Err(Rejection::WrongClass { ability, class });
    }

    let mut resolver = Resolver {
        state,
        rules,
        sink,
        actor,
    };
    match ability {
        Ability::Attack => resolver.attack(request)?,
        Ability::ShieldWall => resolver.shield_wall(request)?,
        Ability::Intercept => resolver.intercept(request)?,
        Ability::Breach => resolver.breach(request)?,
        Ability::Cloak => resolver.cloak(),
        Ability::ShadowStrike => resolver.shadow_strike(request)?,
        Ability::Scan => resolver.scan(request)?,
        Ability::Recalibrate => resolver.recalibrate(request)?,
        Ability::PrecisionShot => resolver.precision_shot(request)?,
        Ability::SuppressingFire => resolver.suppressing_fire(request)?,
        Ability::Patch => resolver.patch(request)?,
        Ability::Overclock => resolver.overclock(request)?,
        Ability::Trap => resolver.trap(request)?,
        Ability::Pulse => resolver.pulse(),
    }
    Ok(ability)
}

fn break_cloak(state: &mut GameState, sink: &mut dyn EventSink, actor: UnitId) {
    let Some(unit) = state.unit_mut(actor) else {
        return;
    };
    if let Some(status) = unit.statuses.remove(StatusKind::Cloaked) {
        sink.emit(CombatEvent::StatusRemoved {
            unit: actor,
            status,
            reason: RemovalReason::AbilityBreak,
        });
    }
}

/// Lower a unit's hp and report it; emits the kill when hp reaches 0
///
/// Ignores facing. Directional blocking is applied by [`Resolver::strike`].
pub(crate) fn inflict_damage(
    state: &mut GameState,
    sink: &mut dyn EventSink,
    target: UnitId,
    amount: u32,
    source: Option<UnitId>,
    ability: Ability,
) -> u32 {
    let Some(unit) = state.unit_mut(target) else {
        return 0;
    };
    if !unit.is_alive() {
        return 0;
    }

    let dealt = apply_damage(unit, amount);
    let hp_after = unit.hp;
    sink.emit(CombatEvent::DamageDealt {
        source,
        target,
        amount: dealt,
        hp_after,
        ability,
    });

    if hp_after == 0 {
        sink.emit(CombatEvent::UnitKilled {
            unit: target,
            killer: source,
            ability,
        });
    }
    dealt
}

fn apply_status(unit: &mut Unit, sink: &mut dyn EventSink, status: StatusEffect) {
    unit.statuses.insert(status);
    sink.emit(CombatEvent::StatusApplied {
        unit: unit.id,
        status,
    });
}

/// Borrowed view of everything a single resolution touches
struct Resolver<'a> {
    state: &'a mut GameState,
    rules: &'a RulesConfig,
    sink: &'a mut dyn EventSink,
    actor: UnitId,
}

impl Resolver<'_> {
    fn actor(&self) -> Result<&Unit, Rejection> {
        self.state
            .unit(self.actor)
            .ok_or(Rejection::UnitNotFound(self.actor))
    }

    fn actor_mut(&mut self) -> Result<&mut Unit, Rejection> {
        let actor = self.actor;
        self.state
            .unit_mut(actor)
            .ok_or(Rejection::UnitNotFound(actor))
    }

    fn target_tile(&self, request: &AbilityRequest) -> Result<Position, Rejection> {
        let target = request.target.ok_or(Rejection::MissingParameter("target"))?;
        if !self.state.grid.is_valid_position(target) {
            return Err(Rejection::OutOfBounds(target));
        }
        Ok(target)
    }

    /// Living unit on the requested tile
    fn target_unit(&self, request: &AbilityRequest) -> Result<&Unit, Rejection> {
        let tile = self.target_tile(request)?;
        self.state.unit_at(tile).ok_or(Rejection::NoUnitAt(tile))
    }

    fn adjacent_ally(&self, request: &AbilityRequest) -> Result<UnitId, Rejection> {
        let actor = self.actor()?;
        let target = self.target_unit(request)?;
        if target.id == actor.id {
            return Err(Rejection::SelfTarget);
        }
        if !target.is_ally_of(actor) {
            return Err(Rejection::NotAlly);
        }
        if actor.position.distance(&target.position) != 1 {
            return Err(Rejection::NotAdjacent);
        }
        Ok(target.id)
    }

    fn enemy_within(&self, request: &AbilityRequest, max: u32) -> Result<UnitId, Rejection> {
        let actor = self.actor()?;
        let target = self.target_unit(request)?;
        if !target.is_enemy_of(actor) {
            return Err(Rejection::NotEnemy);
        }
        let distance = actor.position.distance(&target.position);
        if distance > max {
            return Err(Rejection::OutOfRange { distance, max });
        }
        Ok(target.id)
    }

    /// Visible unit other than the actor, for attack and precision_shot
    fn visible_target(&self, request: &AbilityRequest) -> Result<&Unit, Rejection> {
        let target = self.target_unit(request)?;
        if target.id == self.actor {
            return Err(Rejection::SelfTarget);
        }
        if target.is_cloaked() {
            return Err(Rejection::TargetCloaked);
        }
        Ok(target)
    }

    /// Damage credited to the actor
    fn strike(&mut self, target: UnitId, amount: u32, ability: Ability) -> u32 {
        inflict_damage(
            self.state,
            self.sink,
            target,
            amount,
            Some(self.actor),
            ability,
        )
    }

    fn attack(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let actor = self.actor()?.position;
        let target = self.visible_target(request)?;
        if actor.distance(&target.position) != 1 {
            return Err(Rejection::NotAdjacent);
        }
        let target = target.id;
        self.strike(target, self.rules.abilities.attack_damage, Ability::Attack);
        Ok(())
    }

    fn shield_wall(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let direction = request
            .direction
            .ok_or(Rejection::MissingParameter("direction"))?;
        let sink = &mut *self.sink;
        let actor = self
            .state
            .unit_mut(self.actor)
            .ok_or(Rejection::UnitNotFound(self.actor))?;
        apply_status(actor, sink, StatusEffect::ShieldWall { direction });
        Ok(())
    }

    fn intercept(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let actor = self.actor()?;
        let sentinel_pos = actor.position;
        let facing = actor.facing;
        let target = self.target_unit(request)?;
        if target.id == actor.id {
            return Err(Rejection::SelfTarget);
        }
        if !target.is_ally_of(actor) {
            return Err(Rejection::NotAlly);
        }
        let max = self.rules.abilities.intercept_range;
        let distance = sentinel_pos.distance(&target.position);
        if distance > max {
            return Err(Rejection::OutOfRange { distance, max });
        }

        // Closest free neighbour of the ally; ties go N, E, S, W
        let destination = target
            .position
            .neighbors()
            .into_iter()
            .enumerate()
            .filter(|(_, tile)| {
                self.state.grid.is_valid_position(*tile)
                    && self.state.unit_at(*tile).map_or(true, |u| u.id == self.actor)
            })
            .min_by_key(|(index, tile)| (sentinel_pos.distance(tile), *index))
            .map(|(_, tile)| tile)
            .ok_or(Rejection::NoFreeTile)?;

        if destination != sentinel_pos {
            relocate(
                self.state,
                self.rules,
                self.sink,
                self.actor,
                destination,
                facing,
            );
        }

        let sink = &mut *self.sink;
        if let Some(actor) = self.state.unit_mut(self.actor).filter(|u| u.is_alive()) {
            apply_status(actor, sink, StatusEffect::ShieldWall { direction: facing });
        }
        Ok(())
    }

    fn breach(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let rules = self.rules;
        let config = &rules.abilities;
        let target_id = self.enemy_within(request, config.breach_range)?;
        let actor = self.actor()?;
        let target = self.target_unit(request)?;
        if !is_behind(actor.position, target.position, target.facing) {
            return Err(Rejection::NotBehind(target.facing));
        }
        let addendum = request
            .addendum
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or(Rejection::MissingParameter("addendum"))?;

        if actor.breaches_used() >= config.breach_max_uses {
            return Err(Rejection::BreachCapReached(config.breach_max_uses));
        }
        if actor.breach_cooldown() > 0 {
            return Err(Rejection::BreachCooldown(actor.breach_cooldown()));
        }

        let duration = config.breach_duration;
        let cooldown = config.breach_cooldown;
        let new_orders = addendum.to_string();

        let target = self
            .state
            .unit_mut(target_id)
            .ok_or(Rejection::UnitNotFound(target_id))?;
        let old_orders = std::mem::replace(&mut target.orders, new_orders.clone());
        // Already breached: keep the true orders, restart the clock
        let original_orders = match target.order_override.take() {
            Some(existing) => existing.original_orders,
            None => old_orders.clone(),
        };
        target.order_override = Some(OrderOverride {
            turns_left: duration,
            original_orders,
        });

        let specter = self.actor_mut()?;
        let charges = specter.breach.get_or_insert_with(BreachCharges::default);
        charges.used += 1;
        charges.cooldown = cooldown;

        self.sink.emit(CombatEvent::Breached {
            specter: self.actor,
            target: target_id,
            old_orders,
            new_orders,
        });
        Ok(())
    }

    fn cloak(&mut self) {
        let turns_left = self.rules.abilities.cloak_duration;
        let sink = &mut *self.sink;
        if let Some(actor) = self.state.unit_mut(self.actor) {
            apply_status(actor, sink, StatusEffect::Cloaked { turns_left });
        }
    }

    fn shadow_strike(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let target = self.enemy_within(request, 1)?;
        self.strike(
            target,
            self.rules.abilities.shadow_strike_damage,
            Ability::ShadowStrike,
        );
        Ok(())
    }

    fn scan(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let target = self.enemy_within(request, self.rules.abilities.scan_range)?;
        let orders = self.target_unit(request)?.orders.clone();

        self.state
            .scan_history
            .entry(self.actor)
            .or_default()
            .insert(target, orders);
        self.strike(target, self.rules.abilities.scan_damage, Ability::Scan);
        Ok(())
    }

    fn recalibrate(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let target = self.adjacent_ally(request)?;
        let addendum = request
            .addendum
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or(Rejection::MissingParameter("addendum"))?;

        let ally = self
            .state
            .unit_mut(target)
            .ok_or(Rejection::UnitNotFound(target))?;
        if !ally.orders.is_empty() {
            ally.orders.push(' ');
        }
        ally.orders.push_str(addendum);
        Ok(())
    }

    fn precision_shot(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let actor = self.actor()?;
        let (origin, max, moved) = (actor.position, actor.range, actor.moved_this_turn);
        let target = self.visible_target(request)?;
        let distance = origin.distance(&target.position);
        if distance > max {
            return Err(Rejection::OutOfRange { distance, max });
        }

        let target = target.id;
        let damage = if moved {
            self.rules.abilities.precision_shot_moved_damage
        } else {
            self.rules.abilities.precision_shot_damage
        };
        self.strike(target, damage, Ability::PrecisionShot);
        Ok(())
    }

    fn suppressing_fire(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let actor = self.actor()?;
        let (origin, max) = (actor.position, actor.range);
        let tile = self.target_tile(request)?;
        if tile == origin {
            return Err(Rejection::SelfTarget);
        }
        let distance = origin.distance(&tile);
        if distance > max {
            return Err(Rejection::OutOfRange { distance, max });
        }

        let beyond = extend_line(origin, tile);
        let hit: Vec<UnitId> = [tile, beyond]
            .into_iter()
            .filter(|t| self.state.grid.is_valid_position(*t))
            .filter_map(|t| self.state.unit_at(t).map(|u| u.id))
            .collect();

        let damage = self.rules.abilities.suppressing_fire_damage;
        for target in hit {
            self.strike(target, damage, Ability::SuppressingFire);
            let sink = &mut *self.sink;
            if let Some(unit) = self.state.unit_mut(target).filter(|u| u.is_alive()) {
                apply_status(unit, sink, StatusEffect::Suppressed);
            }
        }
        Ok(())
    }

    fn patch(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let target = self.adjacent_ally(request)?;
        let cap = self.rules.abilities.patch_max_uses;
        if self.actor()?.heals_used >= cap {
            return Err(Rejection::HealCapReached(cap));
        }

        let amount = self.rules.abilities.patch_heal;
        let ally = self
            .state
            .unit_mut(target)
            .ok_or(Rejection::UnitNotFound(target))?;
        let healed = ally.heal(amount);
        let hp_after = ally.hp;
        self.actor_mut()?.heals_used += 1;

        self.sink.emit(CombatEvent::Healed {
            source: self.actor,
            target,
            amount: healed,
            hp_after,
        });
        Ok(())
    }

    fn overclock(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let target = self.adjacent_ally(request)?;

        inflict_damage(
            self.state,
            self.sink,
            target,
            self.rules.abilities.overclock_self_damage,
            Some(self.actor),
            Ability::Overclock,
        );
        let sink = &mut *self.sink;
        if let Some(ally) = self.state.unit_mut(target).filter(|u| u.is_alive()) {
            apply_status(ally, sink, StatusEffect::Overclocked);
        }
        Ok(())
    }

    fn trap(&mut self, request: &AbilityRequest) -> Result<(), Rejection> {
        let actor = self.actor()?;
        let (origin, max, side) = (actor.position, actor.range, actor.side);
        let tile = self.target_tile(request)?;
        let distance = origin.distance(&tile);
        if distance > max {
            return Err(Rejection::OutOfRange { distance, max });
        }
        if self.state.is_occupied(tile) || self.state.trap_at(tile).is_some() {
            return Err(Rejection::TileNotEmpty(tile));
        }

        self.state.traps.push(Trap {
            position: tile,
            owner: self.actor,
            side,
        });
        self.sink.emit(CombatEvent::TrapPlaced {
            owner: self.actor,
            side,
            position: tile,
        });
        Ok(())
    }

    fn pulse(&mut self) {
        let Some(origin) = self.state.unit(self.actor).map(|u| u.position) else {
            return;
        };
        let hit: Vec<UnitId> = self
            .state
            .living_units()
            .filter(|u| u.id != self.actor && u.position.distance(&origin) <= 1)
            .map(|u| u.id)
            .collect();

        let damage = self.rules.abilities.pulse_damage;
        for target in hit {
            self.strike(target, damage, Ability::Pulse);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::events::EventLog;
    use crate::battle::grid::Grid;
    use crate::core::types::Side;

    struct Fixture {
        state: GameState,
        rules: RulesConfig,
        log: EventLog,
    }

    impl Fixture {
        fn new() -> Self {
            let rules = RulesConfig::default();
            Self {
                state: GameState::new(Grid::from(rules.grid)),
                rules,
                log: EventLog::new(),
            }
        }

        fn spawn(&mut self, class: UnitClass, side: Side, x: i32, y: i32) -> UnitId {
            let id = self.state.next_unit_id();
            let mut unit = Unit::new(
                id,
                format!("{class}"),
                class,
                side,
                self.rules.classes.get(class),
            );
            unit.position = Position::new(x, y);
            unit.placed = true;
            self.state.add_unit(unit);
            id
        }

        fn act(&mut self, actor: UnitId, request: AbilityRequest) -> Result<Ability, Rejection> {
            use_ability(&mut self.state, &self.rules, &mut self.log, actor, &request)
        }

        fn unit(&self, id: UnitId) -> &Unit {
            self.state.unit(id).unwrap()
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("precision_shot".parse::<Ability>(), Ok(Ability::PrecisionShot));
        assert_eq!(" Pulse ".parse::<Ability>(), Ok(Ability::Pulse));
        assert_eq!(
            "fireball".parse::<Ability>(),
            Err(Rejection::UnknownAbility("fireball".into()))
        );
    }

    #[test]
    fn test_class_lists() {
        assert_eq!(
            Ability::for_class(UnitClass::Specter),
            vec![
                Ability::Attack,
                Ability::Breach,
                Ability::Cloak,
                Ability::ShadowStrike
            ]
        );
        assert!(!Ability::Attack.is_denied_by_vector());
        assert!(!Ability::Pulse.is_denied_by_vector());
    }

    #[test]
    fn test_unknown_ability_changes_nothing() {
        let mut fx = Fixture::new();
        let specter = fx.spawn(UnitClass::Specter, Side::Blue, 2, 2);
        fx.state
            .unit_mut(specter)
            .unwrap()
            .statuses
            .insert(StatusEffect::Cloaked { turns_left: 2 });

        let result = fx.act(specter, AbilityRequest::new("teleport"));
        assert!(matches!(result, Err(Rejection::UnknownAbility(_))));
        assert!(fx.unit(specter).is_cloaked());
    }

    #[test]
    fn test_attack_adjacent() {
        let mut fx = Fixture::new();
        let a = fx.spawn(UnitClass::Sentinel, Side::Blue, 2, 2);
        let b = fx.spawn(UnitClass::Medic, Side::Red, 2, 3);

        fx.act(a, AbilityRequest::new("attack").at(Position::new(2, 3)))
            .unwrap();
        assert_eq!(fx.unit(b).hp, 7);
    }

    #[test]
    fn test_attack_rejections() {
        let mut fx = Fixture::new();
        let a = fx.spawn(UnitClass::Striker, Side::Blue, 0, 0);
        let b = fx.spawn(UnitClass::Specter, Side::Red, 0, 1);
        fx.spawn(UnitClass::Oracle, Side::Red, 0, 3);

        assert_eq!(
            fx.act(a, AbilityRequest::new("attack")),
            Err(Rejection::MissingParameter("target"))
        );
        assert_eq!(
            fx.act(a, AbilityRequest::new("attack").at(Position::new(0, 3))),
            Err(Rejection::NotAdjacent)
        );
        assert_eq!(
            fx.act(a, AbilityRequest::new("attack").at(Position::new(0, 0))),
            Err(Rejection::SelfTarget)
        );
        assert_eq!(
            fx.act(a, AbilityRequest::new("attack").at(Position::new(4, 4))),
            Err(Rejection::NoUnitAt(Position::new(4, 4)))
        );

        fx.state
            .unit_mut(b)
            .unwrap()
            .statuses
            .insert(StatusEffect::Cloaked { turns_left: 1 });
        assert_eq!(
            fx.act(a, AbilityRequest::new("attack").at(Position::new(0, 1))),
            Err(Rejection::TargetCloaked)
        );
        assert_eq!(fx.unit(b).hp, 6);
    }

    #[test]
    fn test_class_gate() {
        let mut fx = Fixture::new();
        let medic = fx.spawn(UnitClass::Medic, Side::Blue, 0, 0);
        assert_eq!(
            fx.act(medic, AbilityRequest::new("cloak")),
            Err(Rejection::WrongClass {
                ability: Ability::Cloak,
                class: UnitClass::Medic
            })
        );
    }

    #[test]
    fn test_denial_blocks_listed_abilities_only() {
        let mut fx = Fixture::new();
        let specter = fx.spawn(UnitClass::Specter, Side::Blue, 2, 2);
        fx.spawn(UnitClass::Vector, Side::Red, 2, 3);

        let result = fx.act(specter, AbilityRequest::new("cloak"));
        assert_eq!(result, Err(Rejection::Denied(Ability::Cloak)));
        assert!(!fx.unit(specter).is_cloaked());

        // Basic attack is never denied
        assert!(fx
            .act(specter, AbilityRequest::new("attack").at(Position::new(2, 3)))
            .is_ok());
    }

    #[test]
    fn test_cloak_breaks_even_when_rejected() {
        let mut fx = Fixture::new();
        let specter = fx.spawn(UnitClass::Specter, Side::Blue, 2, 2);
        fx.act(specter, AbilityRequest::new("cloak")).unwrap();
        assert!(fx.unit(specter).is_cloaked());

        // Nothing at the target, attack fails, cloak is gone anyway
        assert!(fx
            .act(specter, AbilityRequest::new("attack").at(Position::new(5, 5)))
            .is_err());
        assert!(!fx.unit(specter).is_cloaked());
        assert!(fx.log.iter().any(|e| matches!(
            e,
            CombatEvent::StatusRemoved {
                reason: RemovalReason::AbilityBreak,
                ..
            }
        )));
    }

    #[test]
    fn test_shadow_strike_keeps_cloak() {
        let mut fx = Fixture::new();
        let specter = fx.spawn(UnitClass::Specter, Side::Blue, 2, 2);
        let enemy = fx.spawn(UnitClass::Striker, Side::Red, 3, 2);
        fx.act(specter, AbilityRequest::new("cloak")).unwrap();

        fx.act(
            specter,
            AbilityRequest::new("shadow_strike").at(Position::new(3, 2)),
        )
        .unwrap();
        assert!(fx.unit(specter).is_cloaked());
        assert_eq!(fx.unit(enemy).hp, 4);
    }

    #[test]
    fn test_breach_from_behind() {
        let mut fx = Fixture::new();
        let specter = fx.spawn(UnitClass::Specter, Side::Blue, 2, 2);
        let sentinel = fx.spawn(UnitClass::Sentinel, Side::Red, 2, 4);
        let original = fx.unit(sentinel).orders.clone();

        fx.act(
            specter,
            AbilityRequest::new("breach")
                .at(Position::new(2, 4))
                .with_addendum("Walk into the corner."),
        )
        .unwrap();

        let target = fx.unit(sentinel);
        assert_eq!(target.orders, "Walk into the corner.");
        let saved = target.order_override.as_ref().unwrap();
        assert_eq!(saved.original_orders, original);
        assert_eq!(saved.turns_left, 3);
        assert_eq!(fx.unit(specter).breaches_used(), 1);
        assert_eq!(fx.unit(specter).breach_cooldown(), 2);
    }

    #[test]
    fn test_breach_requires_behind_and_text() {
        let mut fx = Fixture::new();
        let specter = fx.spawn(UnitClass::Specter, Side::Blue, 2, 5);
        let sentinel = fx.spawn(UnitClass::Sentinel, Side::Red, 2, 4);

        assert_eq!(
            fx.act(
                specter,
                AbilityRequest::new("breach")
                    .at(Position::new(2, 4))
                    .with_addendum("x")
            ),
            Err(Rejection::NotBehind(Direction::North))
        );

        fx.state.unit_mut(specter).unwrap().position = Position::new(2, 3);
        assert_eq!(
            fx.act(
                specter,
                AbilityRequest::new("breach")
                    .at(Position::new(2, 4))
                    .with_addendum("   ")
            ),
            Err(Rejection::MissingParameter("addendum"))
        );
        assert!(fx.unit(sentinel).order_override.is_none());
    }

    #[test]
    fn test_breach_cap_and_cooldown() {
        let mut fx = Fixture::new();
        let specter = fx.spawn(UnitClass::Specter, Side::Blue, 2, 2);
        let sentinel = fx.spawn(UnitClass::Sentinel, Side::Red, 2, 3);
        let request = AbilityRequest::new("breach")
            .at(Position::new(2, 3))
            .with_addendum("Stand still.");

        fx.act(specter, request.clone()).unwrap();
        assert_eq!(
            fx.act(specter, request.clone()),
            Err(Rejection::BreachCooldown(2))
        );

        fx.state.unit_mut(specter).unwrap().breach = Some(BreachCharges {
            used: 2,
            cooldown: 0,
        });
        let before = fx.unit(sentinel).clone();
        assert_eq!(
            fx.act(specter, request),
            Err(Rejection::BreachCapReached(2))
        );
        assert_eq!(fx.unit(sentinel).orders, before.orders);
        assert_eq!(fx.unit(specter).breaches_used(), 2);
    }

    #[test]
    fn test_second_breach_keeps_true_orders() {
        let mut fx = Fixture::new();
        let specter = fx.spawn(UnitClass::Specter, Side::Blue, 2, 2);
        let sentinel = fx.spawn(UnitClass::Sentinel, Side::Red, 2, 3);
        let original = fx.unit(sentinel).orders.clone();

        fx.act(
            specter,
            AbilityRequest::new("breach")
                .at(Position::new(2, 3))
                .with_addendum("First."),
        )
        .unwrap();
        fx.state.unit_mut(specter).unwrap().breach = Some(BreachCharges {
            used: 1,
            cooldown: 0,
        });
        fx.state
            .unit_mut(sentinel)
            .unwrap()
            .order_override
            .as_mut()
            .unwrap()
            .turns_left = 1;
        fx.act(
            specter,
            AbilityRequest::new("breach")
                .at(Position::new(2, 3))
                .with_addendum("Second."),
        )
        .unwrap();

        let saved = fx.unit(sentinel).order_override.clone().unwrap();
        assert_eq!(saved.original_orders, original);
        assert_eq!(saved.turns_left, 3);
        assert_eq!(fx.unit(sentinel).orders, "Second.");
    }

    #[test]
    fn test_scan_records_orders() {
        let mut fx = Fixture::new();
        let oracle = fx.spawn(UnitClass::Oracle, Side::Blue, 0, 0);
        let enemy = fx.spawn(UnitClass::Striker, Side::Red, 0, 3);
        let orders = fx.unit(enemy).orders.clone();

        fx.act(oracle, AbilityRequest::new("scan").at(Position::new(0, 3)))
            .unwrap();
        assert_eq!(fx.unit(enemy).hp, 6);
        assert_eq!(fx.state.scan_history[&oracle][&enemy], orders);

        fx.state.unit_mut(enemy).unwrap().position = Position::new(0, 4);
        assert_eq!(
            fx.act(oracle, AbilityRequest::new("scan").at(Position::new(0, 4))),
            Err(Rejection::OutOfRange { distance: 4, max: 3 })
        );
    }

    #[test]
    fn test_recalibrate_appends() {
        let mut fx = Fixture::new();
        let oracle = fx.spawn(UnitClass::Oracle, Side::Blue, 0, 0);
        let ally = fx.spawn(UnitClass::Striker, Side::Blue, 1, 0);
        let before = fx.unit(ally).orders.clone();

        fx.act(
            oracle,
            AbilityRequest::new("recalibrate")
                .at(Position::new(1, 0))
                .with_addendum("Focus the Medic."),
        )
        .unwrap();
        assert_eq!(fx.unit(ally).orders, format!("{before} Focus the Medic."));
    }

    #[test]
    fn test_precision_shot_moved_penalty() {
        let mut fx = Fixture::new();
        let striker = fx.spawn(UnitClass::Striker, Side::Blue, 0, 0);
        let enemy = fx.spawn(UnitClass::Medic, Side::Red, 0, 3);

        fx.act(
            striker,
            AbilityRequest::new("precision_shot").at(Position::new(0, 3)),
        )
        .unwrap();
        assert_eq!(fx.unit(enemy).hp, 5);

        fx.state.unit_mut(striker).unwrap().moved_this_turn = true;
        fx.act(
            striker,
            AbilityRequest::new("precision_shot").at(Position::new(0, 3)),
        )
        .unwrap();
        assert_eq!(fx.unit(enemy).hp, 4);
    }

    #[test]
    fn test_suppressing_fire_hits_line() {
        let mut fx = Fixture::new();
        let striker = fx.spawn(UnitClass::Striker, Side::Blue, 0, 0);
        let near = fx.spawn(UnitClass::Medic, Side::Red, 0, 2);
        let far = fx.spawn(UnitClass::Oracle, Side::Blue, 0, 3);
        let aside = fx.spawn(UnitClass::Vector, Side::Red, 1, 2);

        fx.act(
            striker,
            AbilityRequest::new("suppressing_fire").at(Position::new(0, 2)),
        )
        .unwrap();
        assert_eq!(fx.unit(near).hp, 7);
        assert_eq!(fx.unit(far).hp, 6);
        assert!(fx.unit(near).has_status(StatusKind::Suppressed));
        assert!(fx.unit(far).has_status(StatusKind::Suppressed));
        assert_eq!(fx.unit(aside).hp, 8);
    }

    #[test]
    fn test_suppressing_fire_at_grid_edge() {
        let mut fx = Fixture::new();
        let striker = fx.spawn(UnitClass::Striker, Side::Blue, 0, 2);
        let edge = fx.spawn(UnitClass::Medic, Side::Red, 0, 5);

        // The follow-through tile (0,6) is off the board
        fx.act(
            striker,
            AbilityRequest::new("suppressing_fire").at(Position::new(0, 5)),
        )
        .unwrap();
        assert_eq!(fx.unit(edge).hp, 7);
        assert!(fx.unit(edge).has_status(StatusKind::Suppressed));
        let hits = fx
            .log
            .iter()
            .filter(|e| matches!(e, CombatEvent::DamageDealt { .. }))
            .count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_patch_cap() {
        let mut fx = Fixture::new();
        let medic = fx.spawn(UnitClass::Medic, Side::Blue, 0, 0);
        let ally = fx.spawn(UnitClass::Sentinel, Side::Blue, 0, 1);
        fx.state.unit_mut(ally).unwrap().hp = 2;
        let patch = AbilityRequest::new("patch").at(Position::new(0, 1));

        fx.act(medic, patch.clone()).unwrap();
        assert_eq!(fx.unit(ally).hp, 5);
        fx.act(medic, patch.clone()).unwrap();
        assert_eq!(fx.unit(ally).hp, 8);
        assert_eq!(fx.act(medic, patch), Err(Rejection::HealCapReached(2)));
        assert_eq!(fx.unit(ally).hp, 8);
        assert_eq!(fx.unit(medic).heals_used, 2);
    }

    #[test]
    fn test_patch_rejects_enemy() {
        let mut fx = Fixture::new();
        let medic = fx.spawn(UnitClass::Medic, Side::Blue, 0, 0);
        fx.spawn(UnitClass::Sentinel, Side::Red, 0, 1);
        assert_eq!(
            fx.act(medic, AbilityRequest::new("patch").at(Position::new(0, 1))),
            Err(Rejection::NotAlly)
        );
        assert_eq!(fx.unit(medic).heals_used, 0);
    }

    #[test]
    fn test_overclock_costs_hp() {
        let mut fx = Fixture::new();
        let medic = fx.spawn(UnitClass::Medic, Side::Blue, 0, 0);
        let ally = fx.spawn(UnitClass::Striker, Side::Blue, 1, 0);

        fx.act(medic, AbilityRequest::new("overclock").at(Position::new(1, 0)))
            .unwrap();
        assert_eq!(fx.unit(ally).hp, 6);
        assert!(fx.unit(ally).has_status(StatusKind::Overclocked));
    }

    #[test]
    fn test_trap_placement() {
        let mut fx = Fixture::new();
        let vector = fx.spawn(UnitClass::Vector, Side::Red, 3, 3);
        fx.spawn(UnitClass::Medic, Side::Red, 3, 4);

        fx.act(vector, AbilityRequest::new("trap").at(Position::new(3, 1)))
            .unwrap();
        assert_eq!(fx.state.traps.len(), 1);
        assert_eq!(fx.state.traps[0].side, Side::Red);

        assert_eq!(
            fx.act(vector, AbilityRequest::new("trap").at(Position::new(3, 1))),
            Err(Rejection::TileNotEmpty(Position::new(3, 1)))
        );
        assert_eq!(
            fx.act(vector, AbilityRequest::new("trap").at(Position::new(3, 4))),
            Err(Rejection::TileNotEmpty(Position::new(3, 4)))
        );
        assert_eq!(
            fx.act(vector, AbilityRequest::new("trap").at(Position::new(0, 0))),
            Err(Rejection::OutOfRange { distance: 6, max: 2 })
        );
    }

    #[test]
    fn test_pulse_hits_all_adjacent() {
        let mut fx = Fixture::new();
        let vector = fx.spawn(UnitClass::Vector, Side::Red, 2, 2);
        let ally = fx.spawn(UnitClass::Medic, Side::Red, 2, 3);
        let enemy = fx.spawn(UnitClass::Striker, Side::Blue, 1, 2);
        let far = fx.spawn(UnitClass::Oracle, Side::Blue, 4, 4);

        fx.act(vector, AbilityRequest::new("pulse")).unwrap();
        assert_eq!(fx.unit(vector).hp, 8);
        assert_eq!(fx.unit(ally).hp, 7);
        assert_eq!(fx.unit(enemy).hp, 6);
        assert_eq!(fx.unit(far).hp, 7);
    }

    #[test]
    fn test_shield_wall_marks_facing() {
        let mut fx = Fixture::new();
        let sentinel = fx.spawn(UnitClass::Sentinel, Side::Blue, 2, 2);
        let striker = fx.spawn(UnitClass::Striker, Side::Red, 2, 3);

        assert_eq!(
            fx.act(sentinel, AbilityRequest::new("shield_wall")),
            Err(Rejection::MissingParameter("direction"))
        );
        fx.act(
            sentinel,
            AbilityRequest::new("shield_wall").facing(Direction::North),
        )
        .unwrap();
        assert_eq!(
            fx.unit(sentinel).statuses.shield_direction(),
            Some(Direction::North)
        );

        // The wall is a status marker; damage still goes through Fortify only
        fx.act(striker, AbilityRequest::new("attack").at(Position::new(2, 2)))
            .unwrap();
        assert_eq!(fx.unit(sentinel).hp, 9);
    }

    #[test]
    fn test_intercept_moves_next_to_ally() {
        let mut fx = Fixture::new();
        let sentinel = fx.spawn(UnitClass::Sentinel, Side::Blue, 0, 0);
        fx.spawn(UnitClass::Oracle, Side::Blue, 1, 1);

        fx.act(
            sentinel,
            AbilityRequest::new("intercept").at(Position::new(1, 1)),
        )
        .unwrap();

        let unit = fx.unit(sentinel);
        // South (1,0) and west (0,1) are equally close; south wins the tie
        assert_eq!(unit.position, Position::new(1, 0));
        assert_eq!(unit.statuses.shield_direction(), Some(Direction::North));
        assert!(!unit.has_status(StatusKind::Fortified));
        assert!(unit.moved_this_turn);
    }

    #[test]
    fn test_intercept_rejects_far_ally() {
        let mut fx = Fixture::new();
        let sentinel = fx.spawn(UnitClass::Sentinel, Side::Blue, 0, 0);
        fx.spawn(UnitClass::Oracle, Side::Blue, 3, 3);
        assert_eq!(
            fx.act(
                sentinel,
                AbilityRequest::new("intercept").at(Position::new(3, 3))
            ),
            Err(Rejection::OutOfRange { distance: 6, max: 2 })
        );
        assert_eq!(fx.unit(sentinel).position, Position::new(0, 0));
    }

    #[test]
    fn test_kill_is_reported_with_killer() {
        let mut fx = Fixture::new();
        let striker = fx.spawn(UnitClass::Striker, Side::Blue, 0, 0);
        let enemy = fx.spawn(UnitClass::Specter, Side::Red, 0, 2);
        fx.state.unit_mut(enemy).unwrap().hp = 2;

        fx.act(
            striker,
            AbilityRequest::new("precision_shot").at(Position::new(0, 2)),
        )
        .unwrap();
        assert!(!fx.unit(enemy).is_alive());
        assert!(fx.log.iter().any(|e| matches!(
            e,
            CombatEvent::UnitKilled { unit, killer: Some(k), ability: Ability::PrecisionShot }
                if *unit == enemy && *k == striker
        )));
    }
}

//! Units, classes and per-class bookkeeping
//!
//! Units are never removed from the roster: elimination is hp reaching 0.
//! Everything that asks for "living" units filters on [`Unit::is_alive`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::battle::status::{StatusEffect, StatusKind, Statuses};
use crate::core::config::ClassStats;
use crate::core::error::SibylError;
use crate::core::types::{Direction, Position, Side, UnitId};

/// The six unit classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitClass {
    /// Tank. Fortify passive, shield_wall, intercept
    Sentinel,
    /// Infiltrator. Ghost Step passive, breach, cloak, shadow_strike
    Specter,
    /// Intel. scan, recalibrate
    Oracle,
    /// Ranged damage. precision_shot, suppressing_fire
    Striker,
    /// Support. patch, overclock
    Medic,
    /// Area denial. Denial passive, trap, pulse
    Vector,
}

impl UnitClass {
    pub fn all() -> [UnitClass; 6] {
        [
            UnitClass::Sentinel,
            UnitClass::Specter,
            UnitClass::Oracle,
            UnitClass::Striker,
            UnitClass::Medic,
            UnitClass::Vector,
        ]
    }

    /// Directive a freshly created unit starts with
    pub fn default_orders(&self) -> &'static str {
        match self {
            UnitClass::Sentinel => "Hold the line. Protect the most wounded ally.",
            UnitClass::Specter => "Flank the enemy and strike from behind.",
            UnitClass::Oracle => "Gather intelligence on enemy orders.",
            UnitClass::Striker => "Engage the closest visible enemy from range.",
            UnitClass::Medic => "Keep allies alive.",
            UnitClass::Vector => "Deny the approach with traps and pulses.",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnitClass::Sentinel => "Sentinel",
            UnitClass::Specter => "Specter",
            UnitClass::Oracle => "Oracle",
            UnitClass::Striker => "Striker",
            UnitClass::Medic => "Medic",
            UnitClass::Vector => "Vector",
        }
    }
}

impl FromStr for UnitClass {
    type Err = SibylError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        UnitClass::all()
            .into_iter()
            .find(|class| class.name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| SibylError::Parse(format!("unknown class '{s}'")))
    }
}

impl fmt::Display for UnitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Specter breach bookkeeping, absent until the first breach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BreachCharges {
    pub used: u32,
    /// Own cleanups left before the next breach is allowed
    pub cooldown: u32,
}

/// Orders overwritten by a breach, restored when `turns_left` hits 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOverride {
    pub turns_left: u32,
    pub original_orders: String,
}

/// A combatant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub class: UnitClass,
    pub side: Side,

    // Vitals
    pub hp: u32,
    pub max_hp: u32,

    // Position
    pub position: Position,
    pub facing: Direction,
    /// False until the unit is placed during setup
    pub placed: bool,

    // Class stats
    pub movement: u32,
    pub range: u32,
    pub speed: u32,

    pub statuses: Statuses,
    /// Behavior directive the decision-maker reads
    pub orders: String,

    // Class counters
    pub heals_used: u32,
    pub breach: Option<BreachCharges>,
    pub order_override: Option<OrderOverride>,
    pub moved_this_turn: bool,
}

impl Unit {
    pub fn new(id: UnitId, name: String, class: UnitClass, side: Side, stats: &ClassStats) -> Self {
        let mut statuses = Statuses::new();
        if class == UnitClass::Sentinel {
            statuses.insert(StatusEffect::Fortified);
        }

        Self {
            id,
            name,
            class,
            side,
            hp: stats.hp,
            max_hp: stats.hp,
            position: Position::default(),
            facing: Direction::default(),
            placed: false,
            movement: stats.movement,
            range: stats.range,
            speed: stats.speed,
            statuses,
            orders: class.default_orders().to_string(),
            heals_used: 0,
            breach: None,
            order_override: None,
            moved_this_turn: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Alive and standing on the board
    pub fn is_active(&self) -> bool {
        self.is_alive() && self.placed
    }

    pub fn is_cloaked(&self) -> bool {
        self.statuses.has(StatusKind::Cloaked)
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.statuses.has(kind)
    }

    pub fn is_ally_of(&self, other: &Unit) -> bool {
        self.side == other.side
    }

    pub fn is_enemy_of(&self, other: &Unit) -> bool {
        self.side != other.side
    }

    pub fn breaches_used(&self) -> u32 {
        self.breach.map_or(0, |charges| charges.used)
    }

    pub fn breach_cooldown(&self) -> u32 {
        self.breach.map_or(0, |charges| charges.cooldown)
    }

    /// Restore hp, capped at max_hp. Returns the amount actually healed
    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
        self.hp - before
    }
}

/// Reduce a unit's hp; the only path hp goes down
///
/// Fortified halves the amount, rounding up. hp floors at 0. Returns the
/// damage actually applied.
pub fn apply_damage(unit: &mut Unit, amount: u32) -> u32 {
    let amount = if unit.has_status(StatusKind::Fortified) {
        amount.div_ceil(2)
    } else {
        amount
    };
    let dealt = amount.min(unit.hp);
    unit.hp -= dealt;
    dealt
}

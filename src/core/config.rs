//! Rules configuration with documented constants
//!
//! Every number the rules depend on lives here and is handed to the engine at
//! construction. Defaults reproduce the standard 6x6 ruleset; a TOML file can
//! override any subset of it (missing sections fall back to defaults).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::units::UnitClass;
use crate::core::error::{Result, SibylError};

/// Board dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 6,
            height: 6,
        }
    }
}

/// Base stats assigned to a unit when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStats {
    pub hp: u32,
    /// Tiles per move action (Manhattan)
    pub movement: u32,
    /// Reach of ranged abilities that use the unit's own range
    pub range: u32,
    /// Higher acts earlier in the round
    pub speed: u32,
}

impl ClassStats {
    pub const fn new(hp: u32, movement: u32, range: u32, speed: u32) -> Self {
        Self {
            hp,
            movement,
            range,
            speed,
        }
    }
}

/// Stats for all six classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassTable {
    pub sentinel: ClassStats,
    pub specter: ClassStats,
    pub oracle: ClassStats,
    pub striker: ClassStats,
    pub medic: ClassStats,
    pub vector: ClassStats,
}

impl Default for ClassTable {
    fn default() -> Self {
        Self {
            sentinel: ClassStats::new(10, 2, 1, 1),
            specter: ClassStats::new(6, 3, 1, 4),
            oracle: ClassStats::new(7, 2, 3, 2),
            striker: ClassStats::new(7, 2, 3, 3),
            medic: ClassStats::new(8, 2, 1, 2),
            vector: ClassStats::new(8, 2, 2, 1),
        }
    }
}

impl ClassTable {
    pub fn get(&self, class: UnitClass) -> &ClassStats {
        match class {
            UnitClass::Sentinel => &self.sentinel,
            UnitClass::Specter => &self.specter,
            UnitClass::Oracle => &self.oracle,
            UnitClass::Striker => &self.striker,
            UnitClass::Medic => &self.medic,
            UnitClass::Vector => &self.vector,
        }
    }
}

/// Numeric constants of the fourteen abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    pub attack_damage: u32,

    /// Max distance between a Sentinel and the ally it intercepts for
    pub intercept_range: u32,

    pub breach_range: u32,
    /// Cleanup cycles of the target before its original orders come back
    pub breach_duration: u32,
    pub breach_cooldown: u32,
    pub breach_max_uses: u32,

    pub cloak_duration: u32,
    pub shadow_strike_damage: u32,

    pub scan_range: u32,
    pub scan_damage: u32,

    pub precision_shot_damage: u32,
    /// Damage when the Striker already moved this turn
    pub precision_shot_moved_damage: u32,
    pub suppressing_fire_damage: u32,

    pub patch_heal: u32,
    pub patch_max_uses: u32,
    /// Damage the overclocked ally takes
    pub overclock_self_damage: u32,

    pub trap_damage: u32,
    pub pulse_damage: u32,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            attack_damage: 1,
            intercept_range: 2,
            breach_range: 2,
            breach_duration: 3,
            breach_cooldown: 2,
            breach_max_uses: 2,
            cloak_duration: 2,
            shadow_strike_damage: 3,
            scan_range: 3,
            scan_damage: 1,
            precision_shot_damage: 3,
            precision_shot_moved_damage: 1,
            suppressing_fire_damage: 1,
            patch_heal: 3,
            patch_max_uses: 2,
            overclock_self_damage: 1,
            trap_damage: 2,
            pulse_damage: 1,
        }
    }
}

/// Turn structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Action slots per unit turn
    pub actions_per_turn: u32,
    /// Extra slots granted while Overclocked
    pub overclock_bonus_actions: u32,
    /// Rounds after which the encounter ends without a winner; unlimited
    /// when unset
    pub max_rounds: Option<u32>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            actions_per_turn: 2,
            overclock_bonus_actions: 1,
            max_rounds: None,
        }
    }
}

/// Complete rules configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub classes: ClassTable,
    #[serde(default)]
    pub abilities: AbilityConfig,
    #[serde(default)]
    pub turns: TurnConfig,
}

impl RulesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; absent sections keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let rules: RulesConfig = toml::from_str(contents)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.grid.width <= 0 || self.grid.height <= 0 {
            return Err(SibylError::Config(format!(
                "grid must be non-empty, got {}x{}",
                self.grid.width, self.grid.height
            )));
        }

        for class in UnitClass::all() {
            let stats = self.classes.get(class);
            if stats.hp == 0 {
                return Err(SibylError::Config(format!("{class} hp must be positive")));
            }
            if stats.movement == 0 {
                return Err(SibylError::Config(format!(
                    "{class} movement must be positive"
                )));
            }
        }

        if self.turns.actions_per_turn == 0 {
            return Err(SibylError::Config(
                "actions_per_turn must be positive".into(),
            ));
        }

        if self.abilities.precision_shot_moved_damage > self.abilities.precision_shot_damage {
            return Err(SibylError::Config(format!(
                "precision_shot_moved_damage ({}) should be <= precision_shot_damage ({})",
                self.abilities.precision_shot_moved_damage, self.abilities.precision_shot_damage
            )));
        }

        if self.abilities.breach_duration == 0 {
            return Err(SibylError::Config("breach_duration must be positive".into()));
        }

        Ok(())
    }
}

/// Load rules from a TOML file
pub fn load_rules(path: &Path) -> Result<RulesConfig> {
    let contents = fs::read_to_string(path)?;
    RulesConfig::from_toml_str(&contents)
}

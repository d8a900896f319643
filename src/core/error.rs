use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::battle::abilities::Ability;
use crate::battle::units::UnitClass;
use crate::core::types::{Direction, Position, UnitId};

/// Why the engine refused an action
///
/// Rejections are ordinary outcomes: the state is left untouched and the
/// orchestrator hands the message back to the decision-maker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("position {0} is outside the grid")]
    OutOfBounds(Position),

    #[error("target is {distance} tiles away (max {max})")]
    OutOfRange { distance: u32, max: u32 },

    #[error("target must be adjacent")]
    NotAdjacent,

    #[error("must be behind the target to breach (target faces {0})")]
    NotBehind(Direction),

    #[error("no free tile next to the ally")]
    NoFreeTile,

    #[error("tile {0} is occupied")]
    Occupied(Position),

    #[error("no living unit at {0}")]
    NoUnitAt(Position),

    #[error("tile {0} is not empty")]
    TileNotEmpty(Position),

    #[error("unit is already at {0}")]
    AlreadyThere(Position),

    #[error("{class} cannot use {ability}")]
    WrongClass { ability: Ability, class: UnitClass },

    #[error("patch limit reached ({0} uses)")]
    HealCapReached(u32),

    #[error("breach limit reached ({0} uses)")]
    BreachCapReached(u32),

    #[error("breach on cooldown for {0} more turns")]
    BreachCooldown(u32),

    #[error("no action slots left this turn")]
    NoActionsLeft,

    #[error("{0} blocked by Denial (adjacent enemy Vector)")]
    Denied(Ability),

    #[error("target is cloaked")]
    TargetCloaked,

    #[error("cannot target self")]
    SelfTarget,

    #[error("target must be an ally")]
    NotAlly,

    #[error("target must be an enemy")]
    NotEnemy,

    #[error("unknown ability '{0}'")]
    UnknownAbility(String),

    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("unit {0} not found")]
    UnitNotFound(UnitId),

    #[error("unit {0} is dead")]
    UnitDead(UnitId),

    #[error("it is not {0}'s turn")]
    NotYourTurn(UnitId),

    #[error("action not allowed during {0:?}")]
    WrongPhase(crate::battle::state::Phase),

    #[error("units are still waiting to act this round")]
    RoundInProgress,
}

/// Coarse grouping of rejections, carried by failed attempts in the event
/// stream and the action log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    Geometric,
    Occupancy,
    Authorization,
    ResourceExhausted,
    Blocked,
    Malformed,
    Lifecycle,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::OutOfBounds(_)
            | Rejection::OutOfRange { .. }
            | Rejection::NotAdjacent
            | Rejection::NotBehind(_)
            | Rejection::NoFreeTile => RejectionKind::Geometric,
            Rejection::Occupied(_)
            | Rejection::NoUnitAt(_)
            | Rejection::TileNotEmpty(_)
            | Rejection::AlreadyThere(_) => RejectionKind::Occupancy,
            Rejection::WrongClass { .. } => RejectionKind::Authorization,
            Rejection::HealCapReached(_)
            | Rejection::BreachCapReached(_)
            | Rejection::BreachCooldown(_)
            | Rejection::NoActionsLeft => RejectionKind::ResourceExhausted,
            Rejection::Denied(_)
            | Rejection::TargetCloaked
            | Rejection::SelfTarget
            | Rejection::NotAlly
            | Rejection::NotEnemy => RejectionKind::Blocked,
            Rejection::UnknownAbility(_) | Rejection::MissingParameter(_) => {
                RejectionKind::Malformed
            }
            Rejection::UnitNotFound(_)
            | Rejection::UnitDead(_)
            | Rejection::NotYourTurn(_)
            | Rejection::WrongPhase(_)
            | Rejection::RoundInProgress => RejectionKind::Lifecycle,
        }
    }
}

/// Errors outside the rules themselves: configuration, parsing, I/O
#[derive(Error, Debug)]
pub enum SibylError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Decision parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Rejected: {0}")]
    Rejected(#[from] Rejection),
}

pub type Result<T> = std::result::Result<T, SibylError>;

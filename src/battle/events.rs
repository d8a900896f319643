//! Domain events and the sinks that receive them
//!
//! Events are fire-and-forget: the engine pushes them into whatever
//! [`EventSink`] it was built with and never reads them back.

use serde::{Deserialize, Serialize};

use crate::battle::abilities::Ability;
use crate::battle::state::{EndReason, Snapshot};
use crate::battle::status::{RemovalReason, StatusEffect};
use crate::battle::units::{Unit, UnitClass};
use crate::core::error::RejectionKind;
use crate::core::types::{Direction, Position, Round, Side, UnitId};

/// Something observable happened in the encounter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatEvent {
    UnitPlaced {
        unit: UnitId,
        name: String,
        class: UnitClass,
        side: Side,
        position: Position,
        facing: Direction,
    },
    RoundStarted {
        round: Round,
        turn_order: Vec<UnitId>,
        snapshot: Snapshot,
    },
    RoundEnded {
        round: Round,
        snapshot: Snapshot,
    },
    UnitMoved {
        unit: UnitId,
        from: Position,
        to: Position,
        facing: Direction,
        trap_triggered: bool,
    },
    AbilityAttempted {
        unit: UnitId,
        ability: String,
        target: Option<Position>,
        success: bool,
        reason: Option<String>,
        kind: Option<RejectionKind>,
    },
    Waited {
        unit: UnitId,
    },
    DamageDealt {
        source: Option<UnitId>,
        target: UnitId,
        amount: u32,
        hp_after: u32,
        ability: Ability,
    },
    Healed {
        source: UnitId,
        target: UnitId,
        amount: u32,
        hp_after: u32,
    },
    StatusApplied {
        unit: UnitId,
        status: StatusEffect,
    },
    StatusRemoved {
        unit: UnitId,
        status: StatusEffect,
        reason: RemovalReason,
    },
    UnitKilled {
        unit: UnitId,
        killer: Option<UnitId>,
        ability: Ability,
    },
    TrapPlaced {
        owner: UnitId,
        side: Side,
        position: Position,
    },
    TrapTriggered {
        owner: UnitId,
        victim: UnitId,
        position: Position,
        damage: u32,
    },
    Breached {
        specter: UnitId,
        target: UnitId,
        old_orders: String,
        new_orders: String,
    },
    OrdersRestored {
        unit: UnitId,
        orders: String,
    },
    GameEnded {
        round: Round,
        winner: Option<Side>,
        reason: EndReason,
        survivors: Vec<Unit>,
        snapshot: Snapshot,
    },
}

impl CombatEvent {
    /// Short label, handy for log lines and filtering
    pub fn name(&self) -> &'static str {
        match self {
            CombatEvent::UnitPlaced { .. } => "unit_placed",
            CombatEvent::RoundStarted { .. } => "round_started",
            CombatEvent::RoundEnded { .. } => "round_ended",
            CombatEvent::UnitMoved { .. } => "unit_moved",
            CombatEvent::AbilityAttempted { .. } => "ability_attempted",
            CombatEvent::Waited { .. } => "waited",
            CombatEvent::DamageDealt { .. } => "damage_dealt",
            CombatEvent::Healed { .. } => "healed",
            CombatEvent::StatusApplied { .. } => "status_applied",
            CombatEvent::StatusRemoved { .. } => "status_removed",
            CombatEvent::UnitKilled { .. } => "unit_killed",
            CombatEvent::TrapPlaced { .. } => "trap_placed",
            CombatEvent::TrapTriggered { .. } => "trap_triggered",
            CombatEvent::Breached { .. } => "breached",
            CombatEvent::OrdersRestored { .. } => "orders_restored",
            CombatEvent::GameEnded { .. } => "game_ended",
        }
    }
}

/// Receiver of engine events
pub trait EventSink {
    fn emit(&mut self, event: CombatEvent);
}

impl EventSink for Vec<CombatEvent> {
    fn emit(&mut self, event: CombatEvent) {
        self.push(event);
    }
}

/// In-memory event recorder
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub events: Vec<CombatEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything recorded so far
    pub fn drain(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatEvent> {
        self.events.iter()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: CombatEvent) {
        self.events.push(event);
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: CombatEvent) {}
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: CombatEvent) {
        match &event {
            CombatEvent::UnitKilled {
                unit,
                killer,
                ability,
            } => {
                tracing::info!(%unit, ?killer, %ability, "unit killed");
            }
            CombatEvent::GameEnded { winner, reason, .. } => {
                tracing::info!(?winner, ?reason, "game ended");
            }
            CombatEvent::RoundStarted { round, .. } => {
                tracing::info!(round, "round started");
            }
            other => {
                tracing::debug!(event = other.name(), "{:?}", other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_records_and_drains() {
        let mut log = EventLog::new();
        log.emit(CombatEvent::Waited {
            unit: UnitId::new(3),
        });
        assert_eq!(log.len(), 1);

        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = CombatEvent::TrapPlaced {
            owner: UnitId::new(1),
            side: Side::Red,
            position: Position::new(2, 3),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "trap_placed");
        assert_eq!(json["side"], "red");
        assert_eq!(json["position"]["x"], 2);
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let mut sink = NullSink;
        sink.emit(CombatEvent::Waited {
            unit: UnitId::new(0),
        });
    }
}

//! Status effects and their container
//!
//! A unit holds at most one effect of each kind. Lifetimes are driven by the
//! per-unit cleanup pass in `lifecycle`.

use serde::{Deserialize, Serialize};

use crate::core::types::Direction;

/// Active effect on a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusEffect {
    /// Hidden from enemy views and untargetable by attack/precision_shot
    Cloaked { turns_left: u32 },
    /// Movement budget drops to 1
    Suppressed,
    /// Blocks damage coming from `direction`
    ShieldWall { direction: Direction },
    /// Grants extra action slots
    Overclocked,
    /// Sentinel passive: incoming damage halved (rounded up)
    Fortified,
}

/// Payload-free discriminant of [`StatusEffect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Cloaked,
    Suppressed,
    ShieldWall,
    Overclocked,
    Fortified,
}

impl StatusEffect {
    pub fn kind(&self) -> StatusKind {
        match self {
            StatusEffect::Cloaked { .. } => StatusKind::Cloaked,
            StatusEffect::Suppressed => StatusKind::Suppressed,
            StatusEffect::ShieldWall { .. } => StatusKind::ShieldWall,
            StatusEffect::Overclocked => StatusKind::Overclocked,
            StatusEffect::Fortified => StatusKind::Fortified,
        }
    }
}

impl StatusKind {
    /// Effects that last exactly one action cycle of their holder
    pub fn is_single_cycle(&self) -> bool {
        matches!(
            self,
            StatusKind::Suppressed | StatusKind::ShieldWall | StatusKind::Overclocked
        )
    }
}

/// Why an effect was taken off a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Expired,
    Moved,
    TurnEnd,
    AbilityBreak,
}

/// Set of effects, at most one per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statuses(Vec<StatusEffect>);

impl Statuses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.0.iter().any(|effect| effect.kind() == kind)
    }

    pub fn get(&self, kind: StatusKind) -> Option<&StatusEffect> {
        self.0.iter().find(|effect| effect.kind() == kind)
    }

    pub fn get_mut(&mut self, kind: StatusKind) -> Option<&mut StatusEffect> {
        self.0.iter_mut().find(|effect| effect.kind() == kind)
    }

    /// Insert, replacing any effect of the same kind
    pub fn insert(&mut self, effect: StatusEffect) {
        match self.get_mut(effect.kind()) {
            Some(existing) => *existing = effect,
            None => self.0.push(effect),
        }
    }

    pub fn remove(&mut self, kind: StatusKind) -> Option<StatusEffect> {
        let index = self.0.iter().position(|effect| effect.kind() == kind)?;
        Some(self.0.remove(index))
    }

    /// Remove and return every single-cycle effect, in insertion order
    pub fn take_single_cycle(&mut self) -> Vec<StatusEffect> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.0)
            .into_iter()
            .partition(|effect| effect.kind().is_single_cycle());
        self.0 = kept;
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Remaining cloak turns, if cloaked
    pub fn cloak_turns(&self) -> Option<u32> {
        match self.get(StatusKind::Cloaked) {
            Some(StatusEffect::Cloaked { turns_left }) => Some(*turns_left),
            _ => None,
        }
    }

    /// Direction covered by a shield wall, if any
    pub fn shield_direction(&self) -> Option<Direction> {
        match self.get(StatusKind::ShieldWall) {
            Some(StatusEffect::ShieldWall { direction }) => Some(*direction),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_same_kind() {
        let mut statuses = Statuses::new();
        statuses.insert(StatusEffect::Cloaked { turns_left: 2 });
        statuses.insert(StatusEffect::Cloaked { turns_left: 1 });
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses.cloak_turns(), Some(1));
    }

    #[test]
    fn test_remove_returns_effect() {
        let mut statuses = Statuses::new();
        statuses.insert(StatusEffect::ShieldWall {
            direction: Direction::East,
        });
        statuses.insert(StatusEffect::Fortified);

        assert_eq!(statuses.shield_direction(), Some(Direction::East));
        let removed = statuses.remove(StatusKind::ShieldWall);
        assert_eq!(
            removed,
            Some(StatusEffect::ShieldWall {
                direction: Direction::East
            })
        );
        assert!(!statuses.has(StatusKind::ShieldWall));
        assert!(statuses.has(StatusKind::Fortified));
        assert!(statuses.remove(StatusKind::ShieldWall).is_none());
    }

    #[test]
    fn test_single_cycle_kinds() {
        assert!(StatusKind::Suppressed.is_single_cycle());
        assert!(StatusKind::ShieldWall.is_single_cycle());
        assert!(StatusKind::Overclocked.is_single_cycle());
        assert!(!StatusKind::Cloaked.is_single_cycle());
        assert!(!StatusKind::Fortified.is_single_cycle());
    }

    #[test]
    fn test_status_serializes_with_kind_tag() {
        let json = serde_json::to_string(&StatusEffect::Cloaked { turns_left: 2 }).unwrap();
        assert_eq!(json, r#"{"kind":"cloaked","turns_left":2}"#);
    }
}

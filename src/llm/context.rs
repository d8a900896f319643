//! Render a decision view as prompt text
//!
//! The summary mirrors what the acting unit may know and nothing more: it is
//! built only from a [`DecisionView`], never from raw game state.

use crate::battle::view::{DecisionView, UnitSighting};
use crate::core::types::Position;

/// Prompt material for one unit turn
pub struct TurnContext<'a> {
    view: &'a DecisionView,
}

impl<'a> TurnContext<'a> {
    pub fn from_view(view: &'a DecisionView) -> Self {
        Self { view }
    }

    /// Text summary for the user message
    pub fn summary(&self) -> String {
        let view = self.view;
        let me = &view.me;
        let mut s = String::new();

        s.push_str(&format!("Round {}\n", view.round));
        s.push_str(&format!(
            "You are {} ({}, {} side) at {} facing {}. HP {}/{}.\n",
            me.name, me.class, me.side, me.position, me.facing, me.hp, me.max_hp
        ));
        s.push_str(&format!("Orders: {}\n", me.orders));
        if !me.statuses.is_empty() {
            let statuses: Vec<String> = me.statuses.iter().map(|st| format!("{:?}", st)).collect();
            s.push_str(&format!("Status: {}\n", statuses.join(", ")));
        }
        let abilities: Vec<&str> = view.abilities.iter().map(|a| a.name()).collect();
        s.push_str(&format!(
            "Abilities: {} ({} actions left)\n",
            abilities.join(", "),
            view.actions_left
        ));

        s.push_str("\nAllies:\n");
        if view.allies.is_empty() {
            s.push_str("- none\n");
        }
        for ally in &view.allies {
            s.push_str(&sighting_line(ally));
        }

        s.push_str("\nVisible enemies:\n");
        if view.enemies.is_empty() {
            s.push_str("- none\n");
        }
        for enemy in &view.enemies {
            s.push_str(&sighting_line(enemy));
        }

        if !view.own_traps.is_empty() {
            let traps: Vec<String> = view.own_traps.iter().map(|p| p.to_string()).collect();
            s.push_str(&format!("\nYour traps: {}\n", traps.join(" ")));
        }

        s.push_str("\nTurn order:\n");
        for entry in &view.turn_order {
            let marker = if !entry.alive {
                "dead"
            } else if entry.acted {
                "acted"
            } else {
                "waiting"
            };
            s.push_str(&format!("- {} ({}) {}\n", entry.name, entry.side, marker));
        }

        if let Some(scans) = &view.scan_history {
            s.push_str("\nScan notes:\n");
            for (unit, orders) in scans {
                s.push_str(&format!("- {}: \"{}\"\n", unit, orders));
            }
        }

        if let Some(log) = &view.last_round_log {
            s.push_str("\nLast round:\n");
            for record in log {
                let outcome = if record.success { "ok" } else { "failed" };
                s.push_str(&format!(
                    "- {}: {} ({})\n",
                    record.name, record.action, outcome
                ));
            }
        }

        s.push('\n');
        s.push_str(&self.board());
        s
    }

    /// ASCII board, north at the top
    ///
    /// `@` is the acting unit, upper-case letters are allies, lower-case are
    /// visible enemies, `^` are own traps.
    pub fn board(&self) -> String {
        let view = self.view;
        let mut s = String::new();
        for y in (0..view.grid.height).rev() {
            s.push_str(&format!("{y} "));
            for x in 0..view.grid.width {
                s.push(self.glyph(Position::new(x, y)));
            }
            s.push('\n');
        }
        s.push_str("  ");
        for x in 0..view.grid.width {
            s.push_str(&(x % 10).to_string());
        }
        s.push('\n');
        s
    }

    fn glyph(&self, position: Position) -> char {
        let view = self.view;
        if view.me.position == position {
            return '@';
        }
        if let Some(ally) = view.allies.iter().find(|a| a.position == position) {
            return class_letter(ally).to_ascii_uppercase();
        }
        if let Some(enemy) = view.enemies.iter().find(|e| e.position == position) {
            return class_letter(enemy).to_ascii_lowercase();
        }
        if view.own_traps.contains(&position) {
            return '^';
        }
        '.'
    }
}

fn class_letter(unit: &UnitSighting) -> char {
    unit.class.name().chars().next().unwrap_or('?')
}

fn sighting_line(unit: &UnitSighting) -> String {
    let hp = match (unit.hp, unit.max_hp) {
        (Some(hp), Some(max)) => format!("HP {hp}/{max}"),
        _ => "HP ?".to_string(),
    };
    format!(
        "- {} ({}) at {} facing {}, {}\n",
        unit.name, unit.class, unit.position, unit.facing, hp
    )
}

/// System prompt for turn planning
pub const TURN_SYSTEM_PROMPT: &str = r#"You command one unit in a turn-based tactics game on a 6x6 grid.
Origin is bottom-left; north is +y. Distances are Manhattan.

Reply with a single JSON object:
{
  "thinking": "<short reasoning>",
  "firstAction": <action>,
  "secondAction": <action>
}

Actions:
- {"type": "move", "target": {"x": 0, "y": 0}}
- {"type": "ability", "ability": "<name>", "target": {"x": 0, "y": 0}, "direction": "N", "addendum": "<text>"}
- {"type": "wait"}

Only use abilities listed for your unit. Follow your orders."#;

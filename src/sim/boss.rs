//! Boss encounter
//!
//! The boss shows up after a patient is lost and leaves once the player has
//! worn its health down to zero with medical tools.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Damage used for tool ids missing from the table
pub const DEFAULT_TOOL_DAMAGE: u32 = 10;

/// Tool id -> damage lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolTable {
    pub damages: BTreeMap<String, u32>,
    pub default_damage: u32,
}

impl Default for ToolTable {
    fn default() -> Self {
        let damages = [
            ("syringe", 15),
            ("stethoscope", 10),
            ("thermometer", 8),
            ("scalpel", 20),
            ("bandage", 5),
            ("pill", 12),
        ]
        .into_iter()
        .map(|(tool, damage)| (tool.to_string(), damage))
        .collect();
        Self {
            damages,
            default_damage: DEFAULT_TOOL_DAMAGE,
        }
    }
}

impl ToolTable {
    /// Damage for a tool; unknown tools use the default
    pub fn damage_for(&self, tool: &str) -> u32 {
        self.damages
            .get(tool)
            .copied()
            .unwrap_or(self.default_damage)
    }

    /// Feedback line for a strike
    pub fn strike_message(&self, tool: &str) -> String {
        let damage = self.damage_for(tool);
        match tool {
            "syringe" => format!("Syringe strike! -{damage} HP"),
            "stethoscope" => format!("Stethoscope thrown! -{damage} HP"),
            "thermometer" => format!("Thermometer hit! -{damage} HP"),
            "scalpel" => format!("Sharp scalpel! -{damage} HP"),
            "bandage" => format!("Bandage whip! -{damage} HP"),
            "pill" => format!("The pill works! -{damage} HP"),
            _ => format!("Attack! -{damage} HP"),
        }
    }
}

/// Live boss fight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossEncounter {
    pub health: u32,
    pub max_health: u32,
}

impl BossEncounter {
    pub fn new(max_health: u32) -> Self {
        Self {
            health: max_health,
            max_health,
        }
    }

    /// Apply damage, never going below zero. Returns the health left.
    pub fn strike(&mut self, damage: u32) -> u32 {
        self.health = self.health.saturating_sub(damage);
        self.health
    }

    pub fn is_defeated(&self) -> bool {
        self.health == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_lookup_with_fallback() {
        let tools = ToolTable::default();
        assert_eq!(tools.damage_for("scalpel"), 20);
        assert_eq!(tools.damage_for("bandage"), 5);
        assert_eq!(tools.damage_for("defibrillator"), DEFAULT_TOOL_DAMAGE);
        assert_eq!(tools.strike_message("pill"), "The pill works! -12 HP");
        assert_eq!(tools.strike_message("mop"), "Attack! -10 HP");
    }

    #[test]
    fn test_five_heavy_strikes_defeat_boss() {
        let mut boss = BossEncounter::new(100);
        for i in 1..=5 {
            assert!(!boss.is_defeated());
            assert_eq!(boss.strike(20), 100 - 20 * i);
        }
        assert!(boss.is_defeated());
    }

    #[test]
    fn test_health_floors_at_zero() {
        let mut boss = BossEncounter::new(100);
        boss.strike(95);
        assert_eq!(boss.strike(20), 0);
        assert_eq!(boss.strike(20), 0);
        assert!(boss.is_defeated());
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unit kinds that can travel between villages.
///
/// Serialized with the game's own short keys (`light`, `marcher`, `snob`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Spear,
    Sword,
    Axe,
    Archer,
    Scout,
    Light,
    Marcher,
    Heavy,
    Ram,
    Catapult,
    Knight,
    Snob,
}

impl UnitType {
    /// Every unit in enumeration order. Matching ties are broken by this order.
    pub const ALL: [UnitType; 12] = [
        UnitType::Spear,
        UnitType::Sword,
        UnitType::Axe,
        UnitType::Archer,
        UnitType::Scout,
        UnitType::Light,
        UnitType::Marcher,
        UnitType::Heavy,
        UnitType::Ram,
        UnitType::Catapult,
        UnitType::Knight,
        UnitType::Snob,
    ];

    /// Unscaled minutes needed to cross one field.
    pub const fn base_speed(self) -> f64 {
        match self {
            UnitType::Spear | UnitType::Axe | UnitType::Archer => 18.0,
            UnitType::Sword => 22.0,
            UnitType::Scout => 9.0,
            UnitType::Light | UnitType::Marcher | UnitType::Knight => 10.0,
            UnitType::Heavy => 11.0,
            UnitType::Ram | UnitType::Catapult => 30.0,
            UnitType::Snob => 35.0,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            UnitType::Spear => "spear",
            UnitType::Sword => "sword",
            UnitType::Axe => "axe",
            UnitType::Archer => "archer",
            UnitType::Scout => "scout",
            UnitType::Light => "light",
            UnitType::Marcher => "marcher",
            UnitType::Heavy => "heavy",
            UnitType::Ram => "ram",
            UnitType::Catapult => "catapult",
            UnitType::Knight => "knight",
            UnitType::Snob => "snob",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            UnitType::Spear => "Spear fighter",
            UnitType::Sword => "Swordsman",
            UnitType::Axe => "Axeman",
            UnitType::Archer => "Archer",
            UnitType::Scout => "Scout",
            UnitType::Light => "Light cavalry",
            UnitType::Marcher => "Mounted archer",
            UnitType::Heavy => "Heavy cavalry",
            UnitType::Ram => "Ram",
            UnitType::Catapult => "Catapult",
            UnitType::Knight => "Paladin",
            UnitType::Snob => "Nobleman",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

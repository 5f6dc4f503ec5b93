//! Ability scores, classes and their derived combat tables

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The six ability scores (3..25), plus exceptional strength (0..100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abilities {
    pub str: i32,
    pub str_add: i32,
    pub int: i32,
    pub wis: i32,
    pub dex: i32,
    pub con: i32,
    pub cha: i32,
}

impl Default for Abilities {
    fn default() -> Self {
        Self {
            str: 13,
            str_add: 0,
            int: 13,
            wis: 13,
            dex: 13,
            con: 13,
            cha: 13,
        }
    }
}

/// Dexterity defensive adjustment, indexed by dex 0..=25 (negative is better)
const DEX_DEFENSIVE: [i32; 26] = [
    6, 5, 5, 4, 3, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, -1, -2, -3, -4, -4, -4, -5, -5, -5, -6, -6,
];

impl Abilities {
    /// Strength to-hit adjustment
    pub fn str_to_hit(&self) -> i32 {
        match self.str {
            i32::MIN..=1 => -5,
            2..=3 => -3,
            4..=5 => -2,
            6..=7 => -1,
            8..=16 => 0,
            17 => 1,
            18 => match self.str_add {
                i32::MIN..=50 => 1,
                51..=99 => 2,
                _ => 3,
            },
            19..=20 => 3,
            21..=22 => 4,
            _ => 5,
        }
    }

    /// Strength damage adjustment
    pub fn str_to_dam(&self) -> i32 {
        match self.str {
            i32::MIN..=1 => -4,
            2 => -2,
            3..=5 => -1,
            6..=15 => 0,
            16 => 1,
            17 => 1,
            18 => match self.str_add {
                i32::MIN..=0 => 2,
                1..=75 => 3,
                76..=90 => 4,
                91..=99 => 5,
                _ => 6,
            },
            19..=20 => 7,
            21..=22 => 9,
            _ => 11,
        }
    }

    /// Dexterity armor adjustment (×1, multiply by 10 for armor units)
    pub fn dex_defensive(&self) -> i32 {
        DEX_DEFENSIVE[self.dex.clamp(0, 25) as usize]
    }

    /// Intelligence and wisdom both sharpen aim above 13
    pub fn mental_to_hit(&self) -> i32 {
        ((self.int - 13) as f32 / 1.5) as i32 + ((self.wis - 13) as f32 / 1.5) as i32
    }
}

/// Character class
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Class {
    MagicUser = 0,
    Cleric = 1,
    Thief = 2,
    #[default]
    Warrior = 3,
}

impl Class {
    /// Base to-hit number ("to hit armor class 0") for a mortal of this class
    pub fn thac0(&self, level: u8) -> i32 {
        let level = level as i32;
        let base = match self {
            Class::MagicUser => 20 - level / 3,
            Class::Cleric | Class::Thief => 20 - level * 2 / 3,
            Class::Warrior => 20 - level,
        };
        base.max(1)
    }

    /// Weapon classes parry with a wielded weapon
    pub const fn can_parry(&self) -> bool {
        matches!(self, Class::Warrior | Class::Thief)
    }

    /// Levels gained per point of saving throw improvement
    pub const fn save_slope(&self) -> i32 {
        match self {
            Class::MagicUser | Class::Cleric => 2,
            Class::Thief => 3,
            Class::Warrior => 4,
        }
    }
}

/// Backstab damage multiplier by level
pub fn backstab_multiplier(level: u8) -> i32 {
    match level {
        0..=7 => 2,
        8..=13 => 3,
        14..=20 => 4,
        21..=30 => 5,
        _ => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_abilities_are_neutral() {
        let a = Abilities::default();
        assert_eq!(a.str_to_hit(), 0);
        assert_eq!(a.str_to_dam(), 0);
        assert_eq!(a.dex_defensive(), 0);
        assert_eq!(a.mental_to_hit(), 0);
    }

    #[test]
    fn test_exceptional_strength() {
        let mut a = Abilities {
            str: 18,
            ..Default::default()
        };
        assert_eq!(a.str_to_dam(), 2);
        a.str_add = 100;
        assert_eq!(a.str_to_hit(), 3);
        assert_eq!(a.str_to_dam(), 6);
    }

    #[test]
    fn test_dex_defensive_clamps() {
        let a = Abilities {
            dex: 40,
            ..Default::default()
        };
        assert_eq!(a.dex_defensive(), -6);
        let a = Abilities {
            dex: -3,
            ..Default::default()
        };
        assert_eq!(a.dex_defensive(), 6);
    }

    #[test]
    fn test_thac0_improves_with_level() {
        for class in [Class::MagicUser, Class::Cleric, Class::Thief, Class::Warrior] {
            assert!(class.thac0(30) < class.thac0(1));
            assert!(class.thac0(100) >= 1);
        }
        assert_eq!(Class::Warrior.thac0(10), 10);
    }

    #[test]
    fn test_backstab_multiplier() {
        assert_eq!(backstab_multiplier(1), 2);
        assert_eq!(backstab_multiplier(30), 5);
        assert_eq!(backstab_multiplier(60), 6);
    }
}

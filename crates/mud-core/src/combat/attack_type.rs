//! Weapon attack kinds
//!
//! These define HOW a melee blow is described. They carry no mechanics of
//! their own; hit and damage math ignores them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// How a melee attack is delivered, used only to pick message verbs
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum AttackKind {
    /// Generic blow
    #[default]
    Hit = 0,
    Sting = 1,
    Whip = 2,
    Slash = 3,
    Bite = 4,
    Bludgeon = 5,
    Crush = 6,
    Pound = 7,
    Claw = 8,
    Maul = 9,
    Thrash = 10,
    Pierce = 11,
    Blast = 12,
    Punch = 13,
    Stab = 14,
}

impl AttackKind {
    /// Verb used after "you" ("you slash")
    pub const fn singular(&self) -> &'static str {
        match self {
            AttackKind::Hit => "hit",
            AttackKind::Sting => "sting",
            AttackKind::Whip => "whip",
            AttackKind::Slash => "slash",
            AttackKind::Bite => "bite",
            AttackKind::Bludgeon => "bludgeon",
            AttackKind::Crush => "crush",
            AttackKind::Pound => "pound",
            AttackKind::Claw => "claw",
            AttackKind::Maul => "maul",
            AttackKind::Thrash => "thrash",
            AttackKind::Pierce => "pierce",
            AttackKind::Blast => "blast",
            AttackKind::Punch => "punch",
            AttackKind::Stab => "stab",
        }
    }

    /// Verb used after a third person ("$n slashes")
    pub const fn plural(&self) -> &'static str {
        match self {
            AttackKind::Hit => "hits",
            AttackKind::Sting => "stings",
            AttackKind::Whip => "whips",
            AttackKind::Slash => "slashes",
            AttackKind::Bite => "bites",
            AttackKind::Bludgeon => "bludgeons",
            AttackKind::Crush => "crushes",
            AttackKind::Pound => "pounds",
            AttackKind::Claw => "claws",
            AttackKind::Maul => "mauls",
            AttackKind::Thrash => "thrashes",
            AttackKind::Pierce => "pierces",
            AttackKind::Blast => "blasts",
            AttackKind::Punch => "punches",
            AttackKind::Stab => "stabs",
        }
    }
}

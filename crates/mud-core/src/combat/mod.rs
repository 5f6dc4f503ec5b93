//! Combat system
//!
//! Melee rounds, the damage pipeline, death and experience rewards. Every
//! operation is a method on [`CombatWorld`](crate::world::CombatWorld).

mod attack_type;
mod damage;
mod damage_type;
mod death;
mod flee;
mod hit;
mod messages;
mod scheduler;

pub use attack_type::AttackKind;
pub use damage_type::{AuraKind, DamageCause};
pub use messages::{DAMAGE_MESSAGES, damage_bucket, replace_weapon_words};

/// Outcome of one pass through the damage pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageResult {
    /// Hit points actually removed after mitigation
    Dealt(i32),
    /// The victim died and has been handed to the death flow
    Killed,
}

impl DamageResult {
    pub const fn is_lethal(&self) -> bool {
        matches!(self, DamageResult::Killed)
    }

    /// Damage applied; a killing blow reports 0 since the victim is gone
    pub const fn amount(&self) -> i32 {
        match self {
            DamageResult::Dealt(dam) => *dam,
            DamageResult::Killed => 0,
        }
    }
}

/// Result of a single swing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatResult {
    /// Whether the attack connected
    pub hit: bool,
    /// Whether the defender died
    pub defender_died: bool,
    /// Whether the attacker died (e.g. from a reflective aura)
    pub attacker_died: bool,
    /// Damage applied to the defender
    pub damage: i32,
}

impl CombatResult {
    /// The swing never happened
    pub const NONE: Self = Self {
        hit: false,
        defender_died: false,
        attacker_died: false,
        damage: 0,
    };

    pub const MISS: Self = Self::NONE;

    pub const fn landed(result: DamageResult) -> Self {
        Self {
            hit: true,
            defender_died: result.is_lethal(),
            attacker_died: false,
            damage: result.amount(),
        }
    }
}

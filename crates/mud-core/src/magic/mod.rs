//! Magic system
//!
//! Catalog-driven spells and skills: formula evaluation, mana costs, target
//! resolution for the cast command, and dispatch of a cast to its effect
//! families.

mod cast;
mod catalog;
mod effects;
mod formula;
mod mana;
pub mod saves;
mod target;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use catalog::{
    AffectTemplate, AlterSpec, ClassAssignment, CombatMessages, CreationSpec, EffectFlags,
    MessageSet, PointsSpec, RoomSpec, SpellCatalog, SpellDef, SpellKind, SpellMessages,
    SummonSpec, TargetFlags,
};
pub use formula::{Formula, FormulaContext};
pub use mana::{Voice, density_cost_multiplier, density_power_multiplier};
pub use saves::{CastStyle, SaveKind, saving_throw};
pub use target::{CastError, CastTarget};

/// Catalog id of a spell, skill or song
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SpellId(pub u16);

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spell#{}", self.0)
    }
}

/// Result of one effect family, or of a whole cast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellOutcome {
    /// Something changed
    Success,
    /// The attempt was resisted or could not be carried out
    Failed,
    /// Nothing applicable happened
    NoEffect,
}

impl SpellOutcome {
    /// Combine family results: any success wins, then any failure
    pub fn aggregate(outcomes: impl IntoIterator<Item = SpellOutcome>) -> SpellOutcome {
        let mut result = SpellOutcome::NoEffect;
        for outcome in outcomes {
            match outcome {
                SpellOutcome::Success => return SpellOutcome::Success,
                SpellOutcome::Failed => result = SpellOutcome::Failed,
                SpellOutcome::NoEffect => {}
            }
        }
        result
    }
}

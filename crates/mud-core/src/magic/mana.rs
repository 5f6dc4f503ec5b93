//! Mana cost calculation

use tracing::warn;

use super::{FormulaContext, SpellCatalog, SpellId};
use crate::character::{CharId, Character};
use crate::consts::{CYCLIC_COST_FALLBACK, MAX_PREREQUISITE_DEPTH, MIN_CLASS_MANA};
use crate::rng::GameRng;
use crate::world::CombatWorld;

/// Optional utterance changing the strength of a cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Voice {
    #[default]
    Normal,
    /// Half cost
    Diminish,
    /// Double cost
    Amplify,
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t.clamp(0.0, 1.0)
}

/// Cost multiplier for a room's ambient magic density
///
/// Dense rooms discount down to 0.7; thin rooms discount slightly.
pub fn density_cost_multiplier(density: f32) -> f32 {
    match density {
        d if d >= 0.85 => 0.7,
        d if d >= 0.7 => lerp(1.0, 0.7, (d - 0.7) / 0.15),
        d if d >= 0.3 => 1.0,
        d if d >= 0.15 => 0.95,
        _ => 0.9,
    }
}

/// Power multiplier for damage spells at a room's magic density
pub fn density_power_multiplier(density: f32) -> f32 {
    match density {
        d if d >= 0.85 => 1.3,
        d if d >= 0.7 => lerp(1.0, 1.3, (d - 0.7) / 0.15),
        d if d >= 0.3 => 1.0,
        d if d >= 0.15 => 0.85,
        _ => 0.7,
    }
}

/// Cost before voice and environment
fn base_cost(
    catalog: &SpellCatalog,
    caster: &Character,
    victim: Option<&Character>,
    rng: &mut GameRng,
    spell: SpellId,
    depth: u8,
) -> i32 {
    let Some(def) = catalog.get(spell) else {
        warn!(%spell, "mana cost of an unknown spell");
        return CYCLIC_COST_FALLBACK;
    };

    if let Some(pre) = def.discoverable_from {
        if depth >= MAX_PREREQUISITE_DEPTH {
            warn!(%spell, "prerequisite chain too deep, using fallback cost");
            return CYCLIC_COST_FALLBACK;
        }
        return base_cost(catalog, caster, victim, rng, pre, depth + 1);
    }

    let mut ctx = FormulaContext {
        caster,
        victim,
        level: caster.level as i32,
        skill: caster.skill(spell) as i32,
        rng,
    };

    if let Some(assignment) = def.assignment(caster.class) {
        return assignment
            .mana
            .eval_or(&mut ctx, MIN_CLASS_MANA)
            .max(MIN_CLASS_MANA);
    }

    if def.classes.is_empty() {
        return MIN_CLASS_MANA;
    }

    // Retained from another class: cheapest assignment plus half again
    let cheapest = def
        .classes
        .iter()
        .map(|a| a.mana.eval_or(&mut ctx, MIN_CLASS_MANA).max(MIN_CLASS_MANA))
        .min()
        .unwrap_or(MIN_CLASS_MANA);
    cheapest * 3 / 2
}

impl CombatWorld {
    /// Mana `caster` pays to cast `spell`, never less than 1
    pub fn mana_cost(
        &mut self,
        caster: CharId,
        victim: Option<CharId>,
        spell: SpellId,
        voice: Voice,
    ) -> i32 {
        let Some(ch) = self.chars.get(&caster) else {
            return CYCLIC_COST_FALLBACK;
        };
        let vict = victim.and_then(|v| self.chars.get(&v));
        let mut cost = base_cost(&self.catalog, ch, vict, &mut self.rng, spell, 0);

        cost = match voice {
            Voice::Normal => cost,
            Voice::Diminish => cost / 2,
            Voice::Amplify => cost.saturating_mul(2),
        };

        let density = ch.room.map_or(0.5, |r| self.rooms.magic_density(r));
        let scaled = (cost as f32 * density_cost_multiplier(density)).round() as i32;
        scaled.max(1)
    }
}

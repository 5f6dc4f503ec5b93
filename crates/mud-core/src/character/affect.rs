//! Affect ledger
//!
//! Timed, reversible modifiers attached to a character. Every affect records
//! the exact delta it applied so removal restores the attribute precisely.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use super::Character;
use crate::magic::SpellId;

bitflags! {
    /// Boolean capabilities granted by affects or innately
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AffectFlags: u64 {
        const BLIND = 1 << 0;
        const INVISIBLE = 1 << 1;
        const DETECT_ALIGN = 1 << 2;
        const DETECT_INVIS = 1 << 3;
        const DETECT_MAGIC = 1 << 4;
        const SENSE_LIFE = 1 << 5;
        const WATERWALK = 1 << 6;
        /// Halves incoming damage
        const SANCTUARY = 1 << 7;
        /// Member of its leader's adventuring group
        const GROUP = 1 << 8;
        const CURSE = 1 << 9;
        const INFRAVISION = 1 << 10;
        const POISON = 1 << 11;
        const PROTECT_EVIL = 1 << 12;
        const PROTECT_GOOD = 1 << 13;
        const SLEEP = 1 << 14;
        const SNEAK = 1 << 15;
        const HIDE = 1 << 16;
        const CHARM = 1 << 17;
        /// Stronger ward: turns aside a third of incoming damage
        const GLOBE = 1 << 18;
        /// Negates all incoming damage
        const DAMAGE_IMMUNE = 1 << 19;
        const FIRESHIELD = 1 << 20;
        const THORNSHIELD = 1 << 21;
        const WINDWALL = 1 << 22;
        const PARALYZE = 1 << 23;
    }
}

/// Attribute an affect modifies
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
pub enum ApplyLocation {
    /// Flag-only affect
    #[default]
    None,
    Str,
    Dex,
    Int,
    Wis,
    Con,
    Cha,
    MaxHit,
    MaxMana,
    MaxMove,
    Armor,
    Hitroll,
    Damroll,
    SaveParalysis,
    SaveRod,
    SavePetrification,
    SaveBreath,
    SaveSpell,
}

/// What happens when an affect from the same source is already present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
pub enum AccumPolicy {
    /// Add durations and modifiers to the existing affect
    Stack,
    /// Replace the existing affect, restarting its duration
    #[default]
    Refresh,
    /// Refuse while an affect from the same source is active
    Reject,
}

/// A single timed modifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affect {
    /// Spell or skill that created this affect
    pub spell: SpellId,
    /// Attribute modified
    pub location: ApplyLocation,
    /// Delta applied to `location`
    pub modifier: i32,
    /// Remaining game hours; negative means permanent
    pub duration: i32,
    /// Capabilities granted while active
    pub flags: AffectFlags,
}

impl Affect {
    pub fn new(spell: SpellId, location: ApplyLocation, modifier: i32, duration: i32) -> Self {
        Self {
            spell,
            location,
            modifier,
            duration,
            flags: AffectFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: AffectFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.duration < 0
    }
}

/// Result of [`Character::join_affect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    Added,
    Stacked,
    Refreshed,
    Rejected,
}

impl Character {
    /// Apply or reverse the attribute delta of one modifier
    pub(crate) fn affect_modify(&mut self, location: ApplyLocation, modifier: i32, add: bool) {
        let m = if add { modifier } else { -modifier };
        match location {
            ApplyLocation::None => {}
            ApplyLocation::Str => self.abilities.str += m,
            ApplyLocation::Dex => self.abilities.dex += m,
            ApplyLocation::Int => self.abilities.int += m,
            ApplyLocation::Wis => self.abilities.wis += m,
            ApplyLocation::Con => self.abilities.con += m,
            ApplyLocation::Cha => self.abilities.cha += m,
            ApplyLocation::MaxHit => self.max_hit += m,
            ApplyLocation::MaxMana => self.max_mana += m,
            ApplyLocation::MaxMove => self.max_moves += m,
            ApplyLocation::Armor => self.armor += m,
            ApplyLocation::Hitroll => self.hitroll += m,
            ApplyLocation::Damroll => self.damroll += m,
            ApplyLocation::SaveParalysis => self.saves[0] += m,
            ApplyLocation::SaveRod => self.saves[1] += m,
            ApplyLocation::SavePetrification => self.saves[2] += m,
            ApplyLocation::SaveBreath => self.saves[3] += m,
            ApplyLocation::SaveSpell => self.saves[4] += m,
        }
    }

    /// Rebuild the derived flag set from innate flags and active affects
    pub(crate) fn recompute_flags(&mut self) {
        self.aff_flags = self
            .affects
            .iter()
            .fold(self.innate, |acc, af| acc | af.flags);
    }

    /// Current vitals may not exceed maxima lowered by a removed affect
    fn clamp_vitals(&mut self) {
        if self.hit() > self.max_hit {
            self.set_hit(self.max_hit);
        }
        self.mana = self.mana.min(self.max_mana);
        self.moves = self.moves.min(self.max_moves);
    }

    /// Attach an affect and apply its delta
    pub fn add_affect(&mut self, af: Affect) {
        self.affect_modify(af.location, af.modifier, true);
        self.affects.push(af);
        self.recompute_flags();
    }

    /// Remove the affect at `index`, reversing its delta
    pub fn remove_affect_at(&mut self, index: usize) -> Option<Affect> {
        if index >= self.affects.len() {
            return None;
        }
        let af = self.affects.remove(index);
        self.affect_modify(af.location, af.modifier, false);
        self.recompute_flags();
        self.clamp_vitals();
        Some(af)
    }

    /// Remove every affect created by `spell`; returns how many were removed
    pub fn remove_affects_from(&mut self, spell: SpellId) -> usize {
        let mut removed = 0;
        while let Some(idx) = self.affects.iter().position(|af| af.spell == spell) {
            self.remove_affect_at(idx);
            removed += 1;
        }
        removed
    }

    /// Strip every affect, reversing all deltas
    pub fn clear_affects(&mut self) {
        while !self.affects.is_empty() {
            self.remove_affect_at(self.affects.len() - 1);
        }
    }

    pub fn affected_by_spell(&self, spell: SpellId) -> bool {
        self.affects.iter().any(|af| af.spell == spell)
    }

    /// Attach `af` honouring an accumulation policy
    pub fn join_affect(&mut self, mut af: Affect, policy: AccumPolicy) -> JoinResult {
        let existing = self
            .affects
            .iter()
            .position(|old| old.spell == af.spell && old.location == af.location);

        match (policy, existing) {
            (AccumPolicy::Reject, _) if self.affected_by_spell(af.spell) => JoinResult::Rejected,
            (AccumPolicy::Stack, Some(idx)) => {
                if let Some(old) = self.remove_affect_at(idx) {
                    if !af.is_permanent() && !old.is_permanent() {
                        af.duration += old.duration;
                    }
                    af.modifier += old.modifier;
                    af.flags |= old.flags;
                }
                self.add_affect(af);
                JoinResult::Stacked
            }
            (AccumPolicy::Refresh, Some(idx)) => {
                self.remove_affect_at(idx);
                self.add_affect(af);
                JoinResult::Refreshed
            }
            _ => {
                self.add_affect(af);
                JoinResult::Added
            }
        }
    }

    /// Age affects by one game hour
    ///
    /// Returns the spells whose last affect expired, in expiry order, so the
    /// caller can send wear-off messages once per spell.
    pub fn decay_affects(&mut self) -> Vec<SpellId> {
        let mut worn_off = Vec::new();
        let mut idx = 0;
        while idx < self.affects.len() {
            let af = &mut self.affects[idx];
            if af.duration > 0 {
                af.duration -= 1;
                idx += 1;
            } else if af.duration == 0 {
                if let Some(expired) = self.remove_affect_at(idx) {
                    if !self.affected_by_spell(expired.spell) && !worn_off.contains(&expired.spell) {
                        worn_off.push(expired.spell);
                    }
                }
            } else {
                idx += 1;
            }
        }
        worn_off
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharId;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    fn ch() -> Character {
        Character::player(CharId(1), "Tester", Default::default(), 10)
    }

    const ARMOR_SPELL: SpellId = SpellId(1);
    const BLESS_SPELL: SpellId = SpellId(2);

    #[test]
    fn test_add_and_remove_restores_attribute() {
        let mut c = ch();
        let before = c.armor;
        c.add_affect(Affect::new(ARMOR_SPELL, ApplyLocation::Armor, -20, 24));
        assert_eq!(c.armor, before - 20);
        assert_eq!(c.remove_affects_from(ARMOR_SPELL), 1);
        assert_eq!(c.armor, before);
    }

    #[test]
    fn test_flags_follow_affects() {
        let mut c = ch();
        c.add_affect(
            Affect::new(SpellId(9), ApplyLocation::None, 0, 3).with_flags(AffectFlags::SANCTUARY),
        );
        assert!(c.is_affected(AffectFlags::SANCTUARY));
        c.clear_affects();
        assert!(!c.is_affected(AffectFlags::SANCTUARY));
    }

    #[test]
    fn test_innate_flags_survive_clear() {
        let mut c = ch();
        c.innate = AffectFlags::INFRAVISION;
        c.recompute_flags();
        c.add_affect(Affect::new(SpellId(3), ApplyLocation::None, 0, 1).with_flags(AffectFlags::BLIND));
        c.clear_affects();
        assert!(c.is_affected(AffectFlags::INFRAVISION));
        assert!(!c.is_affected(AffectFlags::BLIND));
    }

    #[test]
    fn test_join_policies() {
        let mut c = ch();
        let af = Affect::new(BLESS_SPELL, ApplyLocation::Hitroll, 2, 6);
        assert_eq!(c.join_affect(af.clone(), AccumPolicy::Refresh), JoinResult::Added);
        assert_eq!(c.join_affect(af.clone(), AccumPolicy::Reject), JoinResult::Rejected);
        assert_eq!(c.hitroll, 2);

        assert_eq!(c.join_affect(af.clone(), AccumPolicy::Stack), JoinResult::Stacked);
        assert_eq!(c.hitroll, 4);
        assert_eq!(c.affects.len(), 1);
        assert_eq!(c.affects[0].duration, 12);

        assert_eq!(c.join_affect(af, AccumPolicy::Refresh), JoinResult::Refreshed);
        assert_eq!(c.hitroll, 2);
        assert_eq!(c.affects[0].duration, 6);
    }

    #[test]
    fn test_decay_reports_wear_off_once() {
        let mut c = ch();
        c.add_affect(Affect::new(BLESS_SPELL, ApplyLocation::Hitroll, 1, 0));
        c.add_affect(Affect::new(BLESS_SPELL, ApplyLocation::SaveSpell, -1, 0));
        c.add_affect(Affect::new(ARMOR_SPELL, ApplyLocation::Armor, -10, 2));
        c.add_affect(Affect::new(SpellId(5), ApplyLocation::Str, 1, -1));

        let worn = c.decay_affects();
        assert_eq!(worn, vec![BLESS_SPELL]);
        assert_eq!(c.hitroll, 0);
        assert_eq!(c.saves[4], 0);
        assert_eq!(c.affects.len(), 2);
        assert_eq!(c.affects[0].duration, 1);

        c.decay_affects();
        assert_eq!(c.decay_affects(), vec![ARMOR_SPELL]);
        // permanent affects never decay
        assert_eq!(c.affects.len(), 1);
        assert!(c.affects[0].is_permanent());
    }

    #[test]
    fn test_lowering_max_hit_clamps_current() {
        let mut c = ch();
        c.add_affect(Affect::new(SpellId(4), ApplyLocation::MaxHit, 50, 5));
        let max = c.max_hit;
        c.set_hit(max);
        c.remove_affects_from(SpellId(4));
        assert_eq!(c.hit(), c.max_hit);
    }

    proptest! {
        #[test]
        fn prop_apply_then_remove_is_identity(loc_idx in 0usize..18, modifier in -50i32..50, dur in -1i32..48) {
            let location = ApplyLocation::iter().nth(loc_idx).unwrap();
            let mut c = ch();
            let snapshot = (c.abilities, c.max_hit, c.max_mana, c.max_moves, c.armor, c.hitroll, c.damroll, c.saves);
            c.add_affect(Affect::new(SpellId(11), location, modifier, dur));
            c.remove_affects_from(SpellId(11));
            let after = (c.abilities, c.max_hit, c.max_mana, c.max_moves, c.armor, c.hitroll, c.damroll, c.saves);
            prop_assert_eq!(snapshot, after);
        }
    }
}

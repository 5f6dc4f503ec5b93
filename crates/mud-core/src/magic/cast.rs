//! Spell resolution
//!
//! [`CombatWorld::call_magic`] is the single entry point for every way a
//! spell takes effect: cast by a character, quaffed, zapped or recited.

use tracing::{debug, warn};

use super::effects::Cast;
use super::{CastStyle, EffectFlags, SpellDef, SpellId, SpellOutcome};
use crate::character::CharId;
use crate::object::ObjectId;
use crate::world::{Audience, CombatWorld, TriggerScope};

impl CombatWorld {
    /// Run the script triggers that may veto a cast
    fn cast_triggers_allow(
        &mut self,
        caster: CharId,
        spell: SpellId,
        victim: Option<CharId>,
        obj: Option<ObjectId>,
    ) -> bool {
        if !self.scripts.before_cast(TriggerScope::World, caster, spell, victim, obj) {
            return false;
        }
        if obj.is_some() && !self.scripts.before_cast(TriggerScope::Object, caster, spell, victim, obj) {
            return false;
        }
        let victim_is_npc = victim.and_then(|v| self.char(v)).is_some_and(|v| v.is_npc());
        if victim_is_npc && !self.scripts.before_cast(TriggerScope::Mob, caster, spell, victim, obj) {
            return false;
        }
        true
    }

    /// Server-side checks; on refusal the caster has already been told why
    fn cast_permitted(&mut self, cast: &Cast, def: &SpellDef, victim: Option<CharId>) -> Option<SpellOutcome> {
        if !def.enabled {
            self.send(cast.caster, "This spell has been disabled.");
            return Some(SpellOutcome::NoEffect);
        }
        let room = self.char(cast.caster).and_then(|c| c.room)?;
        if self.rooms.no_magic(room) {
            self.send(cast.caster, "Your magic fizzles out and dies.");
            self.act("$n's magic fizzles out and dies.", cast.caster, None, None, Audience::Room);
            return Some(SpellOutcome::NoEffect);
        }
        if def.violent && self.rooms.is_peaceful(room) {
            self.send(
                cast.caster,
                "A flash of white light fills the room, dispelling your violent magic!",
            );
            self.act(
                "White light from no particular source suddenly fills the room, then vanishes.",
                cast.caster,
                None,
                None,
                Audience::Room,
            );
            return Some(SpellOutcome::NoEffect);
        }
        if let Some(v) = victim {
            let resist = self
                .char(v)
                .and_then(|c| c.spell_resists.get(&def.id).copied())
                .unwrap_or(0);
            if resist > 0 && self.rng.percent(resist as i32) {
                self.act("$N resists your spell.", cast.caster, None, Some(v), Audience::Actor);
                self.act("You resist $n's spell.", cast.caster, None, Some(v), Audience::Victim);
                return Some(SpellOutcome::Failed);
            }
        }
        None
    }

    /// Apply the per-target families to one recipient; `true` if it died
    fn apply_to_recipient(
        &mut self,
        cast: &Cast,
        def: &SpellDef,
        target: CharId,
        outcomes: &mut Vec<SpellOutcome>,
    ) -> bool {
        if def.has_effect(EffectFlags::DAMAGE) {
            let (outcome, died) = self.mag_damage(cast, def, target);
            outcomes.push(outcome);
            if died {
                return true;
            }
        }
        if def.has_effect(EffectFlags::AFFECTS) {
            outcomes.push(self.mag_affects(cast, def, target));
        }
        if def.has_effect(EffectFlags::UNAFFECTS) {
            outcomes.push(self.mag_unaffects(def, target));
        }
        if def.has_effect(EffectFlags::POINTS) {
            outcomes.push(self.mag_points(cast, def, target));
        }
        false
    }

    /// Resolve a spell against its already chosen target
    ///
    /// Mana and action delay are the caller's business; this only decides
    /// what happens.
    pub fn call_magic(
        &mut self,
        caster: CharId,
        victim: Option<CharId>,
        obj: Option<ObjectId>,
        spell: SpellId,
        level: u8,
        style: CastStyle,
    ) -> SpellOutcome {
        let Some(def) = self.catalog.get(spell).cloned() else {
            warn!(%caster, %spell, "call_magic on an unknown spell");
            return SpellOutcome::NoEffect;
        };
        if self.char(caster).is_none() {
            return SpellOutcome::NoEffect;
        }
        if !self.cast_triggers_allow(caster, spell, victim, obj) {
            debug!(%caster, %spell, "cast vetoed by script");
            return SpellOutcome::NoEffect;
        }

        let cast = Cast { caster, spell, level, style };
        if let Some(refused) = self.cast_permitted(&cast, &def, victim) {
            return refused;
        }

        let mut outcomes = Vec::new();
        let mut affected = Vec::new();
        let mut victim_died = false;

        if def.has_effect(EffectFlags::PER_TARGET) {
            if def.has_effect(EffectFlags::MULTI_TARGET) {
                for target in self.spell_recipients(caster, &def) {
                    if self.char(target).is_none() {
                        continue;
                    }
                    let before = outcomes.len();
                    self.apply_to_recipient(&cast, &def, target, &mut outcomes);
                    if outcomes[before..].contains(&SpellOutcome::Success) {
                        affected.push(target);
                    }
                    if self.char(caster).is_none_or(|c| c.room.is_none()) {
                        break;
                    }
                }
            } else if let Some(target) = victim {
                victim_died = self.apply_to_recipient(&cast, &def, target, &mut outcomes);
                if outcomes.contains(&SpellOutcome::Success) {
                    affected.push(target);
                }
            }
        }

        if !victim_died {
            if def.has_effect(EffectFlags::ALTER_OBJS) {
                outcomes.push(self.mag_alter_objs(&def, obj));
            }
            if def.has_effect(EffectFlags::SUMMONS) {
                outcomes.push(self.mag_summons(&cast, &def));
            }
            if def.has_effect(EffectFlags::CREATIONS) {
                outcomes.push(self.mag_creations(&cast, &def));
            }
            if def.has_effect(EffectFlags::ROOMS) {
                outcomes.push(self.mag_rooms(&cast, &def));
            }
            if def.has_effect(EffectFlags::MANUAL) {
                outcomes.push(self.mag_manual(&cast, victim, obj));
            }
        }

        let outcome = SpellOutcome::aggregate(outcomes);
        debug!(%caster, %spell, ?outcome, "spell resolved");
        match outcome {
            SpellOutcome::Success => {
                self.spell_success_messages(&cast, &def, victim, obj, &affected);
                if !def.has_effect(EffectFlags::DAMAGE) {
                    self.award_spell_exp(caster, victim, obj);
                }
            }
            SpellOutcome::Failed => self.send(caster, "Your spell fails."),
            SpellOutcome::NoEffect => self.send(caster, "Nothing seems to happen."),
        }
        outcome
    }

    fn spell_success_messages(
        &mut self,
        cast: &Cast,
        def: &SpellDef,
        victim: Option<CharId>,
        obj: Option<ObjectId>,
        affected: &[CharId],
    ) {
        let messages = &def.messages;
        let caster = cast.caster;
        if let Some(line) = &messages.to_self {
            self.act(line, caster, obj, victim, Audience::Actor);
        }
        if let Some(line) = &messages.to_victim {
            for &target in affected {
                let audience = if target == caster { Audience::Actor } else { Audience::Victim };
                if target == caster && messages.to_self.is_some() {
                    continue;
                }
                self.act(line, caster, obj, Some(target), audience);
            }
        }
        if let Some(line) = &messages.to_room {
            self.act(line, caster, obj, victim, Audience::RoomButVictim);
        }
    }

    /// Small reward for helping or hindering someone else with magic
    fn award_spell_exp(&mut self, caster: CharId, victim: Option<CharId>, obj: Option<ObjectId>) {
        let Some(caster_level) = self.char(caster).map(|c| c.level) else {
            return;
        };
        let other_level = match (victim, obj) {
            (Some(v), _) if v != caster => self.char(v).map(|c| c.level),
            (_, Some(o)) => self.object(o).map(|o| o.level),
            _ => None,
        };
        if let Some(level) = other_level {
            let exp = self.config.spell_exp_per_level * caster_level.min(level) as i64;
            self.gain_exp(caster, exp);
        }
    }
}

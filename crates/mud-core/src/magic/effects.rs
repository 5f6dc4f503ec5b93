//! Effect families
//!
//! One function per family. Per-target families (damage, affects,
//! unaffects, points) act on a single recipient; the others run once per
//! cast. Each returns a [`SpellOutcome`] that the dispatcher aggregates.

use tracing::{debug, error, warn};

use super::{
    CastStyle, Formula, FormulaContext, SpellDef, SpellId, SpellOutcome, density_power_multiplier,
    saving_throw,
};
use crate::character::{Affect, AffectFlags, CharId, JoinResult, NpcFlags, Position};
use crate::combat::{DamageCause, DamageResult};
use crate::object::ObjectId;
use crate::world::{Audience, CombatWorld, RoomAffect, RoomFlags, RoomId};

/// Who is casting what, at which power
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cast {
    pub caster: CharId,
    pub spell: SpellId,
    pub level: u8,
    pub style: CastStyle,
}

impl CombatWorld {
    /// Evaluate a catalog formula for a cast, falling back to `default`
    pub(crate) fn eval_formula(
        &mut self,
        formula: &Formula,
        cast: &Cast,
        victim: Option<CharId>,
        default: i32,
    ) -> i32 {
        let Some(caster) = self.chars.get(&cast.caster) else {
            return default;
        };
        let victim = victim.and_then(|v| self.chars.get(&v));
        let mut ctx = FormulaContext {
            caster,
            victim,
            level: cast.level as i32,
            skill: caster.skill(cast.spell) as i32,
            rng: &mut self.rng,
        };
        formula.eval_or(&mut ctx, default)
    }

    /// Recipients of the per-target families of a multi-target spell
    pub(crate) fn spell_recipients(&self, caster: CharId, def: &SpellDef) -> Vec<CharId> {
        let Some(room) = self.char(caster).and_then(|c| c.room) else {
            return Vec::new();
        };

        if def.has_effect(super::EffectFlags::GROUPS) {
            let grouped = self.char(caster).is_some_and(|c| c.is_affected(AffectFlags::GROUP));
            return if grouped {
                self.group_members_in(caster, room)
            } else {
                vec![caster]
            };
        }

        let mut rooms = vec![room];
        if def.has_effect(super::EffectFlags::AREAS) {
            rooms.extend(self.rooms.adjacent(room));
        }
        rooms
            .into_iter()
            .flat_map(|r| self.chars_in_room(r))
            .filter(|&id| self.mass_target_allowed(caster, id, def.violent))
            .collect()
    }

    fn mass_target_allowed(&self, caster: CharId, target: CharId, violent: bool) -> bool {
        if target == caster {
            return false;
        }
        if !violent {
            return true;
        }
        let (Some(c), Some(t)) = (self.char(caster), self.char(target)) else {
            return false;
        };
        if t.is_immortal() || self.same_group(caster, target) {
            return false;
        }
        if c.is_npc() && t.is_npc() && !t.is_affected(AffectFlags::CHARM) {
            return false;
        }
        if !c.is_npc() && !t.is_npc() && !self.config.pk_allowed {
            return false;
        }
        true
    }

    /// DAMAGE: returns the outcome and whether the victim died
    pub(crate) fn mag_damage(
        &mut self,
        cast: &Cast,
        def: &SpellDef,
        victim: CharId,
    ) -> (SpellOutcome, bool) {
        let Some(formula) = def.damage.as_ref() else {
            warn!(spell = %def.id, "damage spell without a damage formula");
            return (SpellOutcome::NoEffect, false);
        };
        let raw = self.eval_formula(formula, cast, Some(victim), 0);

        let density = self
            .char(cast.caster)
            .and_then(|c| c.room)
            .map_or(0.5, |r| self.rooms.magic_density(r));
        let mut dam = (raw as f32 * density_power_multiplier(density)).round() as i32;

        let saved = match self.chars.get(&victim) {
            Some(v) => saving_throw(v, cast.style.save_kind(), 0, &mut self.rng),
            None => return (SpellOutcome::NoEffect, false),
        };
        if saved {
            dam /= 2;
        }
        debug!(caster = %cast.caster, %victim, spell = %def.id, raw, dam, saved, "spell damage");

        match self.damage(cast.caster, victim, dam, DamageCause::Spell(def.id)) {
            DamageResult::Killed => (SpellOutcome::Success, true),
            DamageResult::Dealt(d) if d > 0 => (SpellOutcome::Success, false),
            DamageResult::Dealt(_) => (SpellOutcome::Failed, false),
        }
    }

    /// AFFECTS: attach every affect template
    pub(crate) fn mag_affects(&mut self, cast: &Cast, def: &SpellDef, victim: CharId) -> SpellOutcome {
        if def.affects.is_empty() {
            return SpellOutcome::NoEffect;
        }
        let Some(v) = self.chars.get(&victim) else {
            return SpellOutcome::NoEffect;
        };

        if def.violent
            && victim != cast.caster
            && saving_throw(v, cast.style.save_kind(), 0, &mut self.rng)
        {
            return SpellOutcome::Failed;
        }

        let wanted = def.affects.iter().fold(AffectFlags::empty(), |acc, t| acc | t.flags);
        if let Some(v) = self.chars.get(&victim) {
            if wanted.contains(AffectFlags::SLEEP)
                && (v.is_immortal() || v.npc_flagged(NpcFlags::NO_SLEEP))
            {
                return SpellOutcome::Failed;
            }
            if wanted.contains(AffectFlags::CHARM)
                && (v.is_immortal() || v.npc_flagged(NpcFlags::NO_CHARM) || !v.is_npc())
            {
                return SpellOutcome::Failed;
            }
        }

        let mut applied = false;
        for template in &def.affects {
            let modifier = self.eval_formula(&template.modifier, cast, Some(victim), 0);
            let duration = self.eval_formula(&template.duration, cast, Some(victim), 1);
            let af = Affect::new(def.id, template.location, modifier, duration.max(-1))
                .with_flags(template.flags);
            let Some(v) = self.chars.get_mut(&victim) else {
                return SpellOutcome::NoEffect;
            };
            if v.join_affect(af, template.policy) != JoinResult::Rejected {
                applied = true;
            }
        }
        if !applied {
            return SpellOutcome::NoEffect;
        }

        if wanted.contains(AffectFlags::CHARM) {
            self.stop_fighting(victim);
            self.add_follower(victim, cast.caster);
        }
        if wanted.contains(AffectFlags::SLEEP) {
            let awake = self.char(victim).is_some_and(|v| v.position > Position::Sleeping);
            if awake {
                self.act("You feel very sleepy...  Zzzz......", victim, None, None, Audience::Actor);
                self.act("$n goes to sleep.", victim, None, None, Audience::Room);
                self.stop_fighting(victim);
                if let Some(v) = self.chars.get_mut(&victim) {
                    v.position = Position::Sleeping;
                }
            }
        }
        SpellOutcome::Success
    }

    /// UNAFFECTS: strip every dispelled spell
    pub(crate) fn mag_unaffects(&mut self, def: &SpellDef, victim: CharId) -> SpellOutcome {
        let mut removed = false;
        for &spell in &def.dispels {
            let count = self
                .chars
                .get_mut(&victim)
                .map_or(0, |v| v.remove_affects_from(spell));
            if count == 0 {
                continue;
            }
            removed = true;
            let wear_off = self.catalog.get(spell).and_then(|d| d.messages.wear_off.clone());
            if let Some(msg) = wear_off {
                self.send(victim, &msg);
            }
        }
        if removed {
            self.notify_hit_percent(victim);
            SpellOutcome::Success
        } else {
            SpellOutcome::NoEffect
        }
    }

    /// POINTS: restore hit points, mana and movement
    pub(crate) fn mag_points(&mut self, cast: &Cast, def: &SpellDef, victim: CharId) -> SpellOutcome {
        let hit = def.points.hit.as_ref().map(|f| self.eval_formula(f, cast, Some(victim), 0));
        let mana = def.points.mana.as_ref().map(|f| self.eval_formula(f, cast, Some(victim), 0));
        let moves = def.points.moves.as_ref().map(|f| self.eval_formula(f, cast, Some(victim), 0));
        if hit.is_none() && mana.is_none() && moves.is_none() {
            return SpellOutcome::NoEffect;
        }

        let Some(v) = self.chars.get_mut(&victim) else {
            return SpellOutcome::NoEffect;
        };
        if let Some(h) = hit {
            v.alter_hit(h);
        }
        if let Some(m) = mana {
            v.mana = (v.mana + m).min(v.max_mana);
        }
        if let Some(m) = moves {
            v.moves = (v.moves + m).min(v.max_moves);
        }
        if hit.is_some() {
            self.notify_hit_percent(victim);
        }
        SpellOutcome::Success
    }

    /// ALTER_OBJS: set and clear extra flags on the target object
    pub(crate) fn mag_alter_objs(&mut self, def: &SpellDef, obj: Option<ObjectId>) -> SpellOutcome {
        let (Some(spec), Some(obj)) = (def.alter.as_ref(), obj) else {
            return SpellOutcome::NoEffect;
        };
        let Some(o) = self.objects.get_mut(&obj) else {
            return SpellOutcome::NoEffect;
        };
        let before = o.flags;
        o.flags.insert(spec.set);
        o.flags.remove(spec.clear);
        if o.flags == before {
            SpellOutcome::NoEffect
        } else {
            SpellOutcome::Success
        }
    }

    /// SUMMONS: bring NPCs into the caster's room
    pub(crate) fn mag_summons(&mut self, cast: &Cast, def: &SpellDef) -> SpellOutcome {
        let Some(spec) = def.summon.as_ref() else {
            return SpellOutcome::NoEffect;
        };
        let Some(room) = self.char(cast.caster).and_then(|c| c.room) else {
            return SpellOutcome::NoEffect;
        };

        if let Some(catalyst) = spec.catalyst {
            let found = self.char(cast.caster).and_then(|c| {
                c.inventory
                    .iter()
                    .copied()
                    .find(|&o| self.object(o).is_some_and(|obj| obj.vnum == Some(catalyst)))
            });
            match found {
                Some(obj) => {
                    self.act("$p dissolves into thin air.", cast.caster, Some(obj), None, Audience::Actor);
                    self.extract_object(obj);
                }
                None => {
                    self.send(cast.caster, "You do not have the required component.");
                    return SpellOutcome::Failed;
                }
            }
        }

        let chance = match spec.success.as_ref() {
            Some(f) => self.eval_formula(f, cast, None, 100),
            None => 100,
        };
        if !self.rng.percent(chance) {
            return SpellOutcome::Failed;
        }

        let count = self.eval_formula(&spec.count, cast, None, 1).max(1);
        let mut summoned = 0;
        for _ in 0..count {
            let mob = match self.spawn_mob(spec.vnum, room) {
                Ok(mob) => mob,
                Err(err) => {
                    error!(spell = %def.id, %err, "summon prototype missing");
                    break;
                }
            };
            summoned += 1;
            self.act("$n appears in a cloud of smoke.", mob, None, None, Audience::Room);
            if spec.charm {
                self.add_follower(mob, cast.caster);
                if let Some(m) = self.chars.get_mut(&mob) {
                    m.innate |= AffectFlags::CHARM;
                    m.recompute_flags();
                }
            }
        }
        if summoned > 0 {
            SpellOutcome::Success
        } else {
            SpellOutcome::NoEffect
        }
    }

    /// CREATIONS: conjure an object into the caster's inventory
    pub(crate) fn mag_creations(&mut self, cast: &Cast, def: &SpellDef) -> SpellOutcome {
        let Some(spec) = def.create.as_ref() else {
            return SpellOutcome::NoEffect;
        };
        let obj = match self.create_object_from(spec.vnum) {
            Ok(obj) => obj,
            Err(err) => {
                error!(spell = %def.id, %err, "creation prototype missing");
                self.send(cast.caster, "I seem to have goofed.");
                return SpellOutcome::NoEffect;
            }
        };
        self.obj_to_char(obj, cast.caster);
        self.act("$n creates $p.", cast.caster, Some(obj), None, Audience::Room);
        self.act("You create $p.", cast.caster, Some(obj), None, Audience::Actor);
        SpellOutcome::Success
    }

    /// ROOMS: attach a timed flag set to the caster's room
    pub(crate) fn mag_rooms(&mut self, cast: &Cast, def: &SpellDef) -> SpellOutcome {
        let Some(spec) = def.room.as_ref() else {
            return SpellOutcome::NoEffect;
        };
        let Some(room_id) = self.char(cast.caster).and_then(|c| c.room) else {
            return SpellOutcome::NoEffect;
        };
        let duration = self.eval_formula(&spec.duration, cast, None, 1).max(1);
        self.add_room_affect(room_id, def.id, spec.flags, duration)
    }

    fn add_room_affect(
        &mut self,
        room_id: RoomId,
        spell: SpellId,
        flags: RoomFlags,
        duration: i32,
    ) -> SpellOutcome {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return SpellOutcome::NoEffect;
        };
        match room.affects.iter_mut().find(|ra| ra.spell == spell) {
            Some(existing) => {
                existing.flags = flags;
                existing.duration = duration;
            }
            None => room.affects.push(RoomAffect { spell, flags, duration }),
        }
        SpellOutcome::Success
    }

    /// MANUAL: hand the cast to its registered routine
    pub(crate) fn mag_manual(
        &mut self,
        cast: &Cast,
        victim: Option<CharId>,
        obj: Option<ObjectId>,
    ) -> SpellOutcome {
        match self.manual_spell(cast.spell) {
            Some(handler) => handler.cast(self, cast.caster, victim, obj, cast.level),
            None => {
                warn!(spell = %cast.spell, "manual spell has no registered routine");
                SpellOutcome::NoEffect
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{AccumPolicy, ApplyLocation, Character, Class};
    use crate::magic::{AffectTemplate, AlterSpec, EffectFlags, SpellCatalog, SummonSpec};
    use crate::object::{Object, ObjectFlags, ObjectKind};
    use crate::world::{MessageLog, Room};

    fn world(defs: Vec<SpellDef>) -> (CombatWorld, MessageLog, CharId, CharId) {
        let log = MessageLog::new();
        let catalog = SpellCatalog::from_defs(defs).unwrap();
        let mut w = CombatWorld::with_parts(Default::default(), catalog, 11);
        w.set_messenger(Box::new(log.clone()));
        w.rooms.insert(Room::new(RoomId(1), "Tower"));
        let mage = w.spawn(Character::player(CharId(0), "Mira", Class::MagicUser, 20), RoomId(1));
        let orc = w.spawn(Character::npc(CharId(0), "orc", "an orc", 5).with_hit(50, 50), RoomId(1));
        (w, log, mage, orc)
    }

    fn cast(caster: CharId, spell: u16) -> Cast {
        Cast { caster, spell: SpellId(spell), level: 20, style: CastStyle::Spell }
    }

    #[test]
    fn test_points_caps_at_maximum() {
        let mut heal = SpellDef::new(SpellId(1), "heal");
        heal.points.hit = Some(Formula::constant(100));
        let (mut w, _, mage, orc) = world(vec![heal.clone()]);
        if let Some(o) = w.char_mut(orc) {
            o.set_hit(10);
        }
        assert_eq!(w.mag_points(&cast(mage, 1), &heal, orc), SpellOutcome::Success);
        assert_eq!(w.char(orc).map(Character::hit), Some(50));
    }

    #[test]
    fn test_affects_respect_reject_policy() {
        let mut armor = SpellDef::new(SpellId(2), "armor");
        armor.affects.push(AffectTemplate {
            location: ApplyLocation::Armor,
            modifier: Formula::constant(-20),
            duration: Formula::constant(24),
            flags: AffectFlags::empty(),
            policy: AccumPolicy::Reject,
        });
        let (mut w, _, mage, _) = world(vec![armor.clone()]);
        let before = w.char(mage).map(|c| c.armor);
        assert_eq!(w.mag_affects(&cast(mage, 2), &armor, mage), SpellOutcome::Success);
        assert_eq!(w.char(mage).map(|c| c.armor), before.map(|a| a - 20));
        assert_eq!(w.mag_affects(&cast(mage, 2), &armor, mage), SpellOutcome::NoEffect);
        assert_eq!(w.char(mage).map(|c| c.armor), before.map(|a| a - 20));
    }

    #[test]
    fn test_sleep_refused_by_no_sleep_npc() {
        let mut sleep = SpellDef::new(SpellId(3), "sleep");
        sleep.affects.push(AffectTemplate {
            location: ApplyLocation::None,
            modifier: Formula::constant(0),
            duration: Formula::constant(4),
            flags: AffectFlags::SLEEP,
            policy: AccumPolicy::Refresh,
        });
        let (mut w, _, mage, orc) = world(vec![sleep.clone()]);
        if let Some(npc) = w.char_mut(orc).and_then(Character::npc_data_mut) {
            npc.flags |= NpcFlags::NO_SLEEP;
        }
        assert_eq!(w.mag_affects(&cast(mage, 3), &sleep, orc), SpellOutcome::Failed);

        if let Some(npc) = w.char_mut(orc).and_then(Character::npc_data_mut) {
            npc.flags = NpcFlags::empty();
        }
        assert_eq!(w.mag_affects(&cast(mage, 3), &sleep, mage), SpellOutcome::Success);
        assert_eq!(w.char(mage).map(|c| c.position), Some(Position::Sleeping));
    }

    #[test]
    fn test_unaffects_sends_wear_off() {
        let mut bless = SpellDef::new(SpellId(4), "bless");
        bless.messages.wear_off = Some("You feel less righteous.".into());
        let mut dispel = SpellDef::new(SpellId(5), "dispel");
        dispel.dispels = vec![SpellId(4)];
        let (mut w, log, mage, _) = world(vec![bless, dispel.clone()]);
        if let Some(m) = w.char_mut(mage) {
            m.add_affect(Affect::new(SpellId(4), ApplyLocation::Hitroll, 2, 6));
        }
        assert_eq!(w.mag_unaffects(&dispel, mage), SpellOutcome::Success);
        assert!(log.saw(mage, "less righteous"));
        assert_eq!(w.mag_unaffects(&dispel, mage), SpellOutcome::NoEffect);
    }

    #[test]
    fn test_alter_objs() {
        let mut bless = SpellDef::new(SpellId(6), "bless item");
        bless.alter = Some(AlterSpec { set: ObjectFlags::BLESS, clear: ObjectFlags::NODROP });
        let (mut w, _, _, _) = world(vec![bless.clone()]);
        let mut sword = Object::new(ObjectId(0), "sword", "a sword", ObjectKind::Other);
        sword.flags = ObjectFlags::NODROP;
        let sword = w.create_object(sword);
        assert_eq!(w.mag_alter_objs(&bless, Some(sword)), SpellOutcome::Success);
        assert_eq!(w.object(sword).map(|o| o.flags), Some(ObjectFlags::BLESS));
        assert_eq!(w.mag_alter_objs(&bless, Some(sword)), SpellOutcome::NoEffect);
        assert_eq!(w.mag_alter_objs(&bless, None), SpellOutcome::NoEffect);
    }

    #[test]
    fn test_summon_needs_catalyst() {
        let mut animate = SpellDef::new(SpellId(7), "animate");
        animate.effects = EffectFlags::SUMMONS;
        animate.summon = Some(SummonSpec {
            vnum: 300,
            catalyst: Some(50),
            success: None,
            count: Formula::constant(2),
            charm: true,
        });
        let (mut w, log, mage, _) = world(vec![animate.clone()]);
        w.add_mob_prototype(300, Character::npc(CharId(0), "zombie", "a zombie", 3));
        assert_eq!(w.mag_summons(&cast(mage, 7), &animate), SpellOutcome::Failed);
        assert!(log.saw(mage, "required component"));

        w.add_object_prototype(50, Object::new(ObjectId(0), "bone", "a bone", ObjectKind::Other));
        let bone = w.create_object_from(50).unwrap();
        w.obj_to_char(bone, mage);
        assert_eq!(w.mag_summons(&cast(mage, 7), &animate), SpellOutcome::Success);
        assert!(w.object(bone).is_none());
        let zombies = w.characters().filter(|c| c.is_named("zombie")).count();
        assert_eq!(zombies, 2);
        assert_eq!(w.char(mage).map(|c| c.followers.len()), Some(2));
    }

    #[test]
    fn test_room_affect_refreshes() {
        let mut fog = SpellDef::new(SpellId(8), "fog");
        fog.room = Some(crate::magic::RoomSpec { flags: RoomFlags::FOG, duration: Formula::constant(3) });
        let (mut w, _, mage, _) = world(vec![fog.clone()]);
        assert_eq!(w.mag_rooms(&cast(mage, 8), &fog), SpellOutcome::Success);
        assert_eq!(w.mag_rooms(&cast(mage, 8), &fog), SpellOutcome::Success);
        let room = w.rooms.get(RoomId(1)).unwrap();
        assert_eq!(room.affects.len(), 1);
        assert!(room.flags().contains(RoomFlags::FOG));
    }

    #[test]
    fn test_violent_mass_skips_group_and_other_players() {
        let mut quake = SpellDef::new(SpellId(9), "earthquake");
        quake.violent = true;
        quake.effects = EffectFlags::DAMAGE | EffectFlags::MASSES;
        let (mut w, _, mage, orc) = world(vec![quake.clone()]);
        let ally = w.spawn(Character::player(CharId(0), "Bryn", Class::Cleric, 5), RoomId(1));
        assert_eq!(w.spell_recipients(mage, &quake), vec![orc]);
        w.config.pk_allowed = true;
        assert_eq!(w.spell_recipients(mage, &quake), vec![orc, ally]);
    }
}

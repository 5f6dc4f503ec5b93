//! Melee attacks
//!
//! One swing: roll to hit against armor, roll damage, hand it to the
//! damage pipeline, then apply weapon poison and reflective auras.

use tracing::debug;

use super::{AttackKind, AuraKind, CombatResult, DamageCause, DamageResult};
use crate::character::{Affect, AffectFlags, ApplyLocation, CharId, Character, Position, backstab_multiplier};
use crate::consts::MIN_ARMOR;
use crate::magic::{SaveKind, SpellId, saving_throw};
use crate::object::{ObjectKind, PoisonCharge, WeaponStats, WearSlot};
use crate::world::{Audience, CombatWorld};

/// Attacker's to-hit number; lower hits more often
///
/// Based on the class table for players and a flat 20 for NPCs.
pub fn calculate_thac0(ch: &Character, victim: &Character, weapon: Option<&WeaponStats>) -> i32 {
    let mut thac0 = if ch.is_npc() { 20 } else { ch.class.thac0(ch.level) };

    // Strength and gear
    thac0 -= ch.abilities.str_to_hit();
    thac0 -= ch.hitroll;

    if let Some(w) = weapon {
        thac0 -= w.special_hitroll;
        // Proficiency: up to 5 points at 100%
        if let Some(skill) = w.skill {
            thac0 -= ch.skill(skill) as i32 / 20;
        }
    }

    // Intelligence and wisdom
    thac0 -= ch.abilities.mental_to_hit();

    // Protection from the attacker's alignment
    if (ch.is_evil() && victim.is_affected(AffectFlags::PROTECT_EVIL))
        || (ch.is_good() && victim.is_affected(AffectFlags::PROTECT_GOOD))
    {
        thac0 += 2;
    }

    thac0
}

/// Defender's armor class in whole points, -10 at best
///
/// `parry` is the defender's proficiency with its wielded weapon, for
/// classes able to parry; `shield_defense` is the special bonus of a worn
/// shield.
pub fn compute_armor(victim: &Character, attacker: &Character, parry: u8, shield_defense: i32) -> i32 {
    let mut armor = victim.armor;

    if victim.awake() {
        armor += victim.abilities.dex_defensive() * 10;
    }
    armor -= parry as i32 / 5;
    armor -= shield_defense;

    if (attacker.is_evil() && victim.is_affected(AffectFlags::PROTECT_EVIL))
        || (attacker.is_good() && victim.is_affected(AffectFlags::PROTECT_GOOD))
    {
        armor -= 10;
    }

    armor.max(MIN_ARMOR) / 10
}

/// Resolve a d20 roll: a natural 20 or a helpless defender always hits, a
/// natural 1 otherwise misses
pub fn attack_hits(thac0: i32, armor: i32, diceroll: i32, defender_awake: bool) -> bool {
    if diceroll == 20 || !defender_awake {
        return true;
    }
    if diceroll == 1 {
        return false;
    }
    thac0 - diceroll <= armor
}

impl CombatWorld {
    /// Weapon stats of whatever `ch` wields
    fn wielded_weapon(&self, ch: CharId) -> Option<WeaponStats> {
        let obj = self.char(ch)?.wielded()?;
        self.object(obj)?.weapon().cloned()
    }

    /// Attack verb for a blow by `ch`
    fn attack_kind_of(&self, ch: &Character, weapon: Option<&WeaponStats>) -> AttackKind {
        match (weapon, ch.npc_data()) {
            (Some(w), _) => w.attack,
            (None, Some(npc)) => npc.attack,
            (None, None) => AttackKind::Hit,
        }
    }

    /// Parry proficiency and shield bonus of a defender
    fn defenses(&self, victim: &Character) -> (u8, i32) {
        let parry = if victim.class.can_parry() && !victim.is_npc() {
            self.wielded_weapon(victim.id)
                .and_then(|w| w.skill)
                .map_or(0, |s| victim.skill(s))
        } else {
            0
        };
        let shield = victim.equipment[WearSlot::Shield as usize]
            .and_then(|o| self.object(o))
            .map_or(0, |o| match o.kind {
                ObjectKind::Armor { special_defense, .. } => special_defense,
                _ => 0,
            });
        (parry, shield)
    }

    /// Swing once at `victim`
    ///
    /// `skill` names the combat skill driving the attack, if any; its
    /// catalog messages replace the weapon verbs.
    pub fn hit(&mut self, ch: CharId, victim: CharId, skill: Option<SpellId>) -> CombatResult {
        self.hit_with(ch, victim, skill, 1)
    }

    /// Sneak attack multiplying damage by the attacker's level bracket
    pub fn backstab(&mut self, ch: CharId, victim: CharId, skill: SpellId) -> CombatResult {
        let level = self.char(ch).map_or(1, |c| c.level);
        self.hit_with(ch, victim, Some(skill), backstab_multiplier(level))
    }

    fn hit_with(&mut self, ch: CharId, victim: CharId, skill: Option<SpellId>, multiplier: i32) -> CombatResult {
        if !self.same_room(ch, victim) {
            if self.char(ch).and_then(Character::fighting) == Some(victim) {
                self.stop_fighting(ch);
            }
            return CombatResult::NONE;
        }
        let (Some(c), Some(v)) = (self.char(ch), self.char(victim)) else {
            return CombatResult::NONE;
        };
        if v.position == Position::Dead {
            return CombatResult::NONE;
        }

        let weapon = self.wielded_weapon(ch);
        let kind = self.attack_kind_of(c, weapon.as_ref());
        let cause = match skill {
            Some(id) => DamageCause::Skill(id),
            None => DamageCause::Weapon(kind),
        };

        let thac0 = calculate_thac0(c, v, weapon.as_ref());
        let (parry, shield) = self.defenses(v);
        let armor = compute_armor(v, c, parry, shield);
        let defender_awake = v.awake();
        let diceroll = self.rng.number(1, 20);

        if !attack_hits(thac0, armor, diceroll, defender_awake) {
            debug!(%ch, %victim, thac0, armor, diceroll, "miss");
            let result = self.damage(ch, victim, 0, cause);
            return CombatResult {
                defender_died: result.is_lethal(),
                ..CombatResult::MISS
            };
        }

        let dam = self.roll_damage(ch, victim, weapon.as_ref()) * multiplier;
        debug!(%ch, %victim, thac0, armor, diceroll, dam, "hit");
        let result = self.damage(ch, victim, dam, cause);
        let mut outcome = CombatResult::landed(result);

        if let DamageResult::Dealt(dealt) = result {
            if dealt > 0 {
                if let Some(w) = weapon.as_ref().filter(|w| w.poison.is_some()) {
                    self.apply_weapon_poison(ch, victim, w);
                }
                outcome.attacker_died = self.reflect_auras(ch, victim, dealt);
            }
        }
        outcome
    }

    /// Damage of a landed blow, scaled up against helpless defenders
    fn roll_damage(&mut self, ch: CharId, victim: CharId, weapon: Option<&WeaponStats>) -> i32 {
        let Some(c) = self.char(ch) else {
            return 0;
        };
        let mut dam = c.abilities.str_to_dam() + c.damroll;
        let npc_dice = c.npc_data().map(|n| n.damage_dice);

        dam += match (weapon, npc_dice) {
            (Some(w), _) => w.special_damroll + self.rng.dice(w.dice_num, w.dice_sides),
            (None, Some((num, sides))) => self.rng.dice(num, sides),
            (None, None) => self.rng.number(0, 2),
        };

        // Helpless defenders take more
        let vulnerability = self
            .char(victim)
            .map_or(100, |v| v.position.vulnerability_percent());
        dam = dam * vulnerability / 100;

        dam.max(1)
    }

    /// Envenom the victim and maybe spend a charge of the weapon's coating
    fn apply_weapon_poison(&mut self, ch: CharId, victim: CharId, weapon: &WeaponStats) {
        let Some(charge) = weapon.poison else {
            return;
        };
        let poison = self.config.poison_spell;
        let Some(v) = self.chars.get(&victim) else {
            return;
        };
        if v.affected_by_spell(poison) || saving_throw(v, SaveKind::Paralysis, 0, &mut self.rng) {
            return;
        }

        if let Some(v) = self.char_mut(victim) {
            v.add_affect(
                Affect::new(poison, ApplyLocation::Str, -2, charge.strength.max(1))
                    .with_flags(AffectFlags::POISON),
            );
        }
        self.act("You feel very sick.", victim, None, None, Audience::Actor);
        self.act("$N looks very sick!", ch, None, Some(victim), Audience::Actor);

        if self.rng.one_in(2) {
            let Some(obj) = self.char(ch).and_then(Character::wielded) else {
                return;
            };
            if let Some(w) = self.object_mut(obj).and_then(|o| o.weapon_mut()) {
                w.poison = match w.poison {
                    Some(p) if p.charges > 1 => Some(PoisonCharge {
                        charges: p.charges - 1,
                        ..p
                    }),
                    _ => None,
                };
            }
        }
    }

    /// Counter-damage from the victim's auras; returns whether the attacker died
    fn reflect_auras(&mut self, ch: CharId, victim: CharId, dealt: i32) -> bool {
        for aura in AuraKind::ALL {
            let (Some(c), Some(v)) = (self.chars.get(&ch), self.chars.get(&victim)) else {
                return false;
            };
            if !v.is_affected(aura.flag()) || c.is_affected(aura.flag()) {
                continue;
            }
            let mut reflected = dealt / aura.reflect_divisor();
            if saving_throw(c, SaveKind::Breath, 0, &mut self.rng) {
                reflected /= 2;
            }
            if reflected <= 0 {
                continue;
            }
            if self.damage(victim, ch, reflected, DamageCause::Reflect(aura)).is_lethal() {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Class;
    use crate::object::{Object, ObjectId};
    use crate::world::{MessageLog, Room, RoomId};
    use proptest::prelude::*;

    fn world() -> (CombatWorld, MessageLog, CharId, CharId) {
        let log = MessageLog::new();
        let mut w = CombatWorld::new(17);
        w.set_messenger(Box::new(log.clone()));
        w.rooms.insert(Room::new(RoomId(1), "Arena"));
        let a = w.spawn(Character::player(CharId(0), "Alys", Class::Warrior, 20).with_hit(200, 200), RoomId(1));
        let b = w.spawn(Character::npc(CharId(0), "bear", "a bear", 10).with_hit(500, 500), RoomId(1));
        (w, log, a, b)
    }

    fn arm(w: &mut CombatWorld, ch: CharId, stats: WeaponStats) -> ObjectId {
        let sword = w.create_object(Object::new(ObjectId(0), "sword", "a sword", ObjectKind::Weapon(stats)));
        w.equip(ch, sword, WearSlot::Wield).unwrap();
        sword
    }

    #[test]
    fn test_thac0_components() {
        let mut a = Character::player(CharId(1), "Alys", Class::Warrior, 10);
        let b = Character::npc(CharId(2), "bear", "a bear", 10);
        assert_eq!(calculate_thac0(&a, &b, None), 10);

        a.hitroll = 2;
        a.abilities.str = 18;
        a.abilities.str_add = 100;
        a.skills.insert(SpellId(5), 100);
        let w = WeaponStats {
            skill: Some(SpellId(5)),
            special_hitroll: 1,
            ..Default::default()
        };
        // 10 - 3 (str) - 2 (hitroll) - 1 (special) - 5 (proficiency)
        assert_eq!(calculate_thac0(&a, &b, Some(&w)), -1);

        let npc = Character::npc(CharId(3), "rat", "a rat", 30);
        assert_eq!(calculate_thac0(&npc, &b, None), 20);
    }

    #[test]
    fn test_protection_from_evil() {
        let mut a = Character::npc(CharId(1), "imp", "an imp", 5);
        a.alignment = -900;
        let mut b = Character::player(CharId(2), "Ione", Class::Cleric, 10);
        let plain = calculate_thac0(&a, &b, None);
        let plain_armor = compute_armor(&b, &a, 0, 0);
        b.add_affect(Affect::new(SpellId(3), ApplyLocation::None, 0, 4).with_flags(AffectFlags::PROTECT_EVIL));
        assert_eq!(calculate_thac0(&a, &b, None), plain + 2);
        assert_eq!(compute_armor(&b, &a, 0, 0), plain_armor - 1);
    }

    #[test]
    fn test_armor_floor_and_sleep() {
        let a = Character::npc(CharId(1), "imp", "an imp", 5);
        let mut b = Character::player(CharId(2), "Ione", Class::Cleric, 10);
        b.armor = -400;
        assert_eq!(compute_armor(&b, &a, 0, 0), MIN_ARMOR / 10);

        b.armor = 50;
        b.abilities.dex = 18;
        assert_eq!(compute_armor(&b, &a, 0, 0), 1);
        b.position = Position::Sleeping;
        assert_eq!(compute_armor(&b, &a, 0, 0), 5);
    }

    #[test]
    fn test_natural_rolls() {
        assert!(attack_hits(100, -10, 20, true));
        assert!(!attack_hits(-100, 10, 1, true));
        assert!(attack_hits(100, -10, 1, false));
        assert!(attack_hits(15, 0, 15, true));
        assert!(!attack_hits(15, 0, 14, true));
    }

    #[test]
    fn test_hit_damages_and_starts_fight() {
        let (mut w, _, a, b) = world();
        arm(&mut w, a, WeaponStats { dice_num: 2, dice_sides: 4, ..Default::default() });
        let mut landed = false;
        for _ in 0..20 {
            let r = w.hit(a, b, None);
            landed |= r.hit;
            assert!(!r.defender_died);
        }
        assert!(landed);
        assert!(w.char(b).is_some_and(|c| c.hit() < 500));
        assert_eq!(w.char(b).and_then(Character::fighting), Some(a));
    }

    #[test]
    fn test_sleeping_victim_always_hit_harder() {
        let (mut w, _, a, b) = world();
        if let Some(bear) = w.char_mut(b) {
            bear.position = Position::Sleeping;
            bear.armor = MIN_ARMOR;
        }
        let r = w.hit(a, b, None);
        assert!(r.hit);
        // unarmed player: 0..2 doubled, never below 1
        assert!((1..=4).contains(&r.damage));
    }

    #[test]
    fn test_backstab_multiplies() {
        let (mut w, _, a, b) = world();
        arm(&mut w, a, WeaponStats { dice_num: 1, dice_sides: 1, ..Default::default() });
        if let Some(bear) = w.char_mut(b) {
            bear.position = Position::Sleeping;
        }
        let r = w.backstab(a, b, SpellId(40));
        // 1 damage doubled by sleep, times 4 at level 20
        assert!(r.hit);
        assert_eq!(r.damage, 8);
    }

    #[test]
    fn test_poison_coating() {
        let (mut w, log, a, b) = world();
        let sword = arm(
            &mut w,
            a,
            WeaponStats {
                poison: Some(PoisonCharge { charges: 3, strength: 4 }),
                ..Default::default()
            },
        );
        if let Some(bear) = w.char_mut(b) {
            bear.saves = [500; crate::consts::NUM_SAVES];
        }
        let poison = w.config.poison_spell;
        let mut poisoned = false;
        for _ in 0..30 {
            w.hit(a, b, None);
            if let Some(bear) = w.char_mut(b) {
                poisoned |= bear.is_affected(AffectFlags::POISON);
                bear.remove_affects_from(poison);
            }
        }
        assert!(poisoned);
        assert!(log.saw(a, "looks very sick"));
        let charges = w
            .object(sword)
            .and_then(|o| o.weapon())
            .and_then(|wp| wp.poison)
            .map_or(0, |p| p.charges);
        assert!(charges < 3);
    }

    #[test]
    fn test_fire_shield_burns_attacker() {
        let (mut w, log, a, b) = world();
        arm(&mut w, a, WeaponStats { dice_num: 10, dice_sides: 10, ..Default::default() });
        if let Some(bear) = w.char_mut(b) {
            bear.add_affect(
                Affect::new(SpellId(60), ApplyLocation::None, 0, 4).with_flags(AffectFlags::FIRESHIELD),
            );
        }
        let mut burned = false;
        for _ in 0..20 {
            if w.hit(a, b, None).hit {
                burned = true;
                break;
            }
        }
        assert!(burned);
        assert!(w.char(a).is_some_and(|c| c.hit() < 200));
        assert!(log.saw(a, "You are struck by a bear's flames!"));
    }

    #[test]
    fn test_split_rooms_stop_fight() {
        let (mut w, _, a, b) = world();
        w.rooms.insert(Room::new(RoomId(2), "Cave"));
        w.set_fighting(a, b);
        w.move_char(b, RoomId(2));
        assert_eq!(w.hit(a, b, None), CombatResult::NONE);
        assert!(w.char(a).and_then(Character::fighting).is_none());
    }

    proptest! {
        #[test]
        fn prop_hit_chance_monotone_in_armor(thac0 in -20i32..40, armor in -10i32..10, roll in 1i32..=20) {
            if attack_hits(thac0, armor, roll, true) {
                prop_assert!(attack_hits(thac0, armor + 1, roll, true));
            }
        }
    }
}

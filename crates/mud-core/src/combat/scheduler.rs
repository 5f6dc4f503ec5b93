//! Combat rounds
//!
//! Once per violence pulse every fighting character gets its attacks. The
//! combat list is snapshotted first; anyone removed during the round is
//! skipped by the lookups below.

use tracing::trace;

use crate::character::{CharId, Character, NpcFlags, Position, PrefFlags};
use crate::consts::PULSE_VIOLENCE;
use crate::world::{Audience, CombatWorld};

/// Most attacks any NPC gets in one round
const MAX_NPC_ATTACKS: u32 = 4;

/// Proficiency above which a player earns a second attack
const SECOND_ATTACK_SKILL: u8 = 75;

impl CombatWorld {
    /// Attacks `ch` makes this round
    ///
    /// NPCs gain one per 25 levels; players gain a second attack with a
    /// well-trained weapon.
    pub fn attacks_per_round(&self, ch: CharId) -> u32 {
        let Some(c) = self.char(ch) else {
            return 0;
        };
        if c.is_npc() {
            return (1 + c.level as u32 / 25).min(MAX_NPC_ATTACKS);
        }
        let proficiency = c
            .wielded()
            .and_then(|o| self.object(o))
            .and_then(|o| o.weapon())
            .and_then(|w| w.skill)
            .map_or(0, |s| c.skill(s));
        if proficiency > SECOND_ATTACK_SKILL { 2 } else { 1 }
    }

    /// Both still present, in one room, and `ch` still aiming at `victim`
    fn still_engaged(&self, ch: CharId, victim: CharId) -> bool {
        let (Some(c), Some(v)) = (self.char(ch), self.char(victim)) else {
            return false;
        };
        c.fighting() == Some(victim)
            && c.room.is_some()
            && c.room == v.room
            && c.position.can_fight()
            && v.position > Position::Dead
    }

    /// Idle allies of `ch` who join the fight on its behalf
    fn auto_assistants(&self, ch: CharId) -> Vec<CharId> {
        let Some(c) = self.char(ch) else {
            return Vec::new();
        };
        let Some(room) = c.room else {
            return Vec::new();
        };
        self.chars_in_room(room)
            .into_iter()
            .filter(|&id| id != ch && self.same_group(id, ch))
            .filter(|&id| {
                self.char(id).is_some_and(|ally| {
                    (ally.prf_flagged(PrefFlags::AUTOASSIST) || ally.npc_flagged(NpcFlags::HELPER))
                        && ally.fighting().is_none()
                        && ally.position.can_fight()
                        && ally.can_see(c)
                })
            })
            .collect()
    }

    /// Run one combat round for everyone in the combat list
    pub fn perform_violence(&mut self) {
        let snapshot: Vec<CharId> = self.combat_list.clone();

        for ch in snapshot {
            let Some(opponent) = self.char(ch).and_then(Character::fighting) else {
                continue;
            };
            if !self.same_room(ch, opponent) {
                self.stop_fighting(ch);
                continue;
            }

            let Some(c) = self.char_mut(ch) else {
                continue;
            };
            if c.is_npc() {
                if c.wait_ticks > 0 {
                    c.wait_ticks = (c.wait_ticks - PULSE_VIOLENCE as i32).max(0);
                    continue;
                }
                if c.awake() && c.position < Position::Fighting {
                    c.position = Position::Fighting;
                    self.act("$n scrambles to $s feet!", ch, None, None, Audience::Room);
                }
            }

            let can_fight = self.char(ch).is_some_and(|c| c.position.can_fight());
            if !can_fight {
                self.send(ch, "You can't fight while sitting!!");
                continue;
            }

            for ally in self.auto_assistants(ch) {
                self.act("You join the fight!", ally, None, None, Audience::Actor);
                self.act("$n jumps to the aid of $N!", ally, None, Some(ch), Audience::RoomButVictim);
                self.hit(ally, opponent, None);
            }

            let attacks = self.attacks_per_round(ch);
            trace!(%ch, %opponent, attacks, "combat round");
            for _ in 0..attacks {
                if !self.still_engaged(ch, opponent) {
                    break;
                }
                if self.hit(ch, opponent, None).attacker_died {
                    break;
                }
            }

            if self.char(ch).is_some_and(|c| c.room.is_some()) {
                if let Some(behavior) = self.behavior_of(ch) {
                    behavior.on_pulse(self, ch);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{AffectFlags, Class};
    use crate::object::{Object, ObjectId, ObjectKind, WeaponStats, WearSlot};
    use crate::magic::SpellId;
    use crate::world::{Behavior, MessageLog, Room, RoomId};
    use std::cell::Cell;
    use std::rc::Rc;

    fn world() -> (CombatWorld, MessageLog, CharId, CharId) {
        let log = MessageLog::new();
        let mut w = CombatWorld::new(5);
        w.set_messenger(Box::new(log.clone()));
        w.rooms.insert(Room::new(RoomId(1), "Arena"));
        w.rooms.insert(Room::new(RoomId(2), "Hall"));
        let a = w.spawn(Character::player(CharId(0), "Alys", Class::Warrior, 20).with_hit(300, 300), RoomId(1));
        let b = w.spawn(Character::npc(CharId(0), "troll", "a troll", 30).with_hit(300, 300), RoomId(1));
        (w, log, a, b)
    }

    #[test]
    fn test_attacks_per_round() {
        let (mut w, _, a, b) = world();
        assert_eq!(w.attacks_per_round(b), 2);
        assert_eq!(w.attacks_per_round(a), 1);

        let sword = w.create_object(Object::new(
            ObjectId(0),
            "sword",
            "a sword",
            ObjectKind::Weapon(WeaponStats { skill: Some(SpellId(7)), ..Default::default() }),
        ));
        w.equip(a, sword, WearSlot::Wield).unwrap();
        if let Some(c) = w.char_mut(a) {
            c.skills.insert(SpellId(7), 90);
        }
        assert_eq!(w.attacks_per_round(a), 2);
    }

    #[test]
    fn test_round_trades_blows() {
        let (mut w, _, a, b) = world();
        w.set_fighting(a, b);
        w.set_fighting(b, a);
        for _ in 0..5 {
            w.perform_violence();
        }
        assert!(w.char(a).is_some_and(|c| c.hit() < 300));
        assert!(w.char(b).is_some_and(|c| c.hit() < 300));
    }

    #[test]
    fn test_split_fight_is_dropped() {
        let (mut w, _, a, b) = world();
        w.set_fighting(a, b);
        w.move_char(b, RoomId(2));
        w.perform_violence();
        assert!(w.combat_list().is_empty());
        assert!(w.char(a).and_then(Character::fighting).is_none());
    }

    #[test]
    fn test_npc_wait_skips_round() {
        let (mut w, _, a, b) = world();
        w.set_fighting(b, a);
        if let Some(troll) = w.char_mut(b) {
            troll.wait_ticks = PULSE_VIOLENCE as i32 + 5;
        }
        w.perform_violence();
        assert_eq!(w.char(a).map(Character::hit), Some(300));
        assert_eq!(w.char(b).map(|c| c.wait_ticks), Some(5));
    }

    #[test]
    fn test_npc_scrambles_up_player_cannot() {
        let (mut w, log, a, b) = world();
        w.set_fighting(a, b);
        w.set_fighting(b, a);
        for id in [a, b] {
            if let Some(c) = w.char_mut(id) {
                c.position = Position::Sitting;
            }
        }
        w.perform_violence();
        assert!(log.saw(a, "A troll scrambles to its feet!"));
        assert!(log.saw(a, "You can't fight while sitting!!"));
        assert_eq!(w.char(b).map(|c| c.position), Some(Position::Fighting));
    }

    #[test]
    fn test_auto_assist_joins() {
        let (mut w, log, a, b) = world();
        let c = w.spawn(Character::player(CharId(0), "Bryn", Class::Cleric, 10).with_hit(80, 80), RoomId(1));
        w.add_follower(c, a);
        for id in [a, c] {
            if let Some(ch) = w.char_mut(id) {
                ch.innate |= AffectFlags::GROUP;
                ch.recompute_flags();
            }
        }
        if let Some(p) = w.char_mut(c).and_then(|ch| ch.player_data_mut()) {
            p.prefs.insert(PrefFlags::AUTOASSIST);
        }
        w.set_fighting(a, b);
        w.perform_violence();
        assert!(log.saw(c, "You join the fight!"));
        assert_eq!(w.char(c).and_then(Character::fighting), Some(b));
    }

    #[test]
    fn test_helper_npc_joins_for_its_leader() {
        let (mut w, _, a, b) = world();
        let wolf = w.spawn(Character::npc(CharId(0), "wolf", "a grey wolf", 8).with_hit(60, 60), RoomId(1));
        let rat = w.spawn(Character::npc(CharId(0), "rat", "a rat", 1).with_hit(10, 10), RoomId(1));
        for id in [wolf, rat] {
            w.add_follower(id, a);
        }
        for id in [a, wolf, rat] {
            if let Some(ch) = w.char_mut(id) {
                ch.innate |= AffectFlags::GROUP;
                ch.recompute_flags();
            }
        }
        if let Some(npc) = w.char_mut(wolf).and_then(Character::npc_data_mut) {
            npc.flags |= NpcFlags::HELPER;
        }
        w.set_fighting(a, b);
        w.perform_violence();
        assert_eq!(w.char(wolf).and_then(Character::fighting), Some(b));
        assert!(w.char(rat).and_then(Character::fighting).is_none());
    }

    struct Counter(Rc<Cell<u32>>);

    impl Behavior for Counter {
        fn on_pulse(&self, _world: &mut CombatWorld, _me: CharId) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_behavior_runs_after_attacks() {
        let (mut w, _, a, b) = world();
        let calls = Rc::new(Cell::new(0));
        w.set_behavior(b, Rc::new(Counter(calls.clone())));
        w.set_fighting(b, a);
        w.perform_violence();
        w.perform_violence();
        assert_eq!(calls.get(), 2);
    }
}

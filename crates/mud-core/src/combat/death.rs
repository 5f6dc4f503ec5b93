//! Death, corpses and experience rewards

use tracing::{debug, info, warn};

use crate::character::{AffectFlags, CharId, Character, PlayerFlags, Position};
use crate::object::{CorpseInfo, Object, ObjectFlags, ObjectId, ObjectKind};
use crate::world::{Audience, CombatWorld, EngineError, RoomId};

/// Alignment drift towards the opposite of the victim's alignment
fn alignment_shift(killer: &Character, victim: &Character) -> i32 {
    (-victim.alignment - killer.alignment) / 16
}

impl CombatWorld {
    /// Adjust a character's experience
    ///
    /// Gains are capped at `max_exp_gain` and losses at `max_exp_loss`.
    /// Immortals are unaffected; NPC experience is unbounded.
    pub fn gain_exp(&mut self, ch: CharId, gain: i64) {
        let max_gain = self.config.max_exp_gain;
        let max_loss = self.config.max_exp_loss;
        let Some(c) = self.char_mut(ch) else {
            return;
        };
        if c.is_npc() {
            c.exp = c.exp.saturating_add(gain);
            return;
        }
        if c.is_immortal() {
            return;
        }
        let gain = if gain > 0 { gain.min(max_gain) } else { gain.max(-max_loss) };
        c.exp = (c.exp + gain).max(0);
    }

    fn change_alignment(&mut self, ch: CharId, victim: CharId) {
        let Some(shift) = self
            .char(ch)
            .zip(self.char(victim))
            .map(|(c, v)| alignment_shift(c, v))
        else {
            return;
        };
        if let Some(c) = self.char_mut(ch) {
            c.alignment = (c.alignment + shift).clamp(-1000, 1000);
        }
    }

    /// Experience for a kill made alone
    pub(crate) fn solo_gain(&mut self, ch: CharId, victim: CharId) {
        let (Some(c), Some(v)) = (self.char(ch), self.char(victim)) else {
            return;
        };
        let base = self.happy_hour.boost(v.exp / 3).min(self.config.max_exp_gain);

        let level_gap = v.level as i64 - c.level as i64;
        let bonus_cap = if c.is_npc() { 4 } else { 8 };
        let bonus = (base * level_gap.min(bonus_cap) / 8).max(0);
        let mut exp = (base + bonus).max(1);
        if !v.is_npc() {
            exp = exp.min(self.config.max_exp_loss * 2 / 3);
        }

        if exp > 1 {
            self.send(ch, &format!("You receive {exp} experience points."));
        } else {
            self.send(ch, "You receive one lousy experience point.");
        }
        self.gain_exp(ch, exp);
        self.change_alignment(ch, victim);
    }

    /// Experience for a kill shared by the killer's group in the room
    pub(crate) fn group_gain(&mut self, ch: CharId, victim: CharId) {
        let Some(room) = self.char(ch).and_then(|c| c.room) else {
            return;
        };
        let Some(v) = self.char(victim) else {
            return;
        };
        let members = self.group_members_in(ch, room);
        if members.is_empty() {
            self.solo_gain(ch, victim);
            return;
        }
        let count = members.len() as i64;

        // Rounded up so the remainder goes to the group
        let mut total = v.exp / 3 + count - 1;
        if !v.is_npc() {
            total = total.min(self.config.max_exp_loss * 2 / 3);
        }
        let base = self.happy_hour.boost((total / count).max(1));
        debug!(%victim, count, base, "sharing kill experience");

        for member in members {
            let share = base.min(self.config.max_exp_gain).max(1);
            if share > 1 {
                self.send(member, &format!("You receive your share of experience -- {share} points."));
            } else {
                self.send(member, "You receive your share of experience -- one measly little point!");
            }
            self.gain_exp(member, share);
            self.change_alignment(member, victim);
        }
    }

    /// Death cry heard in the room and every adjacent room
    fn death_cry(&mut self, ch: CharId) {
        self.act("Your blood freezes as you hear $n's death cry.", ch, None, None, Audience::Room);
        let Some(room) = self.char(ch).and_then(|c| c.room) else {
            return;
        };
        for adjacent in self.rooms.adjacent(room) {
            if adjacent != room {
                self.send_to_room(adjacent, "Your blood freezes as you hear someone's death cry.", None);
            }
        }
    }

    /// Build a corpse from `ch` and everything it carries
    ///
    /// Player corpses go to their hometown's morgue when one is configured.
    pub fn make_corpse(&mut self, ch: CharId) -> Option<ObjectId> {
        let c = self.char(ch)?;
        let room = c.room?;
        let timer = if c.is_npc() {
            self.config.npc_corpse_hours
        } else {
            self.config.pc_corpse_hours
        };
        let destination = if c.is_npc() {
            room
        } else {
            let hometown = c.player_data().and_then(|p| p.hometown);
            self.config.morgue_for(hometown).unwrap_or(room)
        };

        let mut corpse = Object::new(
            ObjectId(0),
            "corpse",
            &format!("the corpse of {}", c.short_descr),
            ObjectKind::Corpse(CorpseInfo {
                of: c.id,
                name: c.short_descr.clone(),
                was_npc: c.is_npc(),
                vnum: c.npc_data().and_then(|n| n.vnum),
                level: c.level,
            }),
        );
        corpse.flags = ObjectFlags::NODONATE;
        corpse.timer = Some(timer);
        corpse.level = c.level;
        let gold = c.gold;
        let carried: Vec<ObjectId> = c
            .inventory
            .iter()
            .copied()
            .chain(c.equipment.iter().flatten().copied())
            .collect();

        let corpse = self.create_object(corpse);
        let mut weight = 0;
        for obj in carried {
            weight += self.object(obj).map_or(0, |o| o.weight);
            self.obj_to_obj(obj, corpse);
        }
        if gold > 0 {
            let money = self.create_money(gold);
            self.obj_to_obj(money, corpse);
            if let Some(c) = self.char_mut(ch) {
                c.gold = 0;
            }
        }
        if let Some(o) = self.object_mut(corpse) {
            o.weight += weight;
        }
        self.obj_to_room(corpse, destination);
        debug!(%ch, %corpse, room = %destination, "corpse made");
        Some(corpse)
    }

    /// Kill `victim` outright, without experience penalties
    pub fn raw_kill(&mut self, victim: CharId, killer: Option<CharId>) {
        if self.char(victim).is_none() {
            return;
        }
        self.stop_fighting(victim);
        if let Some(v) = self.char_mut(victim) {
            v.clear_affects();
            v.position = Position::Standing;
        }

        if self.scripts.before_death(victim, killer) {
            self.death_cry(victim);
        }

        self.make_corpse(victim);

        let is_npc = self.char(victim).is_some_and(Character::is_npc);
        if is_npc {
            if let Some(v) = self.chars.get(&victim) {
                let killer_ch = killer.and_then(|k| self.chars.get(&k));
                self.observer.npc_died(v, killer_ch);
            }
            if let Some(k) = killer.filter(|&k| self.char(k).is_some_and(|c| !c.is_npc())) {
                if let Some(v) = self.chars.get(&victim) {
                    self.observer.quest_kill(k, v);
                }
            }
        } else {
            self.player_died(victim);
        }

        self.extract_char(victim);
    }

    /// Ghost state, death counter and save for a player who just died
    fn player_died(&mut self, victim: CharId) {
        let respawn = self.config.respawn_room;
        let Some(v) = self.char_mut(victim) else {
            return;
        };
        v.set_hit(0);
        v.mana = 0;
        v.moves = 0;
        if let Some(p) = v.player_data_mut() {
            p.ghost = true;
            p.deaths += 1;
            p.load_room = p.hometown.or(respawn);
        }
        info!(%victim, "player awaiting respawn");
        self.save_character(victim);
    }

    /// Death with its penalties: half the victim's experience when
    /// someone did the killing, and the player-killer flags cleared
    pub fn die(&mut self, victim: CharId, killer: Option<CharId>) {
        if killer.is_some() {
            let loss = self.char(victim).map_or(0, |v| v.exp / 2);
            self.gain_exp(victim, -loss);
        }
        if let Some(p) = self.char_mut(victim).and_then(|v| v.player_data_mut()) {
            p.flags.remove(PlayerFlags::KILLER | PlayerFlags::THIEF);
        }
        self.raw_kill(victim, killer);
    }

    /// Bring a dead player back at their respawn point
    pub fn respawn_player(&mut self, ch: CharId) -> Result<RoomId, EngineError> {
        let c = self.char(ch).ok_or(EngineError::UnknownCharacter(ch))?;
        let Some(p) = c.player_data().filter(|p| p.ghost) else {
            warn!(%ch, "respawn requested for a living character");
            return c.room.ok_or(EngineError::UnknownCharacter(ch));
        };
        let room = p
            .load_room
            .or(p.hometown)
            .or(self.config.respawn_room)
            .filter(|&r| self.rooms.contains(r))
            .ok_or(EngineError::Malformed {
                what: "respawn room",
                reason: format!("no respawn room for {ch}"),
            })?;

        if let Some(c) = self.char_mut(ch) {
            c.set_hit(1);
            c.mana = 1;
            c.moves = 1;
            c.innate.remove(AffectFlags::GROUP);
            c.recompute_flags();
            if let Some(p) = c.player_data_mut() {
                p.ghost = false;
            }
        }
        self.move_char(ch, room);
        self.act("$n appears in a flash of light.", ch, None, None, Audience::Room);
        info!(%ch, %room, "player respawned");
        Ok(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Class;
    use crate::object::{ObjectLocation, WearSlot, WeaponStats};
    use crate::world::{DeathObserver, Direction, MessageLog, Room, ScriptHooks};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn world() -> (CombatWorld, MessageLog, CharId, CharId) {
        let log = MessageLog::new();
        let mut w = CombatWorld::new(21);
        w.set_messenger(Box::new(log.clone()));
        w.rooms.insert(Room::new(RoomId(1), "Arena"));
        w.rooms.insert(Room::new(RoomId(2), "Hall"));
        w.rooms.link(RoomId(1), Direction::West, RoomId(2));
        let a = w.spawn(Character::player(CharId(0), "Alys", Class::Warrior, 10), RoomId(1));
        let b = w.spawn(Character::npc(CharId(0), "orc", "an orc", 12), RoomId(1));
        (w, log, a, b)
    }

    #[test]
    fn test_gain_exp_caps() {
        let (mut w, _, a, b) = world();
        w.config.max_exp_gain = 50;
        w.config.max_exp_loss = 30;
        w.gain_exp(a, 1000);
        assert_eq!(w.char(a).map(|c| c.exp), Some(50));
        w.gain_exp(a, -1000);
        assert_eq!(w.char(a).map(|c| c.exp), Some(20));
        w.gain_exp(a, -1000);
        assert_eq!(w.char(a).map(|c| c.exp), Some(0));

        w.gain_exp(b, 1000);
        assert_eq!(w.char(b).map(|c| c.exp), Some(1000));
    }

    #[test]
    fn test_solo_gain_level_bonus_and_alignment() {
        let (mut w, log, a, b) = world();
        if let Some(orc) = w.char_mut(b) {
            orc.exp = 3000;
            orc.alignment = -800;
        }
        w.solo_gain(a, b);
        // 1000 base, two levels above: +250
        assert!(log.saw(a, "You receive 1250 experience points."));
        let alys = w.char(a).unwrap();
        assert_eq!(alys.exp, 1250);
        assert_eq!(alys.alignment, 50);
    }

    #[test]
    fn test_happy_hour_applies_before_cap() {
        let (mut w, _, a, b) = world();
        w.config.max_exp_gain = 1200;
        w.happy_hour.exp_percent = 50;
        w.happy_hour.hours_left = 1;
        if let Some(orc) = w.char_mut(b) {
            orc.exp = 3000;
            orc.level = 10;
        }
        w.solo_gain(a, b);
        assert_eq!(w.char(a).map(|c| c.exp), Some(1200));
    }

    #[test]
    fn test_group_gain_shares_evenly() {
        let (mut w, log, a, b) = world();
        let c = w.spawn(Character::player(CharId(0), "Bryn", Class::Cleric, 8), RoomId(1));
        let far = w.spawn(Character::player(CharId(0), "Cato", Class::Thief, 8), RoomId(2));
        w.add_follower(c, a);
        w.add_follower(far, a);
        for id in [a, c, far] {
            if let Some(ch) = w.char_mut(id) {
                ch.innate |= AffectFlags::GROUP;
                ch.recompute_flags();
            }
        }
        if let Some(orc) = w.char_mut(b) {
            orc.exp = 3000;
        }
        w.group_gain(c, b);
        // (1000 + 1) / 2
        assert!(log.saw(a, "your share of experience -- 500 points"));
        assert_eq!(w.char(c).map(|ch| ch.exp), Some(500));
        assert_eq!(w.char(far).map(|ch| ch.exp), Some(0));
    }

    #[test]
    fn test_corpse_holds_everything() {
        let (mut w, _, _, b) = world();
        let sword = w.create_object(Object::new(
            ObjectId(0),
            "sword",
            "a sword",
            ObjectKind::Weapon(WeaponStats::default()),
        ));
        let ring = w.create_object(Object::new(ObjectId(0), "ring", "a ring", ObjectKind::Other));
        w.obj_to_char(ring, b);
        w.equip(b, sword, WearSlot::Wield).unwrap();
        if let Some(orc) = w.char_mut(b) {
            orc.gold = 40;
        }

        let corpse = w.make_corpse(b).unwrap();
        let obj = w.object(corpse).unwrap();
        assert_eq!(obj.short_descr, "the corpse of an orc");
        assert_eq!(obj.timer, Some(w.config.npc_corpse_hours));
        assert_eq!(obj.location, ObjectLocation::Room(RoomId(1)));
        assert_eq!(obj.contents.len(), 3);
        assert_eq!(w.object(sword).map(|o| o.location), Some(ObjectLocation::Inside(corpse)));
        let orc = w.char(b).unwrap();
        assert!(orc.inventory.is_empty() && orc.wielded().is_none() && orc.gold == 0);
        let money: i64 = w
            .objects()
            .filter_map(|o| match o.kind {
                ObjectKind::Money(n) => Some(n),
                _ => None,
            })
            .sum();
        assert_eq!(money, 40);
    }

    #[test]
    fn test_player_corpse_goes_to_morgue() {
        let (mut w, _, a, _) = world();
        w.rooms.insert(Room::new(RoomId(50), "Morgue"));
        w.config.morgues.insert(RoomId(7), RoomId(50));
        if let Some(p) = w.char_mut(a).and_then(|c| c.player_data_mut()) {
            p.hometown = Some(RoomId(7));
        }
        let corpse = w.make_corpse(a).unwrap();
        assert_eq!(w.object(corpse).map(|o| o.location), Some(ObjectLocation::Room(RoomId(50))));
        assert_eq!(w.object(corpse).and_then(|o| o.timer), Some(w.config.pc_corpse_hours));
    }

    #[test]
    fn test_death_cry_reaches_neighbours() {
        let (mut w, log, a, b) = world();
        let next_door = w.spawn(Character::player(CharId(0), "Bryn", Class::Cleric, 8), RoomId(2));
        w.die(b, Some(a));
        assert!(log.saw(a, "Your blood freezes as you hear an orc's death cry."));
        assert!(log.saw(next_door, "someone's death cry"));
    }

    struct Silent;

    impl ScriptHooks for Silent {
        fn before_death(&mut self, _victim: CharId, _killer: Option<CharId>) -> bool {
            false
        }
    }

    #[test]
    fn test_death_script_only_silences_the_cry() {
        let (mut w, log, a, b) = world();
        w.set_script_hooks(Box::new(Silent));
        w.die(b, Some(a));
        assert!(!log.saw(a, "death cry"));
        assert!(w.char(b).is_none());
        assert!(w.objects().any(Object::is_corpse));
    }

    #[derive(Default)]
    struct Tally(Rc<RefCell<Vec<(bool, bool)>>>);

    impl DeathObserver for Tally {
        fn npc_died(&mut self, _victim: &Character, killer: Option<&Character>) {
            self.0.borrow_mut().push((killer.is_some(), false));
        }

        fn quest_kill(&mut self, _killer: CharId, _victim: &Character) {
            self.0.borrow_mut().push((true, true));
        }
    }

    #[test]
    fn test_npc_death_notifies_observer() {
        let (mut w, _, a, b) = world();
        let tally = Tally::default();
        let seen = tally.0.clone();
        w.set_death_observer(Box::new(tally));
        w.die(b, Some(a));
        assert_eq!(*seen.borrow(), vec![(true, false), (true, true)]);
    }

    #[test]
    fn test_player_death_and_respawn() {
        let (mut w, _, a, b) = world();
        w.config.respawn_room = Some(RoomId(2));
        if let Some(alys) = w.char_mut(a) {
            alys.exp = 1000;
            if let Some(p) = alys.player_data_mut() {
                p.flags.insert(PlayerFlags::KILLER);
            }
        }
        w.set_fighting(a, b);
        w.die(a, Some(b));

        let alys = w.char(a).unwrap();
        assert!(alys.room.is_none());
        assert_eq!(alys.exp, 500);
        let p = alys.player_data().unwrap();
        assert!(p.ghost && p.deaths == 1);
        assert!(!alys.plr_flagged(PlayerFlags::KILLER));
        assert!(w.char(b).and_then(Character::fighting).is_none());

        assert_eq!(w.respawn_player(a), Ok(RoomId(2)));
        let alys = w.char(a).unwrap();
        assert_eq!(alys.room, Some(RoomId(2)));
        assert_eq!(alys.position, Position::Standing);
        assert!(!alys.player_data().unwrap().ghost);
    }

    #[test]
    fn test_hometown_wins_over_respawn_room() {
        let (mut w, _, a, _) = world();
        w.rooms.insert(Room::new(RoomId(7), "Temple"));
        w.config.respawn_room = Some(RoomId(2));
        if let Some(p) = w.char_mut(a).and_then(|c| c.player_data_mut()) {
            p.hometown = Some(RoomId(7));
        }
        w.die(a, None);
        assert_eq!(w.char(a).and_then(|c| c.player_data()).and_then(|p| p.load_room), Some(RoomId(7)));
        assert_eq!(w.respawn_player(a), Ok(RoomId(7)));
    }

    #[test]
    fn test_environmental_death_keeps_experience() {
        let (mut w, _, a, _) = world();
        if let Some(alys) = w.char_mut(a) {
            alys.exp = 1000;
        }
        w.die(a, None);
        assert_eq!(w.char(a).map(|c| c.exp), Some(1000));
    }
}

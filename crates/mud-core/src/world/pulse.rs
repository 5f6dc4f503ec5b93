//! Heartbeat
//!
//! The server calls [`CombatWorld::pulse`] once per real-time pulse. Combat
//! rounds run every `PULSE_VIOLENCE` pulses and the hourly sweep every
//! `PULSES_PER_MUD_HOUR` pulses.

use tracing::{debug, info};

use super::messages::capitalize;
use super::{CombatWorld, RoomId};
use crate::character::{AffectFlags, CharId, Position};
use crate::combat::DamageCause;
use crate::consts::{PULSE_VIOLENCE, PULSES_PER_MUD_HOUR};
use crate::magic::SpellId;
use crate::object::{ObjectId, ObjectLocation};

impl CombatWorld {
    /// Pulses elapsed since the world was created
    pub fn pulses(&self) -> u64 {
        self.pulse
    }

    /// Advance the world by one pulse
    pub fn pulse(&mut self) {
        self.pulse += 1;
        if self.pulse % PULSE_VIOLENCE as u64 == 0 {
            self.perform_violence();
        }
        if self.pulse % PULSES_PER_MUD_HOUR as u64 == 0 {
            self.hourly_update();
        }
    }

    /// One game hour: affects and corpses age, poison and wounds hurt
    pub fn hourly_update(&mut self) {
        self.decay_char_affects();
        self.decay_room_affects();
        self.apply_suffering();
        self.decay_objects();

        if self.happy_hour.hours_left > 0 {
            self.happy_hour.hours_left -= 1;
            if self.happy_hour.hours_left == 0 {
                info!("happy hour is over");
            }
        }
    }

    fn wear_off_message(&self, spell: SpellId) -> Option<String> {
        self.catalog.get(spell).and_then(|d| d.messages.wear_off.clone())
    }

    fn decay_char_affects(&mut self) {
        let ids: Vec<CharId> = self.characters().filter(|c| c.room.is_some()).map(|c| c.id).collect();
        for id in ids {
            let expired = match self.char_mut(id) {
                Some(c) => c.decay_affects(),
                None => continue,
            };
            for spell in expired {
                if let Some(line) = self.wear_off_message(spell) {
                    self.send(id, &line);
                }
            }
        }
    }

    fn decay_room_affects(&mut self) {
        for (room, spell) in self.rooms.decay_affects() {
            if let Some(line) = self.wear_off_message(spell) {
                self.send_to_room(room, &line, None);
            }
        }
    }

    /// Poison and bleeding; characters below stunned lose a little each hour
    fn apply_suffering(&mut self) {
        let poison = self.config.poison_damage;
        let ids: Vec<CharId> = self.characters().filter(|c| c.room.is_some()).map(|c| c.id).collect();
        for id in ids {
            let Some(c) = self.char(id) else {
                continue;
            };
            let poisoned = c.is_affected(AffectFlags::POISON);
            if poisoned && self.damage(id, id, poison, DamageCause::Suffering).is_lethal() {
                continue;
            }

            let bleed = match self.char(id).map(|c| c.position) {
                Some(Position::Incapacitated) => 1,
                Some(Position::MortallyWounded) => 2,
                _ => 0,
            };
            if bleed > 0 {
                self.damage(id, id, bleed, DamageCause::Suffering);
            }
        }
    }

    /// Count down object timers; expired corpses spill their contents
    fn decay_objects(&mut self) {
        let timed: Vec<ObjectId> = self
            .objects()
            .filter(|o| o.timer.is_some())
            .map(|o| o.id)
            .collect();

        for id in timed {
            let Some(o) = self.object_mut(id) else {
                continue;
            };
            let Some(timer) = o.timer.as_mut() else {
                continue;
            };
            *timer -= 1;
            if *timer > 0 {
                continue;
            }

            let location = o.location;
            let name = o.short_descr.clone();
            let contents = o.contents.clone();
            let room = self.room_of_object(location);

            if let Some(room) = room {
                let line = capitalize(format!("{name} decays into dust."));
                self.send_to_room(room, &line, None);
            }
            for inner in contents {
                match room {
                    Some(r) => self.obj_to_room(inner, r),
                    None => self.extract_object(inner),
                }
            }
            debug!(obj = %id, ?room, "object decayed");
            self.extract_object(id);
        }
    }

    /// Room an object ultimately lies in, following containers and holders
    fn room_of_object(&self, mut location: ObjectLocation) -> Option<RoomId> {
        for _ in 0..16 {
            match location {
                ObjectLocation::Room(r) => return Some(r),
                ObjectLocation::Carried(ch) | ObjectLocation::Worn(ch, _) => return self.char(ch)?.room,
                ObjectLocation::Inside(container) => location = self.object(container)?.location,
                ObjectLocation::Nowhere => return None,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Affect, ApplyLocation, Character, Class};
    use crate::magic::{SpellCatalog, SpellDef};
    use crate::object::{Object, ObjectKind};
    use crate::world::{MessageLog, Room, RoomAffect, RoomFlags};

    fn world() -> (CombatWorld, MessageLog, CharId) {
        let mut armor = SpellDef::new(SpellId(1), "armor");
        armor.messages.wear_off = Some("You feel less protected.".into());
        let mut fog = SpellDef::new(SpellId(2), "fog");
        fog.messages.wear_off = Some("The fog lifts.".into());
        let catalog = SpellCatalog::from_defs(vec![armor, fog]).unwrap();

        let log = MessageLog::new();
        let mut w = CombatWorld::with_parts(Default::default(), catalog, 8);
        w.set_messenger(Box::new(log.clone()));
        w.rooms.insert(Room::new(RoomId(1), "Glade"));
        let a = w.spawn(Character::player(CharId(0), "Alys", Class::Cleric, 10).with_hit(30, 30), RoomId(1));
        (w, log, a)
    }

    #[test]
    fn test_violence_cadence() {
        let (mut w, _, a) = world();
        let b = w.spawn(Character::npc(CharId(0), "wolf", "a wolf", 3).with_hit(40, 40), RoomId(1));
        w.set_fighting(b, a);
        for _ in 0..PULSE_VIOLENCE - 1 {
            w.pulse();
        }
        assert_eq!(w.char(a).map(|c| c.hit()), Some(30));
        assert!(w.char(a).and_then(|c| c.fighting()).is_none());
        w.pulse();
        // the wolf swung, so Alys is now fighting back
        assert_eq!(w.char(a).and_then(|c| c.fighting()), Some(b));
        assert_eq!(w.pulses(), PULSE_VIOLENCE as u64);
    }

    #[test]
    fn test_affects_wear_off_hourly() {
        let (mut w, log, a) = world();
        if let Some(c) = w.char_mut(a) {
            c.add_affect(Affect::new(SpellId(1), ApplyLocation::Armor, -20, 1));
        }
        w.hourly_update();
        assert!(!log.saw(a, "less protected"));
        w.hourly_update();
        assert!(log.saw(a, "You feel less protected."));
        assert!(w.char(a).is_some_and(|c| c.affects.is_empty()));
    }

    #[test]
    fn test_room_affect_wears_off() {
        let (mut w, log, a) = world();
        if let Some(room) = w.rooms.get_mut(RoomId(1)) {
            room.affects.push(RoomAffect {
                spell: SpellId(2),
                flags: RoomFlags::FOG,
                duration: 0,
            });
        }
        w.hourly_update();
        assert!(log.saw(a, "The fog lifts."));
    }

    #[test]
    fn test_poison_and_bleeding() {
        let (mut w, _, a) = world();
        let poison = w.config.poison_spell;
        if let Some(c) = w.char_mut(a) {
            c.add_affect(Affect::new(poison, ApplyLocation::Str, -2, 5).with_flags(AffectFlags::POISON));
        }
        w.hourly_update();
        assert_eq!(w.char(a).map(|c| c.hit()), Some(28));

        let b = w.spawn(Character::npc(CharId(0), "deer", "a deer", 2).with_hit(-4, 10), RoomId(1));
        assert_eq!(w.char(b).map(|c| c.position), Some(Position::Incapacitated));
        w.hourly_update();
        assert_eq!(w.char(b).map(|c| c.hit()), Some(-5));
    }

    #[test]
    fn test_mortally_wounded_bleed_to_death() {
        let (mut w, log, a) = world();
        let b = w.spawn(Character::npc(CharId(0), "deer", "a deer", 2).with_hit(-10, 10), RoomId(1));
        w.hourly_update();
        assert!(w.char(b).is_none());
        assert!(log.saw(a, "A deer is dead!  R.I.P."));
        // no killer: nobody was rewarded
        assert_eq!(w.char(a).map(|c| c.exp), Some(0));
    }

    #[test]
    fn test_corpse_decay_spills_contents() {
        let (mut w, log, a) = world();
        let mut corpse = Object::new(ObjectId(0), "corpse", "the corpse of a rat", ObjectKind::Container);
        corpse.timer = Some(1);
        let corpse = w.create_object(corpse);
        let ring = w.create_object(Object::new(ObjectId(0), "ring", "a ring", ObjectKind::Other));
        w.obj_to_obj(ring, corpse);
        w.obj_to_room(corpse, RoomId(1));

        w.hourly_update();
        assert!(w.object(corpse).is_none());
        assert_eq!(w.object(ring).map(|o| o.location), Some(ObjectLocation::Room(RoomId(1))));
        assert!(log.saw(a, "The corpse of a rat decays into dust."));
    }

    #[test]
    fn test_happy_hour_counts_down() {
        let (mut w, _, _) = world();
        w.happy_hour.exp_percent = 25;
        w.happy_hour.hours_left = 1;
        w.hourly_update();
        assert!(!w.happy_hour.is_active());
    }
}

//! World state
//!
//! [`CombatWorld`] owns every live character and object, the room table, the
//! combat list, the RNG and the collaborators. Every engine operation takes
//! it by `&mut`; there is no global state, so two worlds never interfere.

mod config;
pub mod errors;
pub mod hooks;
pub mod messages;
pub mod pulse;
mod room;

use std::collections::BTreeMap;
use std::rc::Rc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strum::EnumCount;
use tracing::{debug, warn};

pub use config::EngineConfig;
pub use errors::EngineError;
pub use hooks::{
    Behavior, DeathObserver, ManualSpell, NoHooks, Persistence, RescueHandler, ScriptHooks,
    TriggerScope,
};
pub use messages::{Audience, MessageLog, Messenger};
pub use room::{Direction, Exit, Room, RoomAffect, RoomFlags, RoomId, RoomTable};

use crate::character::{AffectFlags, CharId, Character, Position};
use crate::invariant_violation;
use crate::magic::{SpellCatalog, SpellId};
use crate::object::{Object, ObjectId, ObjectKind, ObjectLocation, Vnum, WearSlot};
use crate::rng::GameRng;

/// Time-limited experience bonus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HappyHour {
    /// Extra experience in percent while active
    pub exp_percent: i32,
    /// Game hours left; 0 means inactive
    pub hours_left: i32,
}

impl HappyHour {
    pub fn is_active(&self) -> bool {
        self.hours_left > 0 && self.exp_percent > 0
    }

    /// Apply the bonus to an experience award
    pub fn boost(&self, exp: i64) -> i64 {
        if self.is_active() {
            exp + exp * self.exp_percent as i64 / 100
        } else {
            exp
        }
    }
}

/// The whole simulated world, as far as combat and magic are concerned
pub struct CombatWorld {
    pub(crate) chars: BTreeMap<CharId, Character>,
    pub(crate) objects: BTreeMap<ObjectId, Object>,
    /// Characters with an opponent, in the order they started fighting
    pub(crate) combat_list: Vec<CharId>,
    next_char: u32,
    next_object: u32,

    pub rooms: RoomTable,
    pub config: EngineConfig,
    pub catalog: SpellCatalog,
    pub rng: GameRng,
    pub happy_hour: HappyHour,
    /// Pulses elapsed since the world was created
    pub(crate) pulse: u64,

    mob_prototypes: HashMap<Vnum, Character>,
    obj_prototypes: HashMap<Vnum, Object>,
    prototype_behaviors: HashMap<Vnum, Rc<dyn Behavior>>,
    behaviors: HashMap<CharId, Rc<dyn Behavior>>,
    manual_spells: HashMap<SpellId, Rc<dyn ManualSpell>>,

    pub(crate) messenger: Box<dyn Messenger>,
    pub(crate) scripts: Box<dyn ScriptHooks>,
    pub(crate) persistence: Box<dyn Persistence>,
    pub(crate) observer: Box<dyn DeathObserver>,
    pub(crate) rescue: Box<dyn RescueHandler>,
}

impl CombatWorld {
    /// Empty world with default configuration and an empty catalog
    pub fn new(seed: u64) -> Self {
        Self::with_parts(EngineConfig::default(), SpellCatalog::default(), seed)
    }

    pub fn with_parts(config: EngineConfig, catalog: SpellCatalog, seed: u64) -> Self {
        Self {
            chars: BTreeMap::new(),
            objects: BTreeMap::new(),
            combat_list: Vec::new(),
            next_char: 1,
            next_object: 1,
            rooms: RoomTable::new(),
            config,
            catalog,
            rng: GameRng::new(seed),
            happy_hour: HappyHour::default(),
            pulse: 0,
            mob_prototypes: HashMap::new(),
            obj_prototypes: HashMap::new(),
            prototype_behaviors: HashMap::new(),
            behaviors: HashMap::new(),
            manual_spells: HashMap::new(),
            messenger: Box::new(MessageLog::new()),
            scripts: Box::new(NoHooks),
            persistence: Box::new(NoHooks),
            observer: Box::new(NoHooks),
            rescue: Box::new(NoHooks),
        }
    }

    pub fn set_messenger(&mut self, messenger: Box<dyn Messenger>) {
        self.messenger = messenger;
    }

    pub fn set_script_hooks(&mut self, hooks: Box<dyn ScriptHooks>) {
        self.scripts = hooks;
    }

    pub fn set_persistence(&mut self, persistence: Box<dyn Persistence>) {
        self.persistence = persistence;
    }

    pub fn set_death_observer(&mut self, observer: Box<dyn DeathObserver>) {
        self.observer = observer;
    }

    pub fn set_rescue_handler(&mut self, rescue: Box<dyn RescueHandler>) {
        self.rescue = rescue;
    }

    // ---- Characters ----

    pub fn char(&self, id: CharId) -> Option<&Character> {
        self.chars.get(&id)
    }

    pub fn char_mut(&mut self, id: CharId) -> Option<&mut Character> {
        self.chars.get_mut(&id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.chars.values()
    }

    /// Characters in `room`, in id order
    pub fn chars_in_room(&self, room: RoomId) -> Vec<CharId> {
        self.chars
            .values()
            .filter(|c| c.room == Some(room))
            .map(|c| c.id)
            .collect()
    }

    /// Both characters are in the world and in the same room
    pub fn same_room(&self, a: CharId, b: CharId) -> bool {
        match (self.char(a).and_then(|c| c.room), self.char(b).and_then(|c| c.room)) {
            (Some(ra), Some(rb)) => ra == rb,
            _ => false,
        }
    }

    /// Place a character in the world, assigning it a fresh id
    pub fn spawn(&mut self, mut ch: Character, room: RoomId) -> CharId {
        let id = CharId(self.next_char);
        self.next_char += 1;
        ch.id = id;
        ch.room = Some(room);
        ch.fighting = None;
        ch.recompute_flags();
        if let Some(behavior) = ch
            .npc_data()
            .and_then(|n| n.vnum)
            .and_then(|v| self.prototype_behaviors.get(&v).cloned())
        {
            self.behaviors.insert(id, behavior);
        }
        debug!(%id, name = %ch.short_descr, %room, "character spawned");
        self.chars.insert(id, ch);
        id
    }

    pub fn add_mob_prototype(&mut self, vnum: Vnum, mut proto: Character) {
        if let Some(npc) = proto.npc_data_mut() {
            npc.vnum = Some(vnum);
        }
        self.mob_prototypes.insert(vnum, proto);
    }

    /// Instantiate an NPC from its prototype
    pub fn spawn_mob(&mut self, vnum: Vnum, room: RoomId) -> Result<CharId, EngineError> {
        let proto = self
            .mob_prototypes
            .get(&vnum)
            .cloned()
            .ok_or_else(|| EngineError::Malformed {
                what: "mob prototype",
                reason: format!("no prototype #{vnum}"),
            })?;
        if !self.rooms.contains(room) {
            return Err(EngineError::UnknownRoom(room));
        }
        Ok(self.spawn(proto, room))
    }

    /// Attach a special routine to every NPC spawned from `vnum`
    pub fn register_behavior(&mut self, vnum: Vnum, behavior: Rc<dyn Behavior>) {
        self.prototype_behaviors.insert(vnum, behavior);
    }

    /// Attach a special routine to one live character
    pub fn set_behavior(&mut self, ch: CharId, behavior: Rc<dyn Behavior>) {
        self.behaviors.insert(ch, behavior);
    }

    pub(crate) fn behavior_of(&self, ch: CharId) -> Option<Rc<dyn Behavior>> {
        self.behaviors.get(&ch).cloned()
    }

    pub fn register_manual_spell(&mut self, spell: SpellId, handler: Rc<dyn ManualSpell>) {
        self.manual_spells.insert(spell, handler);
    }

    pub(crate) fn manual_spell(&self, spell: SpellId) -> Option<Rc<dyn ManualSpell>> {
        self.manual_spells.get(&spell).cloned()
    }

    /// Move a character; fights that become split across rooms are repaired
    /// by the next combat round
    pub fn move_char(&mut self, ch: CharId, room: RoomId) {
        if let Some(c) = self.chars.get_mut(&ch) {
            c.room = Some(room);
        }
    }

    /// Remove a character from the live world
    ///
    /// NPCs are destroyed. Players are detached (no room) and kept so they
    /// can respawn.
    pub fn extract_char(&mut self, id: CharId) {
        if !self.chars.contains_key(&id) {
            return;
        }
        self.stop_fighting(id);
        let opponents: Vec<CharId> = self
            .chars
            .values()
            .filter(|c| c.fighting == Some(id))
            .map(|c| c.id)
            .collect();
        for opp in opponents {
            self.stop_fighting(opp);
        }

        self.stop_follower(id);
        let followers = self.chars.get(&id).map(|c| c.followers.clone()).unwrap_or_default();
        for f in followers {
            self.stop_follower(f);
        }

        // Anything still carried falls to the floor
        let room = self.chars.get(&id).and_then(|c| c.room);
        let mut carried = Vec::new();
        if let Some(c) = self.chars.get_mut(&id) {
            carried.extend(c.inventory.drain(..));
        }
        for slot in 0..WearSlot::COUNT {
            if let Some(obj) = self.unequip_index(id, slot) {
                carried.push(obj);
            }
        }
        for obj in carried {
            match room {
                Some(r) => self.obj_to_room(obj, r),
                None => self.extract_object(obj),
            }
        }

        self.behaviors.remove(&id);
        let is_npc = self.chars.get(&id).is_some_and(Character::is_npc);
        if is_npc {
            self.chars.remove(&id);
        } else if let Some(c) = self.chars.get_mut(&id) {
            c.room = None;
        }
        debug!(%id, "character extracted");
    }

    // ---- Fighting relation ----

    /// Characters currently fighting, in the order they started
    pub fn combat_list(&self) -> &[CharId] {
        &self.combat_list
    }

    /// Start `ch` fighting `vict`
    ///
    /// `ch` must not already have an opponent; callers check first.
    /// Waking from magical sleep is part of joining a fight.
    pub fn set_fighting(&mut self, ch: CharId, vict: CharId) {
        if ch == vict || !self.chars.contains_key(&vict) {
            return;
        }
        let Some(c) = self.chars.get_mut(&ch) else {
            return;
        };
        if let Some(current) = c.fighting {
            invariant_violation!("{ch} is already fighting {current}; refused to start on {vict}");
            return;
        }
        c.fighting = Some(vict);
        c.break_magic_sleep();
        if !self.combat_list.contains(&ch) {
            self.combat_list.push(ch);
        }
    }

    /// Remove `ch` from combat
    pub fn stop_fighting(&mut self, ch: CharId) {
        self.combat_list.retain(|&id| id != ch);
        if let Some(c) = self.chars.get_mut(&ch) {
            c.fighting = None;
            if c.position == Position::Fighting {
                c.position = Position::Standing;
            }
            let hit = c.hit();
            c.set_hit(hit);
        }
    }

    // ---- Followers and groups ----

    pub fn add_follower(&mut self, follower: CharId, leader: CharId) {
        if follower == leader || !self.chars.contains_key(&leader) {
            return;
        }
        self.stop_follower(follower);
        if let Some(f) = self.chars.get_mut(&follower) {
            f.master = Some(leader);
        } else {
            return;
        }
        if let Some(l) = self.chars.get_mut(&leader) {
            l.followers.push(follower);
        }
    }

    /// Stop `follower` following its master, breaking any charm
    pub fn stop_follower(&mut self, follower: CharId) {
        let Some(master) = self.chars.get(&follower).and_then(|c| c.master) else {
            return;
        };
        if let Some(m) = self.chars.get_mut(&master) {
            m.followers.retain(|&f| f != follower);
        }
        if let Some(f) = self.chars.get_mut(&follower) {
            f.master = None;
            let charms: Vec<SpellId> = f
                .affects
                .iter()
                .filter(|af| af.flags.contains(AffectFlags::CHARM))
                .map(|af| af.spell)
                .collect();
            for spell in charms {
                f.remove_affects_from(spell);
            }
            f.innate.remove(AffectFlags::CHARM | AffectFlags::GROUP);
            f.recompute_flags();
        }
    }

    /// Leader of the group `ch` belongs to (itself when it follows no one)
    pub fn leader_of(&self, ch: CharId) -> CharId {
        self.char(ch).and_then(|c| c.master).unwrap_or(ch)
    }

    /// Grouped members of `ch`'s group standing in `room`, leader first
    pub fn group_members_in(&self, ch: CharId, room: RoomId) -> Vec<CharId> {
        let leader = self.leader_of(ch);
        let Some(l) = self.char(leader) else {
            return Vec::new();
        };
        std::iter::once(leader)
            .chain(l.followers.iter().copied())
            .filter(|&id| {
                self.char(id)
                    .is_some_and(|c| c.room == Some(room) && c.is_affected(AffectFlags::GROUP))
            })
            .collect()
    }

    /// Both characters belong to the same group
    pub fn same_group(&self, a: CharId, b: CharId) -> bool {
        if a == b {
            return true;
        }
        let grouped = |id| self.char(id).is_some_and(|c| c.is_affected(AffectFlags::GROUP));
        grouped(a) && grouped(b) && self.leader_of(a) == self.leader_of(b)
    }

    /// Strip invisibility and hiding
    pub fn appear(&mut self, ch: CharId) {
        let hidden = AffectFlags::INVISIBLE | AffectFlags::HIDE;
        let Some(c) = self.chars.get_mut(&ch) else {
            return;
        };
        if !c.is_affected(hidden) {
            return;
        }
        let spells: Vec<SpellId> = c
            .affects
            .iter()
            .filter(|af| af.flags.intersects(hidden))
            .map(|af| af.spell)
            .collect();
        for spell in spells {
            c.remove_affects_from(spell);
        }
        c.innate.remove(hidden);
        c.recompute_flags();
        self.act("$n slowly fades into existence.", ch, None, None, Audience::Room);
    }

    pub fn save_character(&mut self, ch: CharId) {
        if let Some(c) = self.chars.get(&ch) {
            if !c.is_npc() {
                self.persistence.save_character(c);
            }
        }
    }

    // ---- Objects ----

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    /// Objects lying on the floor of `room`
    pub fn objects_in_room(&self, room: RoomId) -> Vec<ObjectId> {
        self.objects
            .values()
            .filter(|o| o.location == ObjectLocation::Room(room))
            .map(|o| o.id)
            .collect()
    }

    /// Add an object to the world, assigning it a fresh id
    pub fn create_object(&mut self, mut obj: Object) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        obj.id = id;
        obj.location = ObjectLocation::Nowhere;
        obj.contents.clear();
        self.objects.insert(id, obj);
        id
    }

    pub fn add_object_prototype(&mut self, vnum: Vnum, mut proto: Object) {
        proto.vnum = Some(vnum);
        self.obj_prototypes.insert(vnum, proto);
    }

    /// Instantiate an object from its prototype (not yet placed anywhere)
    pub fn create_object_from(&mut self, vnum: Vnum) -> Result<ObjectId, EngineError> {
        let proto = self
            .obj_prototypes
            .get(&vnum)
            .cloned()
            .ok_or_else(|| EngineError::Malformed {
                what: "object prototype",
                reason: format!("no prototype #{vnum}"),
            })?;
        Ok(self.create_object(proto))
    }

    /// A pile of coins
    pub fn create_money(&mut self, amount: i64) -> ObjectId {
        let (name, short) = if amount == 1 {
            ("coin gold", "a gold coin".to_string())
        } else {
            ("coins gold", format!("{amount} gold coins"))
        };
        let mut obj = Object::new(ObjectId(0), name, &short, ObjectKind::Money(amount));
        obj.weight = 0;
        self.create_object(obj)
    }

    /// Detach an object from wherever it is
    fn obj_from_location(&mut self, obj: ObjectId) {
        let Some(location) = self.objects.get(&obj).map(|o| o.location) else {
            return;
        };
        match location {
            ObjectLocation::Nowhere | ObjectLocation::Room(_) => {}
            ObjectLocation::Carried(ch) => {
                if let Some(c) = self.chars.get_mut(&ch) {
                    c.inventory.retain(|&o| o != obj);
                }
            }
            ObjectLocation::Worn(ch, slot) => {
                self.unequip(ch, slot);
            }
            ObjectLocation::Inside(container) => {
                if let Some(c) = self.objects.get_mut(&container) {
                    c.contents.retain(|&o| o != obj);
                }
            }
        }
        if let Some(o) = self.objects.get_mut(&obj) {
            o.location = ObjectLocation::Nowhere;
        }
    }

    pub fn obj_to_room(&mut self, obj: ObjectId, room: RoomId) {
        self.obj_from_location(obj);
        if let Some(o) = self.objects.get_mut(&obj) {
            o.location = ObjectLocation::Room(room);
        }
    }

    pub fn obj_to_char(&mut self, obj: ObjectId, ch: CharId) {
        if !self.chars.contains_key(&ch) {
            return;
        }
        self.obj_from_location(obj);
        if let Some(o) = self.objects.get_mut(&obj) {
            o.location = ObjectLocation::Carried(ch);
            if let Some(c) = self.chars.get_mut(&ch) {
                c.inventory.push(obj);
            }
        }
    }

    pub fn obj_to_obj(&mut self, obj: ObjectId, container: ObjectId) {
        if obj == container || !self.objects.contains_key(&container) {
            return;
        }
        self.obj_from_location(obj);
        if let Some(o) = self.objects.get_mut(&obj) {
            o.location = ObjectLocation::Inside(container);
            if let Some(c) = self.objects.get_mut(&container) {
                c.contents.push(obj);
            }
        }
    }

    /// Destroy an object and everything inside it
    pub fn extract_object(&mut self, obj: ObjectId) {
        self.obj_from_location(obj);
        if let Some(o) = self.objects.remove(&obj) {
            for inner in o.contents {
                if let Some(i) = self.objects.get_mut(&inner) {
                    i.location = ObjectLocation::Nowhere;
                }
                self.extract_object(inner);
            }
        }
    }

    /// Armor points an armor piece gives in a slot
    fn slot_armor(obj: &Object, slot: WearSlot) -> i32 {
        let ObjectKind::Armor { ac, .. } = obj.kind else {
            return 0;
        };
        let factor = match slot {
            WearSlot::Body => 3,
            WearSlot::Head | WearSlot::Legs => 2,
            _ => 1,
        };
        ac * factor
    }

    /// Wear an object, applying its armor and stat bonuses
    pub fn equip(&mut self, ch: CharId, obj: ObjectId, slot: WearSlot) -> Result<(), EngineError> {
        let c = self.chars.get(&ch).ok_or(EngineError::UnknownCharacter(ch))?;
        if c.equipment[slot as usize].is_some() {
            return Err(EngineError::SlotOccupied(ch, slot));
        }
        if !self.objects.contains_key(&obj) {
            return Err(EngineError::UnknownObject(obj));
        }
        self.obj_from_location(obj);

        let Some(o) = self.objects.get_mut(&obj) else {
            return Err(EngineError::UnknownObject(obj));
        };
        o.location = ObjectLocation::Worn(ch, slot);
        let armor = Self::slot_armor(o, slot);
        let applies = o.applies.clone();
        if let Some(c) = self.chars.get_mut(&ch) {
            c.equipment[slot as usize] = Some(obj);
            c.armor -= armor;
            for (location, modifier) in applies {
                c.affect_modify(location, modifier, true);
            }
        }
        Ok(())
    }

    /// Take off whatever is in `slot`; the object is left nowhere
    pub fn unequip(&mut self, ch: CharId, slot: WearSlot) -> Option<ObjectId> {
        self.unequip_index(ch, slot as usize)
    }

    fn unequip_index(&mut self, ch: CharId, slot_idx: usize) -> Option<ObjectId> {
        let obj = self.chars.get_mut(&ch)?.equipment.get_mut(slot_idx)?.take()?;
        let Some(o) = self.objects.get_mut(&obj) else {
            invariant_violation!("{ch} wore missing object {obj}");
            return None;
        };
        let slot = match o.location {
            ObjectLocation::Worn(_, slot) => slot,
            _ => {
                warn!(%ch, %obj, "worn object had a stale location");
                WearSlot::Hold
            }
        };
        o.location = ObjectLocation::Nowhere;
        let armor = Self::slot_armor(o, slot);
        let applies = o.applies.clone();
        if let Some(c) = self.chars.get_mut(&ch) {
            c.armor += armor;
            for (location, modifier) in applies {
                c.affect_modify(location, modifier, false);
            }
            let hit = c.hit();
            c.set_hit(hit.min(c.max_hit.max(1)));
        }
        Some(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Affect, ApplyLocation, Class};
    use crate::object::WeaponStats;

    fn world() -> (CombatWorld, CharId, CharId) {
        let mut w = CombatWorld::new(1);
        w.rooms.insert(Room::new(RoomId(1), "Arena"));
        w.rooms.insert(Room::new(RoomId(2), "Hall"));
        let a = w.spawn(Character::player(CharId(0), "Alys", Class::Warrior, 10), RoomId(1));
        let b = w.spawn(Character::npc(CharId(0), "orc", "an orc", 5), RoomId(1));
        (w, a, b)
    }

    #[test]
    fn test_fighting_relation_tracks_combat_list() {
        let (mut w, a, b) = world();
        w.set_fighting(a, b);
        w.set_fighting(b, a);
        assert_eq!(w.combat_list(), &[a, b]);
        assert_eq!(w.char(a).and_then(Character::fighting), Some(b));

        // self-targeting is ignored
        w.set_fighting(a, a);
        assert_eq!(w.combat_list().len(), 2);

        w.stop_fighting(a);
        assert_eq!(w.combat_list(), &[b]);
        assert!(w.char(a).and_then(Character::fighting).is_none());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already fighting")]
    fn test_set_fighting_twice_is_invariant_violation() {
        let (mut w, a, b) = world();
        let c = w.spawn(Character::npc(CharId(0), "rat", "a rat", 1), RoomId(1));
        w.set_fighting(a, b);
        w.set_fighting(a, c);
    }

    #[test]
    fn test_extract_npc_clears_opponents() {
        let (mut w, a, b) = world();
        w.set_fighting(a, b);
        w.set_fighting(b, a);
        w.extract_char(b);
        assert!(w.char(b).is_none());
        assert!(w.combat_list().is_empty());
        assert!(w.char(a).and_then(Character::fighting).is_none());
    }

    #[test]
    fn test_extract_player_keeps_record() {
        let (mut w, a, _) = world();
        let sword = w.create_object(Object::new(
            ObjectId(0),
            "sword",
            "a sword",
            ObjectKind::Weapon(WeaponStats::default()),
        ));
        w.obj_to_char(sword, a);
        w.extract_char(a);
        assert!(w.char(a).is_some_and(|c| c.room.is_none()));
        assert_eq!(w.object(sword).map(|o| o.location), Some(ObjectLocation::Room(RoomId(1))));
    }

    #[test]
    fn test_equip_applies_and_reverses() {
        let (mut w, a, _) = world();
        let mut plate = Object::new(
            ObjectId(0),
            "plate",
            "a breastplate",
            ObjectKind::Armor { ac: 5, special_defense: 0 },
        );
        plate.applies.push((ApplyLocation::Hitroll, 2));
        let plate = w.create_object(plate);
        w.obj_to_char(plate, a);

        let before = w.char(a).map(|c| (c.armor, c.hitroll));
        w.equip(a, plate, WearSlot::Body).unwrap();
        assert_eq!(w.char(a).map(|c| (c.armor, c.hitroll)), before.map(|(ac, hr)| (ac - 15, hr + 2)));
        assert!(w.char(a).is_some_and(|c| c.inventory.is_empty()));
        assert!(matches!(
            w.equip(a, plate, WearSlot::Body),
            Err(EngineError::SlotOccupied(_, WearSlot::Body))
        ));

        assert_eq!(w.unequip(a, WearSlot::Body), Some(plate));
        assert_eq!(w.char(a).map(|c| (c.armor, c.hitroll)), before);
    }

    #[test]
    fn test_containers() {
        let (mut w, _, _) = world();
        let bag = w.create_object(Object::new(ObjectId(0), "bag", "a bag", ObjectKind::Container));
        let coins = w.create_money(12);
        w.obj_to_obj(coins, bag);
        assert_eq!(w.object(bag).map(|o| o.contents.clone()), Some(vec![coins]));
        w.extract_object(bag);
        assert!(w.object(coins).is_none());
    }

    #[test]
    fn test_groups_and_followers() {
        let (mut w, a, b) = world();
        let c = w.spawn(Character::player(CharId(0), "Bryn", Class::Cleric, 4), RoomId(1));
        w.add_follower(c, a);
        for id in [a, c] {
            if let Some(ch) = w.char_mut(id) {
                ch.innate |= AffectFlags::GROUP;
                ch.recompute_flags();
            }
        }
        assert_eq!(w.leader_of(c), a);
        assert_eq!(w.group_members_in(c, RoomId(1)), vec![a, c]);
        assert!(w.same_group(a, c));
        assert!(!w.same_group(a, b));

        w.move_char(c, RoomId(2));
        assert_eq!(w.group_members_in(a, RoomId(1)), vec![a]);

        w.stop_follower(c);
        assert!(w.char(a).is_some_and(|ch| ch.followers.is_empty()));
        assert!(!w.same_group(a, c));
    }

    #[test]
    fn test_sleep_breaks_on_fighting() {
        let (mut w, a, b) = world();
        if let Some(orc) = w.char_mut(b) {
            orc.add_affect(
                Affect::new(SpellId(38), ApplyLocation::None, 0, 4).with_flags(AffectFlags::SLEEP),
            );
        }
        w.set_fighting(b, a);
        assert!(w.char(b).is_some_and(|c| !c.is_affected(AffectFlags::SLEEP)));
    }

    #[test]
    fn test_happy_hour_boost() {
        let mut hh = HappyHour { exp_percent: 50, hours_left: 0 };
        assert_eq!(hh.boost(100), 100);
        hh.hours_left = 2;
        assert_eq!(hh.boost(100), 150);
    }
}

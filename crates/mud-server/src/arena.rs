//! Demo arena
//!
//! A small hand-built zone with a few adventurers and monsters, enough to
//! exercise melee, casting, death and respawn from the pulse loop.

use std::rc::Rc;

use mud_core::character::{AffectFlags, CharId, Character, Class, NpcFlags, PrefFlags};
use mud_core::combat::AttackKind;
use mud_core::magic::SpellId;
use mud_core::object::{Object, ObjectId, ObjectKind, PoisonCharge, WeaponStats, WearSlot};
use mud_core::world::{Behavior, CombatWorld, Direction, EngineError, Room, RoomFlags, RoomId};

pub const TEMPLE: RoomId = RoomId(3001);
pub const PIT: RoomId = RoomId(3002);
pub const TUNNEL: RoomId = RoomId(3003);

const TROLL_VNUM: u32 = 3010;
const GOBLIN_VNUM: u32 = 3011;
const LONG_BLADES: SpellId = SpellId(60);

/// Ids of the demo cast
pub struct Arena {
    pub warrior: CharId,
    pub mage: CharId,
    pub cleric: CharId,
}

/// Trolls knit their wounds back together every round
struct Regenerate(i32);

impl Behavior for Regenerate {
    fn on_pulse(&self, world: &mut CombatWorld, me: CharId) {
        if let Some(troll) = world.char_mut(me) {
            if troll.hit() > 0 {
                troll.alter_hit(self.0);
            }
        }
    }
}

fn rooms(world: &mut CombatWorld) {
    world.rooms.insert(Room::new(TEMPLE, "The Temple of Midgaard").with_flags(RoomFlags::PEACEFUL));
    let mut pit = Room::new(PIT, "The Fighting Pit");
    pit.magic_density = 0.8;
    world.rooms.insert(pit);
    world.rooms.insert(Room::new(TUNNEL, "A Dank Tunnel").with_flags(RoomFlags::DARK));
    world.rooms.link(TEMPLE, Direction::Down, PIT);
    world.rooms.link(PIT, Direction::East, TUNNEL);
}

fn prototypes(world: &mut CombatWorld) {
    let mut troll = Character::npc(CharId(0), "troll cave", "a cave troll", 18).with_hit(220, 220);
    troll.exp = 9000;
    troll.gold = 140;
    if let Some(npc) = troll.npc_data_mut() {
        npc.attack = AttackKind::Claw;
        npc.damage_dice = (2, 8);
    }
    world.add_mob_prototype(TROLL_VNUM, troll);
    world.register_behavior(TROLL_VNUM, Rc::new(Regenerate(4)));

    let mut goblin = Character::npc(CharId(0), "goblin", "a snivelling goblin", 4).with_hit(30, 30);
    goblin.exp = 400;
    if let Some(npc) = goblin.npc_data_mut() {
        npc.flags |= NpcFlags::WIMPY;
        npc.attack = AttackKind::Stab;
        npc.damage_dice = (1, 6);
        npc.flee_tendency = 10;
    }
    world.add_mob_prototype(GOBLIN_VNUM, goblin);
}

fn sword(world: &mut CombatWorld) -> ObjectId {
    let mut sword = Object::new(
        ObjectId(0),
        "sword long",
        "a long sword",
        ObjectKind::Weapon(WeaponStats {
            dice_num: 2,
            dice_sides: 6,
            attack: AttackKind::Slash,
            skill: Some(LONG_BLADES),
            poison: Some(PoisonCharge { charges: 3, strength: 4 }),
            ..Default::default()
        }),
    );
    sword.weight = 8;
    world.create_object(sword)
}

/// Party member who helps the rest of the group in a fight
fn grouped(mut ch: Character) -> Character {
    ch.innate |= AffectFlags::GROUP;
    if let Some(p) = ch.player_data_mut() {
        p.prefs |= PrefFlags::AUTOASSIST;
    }
    ch
}

/// Build rooms, prototypes and the starting cast
pub fn populate(world: &mut CombatWorld) -> Result<Arena, EngineError> {
    rooms(world);
    prototypes(world);

    let mut warrior = Character::player(CharId(0), "Brand", Class::Warrior, 24).with_hit(260, 260);
    warrior.skills.insert(LONG_BLADES, 85);
    if let Some(p) = warrior.player_data_mut() {
        p.hometown = Some(TEMPLE);
    }
    let warrior = world.spawn(grouped(warrior), PIT);
    let blade = sword(world);
    world.obj_to_char(blade, warrior);
    world.equip(warrior, blade, WearSlot::Wield)?;

    let mut mage = Character::player(CharId(0), "Mira", Class::MagicUser, 22).with_hit(120, 120);
    mage.max_mana = 300;
    mage.mana = 300;
    for id in [32, 40, 41] {
        mage.skills.insert(SpellId(id), 80);
    }
    let mage = world.spawn(grouped(mage), PIT);

    let mut cleric = Character::player(CharId(0), "Osric", Class::Cleric, 20).with_hit(150, 150);
    cleric.max_mana = 250;
    cleric.mana = 250;
    for id in [1, 16, 36] {
        cleric.skills.insert(SpellId(id), 85);
    }
    let cleric = world.spawn(grouped(cleric), PIT);

    for member in [mage, cleric] {
        world.add_follower(member, warrior);
    }

    world.spawn_mob(TROLL_VNUM, PIT)?;
    world.spawn_mob(GOBLIN_VNUM, PIT)?;
    world.spawn_mob(GOBLIN_VNUM, TUNNEL)?;

    Ok(Arena { warrior, mage, cleric })
}

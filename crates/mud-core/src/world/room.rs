//! Room graph stand-in
//!
//! The engine only asks rooms a handful of questions: whether they are
//! peaceful or suppress magic, which exits are open, and how dense the
//! ambient magic is. [`RoomTable`] answers those from an in-memory map.

use core::fmt;
use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

use crate::magic::SpellId;

/// Unique identifier for a room
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room#{}", self.0)
    }
}

bitflags! {
    /// Room properties consulted by combat and casting
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RoomFlags: u32 {
        /// No violence
        const PEACEFUL = 1 << 0;
        /// Spells fizzle
        const NO_MAGIC = 1 << 1;
        const DARK = 1 << 2;
        const FOG = 1 << 3;
    }
}

/// Exit directions
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumCount,
)]
#[repr(u8)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
    Up = 4,
    Down = 5,
}

impl Direction {
    pub const fn reverse(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub to: RoomId,
    #[serde(default)]
    pub closed: bool,
}

/// Timed room enchantment created by a room-effect spell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAffect {
    pub spell: SpellId,
    pub flags: RoomFlags,
    /// Remaining game hours
    pub duration: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Flags built into the room
    #[serde(default)]
    pub base_flags: RoomFlags,
    #[serde(default)]
    pub exits: BTreeMap<Direction, Exit>,
    /// Ambient magic density, 0.0 (dead zone) to 1.0 (ley nexus)
    #[serde(default = "default_density")]
    pub magic_density: f32,
    #[serde(default)]
    pub affects: Vec<RoomAffect>,
}

fn default_density() -> f32 {
    0.5
}

impl Room {
    pub fn new(id: RoomId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            base_flags: RoomFlags::empty(),
            exits: BTreeMap::new(),
            magic_density: default_density(),
            affects: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: RoomFlags) -> Self {
        self.base_flags = flags;
        self
    }

    /// Built-in flags plus those granted by active room affects
    pub fn flags(&self) -> RoomFlags {
        self.affects
            .iter()
            .fold(self.base_flags, |acc, af| acc | af.flags)
    }

    pub fn is_peaceful(&self) -> bool {
        self.flags().contains(RoomFlags::PEACEFUL)
    }

    pub fn no_magic(&self) -> bool {
        self.flags().contains(RoomFlags::NO_MAGIC)
    }

    /// Exits that can be walked through, in direction order
    pub fn open_exits(&self) -> Vec<(Direction, RoomId)> {
        Direction::iter()
            .filter_map(|dir| {
                self.exits
                    .get(&dir)
                    .filter(|exit| !exit.closed)
                    .map(|exit| (dir, exit.to))
            })
            .collect()
    }
}

/// All rooms of the running world
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomTable {
    rooms: BTreeMap<RoomId, Room>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, room: Room) {
        self.rooms.insert(room.id, room);
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn contains(&self, id: RoomId) -> bool {
        self.rooms.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Connect two rooms in both directions
    pub fn link(&mut self, from: RoomId, dir: Direction, to: RoomId) {
        if let Some(room) = self.rooms.get_mut(&from) {
            room.exits.insert(dir, Exit { to, closed: false });
        }
        if let Some(room) = self.rooms.get_mut(&to) {
            room.exits.insert(dir.reverse(), Exit { to: from, closed: false });
        }
    }

    pub fn is_peaceful(&self, id: RoomId) -> bool {
        self.get(id).is_some_and(Room::is_peaceful)
    }

    pub fn no_magic(&self, id: RoomId) -> bool {
        self.get(id).is_some_and(Room::no_magic)
    }

    /// Magic density of a room; unknown rooms read as moderate
    pub fn magic_density(&self, id: RoomId) -> f32 {
        self.get(id).map_or(default_density(), |r| r.magic_density)
    }

    pub fn open_exits(&self, id: RoomId) -> Vec<(Direction, RoomId)> {
        self.get(id).map(Room::open_exits).unwrap_or_default()
    }

    /// Distinct rooms reachable through one open exit
    pub fn adjacent(&self, id: RoomId) -> Vec<RoomId> {
        let mut out: Vec<RoomId> = Vec::new();
        for (_, to) in self.open_exits(id) {
            if to != id && !out.contains(&to) {
                out.push(to);
            }
        }
        out
    }

    /// Age room affects by one game hour; returns the ones that expired
    pub fn decay_affects(&mut self) -> Vec<(RoomId, SpellId)> {
        let mut expired = Vec::new();
        for room in self.rooms.values_mut() {
            let id = room.id;
            room.affects.retain_mut(|af| {
                if af.duration > 0 {
                    af.duration -= 1;
                    true
                } else if af.duration == 0 {
                    expired.push((id, af.spell));
                    false
                } else {
                    true
                }
            });
        }
        expired
    }
}

//! Core engine constants
//!
//! Timing, level thresholds and hit-point thresholds shared by the combat
//! and magic code. Tunable balance numbers live in [`crate::world::EngineConfig`].

/// Real-time length of one pulse in milliseconds
pub const PULSE_MILLIS: u64 = 100;

/// Pulses between two combat rounds (2 seconds of real time)
pub const PULSE_VIOLENCE: u32 = 20;

/// Pulses in one game hour (affect decay cadence)
pub const PULSES_PER_MUD_HOUR: u32 = 750;

/// First immortal level
pub const LVL_IMMORT: u8 = 101;

/// Hit points at or below which a character is dead
pub const HP_DEAD: i32 = -11;

/// Hit points at or below which a character is mortally wounded
pub const HP_MORTALLY_WOUNDED: i32 = -6;

/// Hit points at or below which a character is incapacitated
pub const HP_INCAPACITATED: i32 = -3;

/// Lowest armor value (best possible armor, ×10 convention)
pub const MIN_ARMOR: i32 = -100;

/// Unarmored base armor value (×10 convention)
pub const BASE_ARMOR: i32 = 100;

/// Alignment at or above which a character counts as good
pub const ALIGN_GOOD: i32 = 350;

/// Alignment at or below which a character counts as evil
pub const ALIGN_EVIL: i32 = -350;

/// Minimum mana cost of an assigned class formula
pub const MIN_CLASS_MANA: i32 = 5;

/// Maximum depth when following discoverable-variant prerequisites
pub const MAX_PREREQUISITE_DEPTH: u8 = 8;

/// Cost charged when prerequisite recursion is cut off
pub const CYCLIC_COST_FALLBACK: i32 = 100;

/// Number of random exits tried when fleeing
pub const FLEE_ATTEMPTS: u32 = 6;

/// Number of saving throw categories
pub const NUM_SAVES: usize = 5;

//! Position state machine
//!
//! A character's coarse activity state, totally ordered from dead to
//! standing. Positions at or below [`Position::Stunned`] are derived from hit
//! points; the ones above are chosen by the character.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::consts::{HP_DEAD, HP_INCAPACITATED, HP_MORTALLY_WOUNDED};

/// Coarse activity state, ordered by severity (weakest first)
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[repr(u8)]
pub enum Position {
    Dead = 0,
    MortallyWounded = 1,
    Incapacitated = 2,
    Stunned = 3,
    Sleeping = 4,
    Resting = 5,
    Sitting = 6,
    Meditating = 7,
    Fighting = 8,
    #[default]
    Standing = 9,
}

impl Position {
    /// Position prescribed for `hit` points given the current position
    ///
    /// | Condition                                  | Result            |
    /// |--------------------------------------------|-------------------|
    /// | hit > 0 and current stronger than stunned  | unchanged         |
    /// | hit > 0                                    | standing          |
    /// | hit <= -11                                 | dead              |
    /// | hit <= -6                                  | mortally wounded  |
    /// | hit <= -3                                  | incapacitated     |
    /// | otherwise                                  | stunned           |
    pub const fn derive(hit: i32, current: Position) -> Position {
        if hit > 0 {
            if current as u8 > Position::Stunned as u8 {
                current
            } else {
                Position::Standing
            }
        } else if hit <= HP_DEAD {
            Position::Dead
        } else if hit <= HP_MORTALLY_WOUNDED {
            Position::MortallyWounded
        } else if hit <= HP_INCAPACITATED {
            Position::Incapacitated
        } else {
            Position::Stunned
        }
    }

    /// Conscious enough to notice the world and defend itself
    pub fn is_awake(&self) -> bool {
        *self > Position::Sleeping
    }

    /// Upright enough to swing a weapon
    pub fn can_fight(&self) -> bool {
        *self >= Position::Fighting
    }

    /// Damage multiplier in percent applied to blows against this position
    ///
    /// Sitting ×1.33 up to mortally wounded ×3.00.
    pub const fn vulnerability_percent(&self) -> i32 {
        match self {
            Position::Standing | Position::Fighting => 100,
            Position::Meditating | Position::Sitting => 133,
            Position::Resting => 166,
            Position::Sleeping => 200,
            Position::Stunned => 233,
            Position::Incapacitated => 266,
            Position::MortallyWounded | Position::Dead => 300,
        }
    }

    /// Condition line shown to the room when a character enters this position
    pub const fn condition_message(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Position::MortallyWounded => Some((
                "$n is mortally wounded, and will die soon, if not aided.",
                "You are mortally wounded, and will die soon, if not aided.",
            )),
            Position::Incapacitated => Some((
                "$n is incapacitated and will slowly die, if not aided.",
                "You are incapacitated and will slowly die, if not aided.",
            )),
            Position::Stunned => Some((
                "$n is stunned, but will probably regain consciousness again.",
                "You're stunned, but will probably regain consciousness again.",
            )),
            Position::Dead => Some(("$n is dead!  R.I.P.", "You are dead!  Sorry...")),
            _ => None,
        }
    }
}

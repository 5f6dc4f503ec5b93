//! Engine error types and invariant reporting
//!
//! Data and lookup problems are returned as [`EngineError`]. Broken engine
//! invariants are reported through [`invariant_violation!`](crate::invariant_violation),
//! which fails loudly in debug builds and degrades to a logged no-op in
//! release builds so one bad combatant cannot abort a whole pulse.

use thiserror::Error;

use crate::character::CharId;
use crate::magic::SpellId;
use crate::object::{ObjectId, WearSlot};
use crate::world::RoomId;

/// Errors raised by world lookups and catalog/configuration loading
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("no such character: {0}")]
    UnknownCharacter(CharId),

    #[error("no such object: {0}")]
    UnknownObject(ObjectId),

    #[error("no such room: {0}")]
    UnknownRoom(RoomId),

    #[error("no such spell: {0}")]
    UnknownSpell(String),

    #[error("duplicate spell id {0} in catalog")]
    DuplicateSpell(SpellId),

    #[error("formula error at column {column}: {message}")]
    Formula { column: usize, message: String },

    #[error("could not parse {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("could not read '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("{0} already has something worn on {1}")]
    SlotOccupied(CharId, WearSlot),

    #[error("prerequisite chain starting at spell {0} is cyclic or too deep")]
    CyclicPrerequisite(SpellId),
}

impl EngineError {
    pub(crate) fn malformed(what: &'static str, err: impl core::fmt::Display) -> Self {
        EngineError::Malformed {
            what,
            reason: err.to_string(),
        }
    }
}

/// Report a broken engine invariant
///
/// Logs at `error` level and trips a `debug_assert!`. Callers must return
/// without mutating state after invoking it.
#[macro_export]
macro_rules! invariant_violation {
    ($($arg:tt)+) => {{
        tracing::error!(target: "mud_core::invariant", $($arg)+);
        debug_assert!(false, $($arg)+);
    }};
}

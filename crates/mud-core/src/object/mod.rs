//! Object system
//!
//! Object instances the engine consults for weapons, armor, poison and
//! currency, and the containers it builds for corpses.

mod obj;

pub use obj::{
    CorpseInfo, Object, ObjectFlags, ObjectId, ObjectKind, ObjectLocation, PoisonCharge, Vnum,
    WearSlot, WeaponStats,
};
